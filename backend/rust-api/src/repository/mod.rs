//! Persistence boundary.
//!
//! Services only see [`Repository`]. [`mongo::MongoRepository`] is the
//! production store; [`memory::MemoryRepository`] backs local runs and tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Match, MentorshipRequest, MentorshipStatus, Module, Opportunity, OpportunityStatus, User,
    UserRole,
};

pub mod memory;
pub mod mongo;
mod records;

pub use memory::MemoryRepository;
pub use mongo::MongoRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0}")]
    NotFound(String),

    /// A conditional write lost: unique key taken or guarded state changed.
    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Whose rows a listing returns. Admins see everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    All,
    Mentor(String),
    Learner(String),
}

impl Viewer {
    pub fn for_role(user_id: &str, role: UserRole) -> Self {
        match role {
            UserRole::Admin => Viewer::All,
            UserRole::Mentor => Viewer::Mentor(user_id.to_string()),
            UserRole::Learner => Viewer::Learner(user_id.to_string()),
        }
    }
}

/// Result of an add-if-absent on a user's completed modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub completed_modules: Vec<String>,
    /// False when the module was already recorded and nothing was written.
    pub inserted: bool,
    /// Catalog size seen by the same unit as the write.
    pub total_modules: usize,
}

/// One atomic unit: move the opportunity from `expected` to `next` and, on
/// acceptance, append the match. Either both writes land or neither does.
#[derive(Debug, Clone)]
pub struct OpportunityResponse {
    pub opportunity_id: String,
    pub expected: OpportunityStatus,
    pub next: OpportunityStatus,
    pub new_match: Option<Match>,
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Connectivity probe used by `/health`.
    async fn ping(&self) -> RepoResult<()>;

    // Modules

    /// All modules in catalog (creation) order.
    async fn list_modules(&self) -> RepoResult<Vec<Module>>;
    async fn get_module(&self, id: &str) -> RepoResult<Option<Module>>;
    async fn count_modules(&self) -> RepoResult<usize>;
    /// Fails with `Conflict` if the id is taken.
    async fn insert_module(&self, module: &Module) -> RepoResult<()>;
    /// Replaces the editable fields; returns `false` if the module is absent.
    async fn update_module(&self, module: &Module) -> RepoResult<bool>;
    /// Deletes the module and pulls its id from every user's completed set.
    /// Returns `false` if the module is absent.
    async fn delete_module(&self, id: &str) -> RepoResult<bool>;

    // Users

    async fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> RepoResult<()>;
    async fn list_users(&self, role: Option<UserRole>) -> RepoResult<Vec<User>>;
    /// Atomic add-if-absent, checked against the module in the same unit so
    /// a concurrent `delete_module` cannot leave an orphaned id behind.
    /// `NotFound` when the module or the user does not exist.
    async fn add_completed_module(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> RepoResult<CompletionUpdate>;
    /// Returns `false` if the user is absent.
    async fn set_completed_modules(&self, user_id: &str, modules: &[String]) -> RepoResult<bool>;

    // Opportunities and matches

    async fn get_opportunity(&self, id: &str) -> RepoResult<Option<Opportunity>>;
    async fn insert_opportunity(&self, opportunity: &Opportunity) -> RepoResult<()>;
    async fn list_opportunities(&self, viewer: &Viewer) -> RepoResult<Vec<Opportunity>>;
    /// `NotFound` if the opportunity is gone, `Conflict` if its status is no
    /// longer `expected` or a match already exists for it.
    async fn commit_opportunity_response(
        &self,
        response: OpportunityResponse,
    ) -> RepoResult<Opportunity>;
    async fn list_matches(&self, viewer: &Viewer) -> RepoResult<Vec<Match>>;

    // Mentorship requests

    async fn insert_mentorship_request(&self, request: &MentorshipRequest) -> RepoResult<()>;
    async fn get_mentorship_request(&self, id: &str) -> RepoResult<Option<MentorshipRequest>>;
    async fn update_mentorship_status(
        &self,
        id: &str,
        status: MentorshipStatus,
    ) -> RepoResult<Option<MentorshipRequest>>;
    async fn list_mentorship_requests(&self, viewer: &Viewer)
        -> RepoResult<Vec<MentorshipRequest>>;
    /// Requests created by an admin.
    async fn list_recommendations(&self) -> RepoResult<Vec<MentorshipRequest>>;
}
