//! In-process store. A single `RwLock` guards all collections, so every
//! trait method is one atomic unit.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    CompletionUpdate, OpportunityResponse, RepoResult, Repository, RepositoryError, Viewer,
};
use crate::models::{
    Match, MentorshipRequest, MentorshipStatus, Module, Opportunity, User, UserRole,
};

#[derive(Default)]
struct MemoryState {
    // Vectors keep insertion order, which is catalog order for modules.
    modules: Vec<Module>,
    users: Vec<User>,
    opportunities: Vec<Opportunity>,
    matches: Vec<Match>,
    mentorship_requests: Vec<MentorshipRequest>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }

    async fn list_modules(&self) -> RepoResult<Vec<Module>> {
        Ok(self.state.read().await.modules.clone())
    }

    async fn get_module(&self, id: &str) -> RepoResult<Option<Module>> {
        let state = self.state.read().await;
        Ok(state.modules.iter().find(|m| m.id == id).cloned())
    }

    async fn count_modules(&self) -> RepoResult<usize> {
        Ok(self.state.read().await.modules.len())
    }

    async fn insert_module(&self, module: &Module) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.modules.iter().any(|m| m.id == module.id) {
            return Err(RepositoryError::Conflict(format!(
                "Module {} already exists",
                module.id
            )));
        }
        state.modules.push(module.clone());
        Ok(())
    }

    async fn update_module(&self, module: &Module) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.modules.iter_mut().find(|m| m.id == module.id) {
            Some(existing) => {
                existing.title = module.title.clone();
                existing.description = module.description.clone();
                existing.content_url = module.content_url.clone();
                existing.duration = module.duration.clone();
                existing.difficulty = module.difficulty.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_module(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let before = state.modules.len();
        state.modules.retain(|m| m.id != id);
        if state.modules.len() == before {
            return Ok(false);
        }
        for user in state.users.iter_mut() {
            user.completed_modules.retain(|m| m != id);
        }
        Ok(true)
    }

    async fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if state.users.iter().any(|u| u.id == user.id) {
            return Err(RepositoryError::Conflict(format!(
                "User {} already exists",
                user.id
            )));
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn list_users(&self, role: Option<UserRole>) -> RepoResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        // Newest first, like the Mongo listing.
        users.reverse();
        Ok(users)
    }

    async fn add_completed_module(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> RepoResult<CompletionUpdate> {
        let mut state = self.state.write().await;
        if !state.modules.iter().any(|m| m.id == module_id) {
            return Err(RepositoryError::NotFound("Module not found".to_string()));
        }
        let total_modules = state.modules.len();
        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
            return Err(RepositoryError::NotFound("User not found".to_string()));
        };
        let inserted = !user.completed_modules.iter().any(|m| m == module_id);
        if inserted {
            user.completed_modules.push(module_id.to_string());
        }
        Ok(CompletionUpdate {
            completed_modules: user.completed_modules.clone(),
            inserted,
            total_modules,
        })
    }

    async fn set_completed_modules(&self, user_id: &str, modules: &[String]) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.completed_modules = modules.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_opportunity(&self, id: &str) -> RepoResult<Option<Opportunity>> {
        let state = self.state.read().await;
        Ok(state.opportunities.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_opportunity(&self, opportunity: &Opportunity) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.opportunities.iter().any(|o| o.id == opportunity.id) {
            return Err(RepositoryError::Conflict(format!(
                "Opportunity {} already exists",
                opportunity.id
            )));
        }
        state.opportunities.push(opportunity.clone());
        Ok(())
    }

    async fn list_opportunities(&self, viewer: &Viewer) -> RepoResult<Vec<Opportunity>> {
        let state = self.state.read().await;
        Ok(state
            .opportunities
            .iter()
            .filter(|o| match viewer {
                Viewer::All => true,
                Viewer::Mentor(id) => &o.mentor_id == id,
                Viewer::Learner(id) => o.is_visible_to_learner(id),
            })
            .cloned()
            .collect())
    }

    async fn commit_opportunity_response(
        &self,
        response: OpportunityResponse,
    ) -> RepoResult<Opportunity> {
        let mut state = self.state.write().await;
        let MemoryState {
            opportunities,
            matches,
            ..
        } = &mut *state;

        let opportunity = opportunities
            .iter_mut()
            .find(|o| o.id == response.opportunity_id)
            .ok_or_else(|| RepositoryError::NotFound("Opportunity not found".to_string()))?;

        if opportunity.status != response.expected {
            return Err(RepositoryError::Conflict(format!(
                "Opportunity is already {}",
                opportunity.status.as_str()
            )));
        }

        // Check before mutating anything so a rejected match leaves no trace.
        if let Some(new_match) = &response.new_match {
            if matches
                .iter()
                .any(|m| m.opportunity_id == new_match.opportunity_id)
            {
                return Err(RepositoryError::Conflict(
                    "Opportunity already has a match".to_string(),
                ));
            }
        }

        opportunity.status = response.next;
        let updated = opportunity.clone();
        if let Some(new_match) = response.new_match {
            matches.push(new_match);
        }
        Ok(updated)
    }

    async fn list_matches(&self, viewer: &Viewer) -> RepoResult<Vec<Match>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .iter()
            .filter(|m| match viewer {
                Viewer::All => true,
                Viewer::Mentor(id) => &m.mentor_id == id,
                Viewer::Learner(id) => &m.learner_id == id,
            })
            .cloned()
            .collect())
    }

    async fn insert_mentorship_request(&self, request: &MentorshipRequest) -> RepoResult<()> {
        let mut state = self.state.write().await;
        state.mentorship_requests.push(request.clone());
        Ok(())
    }

    async fn get_mentorship_request(&self, id: &str) -> RepoResult<Option<MentorshipRequest>> {
        let state = self.state.read().await;
        Ok(state
            .mentorship_requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn update_mentorship_status(
        &self,
        id: &str,
        status: MentorshipStatus,
    ) -> RepoResult<Option<MentorshipRequest>> {
        let mut state = self.state.write().await;
        Ok(state
            .mentorship_requests
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| {
                r.status = status;
                r.clone()
            }))
    }

    async fn list_mentorship_requests(
        &self,
        viewer: &Viewer,
    ) -> RepoResult<Vec<MentorshipRequest>> {
        let state = self.state.read().await;
        Ok(state
            .mentorship_requests
            .iter()
            .filter(|r| match viewer {
                Viewer::All => true,
                Viewer::Mentor(id) => &r.mentor_id == id,
                Viewer::Learner(id) => &r.learner_id == id,
            })
            .cloned()
            .collect())
    }

    async fn list_recommendations(&self) -> RepoResult<Vec<MentorshipRequest>> {
        let state = self.state.read().await;
        Ok(state
            .mentorship_requests
            .iter()
            .filter(|r| r.admin_id.is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OpportunityStatus;
    use chrono::Utc;
    use std::sync::Arc;

    fn user(id: &str, completed: &[&str]) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            role: UserRole::Learner,
            completed_modules: completed.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    fn module(id: &str) -> Module {
        Module {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: String::new(),
            content_url: String::new(),
            duration: String::new(),
            difficulty: String::new(),
            created_at: Utc::now(),
        }
    }

    fn open_opportunity(id: &str) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            mentor_id: "mentor".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            learner_id: None,
            status: OpportunityStatus::Open,
            created_at: Utc::now(),
        }
    }

    fn acceptance(opportunity_id: &str, learner: &str) -> OpportunityResponse {
        OpportunityResponse {
            opportunity_id: opportunity_id.to_string(),
            expected: OpportunityStatus::Open,
            next: OpportunityStatus::Accepted,
            new_match: Some(Match {
                id: format!("match-{learner}"),
                mentor_id: "mentor".to_string(),
                learner_id: learner.to_string(),
                opportunity_id: opportunity_id.to_string(),
                created_at: Utc::now(),
            }),
        }
    }

    #[tokio::test]
    async fn add_completed_module_is_idempotent() {
        let repo = MemoryRepository::new();
        repo.insert_module(&module("m1")).await.unwrap();
        repo.insert_user(&user("u1", &[])).await.unwrap();

        let first = repo.add_completed_module("u1", "m1").await.unwrap();
        let second = repo.add_completed_module("u1", "m1").await.unwrap();

        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(second.completed_modules, vec!["m1".to_string()]);
        assert!(matches!(
            repo.add_completed_module("ghost", "m1").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.add_completed_module("u1", "m2").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn completion_racing_delete_never_orphans() {
        for round in 0..50 {
            let repo = Arc::new(MemoryRepository::new());
            repo.insert_module(&module("m")).await.unwrap();
            repo.insert_user(&user("u", &[])).await.unwrap();

            let completer = {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_completed_module("u", "m").await })
            };
            let deleter = {
                let repo = repo.clone();
                tokio::spawn(async move { repo.delete_module("m").await })
            };

            let completed = completer.await.unwrap();
            assert!(deleter.await.unwrap().unwrap());

            let user = repo.get_user("u").await.unwrap().unwrap();
            assert!(
                user.completed_modules.is_empty(),
                "round {round}: completion survived delete ({completed:?})"
            );
        }
    }

    #[tokio::test]
    async fn delete_module_cascades_to_users() {
        let repo = MemoryRepository::new();
        repo.insert_module(&module("m1")).await.unwrap();
        repo.insert_module(&module("m2")).await.unwrap();
        repo.insert_user(&user("u1", &["m1", "m2"])).await.unwrap();
        repo.insert_user(&user("u2", &["m1"])).await.unwrap();

        assert!(repo.delete_module("m1").await.unwrap());
        assert!(!repo.delete_module("m1").await.unwrap());

        let u1 = repo.get_user("u1").await.unwrap().unwrap();
        let u2 = repo.get_user("u2").await.unwrap().unwrap();
        assert_eq!(u1.completed_modules, vec!["m2".to_string()]);
        assert!(u2.completed_modules.is_empty());
        assert_eq!(repo.count_modules().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = MemoryRepository::new();
        repo.insert_user(&user("u1", &[])).await.unwrap();
        let mut clone = user("u2", &[]);
        clone.email = "u1@example.com".to_string();
        assert!(matches!(
            repo.insert_user(&clone).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn second_acceptance_conflicts_without_writing() {
        let repo = MemoryRepository::new();
        repo.insert_opportunity(&open_opportunity("o1")).await.unwrap();

        let accepted = repo
            .commit_opportunity_response(acceptance("o1", "l1"))
            .await
            .unwrap();
        assert_eq!(accepted.status, OpportunityStatus::Accepted);

        let err = repo
            .commit_opportunity_response(acceptance("o1", "l2"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let matches = repo.list_matches(&Viewer::All).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].learner_id, "l1");
    }

    #[tokio::test]
    async fn missing_opportunity_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo
            .commit_opportunity_response(acceptance("nope", "l1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
