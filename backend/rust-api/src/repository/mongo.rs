//! MongoDB-backed [`Repository`].
//!
//! Multi-document changes (accept + match, module delete + cascade, module
//! completion) run in a transaction, so the deployment must be a replica set. Reads retry on
//! network and server-selection errors; writes never retry outside a
//! transaction.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{
        Error as MongoError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
        UNKNOWN_TRANSACTION_COMMIT_RESULT,
    },
    options::{IndexOptions, ReturnDocument},
    Client, ClientSession, Collection, Database, IndexModel,
};
use tracing::{error, warn};

use super::records::{
    MatchRecord, MentorshipRequestRecord, ModuleRecord, OpportunityRecord, UserRecord,
};
use super::{
    CompletionUpdate, OpportunityResponse, RepoResult, Repository, RepositoryError, Viewer,
};
use crate::models::{
    Match, MentorshipRequest, MentorshipStatus, Module, Opportunity, User, UserRole,
};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

const MODULES: &str = "modules";
const USERS: &str = "users";
const OPPORTUNITIES: &str = "opportunities";
const MATCHES: &str = "matches";
const MENTORSHIP_REQUESTS: &str = "mentorship_requests";

const DUPLICATE_KEY: i32 = 11000;
const TXN_MAX_ATTEMPTS: usize = 3;

pub struct MongoRepository {
    client: Client,
    db: Database,
    read_retry: RetryConfig,
}

/// Outcome of one transaction attempt: a domain refusal ends the call, a
/// driver error may be retried if labelled transient.
enum TxnFailure {
    Refused(RepositoryError),
    Driver(MongoError),
}

impl From<MongoError> for TxnFailure {
    fn from(e: MongoError) -> Self {
        TxnFailure::Driver(e)
    }
}

fn storage(context: &str) -> impl Fn(MongoError) -> RepositoryError + '_ {
    move |e| {
        error!(error = %e, "{}", context);
        RepositoryError::Storage(format!("{context}: {e}"))
    }
}

fn is_duplicate_key(e: &MongoError) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn is_retryable_read(e: &MongoError) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } | ErrorKind::ServerSelection { .. }
    )
}

fn viewer_filter(viewer: &Viewer) -> Document {
    match viewer {
        Viewer::All => doc! {},
        Viewer::Mentor(id) => doc! { "mentor_id": id },
        Viewer::Learner(id) => doc! { "learner_id": id },
    }
}

impl MongoRepository {
    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self {
            client,
            db,
            read_retry: RetryConfig::default(),
        }
    }

    /// Creates the unique indexes the invariants rely on. Safe to call on
    /// every start.
    pub async fn ensure_indexes(&self) -> RepoResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .map_err(storage("Failed to create users.email index"))?;

        self.matches()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "opportunity_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .map_err(storage("Failed to create matches.opportunity_id index"))?;

        self.modules()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "created_at": 1, "_id": 1 })
                    .build(),
            )
            .await
            .map_err(storage("Failed to create modules catalog index"))?;

        Ok(())
    }

    fn modules(&self) -> Collection<ModuleRecord> {
        self.db.collection(MODULES)
    }

    fn users(&self) -> Collection<UserRecord> {
        self.db.collection(USERS)
    }

    fn opportunities(&self) -> Collection<OpportunityRecord> {
        self.db.collection(OPPORTUNITIES)
    }

    fn matches(&self) -> Collection<MatchRecord> {
        self.db.collection(MATCHES)
    }

    fn mentorship_requests(&self) -> Collection<MentorshipRequestRecord> {
        self.db.collection(MENTORSHIP_REQUESTS)
    }

    async fn find_all<R, T>(
        &self,
        collection: Collection<R>,
        filter: Document,
        sort: Document,
        context: &str,
    ) -> RepoResult<Vec<T>>
    where
        R: serde::de::DeserializeOwned + Send + Sync + Unpin + Into<T>,
        T: Send,
    {
        let records: Vec<R> = retry_async_with_config(
            &self.read_retry,
            || async {
                collection
                    .find(filter.clone())
                    .sort(sort.clone())
                    .await?
                    .try_collect::<Vec<R>>()
                    .await
            },
            is_retryable_read,
        )
        .await
        .map_err(storage(context))?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn find_one<R, T>(
        &self,
        collection: Collection<R>,
        filter: Document,
        context: &str,
    ) -> RepoResult<Option<T>>
    where
        R: serde::de::DeserializeOwned + Send + Sync + Unpin + Into<T>,
        T: Send,
    {
        let record = retry_async_with_config(
            &self.read_retry,
            || async { collection.find_one(filter.clone()).await },
            is_retryable_read,
        )
        .await
        .map_err(storage(context))?;
        Ok(record.map(Into::into))
    }

    /// Commits with the driver's recommended retry on an unknown commit result.
    async fn commit(session: &mut ClientSession) -> Result<(), MongoError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match session.commit_transaction().await {
                Err(e)
                    if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                        && attempts < TXN_MAX_ATTEMPTS =>
                {
                    warn!(error = %e, "Commit result unknown, retrying commit");
                }
                other => return other,
            }
        }
    }

    async fn respond_in_session(
        &self,
        session: &mut ClientSession,
        response: &OpportunityResponse,
    ) -> Result<Opportunity, TxnFailure> {
        let updated = self
            .opportunities()
            .find_one_and_update(
                doc! {
                    "_id": &response.opportunity_id,
                    "status": response.expected.as_str(),
                },
                doc! { "$set": { "status": response.next.as_str() } },
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?;

        let Some(updated) = updated else {
            let current = self
                .opportunities()
                .find_one(doc! { "_id": &response.opportunity_id })
                .session(&mut *session)
                .await?;
            return Err(TxnFailure::Refused(match current {
                None => RepositoryError::NotFound("Opportunity not found".to_string()),
                Some(current) => RepositoryError::Conflict(format!(
                    "Opportunity is already {}",
                    current.status.as_str()
                )),
            }));
        };

        if let Some(new_match) = &response.new_match {
            self.matches()
                .insert_one(MatchRecord::from(new_match))
                .session(&mut *session)
                .await
                .map_err(|e| {
                    if is_duplicate_key(&e) {
                        TxnFailure::Refused(RepositoryError::Conflict(
                            "Opportunity already has a match".to_string(),
                        ))
                    } else {
                        TxnFailure::Driver(e)
                    }
                })?;
        }

        Ok(updated.into())
    }

    async fn try_respond(&self, response: &OpportunityResponse) -> Result<Opportunity, TxnFailure> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.respond_in_session(&mut session, response).await {
            Ok(updated) => {
                Self::commit(&mut session).await?;
                Ok(updated)
            }
            Err(failure) => {
                if let Err(e) = session.abort_transaction().await {
                    warn!(error = %e, "Failed to abort opportunity response transaction");
                }
                Err(failure)
            }
        }
    }

    async fn complete_in_session(
        &self,
        session: &mut ClientSession,
        user_id: &str,
        module_id: &str,
    ) -> Result<CompletionUpdate, TxnFailure> {
        // Writing the module document makes this transaction conflict with a
        // concurrent delete + cascade instead of slipping in after it.
        let touched = self
            .modules()
            .update_one(
                doc! { "_id": module_id },
                doc! { "$inc": { "completion_writes": 1 } },
            )
            .session(&mut *session)
            .await?;
        if touched.matched_count == 0 {
            return Err(TxnFailure::Refused(RepositoryError::NotFound(
                "Module not found".to_string(),
            )));
        }

        let before = self
            .users()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! { "$addToSet": { "completed_modules": module_id } },
            )
            .return_document(ReturnDocument::Before)
            .session(&mut *session)
            .await?;
        let Some(before) = before else {
            return Err(TxnFailure::Refused(RepositoryError::NotFound(
                "User not found".to_string(),
            )));
        };

        let total_modules = self
            .modules()
            .count_documents(doc! {})
            .session(&mut *session)
            .await? as usize;

        let mut completed_modules = before.completed_modules;
        let inserted = !completed_modules.iter().any(|m| m == module_id);
        if inserted {
            completed_modules.push(module_id.to_string());
        }
        Ok(CompletionUpdate {
            completed_modules,
            inserted,
            total_modules,
        })
    }

    async fn try_complete(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<CompletionUpdate, TxnFailure> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.complete_in_session(&mut session, user_id, module_id).await {
            Ok(update) => {
                Self::commit(&mut session).await?;
                Ok(update)
            }
            Err(failure) => {
                if let Err(e) = session.abort_transaction().await {
                    warn!(error = %e, "Failed to abort module completion transaction");
                }
                Err(failure)
            }
        }
    }

    async fn delete_in_session(
        &self,
        session: &mut ClientSession,
        id: &str,
    ) -> Result<bool, MongoError> {
        let deleted = self
            .modules()
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }
        self.users()
            .update_many(
                doc! { "completed_modules": id },
                doc! { "$pull": { "completed_modules": id } },
            )
            .session(&mut *session)
            .await?;
        Ok(true)
    }

    async fn try_delete_module(&self, id: &str) -> Result<bool, MongoError> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.delete_in_session(&mut session, id).await {
            Ok(deleted) => {
                Self::commit(&mut session).await?;
                Ok(deleted)
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "Failed to abort module delete transaction");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn ping(&self) -> RepoResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(storage("MongoDB ping failed"))
    }

    async fn list_modules(&self) -> RepoResult<Vec<Module>> {
        self.find_all(
            self.modules(),
            doc! {},
            doc! { "created_at": 1, "_id": 1 },
            "Failed to list modules",
        )
        .await
    }

    async fn get_module(&self, id: &str) -> RepoResult<Option<Module>> {
        self.find_one(self.modules(), doc! { "_id": id }, "Failed to load module")
            .await
    }

    async fn count_modules(&self) -> RepoResult<usize> {
        let count = retry_async_with_config(
            &self.read_retry,
            || async { self.modules().count_documents(doc! {}).await },
            is_retryable_read,
        )
        .await
        .map_err(storage("Failed to count modules"))?;
        Ok(count as usize)
    }

    async fn insert_module(&self, module: &Module) -> RepoResult<()> {
        self.modules()
            .insert_one(ModuleRecord::from(module))
            .await
            .map(|_| ())
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    RepositoryError::Conflict(format!("Module {} already exists", module.id))
                } else {
                    storage("Failed to insert module")(e)
                }
            })
    }

    async fn update_module(&self, module: &Module) -> RepoResult<bool> {
        let result = self
            .modules()
            .update_one(
                doc! { "_id": &module.id },
                doc! {
                    "$set": {
                        "title": &module.title,
                        "description": &module.description,
                        "content_url": &module.content_url,
                        "duration": &module.duration,
                        "difficulty": &module.difficulty,
                    }
                },
            )
            .await
            .map_err(storage("Failed to update module"))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_module(&self, id: &str) -> RepoResult<bool> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_delete_module(id).await {
                Ok(deleted) => return Ok(deleted),
                Err(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR) && attempt < TXN_MAX_ATTEMPTS => {
                    warn!(module_id = %id, attempt, error = %e, "Transient error deleting module, retrying");
                }
                Err(e) => return Err(storage("Failed to delete module")(e)),
            }
        }
    }

    async fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        self.find_one(self.users(), doc! { "_id": id }, "Failed to load user")
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one(
            self.users(),
            doc! { "email": email },
            "Failed to look up user by email",
        )
        .await
    }

    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        self.users()
            .insert_one(UserRecord::from(user))
            .await
            .map(|_| ())
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    RepositoryError::Conflict("User with this email already exists".to_string())
                } else {
                    storage("Failed to insert user")(e)
                }
            })
    }

    async fn list_users(&self, role: Option<UserRole>) -> RepoResult<Vec<User>> {
        let filter = match role {
            Some(role) => doc! { "role": role.as_str() },
            None => doc! {},
        };
        self.find_all(
            self.users(),
            filter,
            doc! { "created_at": -1, "_id": -1 },
            "Failed to list users",
        )
        .await
    }

    async fn add_completed_module(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> RepoResult<CompletionUpdate> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_complete(user_id, module_id).await {
                Ok(update) => return Ok(update),
                Err(TxnFailure::Refused(e)) => return Err(e),
                Err(TxnFailure::Driver(e))
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < TXN_MAX_ATTEMPTS =>
                {
                    warn!(user_id, module_id, attempt, error = %e, "Transient error recording completion, retrying");
                }
                Err(TxnFailure::Driver(e)) => {
                    return Err(storage("Failed to record module completion")(e));
                }
            }
        }
    }

    async fn set_completed_modules(&self, user_id: &str, modules: &[String]) -> RepoResult<bool> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "completed_modules": modules.to_vec() } },
            )
            .await
            .map_err(storage("Failed to update completed modules"))?;
        Ok(result.matched_count > 0)
    }

    async fn get_opportunity(&self, id: &str) -> RepoResult<Option<Opportunity>> {
        self.find_one(
            self.opportunities(),
            doc! { "_id": id },
            "Failed to load opportunity",
        )
        .await
    }

    async fn insert_opportunity(&self, opportunity: &Opportunity) -> RepoResult<()> {
        self.opportunities()
            .insert_one(OpportunityRecord::from(opportunity))
            .await
            .map(|_| ())
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    RepositoryError::Conflict(format!(
                        "Opportunity {} already exists",
                        opportunity.id
                    ))
                } else {
                    storage("Failed to insert opportunity")(e)
                }
            })
    }

    async fn list_opportunities(&self, viewer: &Viewer) -> RepoResult<Vec<Opportunity>> {
        let filter = match viewer {
            // A null match also covers documents without the field.
            Viewer::Learner(id) => doc! {
                "$or": [ { "learner_id": null }, { "learner_id": id } ]
            },
            other => viewer_filter(other),
        };
        self.find_all(
            self.opportunities(),
            filter,
            doc! { "created_at": 1, "_id": 1 },
            "Failed to list opportunities",
        )
        .await
    }

    async fn commit_opportunity_response(
        &self,
        response: OpportunityResponse,
    ) -> RepoResult<Opportunity> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_respond(&response).await {
                Ok(updated) => return Ok(updated),
                Err(TxnFailure::Refused(e)) => return Err(e),
                Err(TxnFailure::Driver(e))
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempt < TXN_MAX_ATTEMPTS =>
                {
                    warn!(
                        opportunity_id = %response.opportunity_id,
                        attempt,
                        error = %e,
                        "Transient transaction error, retrying"
                    );
                }
                Err(TxnFailure::Driver(e)) if is_duplicate_key(&e) => {
                    return Err(RepositoryError::Conflict(
                        "Opportunity already has a match".to_string(),
                    ));
                }
                Err(TxnFailure::Driver(e)) => {
                    return Err(storage("Failed to commit opportunity response")(e));
                }
            }
        }
    }

    async fn list_matches(&self, viewer: &Viewer) -> RepoResult<Vec<Match>> {
        self.find_all(
            self.matches(),
            viewer_filter(viewer),
            doc! { "created_at": 1, "_id": 1 },
            "Failed to list matches",
        )
        .await
    }

    async fn insert_mentorship_request(&self, request: &MentorshipRequest) -> RepoResult<()> {
        self.mentorship_requests()
            .insert_one(MentorshipRequestRecord::from(request))
            .await
            .map(|_| ())
            .map_err(storage("Failed to insert mentorship request"))
    }

    async fn get_mentorship_request(&self, id: &str) -> RepoResult<Option<MentorshipRequest>> {
        self.find_one(
            self.mentorship_requests(),
            doc! { "_id": id },
            "Failed to load mentorship request",
        )
        .await
    }

    async fn update_mentorship_status(
        &self,
        id: &str,
        status: MentorshipStatus,
    ) -> RepoResult<Option<MentorshipRequest>> {
        let updated = self
            .mentorship_requests()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str() } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(storage("Failed to update mentorship request"))?;
        Ok(updated.map(Into::into))
    }

    async fn list_mentorship_requests(
        &self,
        viewer: &Viewer,
    ) -> RepoResult<Vec<MentorshipRequest>> {
        self.find_all(
            self.mentorship_requests(),
            viewer_filter(viewer),
            doc! { "created_at": 1, "_id": 1 },
            "Failed to list mentorship requests",
        )
        .await
    }

    async fn list_recommendations(&self) -> RepoResult<Vec<MentorshipRequest>> {
        self.find_all(
            self.mentorship_requests(),
            doc! { "admin_id": { "$exists": true, "$ne": null } },
            doc! { "created_at": -1, "_id": -1 },
            "Failed to list recommendations",
        )
        .await
    }
}
