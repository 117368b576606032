use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middlewares::auth::{ensure_role, JwtClaims};
use crate::models::mentorship::{
    CreateMentorshipRequest, MentorshipRequestView, RecommendRequest,
};
use crate::models::user::{UserProgressRow, UserSummary};
use crate::models::{MentorshipRequest, MentorshipStatus, User, UserRole};
use crate::repository::{Repository, Viewer};
use crate::services::progress_service::progress_row;

pub const TOP_LEARNERS_LIMIT: usize = 10;

pub struct MentorshipService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> MentorshipService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    async fn user_with_role(&self, id: &str, role: UserRole, missing: &str) -> AppResult<User> {
        self.repo
            .get_user(id)
            .await?
            .filter(|u| u.role == role)
            .ok_or_else(|| AppError::not_found(missing))
    }

    pub async fn mentors(&self) -> AppResult<Vec<UserSummary>> {
        let mentors = self.repo.list_users(Some(UserRole::Mentor)).await?;
        Ok(mentors.iter().map(UserSummary::from).collect())
    }

    /// Learners by progress, highest first; ties keep the newest-first order.
    pub async fn top_learners(&self, actor: &JwtClaims) -> AppResult<Vec<UserProgressRow>> {
        ensure_role(actor, &[UserRole::Mentor, UserRole::Admin])?;

        let learners = self.repo.list_users(Some(UserRole::Learner)).await?;
        let total_modules = self.repo.count_modules().await?;
        let mut rows: Vec<UserProgressRow> = learners
            .iter()
            .map(|u| progress_row(u, total_modules))
            .collect();
        rows.sort_by(|a, b| b.progress.cmp(&a.progress));
        rows.truncate(TOP_LEARNERS_LIMIT);
        Ok(rows)
    }

    /// A learner asks a mentor for guidance on `topic`.
    pub async fn request(
        &self,
        actor: &JwtClaims,
        req: CreateMentorshipRequest,
    ) -> AppResult<MentorshipRequest> {
        ensure_role(actor, &[UserRole::Learner])?;
        req.validate()?;
        self.user_with_role(&req.mentor_id, UserRole::Mentor, "Mentor not found")
            .await?;

        let request = MentorshipRequest {
            id: Uuid::new_v4().to_string(),
            learner_id: actor.sub.clone(),
            mentor_id: req.mentor_id,
            topic: req.topic.trim().to_string(),
            status: MentorshipStatus::Pending,
            admin_id: None,
            created_at: Utc::now(),
        };
        self.repo.insert_mentorship_request(&request).await?;

        tracing::info!(
            request_id = %request.id,
            learner_id = %request.learner_id,
            mentor_id = %request.mentor_id,
            "Mentorship requested"
        );
        Ok(request)
    }

    /// Requests visible to the caller, with participant names attached.
    pub async fn list(&self, actor: &JwtClaims) -> AppResult<Vec<MentorshipRequestView>> {
        let requests = self
            .repo
            .list_mentorship_requests(&Viewer::for_role(&actor.sub, actor.role))
            .await?;
        self.with_names(requests).await
    }

    pub async fn update_status(
        &self,
        actor: &JwtClaims,
        request_id: &str,
        status: &str,
    ) -> AppResult<MentorshipRequest> {
        ensure_role(actor, &[UserRole::Mentor, UserRole::Admin])?;
        let status = MentorshipStatus::parse_update(status).ok_or_else(|| {
            AppError::invalid_input("Status must be one of pending, accepted, declined")
        })?;

        let existing = self
            .repo
            .get_mentorship_request(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Mentorship request not found"))?;
        if actor.role == UserRole::Mentor && existing.mentor_id != actor.sub {
            return Err(AppError::forbidden(
                "You can only update requests addressed to you",
            ));
        }

        let updated = self
            .repo
            .update_mentorship_status(request_id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Mentorship request not found"))?;
        tracing::info!(request_id, actor = %actor.sub, status = status.as_str(), "Mentorship request updated");
        Ok(updated)
    }

    /// Admin pairs a learner with a mentor.
    pub async fn recommend(
        &self,
        actor: &JwtClaims,
        req: RecommendRequest,
    ) -> AppResult<MentorshipRequest> {
        ensure_role(actor, &[UserRole::Admin])?;
        req.validate()?;
        self.user_with_role(&req.learner_id, UserRole::Learner, "Learner not found")
            .await?;
        self.user_with_role(&req.mentor_id, UserRole::Mentor, "Mentor not found")
            .await?;

        let topic = req
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Recommended by admin {}", actor.email));

        let request = MentorshipRequest {
            id: Uuid::new_v4().to_string(),
            learner_id: req.learner_id,
            mentor_id: req.mentor_id,
            topic,
            status: MentorshipStatus::Recommended,
            admin_id: Some(actor.sub.clone()),
            created_at: Utc::now(),
        };
        self.repo.insert_mentorship_request(&request).await?;

        tracing::info!(
            request_id = %request.id,
            admin_id = %actor.sub,
            "Learner recommended to mentor"
        );
        Ok(request)
    }

    pub async fn recommendations(&self) -> AppResult<Vec<MentorshipRequestView>> {
        let requests = self.repo.list_recommendations().await?;
        self.with_names(requests).await
    }

    async fn with_names(
        &self,
        requests: Vec<MentorshipRequest>,
    ) -> AppResult<Vec<MentorshipRequestView>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let names: HashMap<String, String> = self
            .repo
            .list_users(None)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(requests
            .into_iter()
            .map(|request| MentorshipRequestView {
                learner_name: names.get(&request.learner_id).cloned(),
                mentor_name: names.get(&request.mentor_id).cloned(),
                request,
            })
            .collect())
    }
}
