//! Opportunity lifecycle and match creation.
//!
//! The decision checks run against a read snapshot; the write itself is a
//! compare-and-set on the status the snapshot saw, so a concurrent responder
//! that got there first turns this call into a `Conflict` with no writes.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::middlewares::auth::{ensure_role, JwtClaims};
use crate::models::opportunity::CreateOpportunityRequest;
use crate::models::{Match, Opportunity, OpportunityStatus, ResponseDecision, UserRole};
use crate::repository::{OpportunityResponse, Repository, Viewer};

pub struct OpportunityService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> OpportunityService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        actor: &JwtClaims,
        req: CreateOpportunityRequest,
    ) -> AppResult<Opportunity> {
        ensure_role(actor, &[UserRole::Mentor])?;
        req.validate()?;

        let learner_id = req.learner_id.filter(|id| !id.trim().is_empty());
        if let Some(learner_id) = &learner_id {
            let is_learner = self
                .repo
                .get_user(learner_id)
                .await?
                .is_some_and(|u| u.role == UserRole::Learner);
            if !is_learner {
                return Err(AppError::not_found("Target learner not found"));
            }
        }

        let opportunity = Opportunity {
            id: Uuid::new_v4().to_string(),
            mentor_id: actor.sub.clone(),
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            learner_id,
            status: OpportunityStatus::Open,
            created_at: Utc::now(),
        };
        self.repo.insert_opportunity(&opportunity).await?;

        tracing::info!(
            opportunity_id = %opportunity.id,
            mentor_id = %opportunity.mentor_id,
            targeted = opportunity.is_targeted(),
            "Opportunity created"
        );
        Ok(opportunity)
    }

    pub async fn list(&self, actor: &JwtClaims) -> AppResult<Vec<Opportunity>> {
        Ok(self
            .repo
            .list_opportunities(&Viewer::for_role(&actor.sub, actor.role))
            .await?)
    }

    pub async fn list_matches(&self, actor: &JwtClaims) -> AppResult<Vec<Match>> {
        Ok(self
            .repo
            .list_matches(&Viewer::for_role(&actor.sub, actor.role))
            .await?)
    }

    /// Applies a learner's decision. Acceptance flips the status and records
    /// exactly one match in a single storage call.
    pub async fn respond(
        &self,
        opportunity_id: &str,
        actor: &JwtClaims,
        decision: ResponseDecision,
    ) -> AppResult<Opportunity> {
        let result = self.try_respond(opportunity_id, actor, decision).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::Conflict(_)) => "conflict",
            Err(AppError::Forbidden(_)) => "forbidden",
            Err(AppError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::record_opportunity_response(decision.as_str(), outcome);

        if let Err(e) = &result {
            tracing::warn!(opportunity_id, actor = %actor.sub, decision = decision.as_str(), "Opportunity response rejected: {}", e);
        }
        result
    }

    async fn try_respond(
        &self,
        opportunity_id: &str,
        actor: &JwtClaims,
        decision: ResponseDecision,
    ) -> AppResult<Opportunity> {
        ensure_role(actor, &[UserRole::Learner])?;

        if self.repo.get_user(&actor.sub).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let opportunity = self
            .repo
            .get_opportunity(opportunity_id)
            .await?
            .ok_or_else(|| AppError::not_found("Opportunity not found"))?;

        let next = opportunity
            .status
            .transition(decision)
            .map_err(|e| AppError::conflict(e.to_string()))?;

        if !opportunity.is_visible_to_learner(&actor.sub) {
            return Err(AppError::forbidden(
                "This opportunity is reserved for another learner",
            ));
        }

        let new_match = (next == OpportunityStatus::Accepted).then(|| Match {
            id: Uuid::new_v4().to_string(),
            mentor_id: opportunity.mentor_id.clone(),
            learner_id: actor.sub.clone(),
            opportunity_id: opportunity.id.clone(),
            created_at: Utc::now(),
        });
        let creates_match = new_match.is_some();

        let updated = self
            .repo
            .commit_opportunity_response(OpportunityResponse {
                opportunity_id: opportunity.id.clone(),
                expected: opportunity.status,
                next,
                new_match,
            })
            .await?;

        if creates_match {
            metrics::record_match_created();
        }
        tracing::info!(
            opportunity_id,
            learner_id = %actor.sub,
            status = updated.status.as_str(),
            "Opportunity {}",
            updated.status.as_str()
        );
        Ok(updated)
    }
}
