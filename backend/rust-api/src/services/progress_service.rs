use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::middlewares::auth::JwtClaims;
use crate::models::user::{UserProfile, UserProgressRow};
use crate::models::{User, UserRole};
use crate::repository::Repository;

/// Whole percent of the catalog completed, rounded half up. An empty catalog
/// is 0%. Not clamped: ids of deleted modules are pulled from every user, so
/// `completed <= total` holds in practice.
pub fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let (c, t) = (completed as u64, total as u64);
    ((200 * c + t) / (2 * t)) as u32
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub message: String,
    pub completed_modules: Vec<String>,
    pub progress: u32,
    pub total_modules: usize,
}

pub struct ProgressService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> ProgressService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Adds `module_id` to the user's completed set if it is not already
    /// there. Repeating the call changes nothing.
    pub async fn mark_complete(&self, user_id: &str, module_id: &str) -> AppResult<CompletionOutcome> {
        let update = self.repo.add_completed_module(user_id, module_id).await?;
        let total_modules = update.total_modules;
        let progress = completion_percentage(update.completed_modules.len(), total_modules);

        metrics::record_module_completion(update.inserted);
        let message = if update.inserted {
            tracing::info!(user_id, module_id, progress, "Module marked complete");
            "Module marked as complete"
        } else {
            tracing::debug!(user_id, module_id, "Module already completed");
            "Module already completed"
        };

        Ok(CompletionOutcome {
            message: message.to_string(),
            completed_modules: update.completed_modules,
            progress,
            total_modules,
        })
    }

    /// Clears the completed set. Only the user themself or an admin may do it.
    pub async fn reset_progress(&self, actor: &JwtClaims, user_id: &str) -> AppResult<()> {
        if actor.sub != user_id && actor.role != UserRole::Admin {
            tracing::warn!(actor = %actor.sub, target = user_id, "Progress reset denied");
            return Err(AppError::forbidden("You can only reset your own progress"));
        }

        if !self.repo.set_completed_modules(user_id, &[]).await? {
            return Err(AppError::not_found("User not found"));
        }

        tracing::info!(actor = %actor.sub, user_id, "Progress reset");
        Ok(())
    }

    /// Learners may only read their own profile; mentors and admins read any.
    pub async fn profile_for(&self, actor: &JwtClaims, user_id: &str) -> AppResult<UserProfile> {
        if actor.role == UserRole::Learner && actor.sub != user_id {
            return Err(AppError::forbidden("You can only view your own profile"));
        }
        self.profile(user_id).await
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let total_modules = self.repo.count_modules().await?;

        Ok(UserProfile {
            progress: completion_percentage(user.completed_modules.len(), total_modules),
            completed_count: user.completed_modules.len(),
            total_modules,
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            completed_modules: user.completed_modules,
            created_at: user.created_at,
        })
    }

    /// Users with their progress, newest first. `role` narrows the listing.
    pub async fn progress_rows(&self, role: Option<UserRole>) -> AppResult<Vec<UserProgressRow>> {
        let users = self.repo.list_users(role).await?;
        let total_modules = self.repo.count_modules().await?;
        Ok(users
            .iter()
            .map(|u| progress_row(u, total_modules))
            .collect())
    }
}

pub fn progress_row(user: &User, total_modules: usize) -> UserProgressRow {
    UserProgressRow {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        completed_count: user.completed_modules.len(),
        total_modules,
        progress: completion_percentage(user.completed_modules.len(), total_modules),
        created_at: user.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Module;
    use crate::repository::MemoryRepository;
    use chrono::Utc;
    use std::sync::Arc;

    fn claims(id: &str, role: UserRole) -> JwtClaims {
        JwtClaims {
            sub: id.to_string(),
            email: format!("{id}@example.com"),
            role,
            exp: usize::MAX,
            iat: 0,
        }
    }

    async fn setup() -> MemoryRepository {
        let repo = MemoryRepository::new();
        for id in ["alice", "bob"] {
            repo.insert_user(&User {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{id}@example.com"),
                password_hash: String::new(),
                role: UserRole::Learner,
                completed_modules: vec![],
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        for id in ["m1", "m2"] {
            repo.insert_module(&Module {
                id: id.to_string(),
                title: id.to_string(),
                description: String::new(),
                content_url: String::new(),
                duration: "10 minutes".to_string(),
                difficulty: "Beginner".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn mark_complete_is_idempotent() {
        let repo = setup().await;
        let service = ProgressService::new(&repo);

        let first = service.mark_complete("alice", "m1").await.unwrap();
        assert_eq!(first.message, "Module marked as complete");
        assert_eq!(first.progress, 50);

        let second = service.mark_complete("alice", "m1").await.unwrap();
        assert_eq!(second.message, "Module already completed");
        assert_eq!(second.completed_modules, vec!["m1".to_string()]);
        assert_eq!(second.progress, 50);
    }

    #[tokio::test]
    async fn mark_complete_checks_module_and_user() {
        let repo = setup().await;
        let service = ProgressService::new(&repo);
        assert!(matches!(
            service.mark_complete("alice", "nope").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            service.mark_complete("ghost", "m1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn reset_and_profile_access() {
        let repo = setup().await;
        let service = ProgressService::new(&repo);
        service.mark_complete("alice", "m2").await.unwrap();

        let bob = claims("bob", UserRole::Learner);
        assert!(matches!(
            service.reset_progress(&bob, "alice").await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            service.profile_for(&bob, "alice").await.unwrap_err(),
            AppError::Forbidden(_)
        ));

        let admin = claims("root", UserRole::Admin);
        service.reset_progress(&admin, "alice").await.unwrap();
        let profile = service.profile_for(&admin, "alice").await.unwrap();
        assert!(profile.completed_modules.is_empty());
        assert_eq!(profile.progress, 0);
        assert_eq!(profile.total_modules, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn mark_complete_racing_module_delete_keeps_progress_bounded() {
        for _ in 0..25 {
            let repo = Arc::new(setup().await);

            let completer = {
                let repo = repo.clone();
                tokio::spawn(async move {
                    ProgressService::new(repo.as_ref())
                        .mark_complete("alice", "m1")
                        .await
                })
            };
            let deleter = {
                let repo = repo.clone();
                tokio::spawn(async move { repo.delete_module("m1").await })
            };

            match completer.await.unwrap() {
                Ok(outcome) => assert!(outcome.progress <= 100),
                Err(e) => assert!(matches!(e, AppError::NotFound(_))),
            }
            assert!(deleter.await.unwrap().unwrap());

            let admin = claims("root", UserRole::Admin);
            let profile = ProgressService::new(repo.as_ref())
                .profile_for(&admin, "alice")
                .await
                .unwrap();
            assert!(profile.completed_modules.is_empty());
            assert_eq!(profile.progress, 0);
        }
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(completion_percentage(0, 5), 0);
        assert_eq!(completion_percentage(2, 0), 0);
        assert_eq!(completion_percentage(2, 4), 50);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(5, 5), 100);
    }
}
