//! Startup bootstrap from a JSON seed file: an initial admin and a starter
//! module catalog. Entries that already exist are left alone, so the seed can
//! be re-run safely.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::fs;

use crate::error::AppError;
use crate::models::{Difficulty, Module, UserRole};
use crate::services::auth_service::AuthService;
use crate::services::module_service::DEFAULT_DURATION;
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
    pub password: String,
}

fn default_admin_name() -> String {
    "Platform Admin".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSeed {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_url: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub admin: Option<AdminSeed>,
    #[serde(default)]
    pub modules: Vec<ModuleSeed>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub modules_created: usize,
}

pub async fn bootstrap(state: &AppState) -> Result<()> {
    let path = match &state.config.seed_file {
        Some(path) if !path.is_empty() => Path::new(path),
        _ => {
            tracing::debug!("No seed file configured, skipping bootstrap");
            return Ok(());
        }
    };

    if !path.exists() {
        tracing::warn!("Seed file {} not found, skipping bootstrap", path.display());
        return Ok(());
    }

    let contents = fs::read_to_string(path)
        .await
        .context("Failed to read seed file")?;
    let seed: SeedFile =
        serde_json::from_str(&contents).context("Failed to deserialize seed payload")?;

    let report = apply(state, seed).await?;
    tracing::info!(
        admin_created = report.admin_created,
        modules_created = report.modules_created,
        "Seed applied from {}",
        path.display()
    );
    Ok(())
}

pub async fn apply(state: &AppState, seed: SeedFile) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if let Some(admin) = seed.admin {
        match AuthService::from_state(state)
            .create_user(&admin.name, &admin.email, &admin.password, UserRole::Admin)
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Seed admin inserted");
                report.admin_created = true;
            }
            Err(AppError::Conflict(_)) => {
                tracing::info!("Seed admin already exists, skipped");
            }
            Err(e) => return Err(e).context("Failed to insert seed admin"),
        }
    }

    // Creation times follow file order so the catalog keeps that order.
    let base = Utc::now();
    for (offset, entry) in seed.modules.into_iter().enumerate() {
        if state.repo.get_module(&entry.id).await?.is_some() {
            continue;
        }
        let module = Module {
            id: entry.id,
            title: entry.title,
            description: entry.description,
            content_url: entry.content_url,
            duration: entry.duration.unwrap_or_else(|| DEFAULT_DURATION.to_string()),
            difficulty: entry
                .difficulty
                .unwrap_or_else(|| Difficulty::default().as_str().to_string()),
            created_at: base + Duration::milliseconds(offset as i64),
        };
        state
            .repo
            .insert_module(&module)
            .await
            .with_context(|| format!("Failed to insert seed module {}", module.id))?;
        report.modules_created += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn seed_file() -> SeedFile {
        serde_json::from_str(
            r#"{
                "admin": {"email": "Root@Example.com", "password": "bootstrap-pass"},
                "modules": [
                    {"id": "safety", "title": "Online Safety", "duration": "20 minutes"},
                    {"id": "cv", "title": "Writing a CV", "difficulty": "Intermediate"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let mut config = Config::for_memory("secret");
        config.bcrypt_cost = 4;
        let state = AppState::in_memory(config);

        let first = apply(&state, seed_file()).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                admin_created: true,
                modules_created: 2
            }
        );

        let second = apply(&state, seed_file()).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let modules = state.repo.list_modules().await.unwrap();
        assert_eq!(modules[0].id, "safety");
        assert_eq!(modules[1].duration, DEFAULT_DURATION);

        let admin = state
            .repo
            .find_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(admin.name, "Platform Admin");
    }
}
