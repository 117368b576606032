use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::module::{CreateModuleRequest, UpdateModuleRequest};
use crate::models::{Difficulty, GradeResult, Module, PublicQuiz, SubmittedAnswers};
use crate::repository::Repository;
use crate::services::catalog::ModuleCatalog;
use crate::services::{quiz_generator, quiz_grader};

pub const DEFAULT_DURATION: &str = "30 minutes";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct ModuleService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> ModuleService<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> AppResult<Vec<Module>> {
        Ok(self.repo.list_modules().await?)
    }

    pub async fn get(&self, id: &str) -> AppResult<Module> {
        self.repo
            .get_module(id)
            .await?
            .ok_or_else(|| AppError::not_found("Module not found"))
    }

    pub async fn create(&self, req: CreateModuleRequest) -> AppResult<Module> {
        req.validate()?;

        let module = Module {
            id: Uuid::new_v4().to_string(),
            title: req.title.trim().to_string(),
            description: req.description.unwrap_or_default().trim().to_string(),
            content_url: req.content_url.unwrap_or_default().trim().to_string(),
            duration: non_blank(req.duration).unwrap_or_else(|| DEFAULT_DURATION.to_string()),
            difficulty: non_blank(req.difficulty)
                .unwrap_or_else(|| Difficulty::default().as_str().to_string()),
            created_at: Utc::now(),
        };
        if module.title.is_empty() {
            return Err(AppError::invalid_input("Title required"));
        }

        self.repo.insert_module(&module).await?;
        tracing::info!(module_id = %module.id, title = %module.title, "Module created");
        Ok(module)
    }

    /// Absent fields keep their value; id and creation time never change, so
    /// the module keeps its catalog position.
    pub async fn update(&self, id: &str, req: UpdateModuleRequest) -> AppResult<Module> {
        req.validate()?;
        let mut module = self.get(id).await?;

        if let Some(title) = non_blank(req.title) {
            module.title = title;
        }
        if let Some(description) = req.description {
            module.description = description.trim().to_string();
        }
        if let Some(content_url) = req.content_url {
            module.content_url = content_url.trim().to_string();
        }
        if let Some(duration) = req.duration {
            module.duration = duration.trim().to_string();
        }
        if let Some(difficulty) = non_blank(req.difficulty) {
            module.difficulty = difficulty;
        }

        if !self.repo.update_module(&module).await? {
            return Err(AppError::not_found("Module not found"));
        }
        tracing::info!(module_id = %module.id, "Module updated");
        Ok(module)
    }

    /// Removes the module and its id from every user's completed set.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.repo.delete_module(id).await? {
            return Err(AppError::not_found("Module not found"));
        }
        tracing::info!(module_id = %id, "Module deleted");
        Ok(())
    }

    /// Quiz for display: answer keys stripped.
    pub async fn public_quiz(&self, module_id: &str) -> AppResult<PublicQuiz> {
        let catalog = ModuleCatalog::load(self.repo).await?;
        let quiz = quiz_generator::generate(module_id, &catalog)?;
        metrics::record_quiz_generated();
        Ok(PublicQuiz::from(&quiz))
    }

    /// Grades against a quiz regenerated from the current catalog.
    pub async fn submit_quiz(
        &self,
        module_id: &str,
        answers: &SubmittedAnswers,
    ) -> AppResult<GradeResult> {
        let catalog = ModuleCatalog::load(self.repo).await?;
        let quiz = quiz_generator::generate(module_id, &catalog)?;
        if answers.is_empty() {
            tracing::debug!(module_id, "Empty quiz submission");
        }
        let result = quiz_grader::grade(&quiz, answers);

        metrics::record_quiz_submission(result.passed);
        tracing::info!(
            module_id,
            answered = answers.len(),
            score = result.score,
            total = result.total,
            passed = result.passed,
            "Quiz graded"
        );
        Ok(result)
    }
}
