use bcrypt::{hash, verify};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{
    AuthResponse, CreateAdminRequest, LoginRequest, RegisterRequest, UserSummary,
};
use crate::models::{User, UserRole};
use crate::repository::Repository;
use crate::services::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService<'a> {
    repo: &'a dyn Repository,
    jwt: &'a JwtService,
    token_ttl_seconds: i64,
    bcrypt_cost: u32,
}

impl<'a> AuthService<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        jwt: &'a JwtService,
        token_ttl_seconds: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            repo,
            jwt,
            token_ttl_seconds,
            bcrypt_cost,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.repo.as_ref(),
            &state.jwt,
            state.config.jwt_ttl_seconds,
            state.config.bcrypt_cost,
        )
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        verify(password, hash)
            .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        self.jwt
            .generate_token(&JwtClaims::for_user(user, self.token_ttl_seconds))
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Creates the account and stores it; duplicate email is a `Conflict`.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> AppResult<User> {
        let email = normalize_email(email);
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            password_hash: self.hash_password(password)?,
            role,
            completed_modules: Vec::new(),
            created_at: Utc::now(),
        };
        // The store enforces email uniqueness too, for concurrent signups.
        self.repo.insert_user(&user).await?;
        Ok(user)
    }

    /// Self-service signup for learners and mentors.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        req.validate()?;
        if req.role == UserRole::Admin {
            tracing::warn!(email = %req.email, "Rejected admin self-registration");
            return Err(AppError::forbidden("Admin accounts cannot self-register"));
        }

        let user = self
            .create_user(&req.name, &req.email, &req.password, req.role)
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(AuthResponse {
            message: "User registered successfully".to_string(),
            token: self.issue_token(&user)?,
            user: UserSummary::from(&user),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        req.validate()?;
        let email = normalize_email(&req.email);

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            tracing::warn!(email = %email, "Failed login attempt: unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(email = %email, "Failed login attempt: invalid password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        tracing::info!(user_id = %user.id, "Successful login");
        Ok(AuthResponse {
            message: "Login successful".to_string(),
            token: self.issue_token(&user)?,
            user: UserSummary::from(&user),
        })
    }

    pub async fn create_admin(
        &self,
        actor: &JwtClaims,
        req: CreateAdminRequest,
    ) -> AppResult<UserSummary> {
        req.validate()?;
        let user = self
            .create_user(&req.name, &req.email, &req.password, UserRole::Admin)
            .await?;
        tracing::info!(created_by = %actor.sub, user_id = %user.id, "Admin account created");
        Ok(UserSummary::from(&user))
    }
}
