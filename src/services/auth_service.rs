use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::verification_store::{CODE_TTL_SECS, VerificationStore};
use crate::utils::*;

/// Account lookup and creation, backed by the users table in production.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User>;
}

/// Outbound delivery of a verification code. Best effort: failures are
/// surfaced to the caller, never retried here.
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> AppResult<()>;
}

/// Drives the two-step login flow: password check and code issue, then
/// code consumption and token issue. The pending-code state lives entirely
/// in the [`VerificationStore`].
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountDirectory>,
    mailer: Arc<dyn CodeSender>,
    jwt_service: JwtService,
    store: VerificationStore,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        mailer: Arc<dyn CodeSender>,
        jwt_service: JwtService,
        store: VerificationStore,
    ) -> Self {
        Self {
            accounts,
            mailer,
            jwt_service,
            store,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserResponse> {
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        if self.accounts.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::ValidationError(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .accounts
            .insert(request.name.trim(), &request.email, &password_hash)
            .await?;

        log::info!("Registered account {}", user.email);

        Ok(UserResponse::from(user))
    }

    /// Step 1: check the password, then issue and email a verification code.
    ///
    /// The code is stored before the send attempt and is not rolled back if
    /// delivery fails, so a send failure leaves a consumable code behind.
    pub async fn login(&self, request: LoginRequest) -> AppResult<SendCodeResponse> {
        let user = self
            .accounts
            .find_by_email(&request.email)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let code = generate_verification_code();
        self.store.issue(&user.email, &code).await;

        self.mailer.send_code(&user.email, &code).await?;

        log::info!("Verification code sent to {}", user.email);

        Ok(SendCodeResponse {
            expires_in: CODE_TTL_SECS,
        })
    }

    /// Step 2: consume the code and mint a session token.
    pub async fn verify_code(&self, request: VerifyCodeRequest) -> AppResult<AuthResponse> {
        let user = self
            .accounts
            .find_by_email(&request.email)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if !self.store.consume(&user.email, &request.code).await {
            return Err(AppError::InvalidOrExpiredCode);
        }

        let token = self.jwt_service.generate_token(user.id, &user.email)?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            token,
            expires_in: self.jwt_service.get_token_expires_in(),
        })
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &VerificationStore {
        &self.store
    }
}
