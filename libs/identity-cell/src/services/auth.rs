// libs/identity-cell/src/services/auth.rs
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tracing::{debug, info};

use shared_backend::ClinicApiClient;
use shared_models::auth::{InvalidationReason, Session, SessionStore};
use shared_models::error::AppError;

use crate::models::{LoginRequest, LoginResponse};

/// How long the login request may stay in flight before it is aborted.
/// Login is the only call with a deadline; everything else runs to
/// completion and relies on user re-action for retry.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AuthService {
    client: Arc<ClinicApiClient>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(client: Arc<ClinicApiClient>, sessions: SessionStore) -> Self {
        Self { client, sessions }
    }

    /// Authenticate and persist the resulting session in the store.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        debug!("Logging in {}", email);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let body = serde_json::to_value(&request).map_err(|e| AppError::Parse(e.to_string()))?;

        let response: LoginResponse = self
            .client
            .request_with_timeout(
                Method::POST,
                "/api/auth/login",
                None,
                Some(body),
                Some(LOGIN_TIMEOUT),
            )
            .await?;

        let session = Session {
            token: response.token,
            user: response.user,
        };
        self.sessions.set(session.clone());
        info!("Logged in {}", session.user.email);

        Ok(session)
    }

    pub fn logout(&self) {
        self.sessions.invalidate(InvalidationReason::LoggedOut);
    }

    /// Whether the login screen should show the "session expired" notice.
    pub fn session_expired(&self) -> bool {
        self.sessions.last_invalidation() == Some(InvalidationReason::Expired)
    }
}
