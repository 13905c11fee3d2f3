// libs/identity-cell/src/services/profile.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_backend::ClinicApiClient;
use shared_models::auth::UserProfile;
use shared_models::error::AppError;

use crate::models::{EmailCheckResponse, ProfileUpdate};

pub struct ProfileService {
    client: Arc<ClinicApiClient>,
}

impl ProfileService {
    pub fn new(client: Arc<ClinicApiClient>) -> Self {
        Self { client }
    }

    /// Stored profile used to pre-fill the personal-details step.
    pub async fn fetch_user_details(&self, token: &str) -> Result<UserProfile, AppError> {
        debug!("Fetching user details for prefill");
        self.client
            .request(Method::GET, "/api/auth/user-details", Some(token), None)
            .await
    }

    /// Guest duplicate-account guard: true when the email already belongs to
    /// a registered account.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let path = format!("/api/auth/check-email/{}", urlencoding::encode(email));
        let response: EmailCheckResponse =
            self.client.request(Method::GET, &path, None, None).await?;
        Ok(response.exists)
    }

    /// Sync phone/address (and weight/height when supplied) to the profile.
    /// Runs before the appointment write for authenticated bookings; a
    /// failure here aborts the whole submission.
    pub async fn sync_profile(&self, token: &str, update: &ProfileUpdate) -> Result<(), AppError> {
        debug!("Syncing profile fields before booking");
        let body = serde_json::to_value(update).map_err(|e| AppError::Parse(e.to_string()))?;
        let _: Value = self
            .client
            .request(Method::PUT, "/api/auth/update-user", Some(token), Some(body))
            .await?;
        Ok(())
    }
}
