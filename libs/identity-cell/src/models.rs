use serde::{Deserialize, Serialize};

use shared_models::auth::UserProfile;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailCheckResponse {
    pub exists: bool,
}

/// Fields synced to the profile right before an authenticated booking.
/// Weight and height ride along only when the user supplied them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}
