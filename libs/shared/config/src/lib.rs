use std::env;
use tracing::warn;

/// Confidence below which the chat layer asks the user to rephrase instead
/// of acting on a classified intent.
pub const DEFAULT_INTENT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clinic_api_url: String,
    pub intent_api_url: String,
    pub intent_api_token: String,
    pub intent_confidence_threshold: f32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            clinic_api_url: env::var("CLINIC_API_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_URL not set, using empty value");
                    String::new()
                }),
            intent_api_url: env::var("INTENT_API_URL")
                .unwrap_or_else(|_| {
                    warn!("INTENT_API_URL not set, using default");
                    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli"
                        .to_string()
                }),
            intent_api_token: env::var("INTENT_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("INTENT_API_TOKEN not set, using empty value");
                    String::new()
                }),
            intent_confidence_threshold: env::var("INTENT_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_INTENT_CONFIDENCE_THRESHOLD),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.clinic_api_url.is_empty()
    }

    pub fn is_intent_api_configured(&self) -> bool {
        !self.intent_api_url.is_empty() && !self.intent_api_token.is_empty()
    }
}
