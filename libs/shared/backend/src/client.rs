// libs/shared/backend/src/client.rs
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::AppError;

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// HTTP client for the clinic REST backend.
///
/// Requests are plain request/response; none of them retries. A 401/403 on
/// any authenticated call fires the unauthorized hook exactly once per
/// response so the session store can invalidate itself.
pub struct ClinicApiClient {
    client: Client,
    base_url: String,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ClinicApiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.clinic_api_url.trim_end_matches('/').to_string(),
            on_unauthorized: None,
        }
    }

    /// Install the session-invalidation hook fired on 401/403 responses.
    pub fn with_on_unauthorized(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request_with_timeout(method, path, auth_token, body, None)
            .await
    }

    /// Same as [`request`](Self::request) but with a per-request deadline.
    /// Only the login call uses this; everything else runs to completion.
    pub async fn request_with_timeout<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(token) = auth_token {
            req = req.bearer_auth(token);
        }
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }
        if let Some(deadline) = timeout {
            req = req.timeout(deadline);
        }

        let response = req.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            if e.is_timeout() {
                AppError::Timeout(url.clone())
            } else {
                AppError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = extract_message(&error_text);
            error!("API error ({}): {}", status, message);

            return Err(match status.as_u16() {
                401 | 403 => {
                    if let Some(hook) = &self.on_unauthorized {
                        hook();
                    }
                    AppError::Auth(message)
                }
                404 => AppError::NotFound(message),
                400 => AppError::BadRequest(message),
                code => AppError::Server {
                    status: code,
                    message,
                },
            });
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| AppError::Parse(e.to_string()))?;
        Ok(data)
    }
}

/// Prefer the backend's `{"message": ...}` payload over the raw body.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.to_string())
}
