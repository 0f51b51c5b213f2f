use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::errors::ApiError;

/// Authenticated JSON transport shared by the inference and persistence
/// clients. Injects the bearer token, bounds every call with the configured
/// timeout and drops the token when the server answers 401.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(config.session_token.clone())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let req = self.http.post(self.url(path)).json(body);
        self.send(path, req).await
    }

    pub async fn get_json<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let req = self.http.get(self.url(path));
        self.send(path, req).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<R: DeserializeOwned>(
        &self,
        path: &str,
        mut req: RequestBuilder,
    ) -> Result<R, ApiError> {
        if let Some(token) = self.token.read().await.as_deref() {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(path, "request timed out");
                ApiError::Timeout
            } else {
                warn!(path, error = %e, "request failed");
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(path, %status, "response");

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "unauthorized, clearing session token");
            *self.token.write().await = None;
            return Err(ApiError::Unauthorized);
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(ApiError::Service {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        serde_json::from_slice(&body).map_err(|e| ApiError::Service {
            status: status.as_u16(),
            message: format!("malformed response: {e}"),
        })
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}
