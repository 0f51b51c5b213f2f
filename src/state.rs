use std::sync::Arc;

use anyhow::Context;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::images::ImageSource;
use crate::inference::{HttpInferenceClient, InferenceClient};
use crate::logs::{HttpLogStore, LogStore};
use crate::meals::{Clock, SystemClock};

/// Collaborators a capture session talks to, behind trait objects so tests
/// can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub inference: Arc<dyn InferenceClient>,
    pub logs: Arc<dyn LogStore>,
    pub images: Arc<dyn ImageSource>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn init(config: AppConfig, images: Arc<dyn ImageSource>) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.api).context("build http client")?;
        tracing::debug!(base_url = api.base_url(), "api client ready");

        Ok(Self {
            config: Arc::new(config),
            inference: Arc::new(HttpInferenceClient::new(api.clone())) as Arc<dyn InferenceClient>,
            logs: Arc::new(HttpLogStore::new(api)) as Arc<dyn LogStore>,
            images,
            clock: Arc::new(SystemClock) as Arc<dyn Clock>,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        inference: Arc<dyn InferenceClient>,
        logs: Arc<dyn LogStore>,
        images: Arc<dyn ImageSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            inference,
            logs,
            images,
            clock,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{ApiConfig, CaptureConfig};
        use crate::testing::{FakeImageSource, FakeInference, FakeLogStore, FixedClock};

        let config = Arc::new(AppConfig {
            api: ApiConfig {
                base_url: "http://fake.local/api".into(),
                session_token: None,
                timeout_secs: 30,
            },
            capture: CaptureConfig::default(),
        });
        Self::from_parts(
            config,
            Arc::new(FakeInference::new()),
            Arc::new(FakeLogStore::ok()),
            Arc::new(FakeImageSource::default()),
            Arc::new(FixedClock(12)),
        )
    }
}
