use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub session_token: Option<String>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub max_image_bytes: usize,
    /// Treat a hand-entered 0 kcal like an empty field when deciding whether
    /// submit has to estimate first.
    pub estimate_zero_calories: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 20 * 1024 * 1024,
            estimate_zero_calories: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub capture: CaptureConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = CaptureConfig::default();
        let api = ApiConfig {
            base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api".into())
                .trim_end_matches('/')
                .to_string(),
            session_token: std::env::var("SESSION_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs: std::env::var("API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        let capture = CaptureConfig {
            max_image_bytes: std::env::var("MAX_IMAGE_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.max_image_bytes),
            estimate_zero_calories: std::env::var("ESTIMATE_ZERO_CALORIES")
                .ok()
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(defaults.estimate_zero_calories),
        };
        anyhow::ensure!(!api.base_url.is_empty(), "API_BASE_URL must not be empty");
        Ok(Self { api, capture })
    }
}
