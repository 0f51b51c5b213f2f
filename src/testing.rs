//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::{Mutex, Semaphore};

use crate::errors::{AcquireError, ApiError};
use crate::images::{EncodedImage, ImageSource, RawImage};
use crate::inference::{AnalysisOutcome, EstimateOutcome, InferenceClient};
use crate::logs::{DailyLog, FoodLogEntry, LogStore};
use crate::meals::{Clock, MealType};

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[derive(Default)]
pub struct FakeInference {
    analyses: StdMutex<VecDeque<Result<AnalysisOutcome, ApiError>>>,
    estimates: StdMutex<VecDeque<Result<EstimateOutcome, ApiError>>>,
    analyze_calls: AtomicUsize,
    estimate_calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses wait for a permit on the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn with_analysis(self, r: Result<AnalysisOutcome, ApiError>) -> Self {
        self.analyses.lock().unwrap().push_back(r);
        self
    }

    pub fn with_estimate(self, r: Result<EstimateOutcome, ApiError>) -> Self {
        self.estimates.lock().unwrap().push_back(r);
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn estimate_calls(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

fn unscripted() -> ApiError {
    ApiError::Service {
        status: 500,
        message: "no scripted response".into(),
    }
}

#[async_trait]
impl InferenceClient for FakeInference {
    async fn analyze_image(
        &self,
        _image: &EncodedImage,
        _meal_type: MealType,
    ) -> Result<AnalysisOutcome, ApiError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let next = self.analyses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted()))
    }

    async fn estimate_text(
        &self,
        _description: &str,
        _meal_type: MealType,
    ) -> Result<EstimateOutcome, ApiError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        let next = self.estimates.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted()))
    }
}

pub struct FakeLogStore {
    saved: Mutex<Vec<FoodLogEntry>>,
    failure: Option<String>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeLogStore {
    pub fn ok() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            failure: None,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::ok()
        }
    }

    /// Saves wait for a permit on the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub async fn saved(&self) -> Vec<FoodLogEntry> {
        self.saved.lock().await.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for FakeLogStore {
    async fn save(&self, entry: &FoodLogEntry) -> Result<String, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(message) = &self.failure {
            return Err(ApiError::Service {
                status: 500,
                message: message.clone(),
            });
        }
        self.saved.lock().await.push(entry.clone());
        Ok(format!("log-{n}"))
    }

    async fn list_today(&self) -> Result<DailyLog, ApiError> {
        Ok(DailyLog::default())
    }
}

/// Camera and library both hand back a tiny JPEG unless told to fail.
#[derive(Default)]
pub struct FakeImageSource {
    camera_error: Option<AcquireError>,
    library_error: Option<AcquireError>,
}

impl FakeImageSource {
    pub fn camera_fails(mut self, e: AcquireError) -> Self {
        self.camera_error = Some(e);
        self
    }

    pub fn library_fails(mut self, e: AcquireError) -> Self {
        self.library_error = Some(e);
        self
    }
}

#[async_trait]
impl ImageSource for FakeImageSource {
    async fn capture_from_camera(&self) -> Result<RawImage, AcquireError> {
        match &self.camera_error {
            Some(e) => Err(e.clone()),
            None => Ok(jpeg()),
        }
    }

    async fn pick_from_library(&self) -> Result<RawImage, AcquireError> {
        match &self.library_error {
            Some(e) => Err(e.clone()),
            None => Ok(jpeg()),
        }
    }
}

fn jpeg() -> RawImage {
    RawImage {
        body: Bytes::from_static(JPEG),
        content_type: Some("image/jpeg".into()),
    }
}

/// Always reports the given local hour.
pub struct FixedClock(pub u8);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        time::macros::datetime!(2024-06-03 00:00 UTC)
            .replace_hour(self.0)
            .unwrap()
    }
}
