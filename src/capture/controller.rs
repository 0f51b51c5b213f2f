use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::state::{
    CaptureSession, CaptureState, SessionSnapshot, SubmitPlan, SubmitTicket, Ticket,
};
use crate::errors::CaptureError;
use crate::images::{ImageAcquirer, ImageSourceKind};
use crate::inference::{AnalysisOutcome, InferenceClient};
use crate::logs::{DailyLog, LogSubmitter, SavedLog};
use crate::manual::{MacroField, ManualDraft};
use crate::meals::{meal_type_at, Clock, MealType};
use crate::state::AppState;

/// Result of a `submit` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SubmitOutcome {
    Saved(SavedLog),
    /// Calories were missing and got estimated. Nothing was persisted; the
    /// user has to look at the numbers and submit again.
    NeedsConfirmation(ManualDraft),
}

/// Drives one [`CaptureSession`] through acquisition, inference,
/// reconciliation and submission.
///
/// Cloning yields another handle to the same session. The session lock is
/// never held across a network call; completions re-check the generation
/// they were issued under before touching the session.
#[derive(Clone)]
pub struct CaptureController {
    session: Arc<Mutex<CaptureSession>>,
    acquirer: ImageAcquirer,
    inference: Arc<dyn InferenceClient>,
    submitter: LogSubmitter,
    clock: Arc<dyn Clock>,
    estimate_zero_calories: bool,
}

impl CaptureController {
    pub fn new(state: &AppState) -> Self {
        Self {
            session: Arc::new(Mutex::new(CaptureSession::new())),
            acquirer: ImageAcquirer::new(state.images.clone(), state.config.capture.max_image_bytes),
            inference: state.inference.clone(),
            submitter: LogSubmitter::new(state.logs.clone()),
            clock: state.clock.clone(),
            estimate_zero_calories: state.config.capture.estimate_zero_calories,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn state(&self) -> CaptureState {
        self.session.lock().await.state()
    }

    pub async fn reset(&self) {
        let mut session = self.session.lock().await;
        let was = session.state();
        session.reset();
        info!(session_id = %session.id(), generation = session.generation(), from = ?was, "session reset");
    }

    pub async fn select_meal_type(&self, meal_type: MealType) -> Result<(), CaptureError> {
        self.session.lock().await.select_meal_type(meal_type)
    }

    /// Takes a photo or picks one from the library. Library picks also
    /// choose the meal type from the time of day.
    #[instrument(skip(self))]
    pub async fn acquire_image(&self, source: ImageSourceKind) -> Result<SessionSnapshot, CaptureError> {
        let generation = {
            let session = self.session.lock().await;
            if session.state().is_busy() {
                return Err(CaptureError::Busy(session.state()));
            }
            session.generation()
        };

        let acquired = self.acquirer.acquire(source, self.clock.now()).await;

        let mut session = self.session.lock().await;
        if session.generation() != generation {
            debug!("session changed during acquisition, dropping image");
            return Err(CaptureError::Superseded);
        }
        let image = match acquired {
            Ok(image) => image,
            Err(e) => {
                let e = CaptureError::from(e);
                session.record_error(&e);
                return Err(e);
            }
        };
        let auto_meal_type = match source {
            ImageSourceKind::Gallery => Some(meal_type_at(self.clock.as_ref())),
            ImageSourceKind::Camera => None,
        };
        let image_id = image.id;
        session.attach_image(image, auto_meal_type)?;
        info!(session_id = %session.id(), %image_id, meal_type = %session.meal_type(), "image captured");
        Ok(session.snapshot())
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self) -> Result<AnalysisOutcome, CaptureError> {
        let ticket = self.session.lock().await.begin_analysis()?;

        let result = self
            .inference
            .analyze_image(&ticket.image, ticket.ticket.meal_type)
            .await;

        let mut session = self.session.lock().await;
        let outcome = session.finish_analysis(ticket.ticket, result);
        match &outcome {
            Ok(AnalysisOutcome::Analyzed(a)) => {
                info!(session_id = %session.id(), calories = a.calories, "analysis ready")
            }
            Ok(AnalysisOutcome::Unclear(u)) => {
                info!(session_id = %session.id(), reason = %u.reason, "analysis unclear")
            }
            Err(CaptureError::Superseded) => debug!("late analysis response discarded"),
            Err(e) => warn!(session_id = %session.id(), error = %e, "analysis failed"),
        }
        outcome
    }

    pub async fn enter_manual_entry(&self) -> Result<(), CaptureError> {
        self.session.lock().await.enter_manual_entry()
    }

    pub async fn leave_manual_entry(&self) -> Result<(), CaptureError> {
        self.session.lock().await.leave_manual_entry()
    }

    pub async fn edit_description(&self, description: &str) -> Result<ManualDraft, CaptureError> {
        self.session.lock().await.edit_draft(|d| {
            d.set_description(description);
            Ok(())
        })
    }

    pub async fn edit_macro(&self, field: MacroField, input: &str) -> Result<ManualDraft, CaptureError> {
        self.session
            .lock()
            .await
            .edit_draft(|d| d.set_from_input(field, input))
    }

    pub async fn set_macro(&self, field: MacroField, value: Option<u32>) -> Result<ManualDraft, CaptureError> {
        self.session.lock().await.edit_draft(|d| {
            d.set(field, value);
            Ok(())
        })
    }

    /// Fills the draft's numbers from a text estimate of `description`.
    #[instrument(skip(self, description))]
    pub async fn estimate_from_text(&self, description: &str) -> Result<ManualDraft, CaptureError> {
        let ticket = self.session.lock().await.begin_estimate(Some(description))?;
        self.run_estimate(ticket.ticket, &ticket.description).await
    }

    /// Persists the current analysis or manual draft.
    ///
    /// A manual draft without calories is estimated first and handed back
    /// as [`SubmitOutcome::NeedsConfirmation`]; the next `submit` persists it.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<SubmitOutcome, CaptureError> {
        let plan = self
            .session
            .lock()
            .await
            .begin_submit(self.estimate_zero_calories)?;

        match plan {
            SubmitPlan::EstimateFirst(ticket) => {
                info!("calories missing, estimating before submit");
                let draft = self.run_estimate(ticket.ticket, &ticket.description).await?;
                Ok(SubmitOutcome::NeedsConfirmation(draft))
            }
            SubmitPlan::Persist(ticket) => self.persist(ticket).await.map(SubmitOutcome::Saved),
        }
    }

    pub async fn today(&self) -> Result<DailyLog, CaptureError> {
        self.submitter.today().await
    }

    async fn run_estimate(
        &self,
        ticket: Ticket,
        description: &str,
    ) -> Result<ManualDraft, CaptureError> {
        let result = self
            .inference
            .estimate_text(description, ticket.meal_type)
            .await;

        let mut session = self.session.lock().await;
        let outcome = session.finish_estimate(ticket, result);
        match &outcome {
            Ok(d) => info!(session_id = %session.id(), calories = ?d.calories, "estimate applied"),
            Err(CaptureError::Superseded) => debug!("late estimate discarded"),
            Err(e) => warn!(session_id = %session.id(), error = %e, "estimate failed"),
        }
        outcome
    }

    async fn persist(&self, ticket: SubmitTicket) -> Result<SavedLog, CaptureError> {
        let result = self.submitter.submit(&ticket.entry).await;
        let mut session = self.session.lock().await;
        session.finish_submit(ticket.ticket, result)
    }
}
