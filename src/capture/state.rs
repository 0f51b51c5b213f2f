use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiError, CaptureError};
use crate::images::{CapturedImage, EncodedImage};
use crate::inference::{AnalysisOutcome, EstimateOutcome};
use crate::logs::{FoodLogEntry, LogSubmitter, SavedLog};
use crate::manual::ManualDraft;
use crate::meals::{FoodAnalysis, MealType, UnclearResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureState {
    Idle,
    ImageCaptured,
    Analyzing,
    Analyzed,
    Unclear,
    ManualEntry,
    Estimating,
    Estimated,
    Saving,
}

impl Default for CaptureState {
    fn default() -> Self {
        CaptureState::Idle
    }
}

impl CaptureState {
    /// A network call is in flight; only `reset` may interrupt.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            CaptureState::Analyzing | CaptureState::Estimating | CaptureState::Saving
        )
    }
}

/// What the session is about. A session never holds an image and a manual
/// draft at the same time.
#[derive(Debug, Clone, Default)]
pub enum Subject {
    #[default]
    Empty,
    Image(CapturedImage),
    Draft(ManualDraft),
}

/// Handed out when a network call starts. The response is only applied if
/// the session generation still matches `generation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub meal_type: MealType,
    resume: CaptureState,
}

#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub ticket: Ticket,
    pub image: EncodedImage,
}

#[derive(Debug, Clone)]
pub struct EstimateTicket {
    pub ticket: Ticket,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub ticket: Ticket,
    pub entry: FoodLogEntry,
}

/// Next step after `begin_submit`.
#[derive(Debug, Clone)]
pub enum SubmitPlan {
    Persist(SubmitTicket),
    /// Calories are missing; estimate and ask for confirmation instead of
    /// persisting.
    EstimateFirst(EstimateTicket),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub generation: u64,
    pub state: CaptureState,
    pub meal_type: MealType,
    pub image: Option<CapturedImage>,
    pub outcome: Option<AnalysisOutcome>,
    pub draft: Option<ManualDraft>,
    pub last_error: Option<String>,
    pub analyzing: bool,
    pub estimating: bool,
    pub saving: bool,
}

/// Aggregate root of one capture flow.
///
/// Every transition bumps `generation`. Async completions carry the
/// generation they were issued under and are dropped on mismatch, so a reset
/// while a request is in flight can't be overwritten by its late response.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    id: Uuid,
    generation: u64,
    state: CaptureState,
    subject: Subject,
    outcome: Option<AnalysisOutcome>,
    meal_type: MealType,
    last_error: Option<String>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::with_generation(0)
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_generation(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            state: CaptureState::Idle,
            subject: Subject::Empty,
            outcome: None,
            meal_type: MealType::default(),
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn meal_type(&self) -> MealType {
        self.meal_type
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        match &self.subject {
            Subject::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&ManualDraft> {
        match &self.subject {
            Subject::Draft(d) => Some(d),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&FoodAnalysis> {
        match &self.outcome {
            Some(AnalysisOutcome::Analyzed(a)) => Some(a),
            _ => None,
        }
    }

    pub fn unclear(&self) -> Option<&UnclearResult> {
        match &self.outcome {
            Some(AnalysisOutcome::Unclear(u)) => Some(u),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            generation: self.generation,
            state: self.state,
            meal_type: self.meal_type,
            image: self.image().cloned(),
            outcome: self.outcome.clone(),
            draft: self.draft().cloned(),
            last_error: self.last_error.clone(),
            analyzing: self.state == CaptureState::Analyzing,
            estimating: self.state == CaptureState::Estimating,
            saving: self.state == CaptureState::Saving,
        }
    }

    /// Drops everything and starts a fresh session. Safe from any state.
    pub fn reset(&mut self) {
        *self = Self::with_generation(self.generation + 1);
    }

    pub fn record_error(&mut self, e: &CaptureError) {
        if e.is_user_facing() {
            self.last_error = Some(e.to_string());
        }
    }

    fn advance(&mut self, to: CaptureState) {
        self.state = to;
        self.generation += 1;
    }

    fn ensure_not_busy(&self) -> Result<(), CaptureError> {
        if self.state.is_busy() {
            return Err(CaptureError::Busy(self.state));
        }
        Ok(())
    }

    fn ensure_in(&self, op: &'static str, allowed: &[CaptureState]) -> Result<(), CaptureError> {
        self.ensure_not_busy()?;
        if !allowed.contains(&self.state) {
            return Err(CaptureError::InvalidTransition {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    fn ticket(&self, resume: CaptureState) -> Ticket {
        Ticket {
            generation: self.generation,
            meal_type: self.meal_type,
            resume,
        }
    }

    pub fn select_meal_type(&mut self, meal_type: MealType) -> Result<(), CaptureError> {
        self.ensure_not_busy()?;
        self.meal_type = meal_type;
        Ok(())
    }

    /// Replaces whatever the session was about with a fresh image.
    pub fn attach_image(
        &mut self,
        image: CapturedImage,
        auto_meal_type: Option<MealType>,
    ) -> Result<(), CaptureError> {
        self.ensure_not_busy()?;
        self.subject = Subject::Image(image);
        self.outcome = None;
        self.last_error = None;
        if let Some(meal_type) = auto_meal_type {
            self.meal_type = meal_type;
        }
        self.advance(CaptureState::ImageCaptured);
        Ok(())
    }

    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, CaptureError> {
        self.ensure_in(
            "analyze",
            &[
                CaptureState::ImageCaptured,
                CaptureState::Analyzed,
                CaptureState::Unclear,
            ],
        )?;
        let image = match &self.subject {
            Subject::Image(img) => img.encoded.clone(),
            _ => {
                return Err(CaptureError::InvalidTransition {
                    op: "analyze",
                    state: self.state,
                })
            }
        };
        // A prior outcome stays until a new one replaces it, so a failed
        // re-analysis can fall back to it.
        let resume = self.state;
        self.last_error = None;
        self.advance(CaptureState::Analyzing);
        Ok(AnalysisTicket {
            ticket: self.ticket(resume),
            image,
        })
    }

    pub fn finish_analysis(
        &mut self,
        ticket: Ticket,
        result: Result<AnalysisOutcome, ApiError>,
    ) -> Result<AnalysisOutcome, CaptureError> {
        if ticket.generation != self.generation {
            return Err(CaptureError::Superseded);
        }
        match result {
            Ok(outcome) => {
                let next = match &outcome {
                    AnalysisOutcome::Analyzed(_) => CaptureState::Analyzed,
                    AnalysisOutcome::Unclear(_) => CaptureState::Unclear,
                };
                self.outcome = Some(outcome.clone());
                self.advance(next);
                Ok(outcome)
            }
            Err(e) => {
                let e = CaptureError::from(e);
                self.record_error(&e);
                self.advance(ticket.resume);
                Err(e)
            }
        }
    }

    /// Switches to manual entry, keeping the meal type and any unclear result.
    pub fn enter_manual_entry(&mut self) -> Result<(), CaptureError> {
        self.ensure_in(
            "enter manual entry",
            &[CaptureState::Idle, CaptureState::Unclear],
        )?;
        self.subject = Subject::Draft(ManualDraft::default());
        self.last_error = None;
        self.advance(CaptureState::ManualEntry);
        Ok(())
    }

    pub fn leave_manual_entry(&mut self) -> Result<(), CaptureError> {
        self.ensure_in(
            "leave manual entry",
            &[CaptureState::ManualEntry, CaptureState::Estimated],
        )?;
        self.subject = Subject::Empty;
        self.last_error = None;
        let back = if self.unclear().is_some() {
            CaptureState::Unclear
        } else {
            CaptureState::Idle
        };
        self.advance(back);
        Ok(())
    }

    pub fn edit_draft<F>(&mut self, edit: F) -> Result<ManualDraft, CaptureError>
    where
        F: FnOnce(&mut ManualDraft) -> Result<(), CaptureError>,
    {
        self.ensure_in(
            "edit manual entry",
            &[CaptureState::ManualEntry, CaptureState::Estimated],
        )?;
        let Some(current) = self.draft() else {
            return Err(CaptureError::InvalidTransition {
                op: "edit manual entry",
                state: self.state,
            });
        };
        // Edits apply to a copy; a failing edit leaves the draft as it was.
        let mut draft = current.clone();
        if let Err(e) = edit(&mut draft) {
            self.record_error(&e);
            return Err(e);
        }
        self.subject = Subject::Draft(draft.clone());
        self.last_error = None;
        self.advance(draft_state(&draft));
        Ok(draft)
    }

    /// Starts a text estimate. `description`, when given, replaces the draft's.
    pub fn begin_estimate(
        &mut self,
        description: Option<&str>,
    ) -> Result<EstimateTicket, CaptureError> {
        self.ensure_in(
            "estimate",
            &[CaptureState::ManualEntry, CaptureState::Estimated],
        )?;
        let state = self.state;
        let Some(current) = self.draft() else {
            return Err(CaptureError::InvalidTransition { op: "estimate", state });
        };
        let text = description
            .unwrap_or(current.description.as_str())
            .trim()
            .to_string();
        if text.is_empty() {
            let e = CaptureError::Validation("Please enter what you ate.".into());
            self.record_error(&e);
            return Err(e);
        }
        let Subject::Draft(draft) = &mut self.subject else {
            return Err(CaptureError::InvalidTransition { op: "estimate", state });
        };
        if let Some(new) = description {
            draft.set_description(new);
        }
        let description = text;
        let resume = draft_state(draft);
        self.last_error = None;
        self.advance(CaptureState::Estimating);
        Ok(EstimateTicket {
            ticket: self.ticket(resume),
            description,
        })
    }

    /// Applies an estimate. On failure the draft numbers stay as they were.
    pub fn finish_estimate(
        &mut self,
        ticket: Ticket,
        result: Result<EstimateOutcome, ApiError>,
    ) -> Result<ManualDraft, CaptureError> {
        if ticket.generation != self.generation {
            return Err(CaptureError::Superseded);
        }
        let applied = match result {
            Ok(EstimateOutcome::Estimated(estimation)) => match &mut self.subject {
                Subject::Draft(draft) => draft.apply_estimation(&estimation).map(|_| draft.clone()),
                _ => Err(CaptureError::Superseded),
            },
            Ok(EstimateOutcome::Failed { message }) => Err(CaptureError::EstimationFailed(message)),
            Err(e) => Err(CaptureError::from(e)),
        };
        match applied {
            Ok(draft) => {
                self.advance(CaptureState::Estimated);
                Ok(draft)
            }
            Err(e) => {
                self.record_error(&e);
                self.advance(ticket.resume);
                Err(e)
            }
        }
    }

    pub fn begin_submit(
        &mut self,
        estimate_zero_calories: bool,
    ) -> Result<SubmitPlan, CaptureError> {
        self.ensure_in(
            "submit",
            &[
                CaptureState::Analyzed,
                CaptureState::ManualEntry,
                CaptureState::Estimated,
            ],
        )?;
        let entry = if self.state == CaptureState::Analyzed {
            let Some(analysis) = self.analysis() else {
                return Err(CaptureError::InvalidTransition {
                    op: "submit",
                    state: self.state,
                });
            };
            LogSubmitter::entry_from_analysis(analysis, self.meal_type)
        } else {
            let Some(draft) = self.draft() else {
                return Err(CaptureError::InvalidTransition {
                    op: "submit",
                    state: self.state,
                });
            };
            // Only a hand-entered draft is estimated implicitly. An estimated
            // draft is the confirmation step and persists as it stands.
            if self.state == CaptureState::ManualEntry
                && !draft.estimated
                && draft.has_description()
                && draft.needs_estimation(estimate_zero_calories)
            {
                return self.begin_estimate(None).map(SubmitPlan::EstimateFirst);
            }
            match draft.validate() {
                Ok(valid) => LogSubmitter::entry_from_draft(&valid, self.meal_type),
                Err(e) => {
                    self.record_error(&e);
                    return Err(e);
                }
            }
        };
        let resume = self.state;
        self.last_error = None;
        self.advance(CaptureState::Saving);
        Ok(SubmitPlan::Persist(SubmitTicket {
            ticket: self.ticket(resume),
            entry,
        }))
    }

    /// Success ends the session. Failure returns to the pre-submit state with
    /// everything entered kept for another try.
    pub fn finish_submit(
        &mut self,
        ticket: Ticket,
        result: Result<SavedLog, CaptureError>,
    ) -> Result<SavedLog, CaptureError> {
        if ticket.generation != self.generation {
            // Already persisted or failed for a session nobody is looking at.
            return result;
        }
        match result {
            Ok(saved) => {
                self.reset();
                Ok(saved)
            }
            Err(e) => {
                self.record_error(&e);
                self.advance(ticket.resume);
                Err(e)
            }
        }
    }
}

fn draft_state(draft: &ManualDraft) -> CaptureState {
    if draft.estimated {
        CaptureState::Estimated
    } else {
        CaptureState::ManualEntry
    }
}
