use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::family::{JobFamily, JobSnapshot, resolve};

/// Stages every job family walks through.
///
/// IDLE → UPLOADING_ASSETS → SUBMITTED → WAITING → SUCCEEDED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    UploadingAssets,
    Submitted,
    Waiting,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "IDLE"),
            Stage::UploadingAssets => write!(f, "UPLOADING_ASSETS"),
            Stage::Submitted => write!(f, "SUBMITTED"),
            Stage::Waiting => write!(f, "WAITING"),
            Stage::Succeeded => write!(f, "SUCCEEDED"),
            Stage::Failed => write!(f, "FAILED"),
        }
    }
}

/// Inputs that drive a tracker between stages.
#[derive(Debug, Clone)]
pub enum Event<R> {
    /// An input asset upload began.
    UploadStarted,
    /// The submit request is about to be sent.
    SubmitStarted,
    /// The backend accepted the job; `wait` follows immediately.
    Accepted(R),
    /// Advisory snapshot from the progress poller.
    Progress(R),
    /// Snapshot returned by `wait`.
    Finished(R),
    /// Any failure before a terminal snapshot: precondition, upload, submit
    /// or wait.
    Errored(String),
    Reset,
}

impl<R> Event<R> {
    fn name(&self) -> &'static str {
        match self {
            Event::UploadStarted => "upload_started",
            Event::SubmitStarted => "submit_started",
            Event::Accepted(_) => "accepted",
            Event::Progress(_) => "progress",
            Event::Finished(_) => "finished",
            Event::Errored(_) => "errored",
            Event::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Succeeded(String),
    Failed(String),
}

/// The result of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved to a non-terminal stage.
    Next(Stage),
    /// Stage unchanged; data refreshed.
    Stay(Stage),
    /// Reached SUCCEEDED or FAILED.
    Complete(JobOutcome),
    /// The event is not valid in the current stage; nothing changed.
    Rejected { from: Stage, event: &'static str },
}

/// Per-family job state: current stage, last snapshot, outcome.
#[derive(Debug, Clone)]
pub struct JobTracker<F: JobFamily> {
    pub stage: Stage,
    pub job_id: Option<String>,
    pub snapshot: Option<F::Response>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub stage_history: Vec<Stage>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    family: PhantomData<F>,
}

impl<F: JobFamily> Default for JobTracker<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: JobFamily> JobTracker<F> {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            job_id: None,
            snapshot: None,
            result: None,
            error: None,
            stage_history: Vec::new(),
            started_at: None,
            updated_at: Utc::now(),
            family: PhantomData,
        }
    }

    /// Apply `event` and return the resulting transition.
    ///
    /// - UploadStarted / SubmitStarted begin a new attempt from IDLE or a
    ///   terminal stage, clearing the previous attempt's outcome.
    /// - Accepted is only valid in SUBMITTED, Progress only in WAITING.
    /// - Finished is valid in WAITING and resolves the snapshot.
    /// - Errored and Reset are valid everywhere.
    pub fn next(&mut self, event: Event<F::Response>) -> Transition {
        let from = self.stage;
        let name = event.name();
        match (from, event) {
            (_, Event::Reset) => {
                *self = Self::new();
                Transition::Next(Stage::Idle)
            }
            (_, Event::Errored(reason)) => {
                self.error = Some(reason.clone());
                self.enter(Stage::Failed);
                Transition::Complete(JobOutcome::Failed(reason))
            }
            (Stage::UploadingAssets, Event::UploadStarted) => Transition::Stay(from),
            (from, Event::UploadStarted) if from == Stage::Idle || from.is_terminal() => {
                self.begin_attempt();
                self.enter(Stage::UploadingAssets);
                Transition::Next(Stage::UploadingAssets)
            }
            (from, Event::SubmitStarted) if from != Stage::Submitted && from != Stage::Waiting => {
                if from == Stage::Idle || from.is_terminal() {
                    self.begin_attempt();
                }
                self.enter(Stage::Submitted);
                Transition::Next(Stage::Submitted)
            }
            (Stage::Submitted, Event::Accepted(snapshot)) => {
                self.job_id = Some(snapshot.id().to_string());
                self.snapshot = Some(snapshot);
                self.enter(Stage::Waiting);
                Transition::Next(Stage::Waiting)
            }
            (Stage::Waiting, Event::Progress(snapshot)) => {
                self.snapshot = Some(snapshot);
                self.updated_at = Utc::now();
                Transition::Stay(from)
            }
            (Stage::Waiting, Event::Finished(snapshot)) => {
                let outcome = match resolve::<F>(&snapshot) {
                    Ok(url) => {
                        self.result = Some(url.clone());
                        self.enter(Stage::Succeeded);
                        JobOutcome::Succeeded(url)
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        self.error = Some(reason.clone());
                        self.enter(Stage::Failed);
                        JobOutcome::Failed(reason)
                    }
                };
                self.snapshot = Some(snapshot);
                Transition::Complete(outcome)
            }
            (from, _) => Transition::Rejected { from, event: name },
        }
    }

    /// Latest progress reported by the backend, if any.
    pub fn progress(&self) -> Option<f64> {
        self.snapshot.as_ref().and_then(JobSnapshot::progress)
    }

    /// UI flags for this job.
    pub fn flags(&self) -> JobFlags {
        JobFlags {
            stage: self.stage,
            processing: self.stage == Stage::Submitted,
            polling: self.stage == Stage::Waiting,
            progress: self.progress(),
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }

    fn begin_attempt(&mut self) {
        self.job_id = None;
        self.snapshot = None;
        self.result = None;
        self.error = None;
        self.started_at = Some(Utc::now());
    }

    fn enter(&mut self, stage: Stage) {
        self.stage_history.push(self.stage);
        self.stage = stage;
        self.updated_at = Utc::now();
    }
}

/// What a presentation layer needs to render one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFlags {
    pub stage: Stage,
    pub processing: bool,
    pub polling: bool,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub result: Option<String>,
}

/// Structured record of one job attempt, printed at the end of a CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub family: String,
    pub job_id: Option<String>,
    pub stage: Stage,
    pub stage_transitions: Vec<Stage>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: Option<i64>,
}

impl JobRecord {
    pub fn from_tracker<F: JobFamily>(tracker: &JobTracker<F>) -> Self {
        let mut transitions = tracker.stage_history.clone();
        transitions.push(tracker.stage);
        Self {
            family: F::NAME.to_string(),
            job_id: tracker.job_id.clone(),
            stage: tracker.stage,
            stage_transitions: transitions,
            result: tracker.result.clone(),
            error: tracker.error.clone(),
            started_at: tracker.started_at,
            completed_at: tracker.updated_at,
            duration_ms: tracker
                .started_at
                .map(|start| (tracker.updated_at - start).num_milliseconds()),
        }
    }
}
