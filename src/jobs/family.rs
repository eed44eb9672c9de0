//! The three backend job families share one submit/status/wait protocol.
//!
//! A [`JobFamily`] names its endpoints and its request/response shapes;
//! [`JobSnapshot`] gives the orchestration a uniform view of a response
//! so the state machine is written once.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::JobError;
use crate::api::types::{
    JobStatus, LayeredTryOnRequest, TransformResponse, VideoGenerationRequest, VideoResponse,
    VirtualTryOnRequest,
};

/// Uniform read access to a job snapshot returned by the backend.
pub trait JobSnapshot {
    fn id(&self) -> &str;
    fn status(&self) -> &JobStatus;
    fn error(&self) -> Option<&str>;
    /// The single artifact URL this job produced, normalized.
    fn artifact(&self) -> Option<String>;
    /// Percent complete, when the backend reports it.
    fn progress(&self) -> Option<f64> {
        None
    }
}

impl JobSnapshot for TransformResponse {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn artifact(&self) -> Option<String> {
        self.output
            .as_ref()
            .and_then(|o| o.primary())
            .map(str::to_string)
    }
}

impl JobSnapshot for VideoResponse {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn artifact(&self) -> Option<String> {
        self.video_url.clone().filter(|u| !u.is_empty())
    }

    fn progress(&self) -> Option<f64> {
        self.progress
    }
}

/// One backend job family: its endpoints and wire shapes.
pub trait JobFamily {
    type Request: Serialize + Send + Sync;
    type Response: JobSnapshot + DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    /// Human-readable name used in logs and records.
    const NAME: &'static str;
    const SUBMIT_PATH: &'static str;
    const STATUS_PATH: &'static str;
    const WAIT_PATH: &'static str;
    /// Reason reported when a failed job carries no `error`.
    const FAILURE_FALLBACK: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct TryOn;

impl JobFamily for TryOn {
    type Request = VirtualTryOnRequest;
    type Response = TransformResponse;

    const NAME: &'static str = "try-on";
    const SUBMIT_PATH: &'static str = "/api/virtual-try-on/";
    const STATUS_PATH: &'static str = "/api/virtual-try-on/status/{prediction_id}";
    const WAIT_PATH: &'static str = "/api/virtual-try-on/wait/{prediction_id}";
    const FAILURE_FALLBACK: &'static str = "Try-on failed";
}

#[derive(Debug, Clone, Copy)]
pub struct LayeredTryOn;

impl JobFamily for LayeredTryOn {
    type Request = LayeredTryOnRequest;
    type Response = TransformResponse;

    const NAME: &'static str = "layered-try-on";
    const SUBMIT_PATH: &'static str = "/api/layered-try-on/";
    const STATUS_PATH: &'static str = "/api/layered-try-on/status/{prediction_id}";
    const WAIT_PATH: &'static str = "/api/layered-try-on/wait/{prediction_id}";
    const FAILURE_FALLBACK: &'static str = "Layered try-on failed";
}

#[derive(Debug, Clone, Copy)]
pub struct VideoGeneration;

impl JobFamily for VideoGeneration {
    type Request = VideoGenerationRequest;
    type Response = VideoResponse;

    const NAME: &'static str = "video";
    const SUBMIT_PATH: &'static str = "/api/generate-video/";
    const STATUS_PATH: &'static str = "/api/generate-video/status/{prediction_id}";
    const WAIT_PATH: &'static str = "/api/generate-video/wait/{prediction_id}";
    const FAILURE_FALLBACK: &'static str = "Video generation failed";
}

/// Turn a snapshot returned by `wait` into the job's artifact URL.
///
/// Output is only read when the status is the success token.
pub fn resolve<F: JobFamily>(snapshot: &F::Response) -> Result<String, JobError> {
    let status = snapshot.status();
    if status.is_succeeded() {
        snapshot.artifact().ok_or(JobError::MissingOutput {
            job_id: snapshot.id().to_string(),
        })
    } else if status.is_failed() {
        let reason = snapshot
            .error()
            .filter(|e| !e.is_empty())
            .unwrap_or(F::FAILURE_FALLBACK);
        Err(JobError::JobFailed(reason.to_string()))
    } else {
        Err(JobError::Unresolved {
            job_id: snapshot.id().to_string(),
            status: status.to_string(),
        })
    }
}
