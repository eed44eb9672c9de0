use thiserror::Error;

use crate::api::ApiError;

/// Failures of a single job attempt. None of them are fatal: the session
/// can always be reset or the attempt repeated.
#[derive(Debug, Error)]
pub enum JobError {
    /// Required inputs were missing; no request was sent.
    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The backend reported a terminal failure for the job.
    #[error("{0}")]
    JobFailed(String),

    #[error("job {job_id} succeeded without an output")]
    MissingOutput { job_id: String },

    /// `wait` returned before the job reached a terminal status.
    #[error("job {job_id} did not finish (status: {status})")]
    Unresolved { job_id: String, status: String },

    /// The session was reset while this call was in flight.
    #[error("discarded after session reset")]
    Superseded,
}
