mod error;
mod family;
mod progress;
mod state;

pub use error::JobError;
pub use family::{JobFamily, JobSnapshot, LayeredTryOn, TryOn, VideoGeneration, resolve};
pub use progress::{MIN_POLL_INTERVAL, wait_with_progress};
pub use state::{Event, JobFlags, JobOutcome, JobRecord, JobTracker, Stage, Transition};
