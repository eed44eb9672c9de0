use thiserror::Error;

use crate::api::ApiError;
use crate::jobs::JobError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum VizzleError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Handoff store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_keep_their_message() {
        let err = VizzleError::from(JobError::Precondition(
            "Please complete a try-on first".into(),
        ));
        assert!(matches!(err, VizzleError::Job(_)));
        assert_eq!(err.to_string(), "Please complete a try-on first");
    }

    #[test]
    fn store_errors_are_labelled() {
        let err = VizzleError::from(StoreError::Poisoned);
        assert!(matches!(err, VizzleError::Store(_)));
        assert!(err.to_string().starts_with("Handoff store error: "));
    }
}
