use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Returned by a task to ask for a later retry.
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error(transparent)]
    Task(#[from] anyhow::Error),
    #[error("admission controller is closed")]
    Closed,
}
