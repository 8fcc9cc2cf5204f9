//! Errors returned by processors, exporters and the provider.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Error type for export, flush and shutdown operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// The component was already shut down.
    ///
    /// Returned by `export` after `shutdown`, and by `force_flush` on a
    /// processor whose worker has exited.
    #[error("Shutdown already invoked")]
    AlreadyShutdown,

    /// The operation did not complete within the given duration.
    ///
    /// For flush and shutdown the work keeps running in the background; the
    /// caller is only unblocked.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Any other failure: an exhausted retry budget, a rejected batch, a
    /// poisoned lock.
    #[error("Operation failed: {0}")]
    InternalFailure(String),
}

impl<T> From<PoisonError<T>> for SdkError {
    fn from(err: PoisonError<T>) -> Self {
        SdkError::InternalFailure(format!("Mutex poisoned: {err}"))
    }
}

/// Result of export, flush and shutdown operations.
pub type SdkResult = Result<(), SdkError>;
