use thiserror::Error;

use crate::model::AnalysisResult;
use crate::upload::UploadedImage;

/// Ways an inference call can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Analysis backend unreachable: {0}")]
    Http(String),
    #[error("Analysis backend returned status {0}")]
    Status(u16),
    #[error("Could not decode analysis response: {0}")]
    Decode(String),
    #[error("Analysis response out of range: {0}")]
    InvalidResult(String),
    #[error("Analysis worker stopped before reporting a result")]
    WorkerLost,
}

/// Anything that can turn a radiograph into an [`AnalysisResult`].
///
/// One request, one response, no cancellation. Implementations block; the
/// flow runs them off the UI thread.
pub trait InferenceService: Send + Sync {
    fn analyze(&self, image: &UploadedImage) -> Result<AnalysisResult, InferenceError>;

    /// Liveness probe. Never errors; an unreachable backend is unhealthy.
    fn health(&self) -> bool;

    /// Short label for status bars and logs.
    fn name(&self) -> &str;
}
