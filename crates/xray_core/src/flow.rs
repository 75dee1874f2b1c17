use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::inference::{InferenceError, InferenceService};
use crate::model::AnalysisResult;
use crate::upload::UploadedImage;

/// Why an `analyze` or `reset` request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("No image selected")]
    NoImage,
    #[error("An analysis is already running")]
    Busy,
    #[error("Analysis already complete; clear or select a new image first")]
    AlreadyAnalyzed,
    #[error("Could not start analysis worker: {0}")]
    Spawn(String),
}

/// A failed inference call, kept for display until the next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    pub image_name: String,
    pub error: InferenceError,
}

/// Coarse view of the flow, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Empty,
    Ready,
    Analyzing,
    Complete,
    Failed,
}

type Outcome = Result<AnalysisResult, InferenceError>;

struct PendingAnalysis {
    image_id: u64,
    started: Instant,
    rx: Receiver<Outcome>,
}

/// Upload, analyze, report, reset.
///
/// At most one inference call is in flight. Its completion is picked up by
/// [`AnalysisFlow::poll`] or [`AnalysisFlow::wait`] on the owning thread, so
/// the state is only ever written from one place.
pub struct AnalysisFlow {
    service: Arc<dyn InferenceService>,
    selected: Option<UploadedImage>,
    pending: Option<PendingAnalysis>,
    result: Option<AnalysisResult>,
    error: Option<AnalysisError>,
}

impl AnalysisFlow {
    pub fn new(service: Arc<dyn InferenceService>) -> Self {
        Self {
            service,
            selected: None,
            pending: None,
            result: None,
            error: None,
        }
    }

    /// Image the next analysis will run on.
    pub fn selected_image(&self) -> Option<&UploadedImage> {
        self.selected.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.pending.is_some()
    }

    /// Last completed result for the selected image.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Last failure for the selected image.
    pub fn error(&self) -> Option<&AnalysisError> {
        self.error.as_ref()
    }

    /// Time spent on the in-flight call, if any.
    pub fn analyzing_for(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.started.elapsed())
    }

    pub fn state(&self) -> FlowState {
        if self.pending.is_some() {
            FlowState::Analyzing
        } else if self.result.is_some() {
            FlowState::Complete
        } else if self.error.is_some() {
            FlowState::Failed
        } else if self.selected.is_some() {
            FlowState::Ready
        } else {
            FlowState::Empty
        }
    }

    /// Whether `analyze` would start a call right now.
    pub fn can_analyze(&self) -> bool {
        self.check_can_analyze().is_ok()
    }

    /// Replace the selection. Any shown result or error belongs to the old
    /// image and is dropped. An in-flight call keeps running, but its
    /// completion will be discarded.
    pub fn select_image(&mut self, image: UploadedImage) {
        tracing::info!("selected {} (id {})", image.name(), image.id());
        if self.pending.is_some() {
            tracing::warn!("image replaced while an analysis is running; its result will be ignored");
        }
        self.selected = Some(image);
        self.result = None;
        self.error = None;
    }

    /// Start one inference call for the selected image.
    pub fn analyze(&mut self) -> Result<(), FlowError> {
        self.check_can_analyze()?;
        let Some(image) = self.selected.clone() else {
            return Err(FlowError::NoImage);
        };

        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(&self.service);
        let image_id = image.id();
        tracing::info!("starting {} analysis of {}", service.name(), image.name());
        thread::Builder::new()
            .name("analysis".to_string())
            .spawn(move || {
                let outcome = service.analyze(&image);
                // Receiver gone means the flow was dropped; nothing to report to.
                let _ = tx.send(outcome);
            })
            .map_err(|e| FlowError::Spawn(e.to_string()))?;

        self.error = None;
        self.pending = Some(PendingAnalysis {
            image_id,
            started: Instant::now(),
            rx,
        });
        Ok(())
    }

    /// Collect a finished call without blocking. Returns true when state changed.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(InferenceError::WorkerLost),
        };
        self.finish(outcome);
        true
    }

    /// Block up to `timeout` for the in-flight call. Returns true when state changed.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        let outcome = match pending.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => Err(InferenceError::WorkerLost),
        };
        self.finish(outcome);
        true
    }

    /// Clear image, result and error. Refused while a call is in flight.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        if self.pending.is_some() {
            return Err(FlowError::Busy);
        }
        if self.selected.is_some() || self.result.is_some() || self.error.is_some() {
            tracing::info!("analysis reset");
        }
        self.selected = None;
        self.result = None;
        self.error = None;
        Ok(())
    }

    fn check_can_analyze(&self) -> Result<(), FlowError> {
        if self.pending.is_some() {
            return Err(FlowError::Busy);
        }
        if self.selected.is_none() {
            return Err(FlowError::NoImage);
        }
        if self.result.is_some() {
            return Err(FlowError::AlreadyAnalyzed);
        }
        Ok(())
    }

    fn finish(&mut self, outcome: Outcome) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let elapsed = pending.started.elapsed();
        let current = match &self.selected {
            Some(image) if image.id() == pending.image_id => image,
            _ => {
                tracing::info!("discarding stale analysis after {elapsed:.1?}");
                return;
            }
        };
        match outcome {
            Ok(result) => {
                tracing::info!(
                    "analysis of {} done in {elapsed:.1?}: {} {}% ({})",
                    current.name(),
                    result.phenotype,
                    result.probability,
                    result.severity
                );
                self.result = Some(result);
                self.error = None;
            }
            Err(error) => {
                tracing::warn!("analysis of {} failed: {error}", current.name());
                self.error = Some(AnalysisError {
                    image_name: current.name().to_string(),
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInference;
    use anyhow::Result;

    fn dicom(name: &str) -> Result<UploadedImage> {
        Ok(UploadedImage::from_bytes(name, vec![7u8; 64])?)
    }

    fn instant_flow() -> AnalysisFlow {
        AnalysisFlow::new(Arc::new(MockInference::with_seed(Duration::ZERO, 11)))
    }

    #[test]
    fn new_flow_is_empty() {
        let flow = instant_flow();
        assert_eq!(flow.state(), FlowState::Empty);
        assert!(!flow.can_analyze());
        assert!(!flow.is_analyzing());
        assert!(flow.analyzing_for().is_none());
    }

    #[test]
    fn analyze_without_image_is_refused() {
        let mut flow = instant_flow();
        assert_eq!(flow.analyze(), Err(FlowError::NoImage));
        assert!(!flow.is_analyzing());
    }

    #[test]
    fn poll_and_wait_are_noops_when_idle() -> Result<()> {
        let mut flow = instant_flow();
        assert!(!flow.poll());
        assert!(!flow.wait(Duration::from_millis(5)));
        flow.select_image(dicom("a.dcm")?);
        assert!(!flow.poll());
        assert_eq!(flow.state(), FlowState::Ready);
        Ok(())
    }

    #[test]
    fn completed_analysis_reaches_complete_state() -> Result<()> {
        let mut flow = instant_flow();
        flow.select_image(dicom("a.dcm")?);
        flow.analyze()?;
        assert_eq!(flow.state(), FlowState::Analyzing);
        assert!(flow.wait(Duration::from_secs(5)));
        assert_eq!(flow.state(), FlowState::Complete);
        assert!(flow.result().is_some());
        assert_eq!(flow.analyze(), Err(FlowError::AlreadyAnalyzed));
        Ok(())
    }

    #[test]
    fn reset_twice_is_harmless() -> Result<()> {
        let mut flow = instant_flow();
        flow.select_image(dicom("a.dcm")?);
        flow.reset()?;
        flow.reset()?;
        assert_eq!(flow.state(), FlowState::Empty);
        Ok(())
    }
}
