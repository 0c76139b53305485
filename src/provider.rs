//! Collaborator interfaces
//!
//! The camera, the landmark model and the host page are external to the
//! pipeline. Sessions are written against these traits so the same cycle
//! logic drives a live camera, a recorded replay, or a test double.

use crate::error::ChewError;
use crate::types::{Dimensions, Face};

/// A live (or recorded) video stream
#[async_trait::async_trait]
pub trait CaptureSource: Send + 'static {
    /// Frame type handed to the detector
    type Frame: Send + Sync + 'static;

    /// Wait for the next frame; `Ok(None)` means the stream has ended
    async fn next_frame(&mut self) -> Result<Option<Self::Frame>, ChewError>;

    /// Native frame size, when known
    fn dimensions(&self) -> Option<Dimensions> {
        None
    }

    /// Release the underlying device. Must be safe to call more than once.
    async fn release(&mut self);
}

/// Pretrained face and landmark detector
#[async_trait::async_trait]
pub trait FaceDetector<F>: Send + 'static
where
    F: Send + Sync + 'static,
{
    /// Load model weights from `weights_base`. Must complete before `detect`.
    async fn load(&mut self, weights_base: &str) -> Result<(), ChewError>;

    /// Whether `load` has completed successfully
    fn is_ready(&self) -> bool;

    /// Detect faces in a frame; an empty list means no face
    async fn detect(&mut self, frame: &F) -> Result<Vec<Face>, ChewError>;
}

/// Factory for the per-session collaborators.
///
/// The controller asks the backend for fresh collaborators on every start, so
/// no state leaks from one session into the next.
#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    type Capture: CaptureSource;
    type Detector: FaceDetector<<Self::Capture as CaptureSource>::Frame>;
    type Sink: crate::action::ActionSink;

    /// Acquire a capture stream for the given camera (None = default device)
    async fn acquire(&self, camera_id: Option<&str>) -> Result<Self::Capture, ChewError>;

    /// Create an unloaded detector
    fn detector(&self) -> Self::Detector;

    /// Create the action sink for a new session
    fn sink(&self) -> Self::Sink;
}
