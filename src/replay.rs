//! Recorded-detection replay
//!
//! Landmark detections captured from a real run can be stored as NDJSON (one
//! `RecordedFrame` per line) and replayed through the same session pipeline a
//! live camera uses. The CLI and the session tests both drive sessions this way.

use crate::action::ActionSink;
use crate::error::ChewError;
use crate::provider::{CaptureSource, FaceDetector, SessionBackend};
use crate::types::{Dimensions, Face};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One recorded frame: the faces the detector saw at that moment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub sequence: u64,
    #[serde(default)]
    pub faces: Vec<Face>,
}

/// Parse NDJSON recorded frames. Blank lines are ignored.
pub fn parse_ndjson(input: &str) -> Result<Vec<RecordedFrame>, ChewError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| ChewError::ParseError(format!("line {}: {}", i + 1, e)))
        })
        .collect()
}

/// Capture source that plays back recorded frames in order
pub struct ReplaySource {
    frames: VecDeque<RecordedFrame>,
    dimensions: Option<Dimensions>,
    open: Arc<AtomicUsize>,
    released: bool,
}

impl ReplaySource {
    /// `open` is decremented once when the source is released
    pub fn new(
        frames: Vec<RecordedFrame>,
        dimensions: Option<Dimensions>,
        open: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frames: frames.into(),
            dimensions,
            open,
            released: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[async_trait::async_trait]
impl CaptureSource for ReplaySource {
    type Frame = RecordedFrame;

    async fn next_frame(&mut self) -> Result<Option<RecordedFrame>, ChewError> {
        if self.released {
            return Err(ChewError::Capture("stream already released".to_string()));
        }
        Ok(self.frames.pop_front())
    }

    fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.frames.clear();
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Detector that returns the faces stored with each recorded frame
#[derive(Debug, Default)]
pub struct AnnotatedDetector {
    weights_base: Option<String>,
}

impl AnnotatedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight location given to `load`
    pub fn weights_base(&self) -> Option<&str> {
        self.weights_base.as_deref()
    }
}

#[async_trait::async_trait]
impl FaceDetector<RecordedFrame> for AnnotatedDetector {
    async fn load(&mut self, weights_base: &str) -> Result<(), ChewError> {
        if weights_base.trim().is_empty() {
            return Err(ChewError::DetectorInit(
                "no weight location given".to_string(),
            ));
        }
        self.weights_base = Some(weights_base.to_string());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.weights_base.is_some()
    }

    async fn detect(&mut self, frame: &RecordedFrame) -> Result<Vec<Face>, ChewError> {
        if !self.is_ready() {
            return Err(ChewError::DetectorNotReady);
        }
        Ok(frame.faces.clone())
    }
}

/// Backend that hands every session a fresh replay of the same recording
pub struct ReplayBackend<A: ActionSink> {
    frames: Vec<RecordedFrame>,
    dimensions: Option<Dimensions>,
    cameras: Option<Vec<String>>,
    make_sink: Box<dyn Fn() -> A + Send + Sync>,
    open: Arc<AtomicUsize>,
}

impl<A: ActionSink> ReplayBackend<A> {
    pub fn new<F>(frames: Vec<RecordedFrame>, make_sink: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            frames,
            dimensions: None,
            cameras: None,
            make_sink: Box::new(make_sink),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Restrict the cameras that can be acquired. An empty list means no camera.
    pub fn with_cameras(mut self, cameras: Vec<String>) -> Self {
        self.cameras = Some(cameras);
        self
    }

    /// Captures acquired and not yet released
    pub fn open_captures(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<A: ActionSink> SessionBackend for ReplayBackend<A> {
    type Capture = ReplaySource;
    type Detector = AnnotatedDetector;
    type Sink = A;

    async fn acquire(&self, camera_id: Option<&str>) -> Result<ReplaySource, ChewError> {
        if let Some(cameras) = &self.cameras {
            let found = match camera_id {
                Some(id) => cameras.iter().any(|c| c == id),
                None => !cameras.is_empty(),
            };
            if !found {
                return Err(ChewError::CaptureUnavailable(format!(
                    "no camera matching {}",
                    camera_id.unwrap_or("default")
                )));
            }
        }

        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(ReplaySource::new(
            self.frames.clone(),
            self.dimensions,
            self.open.clone(),
        ))
    }

    fn detector(&self) -> AnnotatedDetector {
        AnnotatedDetector::new()
    }

    fn sink(&self) -> A {
        (self.make_sink)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::CounterSink;
    use crate::landmarks::tests::face_at_distance;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ndjson() {
        let face = serde_json::to_string(&face_at_distance(12.0)).unwrap();
        let input = format!(
            "{{\"sequence\":0,\"faces\":[{face}]}}\n\n{{\"sequence\":1}}\n"
        );

        let frames = parse_ndjson(&input).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].faces.len(), 1);
        assert!(frames[1].faces.is_empty());
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let err = parse_ndjson("{\"sequence\":0}\nnot json\n").unwrap_err();
        match err {
            ChewError::ParseError(msg) => assert!(msg.starts_with("line 2:")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_source_plays_in_order_then_ends() {
        let open = Arc::new(AtomicUsize::new(1));
        let frames = vec![
            RecordedFrame { sequence: 7, faces: vec![] },
            RecordedFrame { sequence: 8, faces: vec![] },
        ];
        let mut source = ReplaySource::new(frames, None, open.clone());

        assert_eq!(source.next_frame().await.unwrap().unwrap().sequence, 7);
        assert_eq!(source.next_frame().await.unwrap().unwrap().sequence, 8);
        assert!(source.next_frame().await.unwrap().is_none());

        source.release().await;
        source.release().await;
        assert!(source.is_released());
        assert_eq!(source.remaining(), 0);
        assert_eq!(open.load(Ordering::SeqCst), 0);
        assert!(source.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_detector_requires_load() {
        let mut detector = AnnotatedDetector::new();
        let frame = RecordedFrame {
            sequence: 0,
            faces: vec![face_at_distance(5.0)],
        };

        assert!(matches!(
            detector.detect(&frame).await,
            Err(ChewError::DetectorNotReady)
        ));
        assert!(matches!(
            detector.load("  ").await,
            Err(ChewError::DetectorInit(_))
        ));

        detector.load("./weights").await.unwrap();
        assert_eq!(detector.weights_base(), Some("./weights"));
        assert_eq!(detector.detect(&frame).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_camera_selection() {
        let backend = ReplayBackend::new(vec![], CounterSink::new)
            .with_cameras(vec!["front".to_string()]);

        assert!(backend.acquire(Some("front")).await.is_ok());
        assert!(backend.acquire(None).await.is_ok());
        assert!(matches!(
            backend.acquire(Some("rear")).await,
            Err(ChewError::CaptureUnavailable(_))
        ));
        assert_eq!(backend.open_captures(), 2);
    }
}
