//! Core types for the chewsense pipeline
//!
//! This module defines the data that flows through each stage of a detection
//! cycle: landmark geometry from the detector, the per-frame distance sample,
//! the smoothed chewing decision, and the per-cycle report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 2D landmark coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single detected face with its landmark points (68-point scheme)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Face {
    pub landmarks: Vec<Point>,
}

impl Face {
    pub fn new(landmarks: Vec<Point>) -> Self {
        Self { landmarks }
    }

    /// Landmark at `index`, if the detector returned that many points
    pub fn landmark(&self, index: usize) -> Option<Point> {
        self.landmarks.get(index).copied()
    }

    /// Rescale landmarks from capture resolution to display resolution
    pub fn resized(&self, from: Dimensions, to: Dimensions) -> Face {
        if from.width == 0 || from.height == 0 {
            return self.clone();
        }
        let sx = to.width as f64 / from.width as f64;
        let sy = to.height as f64 / from.height as f64;
        Face {
            landmarks: self
                .landmarks
                .iter()
                .map(|p| Point::new(p.x * sx, p.y * sy))
                .collect(),
        }
    }
}

/// Output of the smoothing and decision engine for one ingested sample.
///
/// `average` is `None` until the window has filled; `change_rate` is `None`
/// until two averages exist. `is_chewing` is false whenever either is missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChewingDecision {
    pub average: Option<f64>,
    pub change_rate: Option<f64>,
    pub is_chewing: bool,
}

/// Page scroll behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Smooth,
}

/// A scroll-by request for the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRequest {
    /// Vertical offset in CSS pixels
    pub top: i32,
    pub behavior: ScrollBehavior,
}

/// Side effect performed by an action sink for one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    None,
    Scrolled { request: ScrollRequest },
    Counted { count: u64 },
}

/// What happened in one scheduled cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A face was found and a sample was ingested
    Decided {
        distance: f64,
        decision: ChewingDecision,
        action: Action,
    },
    /// No usable face this cycle; history untouched
    NoFace,
    /// The detector failed on this frame; history untouched
    DetectionFailed { error: String },
}

/// Report emitted to observers once per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub session_id: String,
    pub cycle: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: CycleOutcome,
}

/// Counters accumulated over the lifetime of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Cycles that ran to completion (any outcome)
    pub cycles: u64,
    /// Cycles that produced a decision
    pub decisions: u64,
    /// Cycles skipped because no face was present
    pub missed_faces: u64,
    /// Cycles skipped because the detector returned an error
    pub detector_errors: u64,
    /// Decided cycles where chewing was detected
    pub chewing_cycles: u64,
    /// Timer ticks dropped because a cycle overran its slot
    pub skipped_ticks: u64,
}

/// Why a session stopped running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stop signal received (possibly mid-cycle)
    Requested,
    /// The capture source ran out of frames
    EndOfStream,
    /// Capture or detector failure ended the session
    Failed,
}

/// Final summary of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub reason: StopReason,
    pub error: Option<String>,
    pub stats: SessionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_face_resize() {
        let face = Face::new(vec![Point::new(100.0, 50.0), Point::new(640.0, 480.0)]);
        let resized = face.resized(Dimensions::new(640, 480), Dimensions::new(320, 240));

        assert_eq!(resized.landmarks[0], Point::new(50.0, 25.0));
        assert_eq!(resized.landmarks[1], Point::new(320.0, 240.0));
    }

    #[test]
    fn test_face_resize_zero_source() {
        let face = Face::new(vec![Point::new(1.0, 2.0)]);
        let resized = face.resized(Dimensions::new(0, 0), Dimensions::new(320, 240));
        assert_eq!(resized, face);
    }

    #[test]
    fn test_cycle_report_serialization() {
        let report = CycleReport {
            session_id: "s".to_string(),
            cycle: 3,
            at: Utc::now(),
            outcome: CycleOutcome::Decided {
                distance: 12.5,
                decision: ChewingDecision {
                    average: Some(12.0),
                    change_rate: Some(0.5),
                    is_chewing: true,
                },
                action: Action::Counted { count: 1 },
            },
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"], "decided");
        assert_eq!(value["decision"]["is_chewing"], true);
        assert_eq!(value["action"]["kind"], "counted");
        assert_eq!(value["action"]["count"], 1);
    }

    #[test]
    fn test_scroll_request_shape() {
        let request = ScrollRequest {
            top: 50,
            behavior: ScrollBehavior::Smooth,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"top":50,"behavior":"smooth"}"#);
    }
}
