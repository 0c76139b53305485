//! Landmark signal extraction
//!
//! Pulls the nose tip and mouth center out of the first detected face and
//! turns them into a single distance sample. Frames without a usable face
//! yield `None`; the caller skips the cycle.

use crate::config::LandmarkConfig;
use crate::types::{Face, Point};
use serde::{Deserialize, Serialize};

/// Number of points in the landmark scheme
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Nose tip (bottom of the nose) in the 68-point scheme
pub const NOSE_TIP: usize = 33;

/// Upper lip center in the 68-point scheme
pub const MOUTH_CENTER: usize = 51;

/// Chin center in the 68-point scheme
pub const CHIN: usize = 8;

/// The two measured points and their distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoseMouthMeasurement {
    pub nose: Point,
    pub mouth: Point,
    pub distance: f64,
}

/// Extracts the nose-to-mouth distance from detection results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalExtractor {
    nose_tip: usize,
    mouth_center: usize,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(NOSE_TIP, MOUTH_CENTER)
    }
}

impl SignalExtractor {
    pub fn new(nose_tip: usize, mouth_center: usize) -> Self {
        Self {
            nose_tip,
            mouth_center,
        }
    }

    pub fn from_config(config: &LandmarkConfig) -> Self {
        Self::new(config.nose_tip, config.mouth_center)
    }

    /// Measure the first face; `None` when no face (or too few landmarks) is present
    pub fn measure(&self, faces: &[Face]) -> Option<NoseMouthMeasurement> {
        // At most one tracked face: the first detection wins
        let face = faces.first()?;
        let nose = face.landmark(self.nose_tip)?;
        let mouth = face.landmark(self.mouth_center)?;

        Some(NoseMouthMeasurement {
            nose,
            mouth,
            distance: nose.distance_to(&mouth),
        })
    }

    /// Distance sample for this frame, if a face is present
    pub fn extract(&self, faces: &[Face]) -> Option<f64> {
        self.measure(faces).map(|m| m.distance)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a 68-point face with the nose and mouth at the given positions
    pub(crate) fn face_with(nose: Point, mouth: Point) -> Face {
        let mut landmarks = vec![Point::default(); NUM_FACIAL_LANDMARKS];
        landmarks[NOSE_TIP] = nose;
        landmarks[MOUTH_CENTER] = mouth;
        Face::new(landmarks)
    }

    /// Build a face whose nose-to-mouth distance is exactly `distance`
    pub(crate) fn face_at_distance(distance: f64) -> Face {
        face_with(Point::new(100.0, 100.0), Point::new(100.0, 100.0 + distance))
    }

    #[test]
    fn test_extract_distance() {
        let face = face_with(Point::new(10.0, 10.0), Point::new(13.0, 14.0));
        let extractor = SignalExtractor::default();

        let distance = extractor.extract(&[face]).unwrap();
        assert!((distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_face_yields_none() {
        let extractor = SignalExtractor::default();
        assert_eq!(extractor.extract(&[]), None);
    }

    #[test]
    fn test_short_landmark_list_yields_none() {
        let face = Face::new(vec![Point::default(); 40]);
        let extractor = SignalExtractor::default();
        assert_eq!(extractor.extract(&[face]), None);
    }

    #[test]
    fn test_only_first_face_is_used() {
        let first = face_at_distance(20.0);
        let second = face_at_distance(80.0);
        let extractor = SignalExtractor::default();

        assert_eq!(extractor.extract(&[first, second]), Some(20.0));
    }

    #[test]
    fn test_custom_mouth_landmark() {
        let mut face = face_at_distance(10.0);
        face.landmarks[CHIN] = Point::new(100.0, 160.0);
        let extractor = SignalExtractor::new(NOSE_TIP, CHIN);

        let measurement = extractor.measure(&[face]).unwrap();
        assert_eq!(measurement.mouth, Point::new(100.0, 160.0));
        assert_eq!(measurement.distance, 60.0);
    }
}
