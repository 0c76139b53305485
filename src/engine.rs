//! Smoothing and decision engine
//!
//! Converts the per-frame nose-to-mouth distance into a chewing decision:
//! a trailing moving average over the last `window_size` samples, the absolute
//! change of that average between consecutive samples, and a threshold on the
//! change. Only the last `window_size` raw samples and the last two averages
//! are retained, so memory stays constant over arbitrarily long sessions.

use crate::error::ChewError;
use crate::types::ChewingDecision;
use std::collections::VecDeque;

/// Number of moving averages needed to compute a change rate
const AVERAGES_RETAINED: usize = 2;

/// Moving-average change-rate chewing detector
#[derive(Debug, Clone)]
pub struct ChewingDetector {
    window_size: usize,
    threshold: f64,
    /// Most recent raw distances (at most `window_size`)
    raw_window: VecDeque<f64>,
    /// Most recent moving averages (at most 2)
    averages: VecDeque<f64>,
    samples_seen: u64,
    averages_seen: u64,
}

impl ChewingDetector {
    /// Create a detector with the given window size and change-rate threshold.
    ///
    /// The window must hold at least one sample and the threshold must be a
    /// finite, non-negative number.
    pub fn new(window_size: usize, threshold: f64) -> Result<Self, ChewError> {
        if window_size == 0 {
            return Err(ChewError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ChewError::InvalidConfig(format!(
                "threshold must be a finite non-negative number, got {threshold}"
            )));
        }

        Ok(Self {
            window_size,
            threshold,
            raw_window: VecDeque::with_capacity(window_size),
            averages: VecDeque::with_capacity(AVERAGES_RETAINED),
            samples_seen: 0,
            averages_seen: 0,
        })
    }

    /// Ingest one distance sample and return the decision for this cycle
    pub fn ingest(&mut self, distance: f64) -> ChewingDecision {
        self.raw_window.push_back(distance);
        while self.raw_window.len() > self.window_size {
            self.raw_window.pop_front();
        }
        self.samples_seen += 1;

        // Warm-up: not enough samples for a full window yet
        if self.raw_window.len() < self.window_size {
            return ChewingDecision::default();
        }

        let average = self.raw_window.iter().sum::<f64>() / self.window_size as f64;
        self.averages.push_back(average);
        while self.averages.len() > AVERAGES_RETAINED {
            self.averages.pop_front();
        }
        self.averages_seen += 1;

        let change_rate = match (self.averages.front(), self.averages.back()) {
            (Some(previous), Some(latest)) if self.averages.len() == AVERAGES_RETAINED => {
                (latest - previous).abs()
            }
            _ => {
                return ChewingDecision {
                    average: Some(average),
                    change_rate: None,
                    is_chewing: false,
                }
            }
        };

        ChewingDecision {
            average: Some(average),
            change_rate: Some(change_rate),
            is_chewing: change_rate >= self.threshold,
        }
    }

    /// Drop all history, returning to the warm-up state
    pub fn reset(&mut self) {
        self.raw_window.clear();
        self.averages.clear();
        self.samples_seen = 0;
        self.averages_seen = 0;
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Total number of raw samples ingested since creation or the last reset
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Total number of moving averages produced since creation or the last reset
    pub fn averages_seen(&self) -> u64 {
        self.averages_seen
    }

    /// Number of raw samples currently retained
    pub fn retained_samples(&self) -> usize {
        self.raw_window.len()
    }

    /// Most recent moving average, if the window has filled
    pub fn latest_average(&self) -> Option<f64> {
        self.averages.back().copied()
    }
}
