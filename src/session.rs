//! Capture session
//!
//! A session owns everything one camera run needs: the capture stream, the
//! loaded detector, the extractor, the smoothing engine and the action sink.
//! Each cycle runs capture → detect → extract → ingest → act. Cycles are
//! serialized by the ticker, and the capture stream is released on every exit
//! path of `run`, including a stop that arrives while detection is in flight
//! and a collaborator that panics mid-cycle.

use crate::action::ActionSink;
use crate::engine::ChewingDetector;
use crate::error::ChewError;
use crate::landmarks::SignalExtractor;
use crate::provider::{CaptureSource, FaceDetector};
use crate::scheduler::CycleTicker;
use crate::types::{
    CycleOutcome, CycleReport, Dimensions, Face, SessionStats, SessionSummary, StopReason,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// One capture session and the state it owns
pub struct ChewSession<C, D, A>
where
    C: CaptureSource,
    D: FaceDetector<C::Frame>,
    A: ActionSink,
{
    id: Uuid,
    started_at: DateTime<Utc>,
    capture: C,
    detector: D,
    extractor: SignalExtractor,
    engine: ChewingDetector,
    sink: A,
    display: Option<Dimensions>,
    stats: SessionStats,
    observer: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl<C, D, A> ChewSession<C, D, A>
where
    C: CaptureSource,
    D: FaceDetector<C::Frame>,
    A: ActionSink,
{
    /// Assemble a session from a ready engine and collaborators
    pub fn new(engine: ChewingDetector, capture: C, detector: D, sink: A) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            capture,
            detector,
            extractor: SignalExtractor::default(),
            engine,
            sink,
            display: None,
            stats: SessionStats::default(),
            observer: None,
        }
    }

    pub fn with_extractor(mut self, extractor: SignalExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Map landmarks to this display size before measuring
    pub fn with_display(mut self, display: Option<Dimensions>) -> Self {
        self.display = display;
        self
    }

    /// Send a report for every completed cycle to `observer`
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn engine(&self) -> &ChewingDetector {
        &self.engine
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    /// Run one cycle. Returns `Ok(None)` when the capture stream has ended.
    pub async fn run_cycle(&mut self) -> Result<Option<CycleOutcome>, ChewError> {
        if !self.detector.is_ready() {
            return Err(ChewError::DetectorNotReady);
        }

        // Stage 1: Capture
        let frame = match self.capture.next_frame().await? {
            Some(frame) => frame,
            None => return Ok(None),
        };

        // Stage 2: Detect
        let faces = match self.detector.detect(&frame).await {
            Ok(faces) => self.to_display(faces),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Detection failed, skipping cycle");
                self.stats.cycles += 1;
                self.stats.detector_errors += 1;
                let outcome = CycleOutcome::DetectionFailed {
                    error: e.to_string(),
                };
                self.report(&outcome);
                return Ok(Some(outcome));
            }
        };

        // Stage 3: Extract
        let measurement = self.extractor.measure(&faces);
        self.sink.on_detection(&faces, measurement.as_ref());
        self.stats.cycles += 1;

        let outcome = match measurement {
            None => {
                tracing::debug!(session = %self.id, faces = faces.len(), "No face, skipping cycle");
                self.stats.missed_faces += 1;
                self.sink.on_missed_face();
                CycleOutcome::NoFace
            }
            Some(measurement) => {
                // Stage 4: Ingest
                let decision = self.engine.ingest(measurement.distance);
                self.stats.decisions += 1;
                if decision.is_chewing {
                    self.stats.chewing_cycles += 1;
                }
                tracing::trace!(
                    session = %self.id,
                    distance = measurement.distance,
                    average = ?decision.average,
                    change_rate = ?decision.change_rate,
                    chewing = decision.is_chewing,
                    "Decision"
                );

                // Stage 5: Act
                let action = self.sink.on_decision(&decision);
                CycleOutcome::Decided {
                    distance: measurement.distance,
                    decision,
                    action,
                }
            }
        };

        self.report(&outcome);
        Ok(Some(outcome))
    }

    /// Drive cycles until stopped, the stream ends, or capture fails.
    ///
    /// The capture source is released before this returns, whatever the reason.
    /// A panic in a collaborator ends the session as `Failed`.
    pub async fn run(
        &mut self,
        mut ticker: CycleTicker,
        mut stop: watch::Receiver<bool>,
    ) -> SessionSummary {
        tracing::info!(session = %self.id, "Session running");

        let outcome = AssertUnwindSafe(self.drive(&mut ticker, &mut stop))
            .catch_unwind()
            .await;
        let (reason, error) = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = format!("session panicked: {}", panic_message(panic.as_ref()));
                tracing::error!(session = %self.id, error = %message, "Session failed");
                (StopReason::Failed, Some(message))
            }
        };

        self.capture.release().await;

        let summary = SessionSummary {
            session_id: self.id.to_string(),
            started_at: self.started_at,
            stopped_at: Utc::now(),
            reason,
            error,
            stats: self.stats.clone(),
        };
        tracing::info!(
            session = %self.id,
            reason = ?summary.reason,
            cycles = summary.stats.cycles,
            chewing_cycles = summary.stats.chewing_cycles,
            "Session stopped"
        );
        summary
    }

    async fn drive(
        &mut self,
        ticker: &mut CycleTicker,
        stop: &mut watch::Receiver<bool>,
    ) -> (StopReason, Option<String>) {
        loop {
            let tick = tokio::select! {
                biased;
                _ = stop_requested(stop) => return (StopReason::Requested, None),
                tick = ticker.tick() => tick,
            };
            self.stats.skipped_ticks += tick.skipped;

            let result = tokio::select! {
                biased;
                _ = stop_requested(stop) => return (StopReason::Requested, None),
                result = self.run_cycle() => result,
            };

            match result {
                Ok(Some(_)) => {}
                Ok(None) => return (StopReason::EndOfStream, None),
                Err(e) => {
                    tracing::error!(session = %self.id, error = %e, "Session failed");
                    return (StopReason::Failed, Some(e.to_string()));
                }
            }
        }
    }

    fn to_display(&self, faces: Vec<Face>) -> Vec<Face> {
        match (self.capture.dimensions(), self.display) {
            (Some(from), Some(to)) if from != to => {
                faces.iter().map(|f| f.resized(from, to)).collect()
            }
            _ => faces,
        }
    }

    fn report(&self, outcome: &CycleOutcome) {
        if let Some(observer) = &self.observer {
            let report = CycleReport {
                session_id: self.id.to_string(),
                cycle: self.stats.cycles,
                at: Utc::now(),
                outcome: outcome.clone(),
            };
            // Observer gone is not an error for the session
            let _ = observer.send(report);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Resolves once a stop is signalled or the sender is dropped
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}
