//! Session control
//!
//! The controller is the command surface of the detector. It owns at most one
//! running session and turns `startVideo` / `stopVideo` commands into session
//! starts and stops. Every start builds fresh collaborators and a fresh engine,
//! so nothing carries over between sessions.

use crate::config::ChewConfig;
use crate::engine::ChewingDetector;
use crate::error::ChewError;
use crate::landmarks::SignalExtractor;
use crate::provider::{FaceDetector, SessionBackend};
use crate::scheduler::{CycleTicker, Pacing};
use crate::session::ChewSession;
use crate::types::{CycleReport, SessionSummary};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Commands accepted from the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    StartVideo {
        #[serde(default)]
        camera_id: Option<String>,
    },
    StopVideo,
}

impl Command {
    pub fn from_json(json: &str) -> Result<Self, ChewError> {
        serde_json::from_str(json).map_err(|e| ChewError::ParseError(e.to_string()))
    }
}

struct ActiveSession {
    id: Uuid,
    stop: watch::Sender<bool>,
    task: JoinHandle<SessionSummary>,
}

/// Owns the single active session
pub struct SessionController<B: SessionBackend> {
    backend: B,
    config: ChewConfig,
    pacing: Pacing,
    observer: Option<mpsc::UnboundedSender<CycleReport>>,
    active: Option<ActiveSession>,
    last_summary: Option<SessionSummary>,
}

impl<B: SessionBackend> SessionController<B> {
    pub fn new(backend: B, config: ChewConfig) -> Self {
        let pacing = Pacing::Every(Duration::from_millis(config.capture.interval_ms));
        Self {
            backend,
            config,
            pacing,
            observer: None,
            active: None,
            last_summary: None,
        }
    }

    /// Override the cycle pacing derived from the configuration
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Forward the cycle reports of every session to `observer`
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ChewConfig {
        &self.config
    }

    /// Id of the active session, if any
    pub fn active_session(&self) -> Option<Uuid> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Whether a session is active and still cycling
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|a| !a.task.is_finished())
            .unwrap_or(false)
    }

    /// Summary of the most recently stopped session
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Apply a host command
    pub async fn handle(&mut self, command: Command) -> Result<(), ChewError> {
        match command {
            Command::StartVideo { camera_id } => self.start(camera_id).await.map(|_| ()),
            Command::StopVideo => self.stop().await.map(|_| ()),
        }
    }

    /// Start a new session, stopping any previous one first.
    ///
    /// `camera_id` falls back to the configured camera, then to the default device.
    pub async fn start(&mut self, camera_id: Option<String>) -> Result<Uuid, ChewError> {
        if let Err(e) = self.stop().await {
            tracing::warn!(error = %e, "Previous session ended abnormally");
        }
        self.config.validate()?;

        let engine =
            ChewingDetector::new(self.config.engine.window_size, self.config.engine.threshold)?;

        let mut detector = self.backend.detector();
        detector
            .load(&self.config.model.weights_base)
            .await
            .map_err(|e| match e {
                ChewError::DetectorInit(_) => e,
                other => ChewError::DetectorInit(other.to_string()),
            })?;
        tracing::debug!(weights = %self.config.model.weights_base, "Detector loaded");

        let camera = camera_id.or_else(|| self.config.capture.camera_id.clone());
        let capture = match self.backend.acquire(camera.as_deref()).await {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!(camera = ?camera, error = %e, "Error accessing webcam");
                return Err(match e {
                    ChewError::CaptureUnavailable(_) => e,
                    other => ChewError::CaptureUnavailable(other.to_string()),
                });
            }
        };

        let mut session = ChewSession::new(engine, capture, detector, self.backend.sink())
            .with_extractor(SignalExtractor::from_config(&self.config.landmarks))
            .with_display(self.config.capture.display);
        if let Some(observer) = &self.observer {
            session = session.with_observer(observer.clone());
        }

        let id = session.id();
        let (stop_tx, stop_rx) = watch::channel(false);
        let ticker = CycleTicker::new(self.pacing);
        let task = tokio::spawn(async move { session.run(ticker, stop_rx).await });

        tracing::info!(session = %id, camera = ?camera, "Session started");
        self.active = Some(ActiveSession {
            id,
            stop: stop_tx,
            task,
        });
        Ok(id)
    }

    /// Stop the active session and wait for it to release its camera.
    ///
    /// Returns `Ok(None)` when nothing was running, and `SessionTask` when the
    /// session task could not be joined.
    pub async fn stop(&mut self) -> Result<Option<SessionSummary>, ChewError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        // The task may already have ended on its own
        let _ = active.stop.send(true);

        match active.task.await {
            Ok(summary) => {
                self.last_summary = Some(summary.clone());
                Ok(Some(summary))
            }
            Err(e) => {
                tracing::error!(session = %active.id, error = %e, "Session task did not finish cleanly");
                Err(ChewError::SessionTask(e.to_string()))
            }
        }
    }
}
