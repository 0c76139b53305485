//! chewsense - Heuristic chewing detection from facial-landmark distances
//!
//! A webcam session measures the distance between the nose tip and the mouth
//! center on every frame, smooths it with a trailing moving average, and flags
//! chewing whenever the average changes faster than a threshold:
//! capture → landmark detection → distance extraction → smoothing → action.
//!
//! ## Modules
//!
//! - **Engine**: the moving-average change-rate detector, usable on its own
//! - **Session**: the serialized capture cycle and its collaborators
//! - **Controller**: the `startVideo` / `stopVideo` command surface

pub mod action;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod landmarks;
pub mod logging;
pub mod provider;
pub mod replay;
pub mod scheduler;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::ChewConfig;
pub use controller::{Command, SessionController};
pub use engine::ChewingDetector;
pub use error::ChewError;
pub use landmarks::SignalExtractor;
pub use provider::{CaptureSource, FaceDetector, SessionBackend};
pub use session::ChewSession;
pub use types::{ChewingDecision, Face, Point};

/// Library version
pub const CHEW_VERSION: &str = env!("CARGO_PKG_VERSION");
