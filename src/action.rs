//! Action sinks
//!
//! A sink receives one decision per decided cycle and performs the visible
//! side effect: scrolling the host page, or counting and rendering.

use crate::config::{ActionConfig, ActionKind};
use crate::landmarks::NoseMouthMeasurement;
use crate::types::{Action, ChewingDecision, Face, Point, ScrollBehavior, ScrollRequest};
use serde::{Deserialize, Serialize};

/// Label rendered while chewing is detected
pub const CHEWING_LABEL: &str = "Chewing";

/// Consumer of chewing decisions
pub trait ActionSink: Send + 'static {
    /// Called once per cycle that produced a decision
    fn on_decision(&mut self, decision: &ChewingDecision) -> Action;

    /// Called on cycles skipped for lack of a face
    fn on_missed_face(&mut self) {}

    /// Called with the detection result of every cycle, for overlay drawing
    fn on_detection(&mut self, _faces: &[Face], _measurement: Option<&NoseMouthMeasurement>) {}
}

/// Host page that can be scrolled
pub trait PageScroller: Send + 'static {
    fn scroll_by(&mut self, request: ScrollRequest);
}

impl<F> PageScroller for F
where
    F: FnMut(ScrollRequest) + Send + 'static,
{
    fn scroll_by(&mut self, request: ScrollRequest) {
        self(request)
    }
}

/// Scrolls the host page by a fixed step on every chewing cycle
pub struct ScrollSink<S: PageScroller> {
    scroller: S,
    step_px: i32,
}

impl<S: PageScroller> ScrollSink<S> {
    pub fn new(scroller: S, step_px: i32) -> Self {
        Self { scroller, step_px }
    }
}

impl<S: PageScroller> ActionSink for ScrollSink<S> {
    fn on_decision(&mut self, decision: &ChewingDecision) -> Action {
        if !decision.is_chewing {
            return Action::None;
        }
        let request = ScrollRequest {
            top: self.step_px,
            behavior: ScrollBehavior::Smooth,
        };
        self.scroller.scroll_by(request);
        Action::Scrolled { request }
    }
}

/// Render model for the on-screen overlay
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Overlay {
    /// Landmarks of all detected faces
    pub landmarks: Vec<Vec<Point>>,
    /// Nose-to-mouth line, when a face was measured
    pub nose_mouth_line: Option<(Point, Point)>,
    /// Counter text, always present
    pub count_text: String,
    /// "Chewing" while active
    pub label: Option<String>,
}

/// Counts chewing cycles and keeps an overlay for rendering
#[derive(Debug, Clone, Default)]
pub struct CounterSink {
    count: u64,
    now_chewing: bool,
    overlay: Overlay,
}

impl CounterSink {
    pub fn new() -> Self {
        let mut sink = Self::default();
        sink.refresh_text();
        sink
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_chewing(&self) -> bool {
        self.now_chewing
    }

    /// Overlay as of the latest cycle
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    fn refresh_text(&mut self) {
        self.overlay.count_text = format!("Count:{}", self.count);
        self.overlay.label = self.now_chewing.then(|| CHEWING_LABEL.to_string());
    }
}

impl ActionSink for CounterSink {
    fn on_decision(&mut self, decision: &ChewingDecision) -> Action {
        self.now_chewing = decision.is_chewing;
        let action = if decision.is_chewing {
            self.count += 1;
            Action::Counted { count: self.count }
        } else {
            Action::None
        };
        self.refresh_text();
        action
    }

    fn on_detection(&mut self, faces: &[Face], measurement: Option<&NoseMouthMeasurement>) {
        self.overlay.landmarks = faces.iter().map(|f| f.landmarks.clone()).collect();
        self.overlay.nose_mouth_line = measurement.map(|m| (m.nose, m.mouth));
    }
}

/// Sink selected at runtime from configuration
pub enum ConfiguredSink {
    Scroll(ScrollSink<Box<dyn FnMut(ScrollRequest) + Send>>),
    Counter(CounterSink),
}

impl ConfiguredSink {
    /// Build the sink named by `config`; `scroller` is used for the scroll action
    pub fn from_config(
        config: &ActionConfig,
        scroller: Box<dyn FnMut(ScrollRequest) + Send>,
    ) -> Self {
        match config.kind {
            ActionKind::Scroll => Self::Scroll(ScrollSink::new(scroller, config.scroll_step_px)),
            ActionKind::Counter => Self::Counter(CounterSink::new()),
        }
    }
}

impl ActionSink for ConfiguredSink {
    fn on_decision(&mut self, decision: &ChewingDecision) -> Action {
        match self {
            Self::Scroll(sink) => sink.on_decision(decision),
            Self::Counter(sink) => sink.on_decision(decision),
        }
    }

    fn on_missed_face(&mut self) {
        match self {
            Self::Scroll(sink) => sink.on_missed_face(),
            Self::Counter(sink) => sink.on_missed_face(),
        }
    }

    fn on_detection(&mut self, faces: &[Face], measurement: Option<&NoseMouthMeasurement>) {
        match self {
            Self::Scroll(sink) => sink.on_detection(faces, measurement),
            Self::Counter(sink) => sink.on_detection(faces, measurement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn chewing(flag: bool) -> ChewingDecision {
        ChewingDecision {
            average: Some(10.0),
            change_rate: Some(if flag { 2.0 } else { 0.0 }),
            is_chewing: flag,
        }
    }

    #[test]
    fn test_scroll_sink_scrolls_only_when_chewing() {
        let scrolled = Arc::new(Mutex::new(Vec::new()));
        let log = scrolled.clone();
        let mut sink = ScrollSink::new(
            move |request: ScrollRequest| log.lock().unwrap().push(request),
            50,
        );

        assert_eq!(sink.on_decision(&chewing(false)), Action::None);
        let action = sink.on_decision(&chewing(true));

        let expected = ScrollRequest {
            top: 50,
            behavior: ScrollBehavior::Smooth,
        };
        assert_eq!(action, Action::Scrolled { request: expected });
        assert_eq!(*scrolled.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn test_counter_sink_counts_chewing_cycles() {
        let mut sink = CounterSink::new();
        assert_eq!(sink.overlay().count_text, "Count:0");

        assert!(!sink.is_chewing());

        sink.on_decision(&chewing(true));
        sink.on_decision(&chewing(true));
        assert_eq!(sink.count(), 2);
        assert!(sink.is_chewing());
        assert_eq!(sink.overlay().label.as_deref(), Some(CHEWING_LABEL));

        let action = sink.on_decision(&chewing(false));
        assert_eq!(action, Action::None);
        assert!(!sink.is_chewing());
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.overlay().count_text, "Count:2");
        assert_eq!(sink.overlay().label, None);
    }

    #[test]
    fn test_counter_overlay_tracks_detection() {
        let mut sink = CounterSink::new();
        let measurement = NoseMouthMeasurement {
            nose: Point::new(1.0, 1.0),
            mouth: Point::new(1.0, 5.0),
            distance: 4.0,
        };
        let face = Face::new(vec![measurement.nose, measurement.mouth]);

        sink.on_detection(&[face], Some(&measurement));
        assert_eq!(sink.overlay().landmarks.len(), 1);
        assert_eq!(
            sink.overlay().nose_mouth_line,
            Some((Point::new(1.0, 1.0), Point::new(1.0, 5.0)))
        );

        sink.on_detection(&[], None);
        assert!(sink.overlay().landmarks.is_empty());
        assert_eq!(sink.overlay().nose_mouth_line, None);
    }

    #[test]
    fn test_configured_sink_uses_step() {
        let config = ActionConfig {
            kind: ActionKind::Scroll,
            scroll_step_px: 120,
        };
        let mut sink = ConfiguredSink::from_config(&config, Box::new(|_| {}));
        match sink.on_decision(&chewing(true)) {
            Action::Scrolled { request } => assert_eq!(request.top, 120),
            other => panic!("expected scroll, got {other:?}"),
        }
    }
}
