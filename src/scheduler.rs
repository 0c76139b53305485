//! Cycle pacing
//!
//! A session asks the ticker for the next slot only after its previous cycle
//! has fully completed, so cycles never overlap. When a cycle overruns its
//! slot, the ticks it covered are dropped rather than queued up.

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Pacing of a session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Fixed-rate timer
    Every(Duration),
    /// Run cycles back to back (replays and tests)
    Unpaced,
}

/// A scheduled slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Zero-based index of this slot among those actually run
    pub index: u64,
    /// Slots dropped between the previous slot and this one because a cycle overran
    pub skipped: u64,
}

/// Produces serialized cycle slots
pub struct CycleTicker {
    inner: TickerKind,
    next_index: u64,
}

enum TickerKind {
    Timed {
        interval: Interval,
        period: Duration,
        last: Option<Instant>,
    },
    Unpaced,
}

impl CycleTicker {
    pub fn new(pacing: Pacing) -> Self {
        let inner = match pacing {
            Pacing::Every(period) => {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                TickerKind::Timed {
                    interval,
                    period,
                    last: None,
                }
            }
            Pacing::Unpaced => TickerKind::Unpaced,
        };
        Self {
            inner,
            next_index: 0,
        }
    }

    /// Fixed-rate ticker with the given period in milliseconds
    pub fn every_ms(period_ms: u64) -> Self {
        Self::new(Pacing::Every(Duration::from_millis(period_ms)))
    }

    /// Wait for the next slot
    pub async fn tick(&mut self) -> Tick {
        let skipped = match &mut self.inner {
            TickerKind::Timed {
                interval,
                period,
                last,
            } => {
                interval.tick().await;
                // A late tick resolves at once with its missed deadline, so the
                // gap is measured between resolution times.
                let resolved = Instant::now();
                let skipped = match last {
                    Some(previous) => {
                        let gap = resolved.saturating_duration_since(*previous);
                        let slots = gap.as_nanos() / period.as_nanos().max(1);
                        (slots as u64).saturating_sub(1)
                    }
                    None => 0,
                };
                *last = Some(resolved);
                skipped
            }
            TickerKind::Unpaced => {
                tokio::task::yield_now().await;
                0
            }
        };

        let tick = Tick {
            index: self.next_index,
            skipped,
        };
        self.next_index += 1;
        tick
    }
}
