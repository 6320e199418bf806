//! Edge classification: long power-hold vs. momentary presses

use crate::flags::PendingActions;
use crate::{Edge, KeyEvent, LogicalKey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Slot value meaning "no press in flight"
const IDLE: u64 = u64::MAX;

/// Per-key press-start records.
///
/// One atomic slot per logical key, written on the active (falling) edge and
/// taken on release. Lock-free so it is safe to touch from the GPIO delivery
/// thread while other keys deliver concurrently.
#[derive(Debug)]
pub struct PressTracker {
    pressed_at: [AtomicU64; LogicalKey::ALL.len()],
}

impl Default for PressTracker {
    fn default() -> Self {
        Self {
            pressed_at: std::array::from_fn(|_| AtomicU64::new(IDLE)),
        }
    }
}

impl PressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the active edge for `key` at tick `at`.
    pub fn press(&self, key: LogicalKey, at: Duration) {
        self.pressed_at[key.index()].store(at.as_micros() as u64, Ordering::Release);
    }

    /// Close out a press, returning how long the key was held.
    ///
    /// Returns `None` when no press was in flight (a release delivered
    /// without its press, e.g. the key was already down at startup) or when
    /// the ticks ran backwards.
    pub fn release(&self, key: LogicalKey, at: Duration) -> Option<Duration> {
        let started = self.pressed_at[key.index()].swap(IDLE, Ordering::AcqRel);
        if started == IDLE {
            return None;
        }
        (at.as_micros() as u64)
            .checked_sub(started)
            .map(Duration::from_micros)
    }
}

/// Turns qualifying edges into pending appliance actions.
///
/// Runs on the GPIO delivery thread, concurrently with the main loop and
/// with deliveries for other keys; everything it touches is atomic, and it
/// never blocks.
#[derive(Debug)]
pub struct KeyClassifier {
    actions: Arc<PendingActions>,
    presses: PressTracker,
    power_hold: Duration,
}

impl KeyClassifier {
    pub fn new(actions: Arc<PendingActions>, power_hold: Duration) -> Self {
        Self {
            actions,
            presses: PressTracker::new(),
            power_hold,
        }
    }

    /// Classify a single debounced edge.
    pub fn observe(&self, event: KeyEvent) {
        match (event.key, event.edge) {
            (LogicalKey::Power, Edge::Falling) => {
                self.presses.press(LogicalKey::Power, event.at);
            }
            (LogicalKey::Power, Edge::Rising) => {
                if let Some(held) = self.presses.release(LogicalKey::Power, event.at) {
                    if held > self.power_hold {
                        info!("power key held {}ms, requesting shutdown", held.as_millis());
                        self.actions.request_shutdown();
                    } else {
                        debug!("power key released after {}ms, ignoring", held.as_millis());
                    }
                }
            }
            (LogicalKey::Menu, Edge::Falling) => {
                info!("menu key pressed, requesting still capture");
                self.actions.request_capture();
            }
            (LogicalKey::Down, Edge::Falling) => {
                info!("down key pressed, requesting media eject");
                self.actions.request_eject();
            }
            // Up/Left/Right are wired but reserved for future navigation.
            _ => trace!("unbound edge: {:?} {:?}", event.key, event.edge),
        }
    }
}
