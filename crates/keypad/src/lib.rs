//! GPIO Button Input for the Microscope Appliance
//!
//! Six front-panel buttons wired active-low with pull-ups. Each line gets a
//! debounce filter and an async edge interrupt; qualifying edges are
//! classified into discrete appliance actions (momentary capture, momentary
//! eject, long-press power) and posted as clear-on-read flags for the main
//! loop.

pub mod classifier;
pub mod flags;
mod gpio;

pub use classifier::{KeyClassifier, PressTracker};
pub use flags::PendingActions;
pub use gpio::Keypad;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Keypad error types
#[derive(Debug, Error)]
pub enum KeypadError {
    /// The GPIO subsystem could not be initialized or a line claimed
    #[error("GPIO subsystem unavailable: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Logical front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    Up,
    Down,
    Left,
    Right,
    Menu,
    Power,
}

impl LogicalKey {
    /// Every key, in wiring order
    pub const ALL: [LogicalKey; 6] = [
        LogicalKey::Up,
        LogicalKey::Down,
        LogicalKey::Left,
        LogicalKey::Right,
        LogicalKey::Menu,
        LogicalKey::Power,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            LogicalKey::Up => 0,
            LogicalKey::Down => 1,
            LogicalKey::Left => 2,
            LogicalKey::Right => 3,
            LogicalKey::Menu => 4,
            LogicalKey::Power => 5,
        }
    }
}

/// Signal transition on a line. With pull-up wiring the falling edge is the
/// press and the rising edge is the release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// A single qualifying edge as delivered by the GPIO subsystem.
///
/// Built per delivery and consumed immediately by the classifier; never
/// stored. `at` is the delivery tick (time since boot).
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub key: LogicalKey,
    pub edge: Edge,
    pub at: Duration,
}

/// Keypad configuration: BCM pin assignment and timing knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypadConfig {
    /// BCM pin for the Up key
    pub up: u8,
    /// BCM pin for the Down key (media eject)
    pub down: u8,
    /// BCM pin for the Left key
    pub left: u8,
    /// BCM pin for the Right key
    pub right: u8,
    /// BCM pin for the Menu key (still capture)
    pub menu: u8,
    /// BCM pin for the Power key
    pub power: u8,
    /// Edge debounce window (microseconds)
    pub debounce_us: u64,
    /// Hold duration that turns a power press into a shutdown request (ms)
    pub power_hold_ms: u64,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            up: 15,
            down: 4,
            left: 17,
            right: 2,
            menu: 14,
            power: 18,
            debounce_us: 100,
            power_hold_ms: 2000,
        }
    }
}

impl KeypadConfig {
    /// Pin assigned to `key` (BCM numbering)
    pub fn pin(&self, key: LogicalKey) -> u8 {
        match key {
            LogicalKey::Up => self.up,
            LogicalKey::Down => self.down,
            LogicalKey::Left => self.left,
            LogicalKey::Right => self.right,
            LogicalKey::Menu => self.menu,
            LogicalKey::Power => self.power,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_micros(self.debounce_us)
    }

    pub fn power_hold(&self) -> Duration {
        Duration::from_millis(self.power_hold_ms)
    }
}
