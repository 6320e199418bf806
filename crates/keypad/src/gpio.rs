//! Hardware wiring: pull-up inputs, debounce filter, async edge delivery

use crate::classifier::KeyClassifier;
use crate::{Edge, KeyEvent, KeypadConfig, KeypadError, LogicalKey};
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the configured input lines.
///
/// Dropping this detaches every interrupt handler, so keep it alive for the
/// lifetime of the event loop.
pub struct Keypad {
    pins: Vec<InputPin>,
}

impl Keypad {
    /// Claim all six lines and route their debounced edges into `classifier`.
    ///
    /// Fails if the GPIO subsystem is unavailable or a line cannot be
    /// claimed; the appliance cannot run without its buttons.
    pub fn attach(
        config: &KeypadConfig,
        classifier: Arc<KeyClassifier>,
    ) -> Result<Self, KeypadError> {
        let gpio = Gpio::new()?;
        let debounce = config.debounce();
        let mut pins = Vec::with_capacity(LogicalKey::ALL.len());

        for key in LogicalKey::ALL {
            let mut pin = gpio.get(config.pin(key))?.into_input_pullup();
            let sink = Arc::clone(&classifier);
            pin.set_async_interrupt(Trigger::Both, Some(debounce), move |event: Event| {
                let edge = match event.trigger {
                    Trigger::RisingEdge => Edge::Rising,
                    Trigger::FallingEdge => Edge::Falling,
                    _ => return,
                };
                sink.observe(KeyEvent {
                    key,
                    edge,
                    at: event.timestamp,
                });
            })?;
            debug!("attached {:?} to BCM pin {}", key, config.pin(key));
            pins.push(pin);
        }

        info!("keypad attached ({} lines, pull-up, active low)", pins.len());
        Ok(Self { pins })
    }

    /// Number of claimed lines
    pub fn line_count(&self) -> usize {
        self.pins.len()
    }
}
