//! Interrupt-driven edge source on Raspberry Pi GPIO.
//!
//! Rising edges on the reference clock line and on the primary encoder line
//! become `Edge` values pushed into an `EdgeSink`. The secondary encoder line
//! is read synchronously inside the primary callback.

use std::sync::Arc;

use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use rotor_traits::{Edge, EdgeSink};

use crate::error::Result;

/// BCM pin numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePins {
    pub clock: u8,
    pub primary: u8,
    pub secondary: u8,
}

/// Owns the pins; interrupts stay armed until it is dropped.
pub struct GpioEdgeSource {
    clock: InputPin,
    primary: InputPin,
}

impl core::fmt::Debug for GpioEdgeSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpioEdgeSource")
            .field("clock", &self.clock.pin())
            .field("primary", &self.primary.pin())
            .finish()
    }
}

impl GpioEdgeSource {
    pub fn start(pins: EdgePins, sink: Arc<dyn EdgeSink>) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut clock = gpio.get(pins.clock)?.into_input_pulldown();
        let mut primary = gpio.get(pins.primary)?.into_input_pulldown();
        let secondary = gpio.get(pins.secondary)?.into_input_pulldown();

        let clock_sink = Arc::clone(&sink);
        clock.set_async_interrupt(Trigger::RisingEdge, move |_: Level| {
            clock_sink.emit(Edge::Clock);
        })?;

        primary.set_async_interrupt(Trigger::RisingEdge, move |_: Level| {
            let level = secondary.read();
            sink.emit(Edge::primary(Some(level == Level::High)));
        })?;

        tracing::info!(
            clock = pins.clock,
            primary = pins.primary,
            secondary = pins.secondary,
            "gpio edge interrupts armed"
        );
        Ok(Self { clock, primary })
    }

    /// Disarm both interrupts.
    pub fn stop(&mut self) -> Result<()> {
        self.clock.clear_async_interrupt()?;
        self.primary.clear_async_interrupt()?;
        Ok(())
    }
}

impl Drop for GpioEdgeSource {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "failed to disarm gpio interrupts");
        }
    }
}
