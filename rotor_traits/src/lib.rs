pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the driver boundary.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Level assumed for the secondary encoder channel when it cannot be read.
pub const MISSING_SECONDARY_LEVEL: bool = true;

/// One hardware-triggered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Leading edge on the primary encoder channel, with the secondary
    /// channel level sampled at the same instant.
    Primary { secondary_high: bool },
    /// Leading edge of the reference clock.
    Clock,
}

impl Edge {
    /// Build a primary edge from an optional secondary reading.
    #[inline]
    pub fn primary(secondary: Option<bool>) -> Self {
        Edge::Primary {
            secondary_high: secondary.unwrap_or(MISSING_SECONDARY_LEVEL),
        }
    }
}

/// Destination for edges produced by interrupt callbacks or simulators.
///
/// Implementations must not block: `emit` is called from interrupt context.
pub trait EdgeSink: Send + Sync {
    fn emit(&self, edge: Edge);
}

/// PWM motor driver chip.
pub trait MotorDriver {
    /// Drive with a signed register value; the sign selects the direction.
    fn drive(&mut self, set_point: i32) -> Result<(), DriverError>;
    /// Read the fault register; 0 means no fault.
    fn fault(&mut self) -> Result<u8, DriverError>;
    /// Short the motor windings.
    fn brake(&mut self) -> Result<(), DriverError>;

    /// Human-readable reason for a nonzero fault code.
    fn fault_reason(&self, code: u8) -> String {
        format!("fault code {code:#04x}")
    }
}

impl<D: MotorDriver + ?Sized> MotorDriver for Box<D> {
    fn drive(&mut self, set_point: i32) -> Result<(), DriverError> {
        (**self).drive(set_point)
    }
    fn fault(&mut self) -> Result<u8, DriverError> {
        (**self).fault()
    }
    fn brake(&mut self) -> Result<(), DriverError> {
        (**self).brake()
    }
    fn fault_reason(&self, code: u8) -> String {
        (**self).fault_reason(code)
    }
}
