//! Maps `Box<dyn Error>` from the driver trait boundary to typed `CoreError`.
//!
//! `rotor_traits::MotorDriver` returns `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `rotor_hardware::HwError` downcasting.

use crate::error::CoreError;

/// Map a trait-boundary error to a typed `CoreError`.
///
/// Known hardware error types are downcast first, then anything else is
/// classified by its message.
pub fn map_driver_error(e: &(dyn std::error::Error + 'static)) -> CoreError {
    #[cfg(feature = "hardware-errors")]
    {
        use rotor_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::I2c(_) | HwError::Io(_) => CoreError::DriverIo(hw.to_string()),
                HwError::Gpio(_) => CoreError::Hardware(hw.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return CoreError::DriverIo(io.to_string());
    }
    let s = e.to_string();
    if s.to_lowercase().contains("i2c") {
        CoreError::DriverIo(s)
    } else {
        CoreError::Hardware(s)
    }
}
