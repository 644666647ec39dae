pub mod drv8830;
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use rotor_traits::{DriverError, MotorDriver};

use crate::error::HwError;

#[derive(Debug, Default)]
struct SimState {
    commanded: AtomicI32,
    fault: AtomicU8,
    braked: AtomicBool,
    failing: AtomicBool,
}

/// Shared view of a `SimulatedDriver`, for the simulated rig and for tests.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    state: Arc<SimState>,
}

impl SimHandle {
    /// Set-point the motor is currently running at; zero while braked.
    pub fn commanded(&self) -> i32 {
        self.state.commanded.load(Ordering::Relaxed)
    }

    pub fn is_braked(&self) -> bool {
        self.state.braked.load(Ordering::Relaxed)
    }

    /// Latch a fault; reported by the next fault read and then cleared.
    pub fn inject_fault(&self, code: u8) {
        self.state.fault.store(code, Ordering::Relaxed);
    }

    /// Make subsequent driver calls fail like a dead bus.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::Relaxed);
    }
}

/// Simulated motor driver implementation
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    handle: SimHandle,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    fn check_bus(&self) -> Result<(), HwError> {
        if self.handle.state.failing.load(Ordering::Relaxed) {
            Err(HwError::I2c("simulated bus failure".into()))
        } else {
            Ok(())
        }
    }
}

impl MotorDriver for SimulatedDriver {
    fn drive(&mut self, set_point: i32) -> Result<(), DriverError> {
        self.check_bus()?;
        let state = &self.handle.state;
        state.braked.store(false, Ordering::Relaxed);
        state.commanded.store(set_point, Ordering::Relaxed);
        Ok(())
    }
    fn fault(&mut self) -> Result<u8, DriverError> {
        self.check_bus()?;
        Ok(self.handle.state.fault.swap(0, Ordering::Relaxed))
    }
    fn brake(&mut self) -> Result<(), DriverError> {
        self.check_bus()?;
        let state = &self.handle.state;
        state.commanded.store(0, Ordering::Relaxed);
        state.braked.store(true, Ordering::Relaxed);
        Ok(())
    }
    fn fault_reason(&self, code: u8) -> String {
        drv8830::describe_fault(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_driver() {
        let mut driver = SimulatedDriver::new();
        let handle = driver.handle();
        driver.drive(-7).unwrap();
        assert_eq!(handle.commanded(), -7);
        driver.brake().unwrap();
        assert_eq!(handle.commanded(), 0);
        assert!(handle.is_braked());
    }

    #[test]
    fn injected_fault_is_reported_once() {
        let mut driver = SimulatedDriver::new();
        driver.handle().inject_fault(0x08);
        assert_eq!(driver.fault().unwrap(), 0x08);
        assert_eq!(driver.fault().unwrap(), 0);
        assert_eq!(driver.fault_reason(0x08), "overtemperature");
    }

    #[test]
    fn failing_bus_reports_i2c_error() {
        let mut driver = SimulatedDriver::new();
        driver.handle().set_failing(true);
        let err = driver.drive(1).unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
    }
}
