//! Test and helper drivers for rotor_core

use std::sync::{Arc, Mutex, PoisonError};

use rotor_traits::{DriverError, MotorDriver};

/// A driver that accepts every command and never reports a fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDriver;

impl MotorDriver for NullDriver {
    fn drive(&mut self, _set_point: i32) -> Result<(), DriverError> {
        Ok(())
    }
    fn fault(&mut self) -> Result<u8, DriverError> {
        Ok(0)
    }
    fn brake(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Drive(i32),
    Fault,
    Brake,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<DriverCall>,
    fault_code: u8,
    failing: bool,
}

/// Records every call; clones share the log, so a test can keep one clone
/// while the engine owns another.
#[derive(Debug, Default, Clone)]
pub struct RecordingDriver {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Most recent drive command, if any.
    pub fn last_drive(&self) -> Option<i32> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            DriverCall::Drive(v) => Some(*v),
            _ => None,
        })
    }

    pub fn brake_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Brake))
            .count()
    }

    /// Code returned by subsequent fault reads.
    pub fn set_fault(&self, code: u8) {
        self.lock().fault_code = code;
    }

    /// Make every subsequent call fail with an I/O error (still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn record(&self, call: DriverCall) -> Result<(), DriverError> {
        let mut s = self.lock();
        s.calls.push(call);
        if s.failing {
            Err(Box::new(std::io::Error::other("i2c write failed")))
        } else {
            Ok(())
        }
    }
}

impl MotorDriver for RecordingDriver {
    fn drive(&mut self, set_point: i32) -> Result<(), DriverError> {
        self.record(DriverCall::Drive(set_point))
    }
    fn fault(&mut self) -> Result<u8, DriverError> {
        self.record(DriverCall::Fault)?;
        Ok(self.lock().fault_code)
    }
    fn brake(&mut self) -> Result<(), DriverError> {
        self.record(DriverCall::Brake)
    }
    fn fault_reason(&self, code: u8) -> String {
        format!("recorded fault {code:#04x}")
    }
}
