//! TI DRV8830 low-voltage motor driver on I2C.
//!
//! Two registers: CONTROL holds the output voltage (VSET, bits 7:2) and the
//! H-bridge state (IN2/IN1, bits 1:0); FAULT holds latched fault flags, cleared
//! by writing the CLEAR bit.

use rotor_traits::{DriverError, MotorDriver};

use crate::error::Result;

pub const REG_CONTROL: u8 = 0x00;
pub const REG_FAULT: u8 = 0x01;

/// Lowest VSET the chip accepts (0.48 V); smaller codes are reserved.
pub const VSET_MIN: u8 = 0x06;
/// Highest VSET (5.06 V).
pub const VSET_MAX: u8 = 0x3F;

pub const FAULT_CLEAR: u8 = 0x80;
pub const FAULT_MASK: u8 = 0x1F;

const FAULT_FLAGS: [(u8, &str); 5] = [
    (0x01, "fault"),
    (0x02, "overcurrent"),
    (0x04, "undervoltage lockout"),
    (0x08, "overtemperature"),
    (0x10, "current limit"),
];

/// H-bridge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bridge {
    Coast = 0b00,
    Reverse = 0b01,
    Forward = 0b10,
    Brake = 0b11,
}

/// Human-readable list of the flags set in a fault register value.
pub fn describe_fault(code: u8) -> String {
    let flags: Vec<&str> = FAULT_FLAGS
        .iter()
        .filter(|(bit, _)| code & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if flags.is_empty() {
        format!("unknown fault {code:#04x}")
    } else {
        flags.join(", ")
    }
}

/// CONTROL register value for a signed set-point in `[-full_scale, full_scale]`.
///
/// Zero coasts. Other magnitudes scale linearly onto VSET, rounding half up,
/// and never fall below [`VSET_MIN`].
pub fn control_byte(set_point: i32, full_scale: u8) -> u8 {
    if set_point == 0 || full_scale == 0 {
        return Bridge::Coast as u8;
    }
    let full = u32::from(full_scale);
    let m = set_point.unsigned_abs().min(full);
    let vset = (m * u32::from(VSET_MAX) * 2 + full) / (full * 2);
    let vset = u8::try_from(vset).unwrap_or(VSET_MAX).clamp(VSET_MIN, VSET_MAX);
    let bridge = if set_point > 0 {
        Bridge::Forward
    } else {
        Bridge::Reverse
    };
    (vset << 2) | bridge as u8
}

/// Byte-wide register access; implemented by the Linux I2C bus and by tests.
pub trait RegisterBus {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;
    fn read_register(&mut self, reg: u8) -> Result<u8>;
}

pub struct Drv8830<B: RegisterBus> {
    bus: B,
    full_scale: u8,
    last_control: Option<u8>,
}

impl<B: RegisterBus> core::fmt::Debug for Drv8830<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Drv8830")
            .field("full_scale", &self.full_scale)
            .field("last_control", &self.last_control)
            .finish()
    }
}

impl<B: RegisterBus> Drv8830<B> {
    /// `full_scale` is the set-point magnitude that maps to the highest VSET.
    pub fn new(bus: B, full_scale: u8) -> Self {
        Self {
            bus,
            full_scale,
            last_control: None,
        }
    }

    fn write_control(&mut self, value: u8) -> Result<()> {
        self.bus.write_register(REG_CONTROL, value)?;
        self.last_control = Some(value);
        Ok(())
    }

    /// Latched fault flags, without clearing them.
    pub fn read_fault(&mut self) -> Result<u8> {
        Ok(self.bus.read_register(REG_FAULT)? & FAULT_MASK)
    }

    pub fn clear_fault(&mut self) -> Result<()> {
        self.bus.write_register(REG_FAULT, FAULT_CLEAR)
    }

    /// Last CONTROL value written.
    pub fn last_control(&self) -> Option<u8> {
        self.last_control
    }
}

impl<B: RegisterBus> MotorDriver for Drv8830<B> {
    fn drive(&mut self, set_point: i32) -> std::result::Result<(), DriverError> {
        let value = control_byte(set_point, self.full_scale);
        tracing::trace!(set_point, control = value, "drv8830 control");
        Ok(self.write_control(value)?)
    }

    /// Reads and then clears the latched flags, so each fault is reported once.
    fn fault(&mut self) -> std::result::Result<u8, DriverError> {
        let code = self.read_fault()?;
        if code != 0 {
            self.clear_fault()?;
        }
        Ok(code)
    }

    fn brake(&mut self) -> std::result::Result<(), DriverError> {
        Ok(self.write_control(Bridge::Brake as u8)?)
    }

    fn fault_reason(&self, code: u8) -> String {
        describe_fault(code)
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod linux {
    use rppal::i2c::I2c;

    use super::{Drv8830, RegisterBus};
    use crate::error::Result;

    impl RegisterBus for I2c {
        fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
            Ok(self.smbus_write_byte(reg, value)?)
        }
        fn read_register(&mut self, reg: u8) -> Result<u8> {
            Ok(self.smbus_read_byte(reg)?)
        }
    }

    impl Drv8830<I2c> {
        /// Open the chip at `address` on `/dev/i2c-<bus>`.
        pub fn open(bus: u8, address: u16, full_scale: u8) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus)?;
            i2c.set_slave_address(address)?;
            tracing::info!(bus, address, "drv8830 opened");
            Ok(Self::new(i2c, full_scale))
        }
    }
}
