#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Tachometer and motor drive engine (hardware-agnostic).
//!
//! Converts quadrature encoder edges and a periodic reference clock into
//! position, rotation, lap time, cycle time and speed, and commands a PWM
//! motor driver once per clock tick. Hardware is reached only through
//! `rotor_traits::MotorDriver`; edges arrive as `rotor_traits::Edge` values.
//!
//! ## Architecture
//!
//! - **Encoder**: signed pulse position and measurement boundaries (`encoder`)
//! - **Lap window**: timing of the last measurement window (`lap`)
//! - **Speed**: revolutions per minute with a deadband (`speed`)
//! - **Set-points**: discrete operator values to register values (`set_point`)
//! - **Cycle**: per-edge state machine (`cycle::TachoCore`)
//! - **Concurrency**: one lock over all state (`controller::Tacho`), one
//!   consumer thread fed by interrupt producers (`dispatch`)
//! - **Publication**: old/new change notifications (`publish`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Every reported quantity is a [`Fixed`] decimal with an explicit number of
//! fractional digits, rounded HALF_UP. See `fixed_point` and `ScaleCfg`.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod cycle;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod fixed_point;
pub mod hw_error;
pub mod lap;
pub mod mocks;
pub mod publish;
pub mod ring;
pub mod set_point;
pub mod snapshot;
pub mod speed;

pub use builder::{BoxedDriver, Missing, Set, TachoBuilder, build_core};
pub use config::{DisplayMode, EncoderCfg, ScaleCfg, SetPointCfg};
pub use controller::Tacho;
pub use cycle::{Phase, SetPointChange, TachoCore};
pub use dispatch::{Dispatcher, EdgeSender};
pub use error::{BuildError, CoreError, Report, Result};
pub use fixed_point::{Fixed, ParseFixedError};
pub use publish::{Change, Observer, Publisher, SubscriptionId, Topic};
pub use set_point::SetPointTable;
pub use snapshot::Snapshot;

pub use rotor_traits::{Edge, EdgeSink, MotorDriver};
