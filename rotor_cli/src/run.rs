//! Device assembly and the measurement loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use rotor_config::Config;
use rotor_core::error::{CoreError, Result};
use rotor_core::{BoxedDriver, Change, Dispatcher, Fixed, Snapshot, Tacho, Topic};
use rotor_hardware::sim::{RigCfg, SimulatedRig};
use rotor_hardware::{SimHandle, SimulatedDriver};
use rotor_traits::{EdgeSink, MotorDriver};

use crate::console::{self, Command};
use crate::sinks::{CsvRecorder, console_observer};

const POLL: Duration = Duration::from_millis(20);

/// Fault code latched into the simulated driver at startup (tests and demos).
pub const ENV_SIM_FAULT: &str = "ROTOR_SIM_FAULT";
/// Any value makes the simulated driver fail every bus transfer.
pub const ENV_SIM_BUS_FAIL: &str = "ROTOR_SIM_BUS_FAIL";

fn device_init(what: &str, e: impl std::fmt::Display) -> eyre::Report {
    eyre::Report::new(CoreError::Hardware(format!("{what}: {e}")))
}

/// An opened motor driver, plus the simulation handle when there is no real hardware.
pub struct Device {
    pub driver: BoxedDriver,
    pub label: String,
    sim: Option<SimHandle>,
}

impl core::fmt::Debug for Device {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("label", &self.label)
            .field("simulated", &self.sim.is_some())
            .finish()
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn parse_fault_env(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn open_simulated() -> Device {
    let driver = SimulatedDriver::new();
    let handle = driver.handle();
    if let Some(code) = std::env::var(ENV_SIM_FAULT)
        .ok()
        .as_deref()
        .and_then(parse_fault_env)
    {
        handle.inject_fault(code);
    }
    if std::env::var_os(ENV_SIM_BUS_FAIL).is_some() {
        handle.set_failing(true);
    }
    Device {
        driver: Box::new(driver),
        label: "simulated".to_string(),
        sim: Some(handle),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_device(cfg: &Config) -> Result<Device> {
    use rotor_hardware::drv8830::Drv8830;

    let full_scale = u8::try_from(cfg.set_point.magnitude)
        .map_err(|_| CoreError::Config("set_point.magnitude out of range".into()))?;
    let driver = Drv8830::open(cfg.driver.i2c_bus, cfg.driver.address, full_scale)
        .map_err(|e| device_init("open drv8830", e))?;
    Ok(Device {
        driver: Box::new(driver),
        label: format!(
            "drv8830 bus {} address {:#04x}",
            cfg.driver.i2c_bus, cfg.driver.address
        ),
        sim: None,
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_device(_cfg: &Config) -> Result<Device> {
    Ok(open_simulated())
}

/// Read the fault register once. A failed read means the device is unusable.
pub fn read_startup_fault(driver: &mut BoxedDriver) -> Result<u8> {
    let code = driver.fault().map_err(|e| device_init("read fault register", e))?;
    if code == 0 {
        tracing::info!(fault = code, "driver fault register clear");
    } else {
        tracing::info!(fault = code, reason = %driver.fault_reason(code), "driver fault register");
    }
    Ok(code)
}

pub fn build_tacho(cfg: &Config, driver: BoxedDriver) -> Result<Tacho> {
    Tacho::builder()
        .with_driver(driver)
        .with_encoder((&cfg.encoder).into())
        .with_scales((&cfg.scales).into())
        .with_set_points((&cfg.set_point).into())
        .build()
}

/// Keeps edge producers alive; dropping it silences them.
enum EdgeSource {
    Sim(SimulatedRig),
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    Gpio(rotor_hardware::gpio::GpioEdgeSource),
}

impl EdgeSource {
    fn start(cfg: &Config, sim: Option<SimHandle>, sink: Arc<dyn EdgeSink>) -> Result<Self> {
        if let Some(handle) = sim {
            let rig = RigCfg {
                cycle: Duration::from_millis(cfg.simulation.cycle_ms),
                full_speed_pps: cfg.simulation.full_speed_pps,
                full_scale: cfg.set_point.magnitude,
            };
            return Ok(Self::Sim(SimulatedRig::start(rig, handle, sink)));
        }
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        {
            use rotor_hardware::gpio::{EdgePins, GpioEdgeSource};
            let pins = EdgePins {
                clock: cfg.pins.clock,
                primary: cfg.pins.primary,
                secondary: cfg.pins.secondary,
            };
            let source =
                GpioEdgeSource::start(pins, sink).map_err(|e| device_init("arm gpio edges", e))?;
            Ok(Self::Gpio(source))
        }
        #[cfg(not(all(feature = "hardware", target_os = "linux")))]
        {
            let _ = (cfg, sink);
            Err(CoreError::State("no edge source available in this build".into()).into())
        }
    }

    fn stop(self) {
        match self {
            Self::Sim(mut rig) => rig.stop(),
            #[cfg(all(feature = "hardware", target_os = "linux"))]
            Self::Gpio(mut gpio) => {
                if let Err(e) = gpio.stop() {
                    tracing::warn!(error = %e, "failed to disarm gpio interrupts");
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOpts {
    pub set_point: Option<Fixed>,
    pub ticks: Option<u64>,
    pub record: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub ticks: u64,
    pub last: Snapshot,
}

/// Run until `shutdown` is raised, the operator quits, or `opts.ticks` snapshots were published.
pub fn run(cfg: &Config, opts: &RunOpts, shutdown: &Arc<AtomicBool>) -> Result<RunSummary> {
    let mut device = open_device(cfg)?;
    read_startup_fault(&mut device.driver)?;
    tracing::info!(driver = %device.label, "motor driver ready");
    let sim = device.sim.take();
    let tacho = build_tacho(cfg, device.driver)?;

    let seen = Arc::new(AtomicU64::new(0));
    {
        let seen = Arc::clone(&seen);
        tacho.publisher().subscribe_to(Topic::Snapshot, move |_: &Change| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
    }
    tacho.publisher().subscribe(console_observer(opts.json));
    let recorder = match &opts.record {
        Some(path) => {
            let rec = Arc::new(CsvRecorder::create(path)?);
            let sink = Arc::clone(&rec);
            tacho
                .publisher()
                .subscribe_to(Topic::Snapshot, move |c: &Change| {
                    if let Change::Snapshot { new, .. } = c {
                        sink.record(new);
                    }
                });
            tracing::info!(path = %path.display(), "recording snapshots");
            Some(rec)
        }
        None => None,
    };

    if let Some(v) = opts.set_point
        && !tacho.select_set_point(v)
    {
        return Err(CoreError::Config(format!("set-point {v} is not in the table")).into());
    }

    let mut dispatcher = Dispatcher::spawn(tacho.clone());
    let source = EdgeSource::start(cfg, sim, Arc::new(dispatcher.sender()))?;

    let (tx, rx) = crossbeam_channel::unbounded();
    // Blocked on stdin until EOF; never joined.
    let _console = console::spawn_stdin(tx);

    tracing::info!(ticks = ?opts.ticks, "run start");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        if opts.ticks.is_some_and(|n| seen.load(Ordering::SeqCst) >= n) {
            break;
        }
        match rx.recv_timeout(POLL) {
            Ok(Command::SetPoint(v)) => {
                if !tacho.select_set_point(v) {
                    tracing::info!(value = %v, current = %tacho.set_point(), "set-point not in table; keeping current");
                }
            }
            Ok(Command::Stop) => {
                tracing::info!("operator stop");
                tacho.stop();
            }
            Ok(Command::Reset) => {
                tracing::info!("operator reset");
                tacho.reset();
            }
            Ok(Command::Quit) => {
                tracing::info!("operator quit");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Console hit EOF; keep running on the other exit conditions.
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(POLL),
        }
    }

    source.stop();
    dispatcher.shutdown();
    tacho.stop();
    if let Some(rec) = recorder {
        rec.flush()?;
    }

    let summary = RunSummary {
        ticks: seen.load(Ordering::SeqCst),
        last: tacho.publisher().last_snapshot(),
    };
    tracing::info!(ticks = summary.ticks, position = summary.last.position, "run stopped");
    Ok(summary)
}

/// Open the driver and read its fault register.
pub fn self_check(cfg: &Config) -> Result<(String, u8)> {
    let mut device = open_device(cfg)?;
    let code = read_startup_fault(&mut device.driver)?;
    if code != 0 {
        return Err(CoreError::DriverFault {
            code,
            reason: device.driver.fault_reason(code),
        }
        .into());
    }
    Ok((device.label, code))
}
