//! Human-readable error descriptions and structured JSON error formatting.

use rotor_core::error::{BuildError, CoreError};

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_DEVICE: i32 = 3;
pub const EXIT_CONFIG: i32 = 4;

/// Map an `eyre::Report` to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDriver => {
                "What happened: No motor driver was provided to the measurement loop.\nLikely causes: The driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the driver is created successfully and passed via with_driver(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Inconsistent [encoder] or [scales] values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/rotor.toml for a sample."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Config(msg) => format!(
                "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: Wrong --config path, missing [pins], or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            CoreError::Hardware(msg) | CoreError::DriverIo(msg) => format!(
                "What happened: The motor driver or edge inputs could not be initialized ({msg}).\nLikely causes: I2C disabled, wrong bus or address, wiring/power issues, or missing GPIO permissions.\nHow to fix: Check [driver] and [pins] in the config, run `i2cdetect -y <bus>`, and verify the process may access /dev/i2c-* and /dev/gpiomem."
            ),
            CoreError::DriverFault { code, reason } => format!(
                "What happened: The motor driver reports fault {code:#04x} ({reason}).\nLikely causes: Stalled or shorted motor, supply below lockout, or an overheated chip.\nHow to fix: Power down, inspect the motor and supply, then rerun self-check."
            ),
            CoreError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: config problems 4, device initialization 3, anything else 1.
/// Usage errors exit with 2 from clap before any of this runs.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Config(_)) => EXIT_CONFIG,
        Some(CoreError::Hardware(_) | CoreError::DriverIo(_)) => EXIT_DEVICE,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Config(_)) => "InvalidConfig",
        Some(CoreError::Hardware(_) | CoreError::DriverIo(_)) => "DeviceInit",
        Some(CoreError::DriverFault { .. }) => "DriverFault",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    if let Some(CoreError::DriverFault { code, reason }) = err.downcast_ref::<CoreError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "code": code, "fault": reason },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": msg }).to_string()
}
