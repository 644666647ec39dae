#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod console;
mod error_fmt;
mod run;
mod sinks;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use rotor_core::error::CoreError;
use rotor_core::{SetPointCfg, SetPointTable};
use serde_json::json;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOpts;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json && let Err(e) = color_eyre::install() {
        eprintln!("failed to install error report hook: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: &Path) -> Result<rotor_config::Config> {
    let config_error = |msg: String| eyre::Report::new(CoreError::Config(msg));
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg = rotor_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate().map_err(|e| config_error(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(json: bool, cli_level: Option<&str>, logging: &rotor_config::Logging) {
    // --log-level beats RUST_LOG, which beats [logging] level.
    let filter = cli_level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .or_else(|| {
            logging
                .level
                .as_deref()
                .and_then(|l| EnvFilter::try_new(l).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "rotor.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            set_point,
            ticks,
            record,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let shutdown = Arc::clone(&shutdown);
                ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))?;
            }
            let opts = RunOpts {
                set_point,
                ticks,
                record,
                json: cli.json,
            };
            let summary = run::run(&cfg, &opts, &shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "event": "stopped",
                        "ticks": summary.ticks,
                        "last": sinks::snapshot_json(&summary.last),
                    })
                );
            } else {
                println!("stopped after {} ticks; last {}", summary.ticks, summary.last);
            }
        }
        Commands::SetPoints => {
            let table = SetPointTable::build(&SetPointCfg::from(&cfg.set_point))?;
            if cli.json {
                let rows: Vec<_> = table
                    .iter()
                    .map(|(display, register)| {
                        json!({ "display": display.to_string(), "register": register })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(rows));
            } else {
                for (display, register) in table.iter() {
                    println!("{display} -> {register}");
                }
            }
        }
        Commands::SelfCheck => {
            let (label, fault) = run::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    json!({ "status": "ok", "driver": label, "fault": fault })
                );
            } else {
                println!("self-check ok: {label}, fault register {fault:#04x}");
            }
        }
    }
    Ok(())
}
