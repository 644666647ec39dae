//! Snapshot observers: console printer and CSV recorder.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use eyre::{Result, WrapErr};
use rotor_core::{Change, Snapshot};
use serde_json::{Value, json};

pub const CSV_HEADER: [&str; 6] = [
    "counter",
    "position",
    "rotation",
    "lap_time",
    "speed",
    "cycle_time",
];

/// Decimals are emitted as strings so their scale survives.
pub fn snapshot_json(s: &Snapshot) -> Value {
    json!({
        "counter": s.counter,
        "position": s.position,
        "rotation": s.rotation.to_string(),
        "lap_time": s.lap_time.to_string(),
        "speed": s.speed.to_string(),
        "cycle_time": s.cycle_time.to_string(),
    })
}

/// Render a change as one stdout line.
pub fn render(change: &Change, json: bool) -> String {
    match (change, json) {
        (Change::Snapshot { new, .. }, false) => new.to_string(),
        (Change::Snapshot { new, .. }, true) => {
            let mut v = snapshot_json(new);
            v["event"] = json!("snapshot");
            v.to_string()
        }
        (Change::SetPoint { old, new }, false) => format!("set-point {old} -> {new}"),
        (Change::SetPoint { old, new }, true) => json!({
            "event": "set_point",
            "old": old.to_string(),
            "new": new.to_string(),
        })
        .to_string(),
    }
}

/// Observer printing every change to stdout.
pub fn console_observer(json: bool) -> impl Fn(&Change) + Send + Sync + 'static {
    move |change: &Change| {
        let mut out = std::io::stdout().lock();
        // A closed pipe must not take the loop down.
        let _ = writeln!(out, "{}", render(change, json));
    }
}

/// Appends one CSV row per snapshot.
pub struct CsvRecorder {
    writer: Mutex<csv::Writer<File>>,
}

impl core::fmt::Debug for CsvRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CsvRecorder").finish_non_exhaustive()
    }
}

impl CsvRecorder {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)
            .wrap_err_with(|| format!("create snapshot record {}", path.display()))?;
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    pub fn record(&self, s: &Snapshot) {
        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let row = [
            s.counter.to_string(),
            s.position.to_string(),
            s.rotation.to_string(),
            s.lap_time.to_string(),
            s.speed.to_string(),
            s.cycle_time.to_string(),
        ];
        if let Err(e) = w.write_record(&row) {
            tracing::warn!(error = %e, counter = s.counter, "snapshot record write failed");
            return;
        }
        if let Err(e) = w.flush() {
            tracing::warn!(error = %e, counter = s.counter, "snapshot record flush failed");
        }
    }

    pub fn flush(&self) -> Result<()> {
        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        w.flush()?;
        Ok(())
    }
}
