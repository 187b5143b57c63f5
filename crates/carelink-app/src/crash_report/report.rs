use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::sanitize::sanitize_secrets;

/// `<data dir>/carelink/crash-reports`.
pub fn crash_report_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("carelink").join("crash-reports"))
}

/// Write a sanitized crash report for a panic.
///
/// Runs inside the panic hook and must not panic; failures yield `None`.
pub fn write_crash_report(info: &PanicHookInfo) -> Option<PathBuf> {
    let location = info
        .location()
        .map(|loc| json!({ "file": loc.file(), "line": loc.line(), "column": loc.column() }));
    let report = build_report(
        &panic_message(info.payload()),
        location,
        &Backtrace::force_capture().to_string(),
    );
    save_report(&crash_report_dir()?, &report)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Message and backtrace pass through [`sanitize_secrets`]: panics raised
/// while handling config can carry API keys.
fn build_report(message: &str, location: Option<Value>, backtrace: &str) -> Value {
    json!({
        "app": "carelink",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "panic_message": sanitize_secrets(message),
        "location": location,
        "backtrace": sanitize_secrets(backtrace),
    })
}

/// `crash_<utc timestamp>.json` in `dir`, owner-readable only on Unix.
fn save_report(dir: &Path, report: &Value) -> Option<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("crash_{stamp}.json"));

    std::fs::create_dir_all(dir).ok()?;
    std::fs::write(&path, serde_json::to_string_pretty(report).ok()?).ok()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
    }
    Some(path)
}
