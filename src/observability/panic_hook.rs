//! Crash report printed when a worker panics.
//!
//! The report is plain `key: value` lines so it can be pasted into an issue
//! as is. It names the file and type being fixed so the input can be reduced.

use super::context::{get_current_context, get_progress, FixContext, FixPhase};
use std::fmt::Write as _;
use std::panic::PanicHookInfo;

/// Replace the default panic hook. Call once, early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let report = crash_report(
            &panic_message(info),
            location.as_deref(),
            &get_current_context(),
            get_progress(),
        );
        eprint!("{}", report);
        if std::env::var_os("RUST_BACKTRACE").is_some() {
            eprintln!("{}", std::backtrace::Backtrace::capture());
        }
    }));
}

fn crash_report(
    message: &str,
    location: Option<&str>,
    context: &FixContext,
    (processed, total): (usize, usize),
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\ncwefix {} panicked: {}", env!("CARGO_PKG_VERSION"), message);
    if let Some(location) = location {
        let _ = writeln!(out, "  at: {}", location);
    }
    match context.phase {
        Some(phase) => {
            let _ = writeln!(out, "  phase: {}", phase);
        }
        None => {
            let _ = writeln!(out, "  phase: startup");
        }
    }
    if let Some(file) = &context.current_file {
        let _ = writeln!(out, "  file: {}", file.display());
    }
    if let Some(ty) = &context.current_type {
        let _ = writeln!(out, "  type: {}", ty);
    }
    if total > 0 {
        let _ = writeln!(out, "  files done: {}/{}", processed, total);
    }
    if context.phase == Some(FixPhase::Writing) {
        // writes go through a temp file and a rename
        let _ = writeln!(out, "  the file being written is either untouched or complete");
    }
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        let _ = writeln!(out, "  set RUST_BACKTRACE=1 for a backtrace");
    }
    out
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
