//! Progress feedback for fix runs, built on `indicatif`.
//!
//! Bars are drawn on stderr only when it is a terminal and quiet mode is
//! off (`--quiet` or `CWEFIX_QUIET`). Otherwise every bar is hidden and all
//! calls on it are no-ops.
//!
//! ```rust,no_run
//! use cwefix::progress::{ProgressConfig, ProgressManager, TEMPLATE_FILES};
//!
//! let manager = ProgressManager::new(ProgressConfig::from_env(false));
//! let bar = manager.create_bar(42, TEMPLATE_FILES);
//! bar.set_message("Fixing");
//! bar.inc(1);
//! bar.finish_and_clear();
//! ```

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;

pub const TEMPLATE_FILES: &str = "{spinner} {msg} {pos}/{len} files ({percent}%) - {eta}";
pub const TEMPLATE_SPINNER: &str = "{spinner} {msg}";

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    pub quiet_mode: bool,
}

impl ProgressConfig {
    pub fn from_env(quiet: bool) -> Self {
        Self {
            quiet_mode: quiet || std::env::var("CWEFIX_QUIET").is_ok(),
        }
    }

    pub fn should_show_progress(&self) -> bool {
        use std::io::IsTerminal;
        !self.quiet_mode && std::io::stderr().is_terminal()
    }
}

#[derive(Clone)]
pub struct ProgressManager {
    multi: Arc<MultiProgress>,
    config: ProgressConfig,
}

impl ProgressManager {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
            config,
        }
    }

    /// A bar over `len` items, hidden when progress is off.
    pub fn create_bar(&self, len: u64, template: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars(TICK_CHARS);
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(style);
        pb
    }

    pub fn create_spinner(&self, msg: &str) -> ProgressBar {
        if !self.config.should_show_progress() {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::default_spinner()
            .template(TEMPLATE_SPINNER)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Remove all bars before printing the final report.
    pub fn clear(&self) -> std::io::Result<()> {
        self.multi.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_quiet_flag() {
        let config = ProgressConfig::from_env(true);
        assert!(!config.should_show_progress());
    }

    #[test]
    fn test_quiet_manager_hides_bars() {
        let manager = ProgressManager::new(ProgressConfig { quiet_mode: true });
        assert!(manager.create_bar(10, TEMPLATE_FILES).is_hidden());
        assert!(manager.create_spinner("Indexing").is_hidden());
    }
}
