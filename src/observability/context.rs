//! Thread-local context tracking for crash reports.
//!
//! Each rayon worker records the phase and file it is working on; the
//! panic hook reads it back. Progress is global and atomic.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static FILES_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FILES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<FixContext> = const { RefCell::new(FixContext::new()) };
}

/// What the current thread was doing.
#[derive(Debug, Clone, Default)]
pub struct FixContext {
    pub phase: Option<FixPhase>,
    pub current_file: Option<PathBuf>,
    /// Type declaration being rewritten, if any.
    pub current_type: Option<String>,
}

impl FixContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_file: None,
            current_type: None,
        }
    }
}

/// Stages of a fix run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixPhase {
    /// Walking the source roots
    Discovery,
    /// Building the classpath type index
    Indexing,
    Parsing,
    /// Finding insecure call sites
    Scanning,
    /// Deciding which members each host needs
    Planning,
    Rewriting,
    /// Writing rewritten units back to disk
    Writing,
    Reporting,
}

impl std::fmt::Display for FixPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Indexing => write!(f, "indexing"),
            Self::Parsing => write!(f, "parsing"),
            Self::Scanning => write!(f, "scanning"),
            Self::Planning => write!(f, "planning"),
            Self::Rewriting => write!(f, "rewriting"),
            Self::Writing => write!(f, "writing"),
            Self::Reporting => write!(f, "reporting"),
        }
    }
}

/// Restores the previous context when dropped.
pub struct ContextGuard {
    previous: FixContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut FixContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

/// Set the current phase until the guard drops.
///
/// ```ignore
/// let _phase = set_phase(FixPhase::Parsing);
/// ```
#[must_use]
pub fn set_phase(phase: FixPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

/// Set the current phase with no guard; it stays until changed.
pub fn set_phase_persistent(phase: FixPhase) {
    CURRENT_CONTEXT.with(|ctx| {
        ctx.borrow_mut().phase = Some(phase);
    });
}

#[must_use]
pub fn set_current_file(path: impl Into<PathBuf>) -> ContextGuard {
    let path = path.into();
    update(|ctx| ctx.current_file = Some(path))
}

#[must_use]
pub fn set_current_type(name: impl Into<String>) -> ContextGuard {
    let name = name.into();
    update(|ctx| ctx.current_type = Some(name))
}

pub fn set_progress(processed: usize, total: usize) {
    FILES_PROCESSED.store(processed, Ordering::Relaxed);
    FILES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FILES_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> FixContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// (processed, total)
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FILES_PROCESSED.load(Ordering::Relaxed),
        FILES_TOTAL.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_restore_previous_context() {
        let _phase = set_phase(FixPhase::Scanning);
        {
            let _file = set_current_file("src/A.java");
            let _ty = set_current_type("A");
            let ctx = get_current_context();
            assert_eq!(ctx.phase, Some(FixPhase::Scanning));
            assert_eq!(ctx.current_file, Some(PathBuf::from("src/A.java")));
            assert_eq!(ctx.current_type.as_deref(), Some("A"));
        }
        let ctx = get_current_context();
        assert_eq!(ctx.phase, Some(FixPhase::Scanning));
        assert!(ctx.current_file.is_none());
        assert!(ctx.current_type.is_none());
    }

    #[test]
    fn test_context_is_per_thread() {
        let _phase = set_phase(FixPhase::Rewriting);
        std::thread::spawn(|| {
            assert!(get_current_context().phase.is_none());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(FixPhase::Discovery.to_string(), "discovery");
        assert_eq!(FixPhase::Writing.to_string(), "writing");
    }
}
