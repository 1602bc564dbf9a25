//! Crash reports and run context.
//!
//! Workers record the phase, file and type they are on; the panic hook
//! prints that context when something goes wrong.
//!
//! ```ignore
//! use cwefix::observability::{set_current_file, set_phase, FixPhase};
//!
//! let _phase = set_phase(FixPhase::Parsing);
//! for file in files {
//!     let _file = set_current_file(&file);
//!     parse(&read(&file)?)?;
//! }
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_processed, set_current_file, set_current_type,
    set_phase, set_phase_persistent, set_progress, ContextGuard, FixContext, FixPhase,
};
pub use panic_hook::install_panic_hook;
