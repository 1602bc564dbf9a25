//! Tree-aware remediation of insecure random generation (CWE-338) in Java
//! sources.
//!
//! A unit is parsed into a lossless syntax tree, calls to weak random
//! utilities are matched against a declarative rule table, the enclosing
//! type receives a `SecureRandom`-backed helper, and the calls are rewritten
//! to use it. Everything the rules do not touch is printed back verbatim.

pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod io;
pub mod matcher;
pub mod observability;
pub mod orchestrator;
pub mod progress;
pub mod resolve;
pub mod rewriter;
pub mod rules;
pub mod runner;
pub mod synthesis;
pub mod syntax;

pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
pub use crate::errors::{Error, ErrorCode, Result};
pub use crate::matcher::{find_matches, MatchResult, Matcher};
pub use crate::orchestrator::{TransformOutcome, TransformState, Transformer, TypeRewrites};
pub use crate::rules::{load_rule_table, Rule, RuleTable};
pub use crate::runner::{FileReport, RunReport, Runner};
pub use crate::syntax::{parse, CompilationUnit};
