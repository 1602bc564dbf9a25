// Test utilities shared by the cwefix integration tests
#![allow(dead_code)]

use cwefix::rules::{BuiltinRuleLoader, RuleLoader};
use cwefix::{RuleTable, TransformOutcome, Transformer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn builtin_rules() -> RuleTable {
    BuiltinRuleLoader
        .load_rules()
        .and_then(RuleTable::new)
        .expect("built-in rules load")
}

pub fn transformer() -> Transformer {
    Transformer::new(Arc::new(builtin_rules()))
}

pub fn transform(source: &str) -> TransformOutcome {
    transformer()
        .transform_source(source)
        .expect("source parses and transforms")
}

/// Printed result of one transformation.
pub fn fix(source: &str) -> String {
    transform(source).unit.print()
}

pub fn write_java(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create source dir");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}
