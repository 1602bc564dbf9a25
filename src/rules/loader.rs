//! Rule loading: the embedded table plus rule files named in the config.

use super::{Rule, RuleTable};
use crate::config::RulesConfig;
use crate::errors::{Error, Result, ResultExt};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_RULES: &str = include_str!("default_rules.toml");

/// On-disk shape of a rule file.
#[derive(Debug, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

static BUILTIN_RULES: Lazy<std::result::Result<Vec<Rule>, String>> = Lazy::new(|| {
    toml::from_str::<RulesFile>(DEFAULT_RULES)
        .map(|file| file.rules)
        .map_err(|e| e.to_string())
});

/// Source of rules.
pub trait RuleLoader: Send + Sync {
    fn load_rules(&self) -> Result<Vec<Rule>>;
}

/// Rules compiled into the binary.
pub struct BuiltinRuleLoader;

impl RuleLoader for BuiltinRuleLoader {
    fn load_rules(&self) -> Result<Vec<Rule>> {
        let rules = BUILTIN_RULES
            .as_ref()
            .map_err(|e| Error::RuleTable(format!("built-in rules: {}", e)))?
            .clone();
        debug!(rule_count = rules.len(), "Loaded built-in rules from embedded TOML");
        Ok(rules)
    }
}

/// Rules from a TOML file.
pub struct FileRuleLoader {
    file_path: PathBuf,
}

impl FileRuleLoader {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }
}

impl RuleLoader for FileRuleLoader {
    fn load_rules(&self) -> Result<Vec<Rule>> {
        let content = std::fs::read_to_string(&self.file_path)
            .map_err(|e| Error::file_system("Cannot read rule file", &self.file_path, e))?;
        let file: RulesFile = toml::from_str(&content)
            .map_err(Error::from)
            .context(format!("parsing {}", self.file_path.display()))?;
        debug!(
            file = %self.file_path.display(),
            rule_count = file.rules.len(),
            "Loaded rules from file"
        );
        Ok(file.rules)
    }
}

/// Built-in rules, then each configured rule file, minus disabled ids.
///
/// A rule file that redefines a built-in id replaces it.
pub fn load_rule_table(config: &RulesConfig) -> Result<RuleTable> {
    let mut loaders: Vec<Box<dyn RuleLoader>> = vec![Box::new(BuiltinRuleLoader)];
    loaders.extend(
        config
            .rule_files
            .iter()
            .map(|p| Box::new(FileRuleLoader::new(p)) as Box<dyn RuleLoader>),
    );

    let mut rules: Vec<Rule> = Vec::new();
    for loader in &loaders {
        for rule in loader.load_rules()? {
            match rules.iter_mut().find(|r| r.id == rule.id) {
                Some(existing) => {
                    debug!(rule_id = %rule.id, "Rule file overrides built-in rule");
                    *existing = rule;
                }
                None => rules.push(rule),
            }
        }
    }

    for id in &config.disabled {
        if !rules.iter().any(|r| &r.id == id) {
            warn!(rule_id = %id, "Disabled rule does not exist");
        }
    }
    rules.retain(|r| !config.disabled.contains(&r.id));

    let table = RuleTable::new(rules)?;
    debug!(rule_count = table.len(), "Rule table ready");
    Ok(table)
}
