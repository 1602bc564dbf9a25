//! Declarative table of insecure call signatures and their remediation.
//!
//! A [`Rule`] names the owner types it covers, the overloads it rewrites and
//! the members a host type needs once any of those overloads is rewritten.
//! Adding a rule to the family means adding a table entry, see
//! `default_rules.toml`.

pub mod loader;

use crate::errors::{Error, Result};
use crate::resolve::split_qualified;
use crate::synthesis::{MemberSignature, MemberSpec};
use crate::syntax::{normalize_source_text, parse_member, Member};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub use loader::{load_rule_table, BuiltinRuleLoader, FileRuleLoader, RuleLoader};

/// Placeholder for the matched owner type in member sources and imports.
pub const OWNER_PLACEHOLDER: &str = "{owner}";

/// Declared kind of a parameter in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "char")]
    Char,
    #[serde(rename = "String")]
    String,
    #[serde(rename = "char[]")]
    CharArray,
    #[serde(rename = "Object")]
    Object,
}

impl ParamKind {
    pub fn java_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::String => "String",
            Self::CharArray => "char[]",
            Self::Object => "Object",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.java_name())
    }
}

/// Which arguments of the matched call the helper invocation keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentMapping {
    /// Helper takes no arguments.
    #[default]
    Discard,
    /// Original argument subtrees at these indices, in this order.
    Positional(Vec<usize>),
}

impl ArgumentMapping {
    pub fn arity(&self) -> usize {
        match self {
            Self::Discard => 0,
            Self::Positional(indices) => indices.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub method: String,
    #[serde(default)]
    pub params: Vec<ParamKind>,
    pub returns: String,
    pub helper: String,
    #[serde(default)]
    pub arguments: ArgumentMapping,
    /// Restricts the signature to some of the rule's owners.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
}

impl Signature {
    pub fn applies_to(&self, owner: &str) -> bool {
        self.owners.is_empty() || self.owners.iter().any(|o| o == owner)
    }

    /// `randomNumeric(int)`
    pub fn describe(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.java_name()).collect();
        format!("{}({})", self.method, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MemberTemplate {
    Field {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        #[serde(rename = "static", default)]
        is_static: bool,
        source: String,
    },
    StaticInitializer {
        /// Fields the initializer reads; it is placed after them.
        #[serde(default)]
        after: Vec<String>,
        source: String,
    },
    Method {
        name: String,
        #[serde(default)]
        params: Vec<String>,
        returns: String,
        #[serde(rename = "static", default)]
        is_static: bool,
        source: String,
    },
}

impl MemberTemplate {
    pub fn source(&self) -> &str {
        match self {
            Self::Field { source, .. }
            | Self::StaticInitializer { source, .. }
            | Self::Method { source, .. } => source,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Field { name, .. } | Self::Method { name, .. } => Some(name),
            Self::StaticInitializer { .. } => None,
        }
    }

    /// Concrete member for a host whose calls resolved to `owner`.
    pub fn instantiate(&self, rule: &str, owner: &str) -> MemberSpec {
        let (_, owner_simple) = split_qualified(owner);
        let source = self.source().replace(OWNER_PLACEHOLDER, owner_simple);
        let (name, signature, after) = match self {
            Self::Field { name, ty, is_static, .. } => (
                name.clone(),
                MemberSignature::Field {
                    ty: normalize_source_text(ty),
                    is_static: *is_static,
                },
                Vec::new(),
            ),
            Self::StaticInitializer { after, .. } => (
                String::new(),
                MemberSignature::Initializer {
                    body: normalize_source_text(&source),
                },
                after.clone(),
            ),
            Self::Method {
                name,
                params,
                returns,
                is_static,
                ..
            } => (
                name.clone(),
                MemberSignature::Method {
                    params: params.iter().map(|p| normalize_source_text(p)).collect(),
                    returns: normalize_source_text(returns),
                    is_static: *is_static,
                },
                Vec::new(),
            ),
        };
        MemberSpec {
            name,
            signature,
            source,
            after,
            rule: rule.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_cwe")]
    pub cwe: String,
    pub owners: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub members: Vec<MemberTemplate>,
}

fn default_cwe() -> String {
    "CWE-338".to_string()
}

impl Rule {
    pub fn owns(&self, owner: &str) -> bool {
        self.owners.iter().any(|o| o == owner)
    }

    /// Signatures of `method` that apply to `owner`.
    pub fn signatures_for(&self, owner: &str, method: &str) -> Vec<&Signature> {
        self.signatures
            .iter()
            .filter(|s| s.method == method && s.applies_to(owner))
            .collect()
    }

    /// Member specs a host needs once this rule rewrote a call on `owner`.
    pub fn member_specs(&self, owner: &str) -> Vec<MemberSpec> {
        self.members
            .iter()
            .map(|m| m.instantiate(&self.id, owner))
            .collect()
    }

    /// Qualified imports for `owner`, placeholder resolved.
    pub fn imports_for(&self, owner: &str) -> Vec<String> {
        self.imports
            .iter()
            .map(|i| i.replace(OWNER_PLACEHOLDER, owner))
            .collect()
    }

    fn helper_template(&self, helper: &str) -> Option<(&[String], &str)> {
        self.members.iter().find_map(|m| match m {
            MemberTemplate::Method {
                name,
                params,
                returns,
                ..
            } if name == helper => Some((params.as_slice(), returns.as_str())),
            _ => None,
        })
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Error::RuleTable(format!("rule `{}`: {}", self.id, msg));

        if self.owners.is_empty() {
            return Err(invalid("no owner types".into()));
        }
        if self.signatures.is_empty() {
            return Err(invalid("no signatures".into()));
        }

        let mut keys = HashSet::new();
        for member in &self.members {
            let key = match member {
                MemberTemplate::StaticInitializer { source, .. } => {
                    format!("initializer:{}", normalize_source_text(source))
                }
                MemberTemplate::Field { name, .. } => format!("field:{}", name),
                MemberTemplate::Method { name, .. } => format!("method:{}", name),
            };
            if !keys.insert(key) {
                return Err(invalid(format!(
                    "member `{}` is declared twice",
                    member.name().unwrap_or("static initializer")
                )));
            }
        }

        for sig in &self.signatures {
            if let Some(foreign) = sig.owners.iter().find(|o| !self.owns(o)) {
                return Err(invalid(format!(
                    "signature {} restricted to `{}`, which is not an owner of the rule",
                    sig.describe(),
                    foreign
                )));
            }
            let (params, returns) = self.helper_template(&sig.helper).ok_or_else(|| {
                invalid(format!(
                    "helper `{}` of {} has no method template",
                    sig.helper,
                    sig.describe()
                ))
            })?;
            if normalize_source_text(returns) != normalize_source_text(&sig.returns) {
                return Err(invalid(format!(
                    "helper `{}` returns {} but {} returns {}",
                    sig.helper,
                    returns,
                    sig.describe(),
                    sig.returns
                )));
            }
            if params.len() != sig.arguments.arity() {
                return Err(invalid(format!(
                    "helper `{}` takes {} parameters but {} passes {}",
                    sig.helper,
                    params.len(),
                    sig.describe(),
                    sig.arguments.arity()
                )));
            }
            if let ArgumentMapping::Positional(indices) = &sig.arguments {
                if let Some(bad) = indices.iter().find(|i| **i >= sig.params.len()) {
                    return Err(invalid(format!(
                        "{} has no argument at index {}",
                        sig.describe(),
                        bad
                    )));
                }
            }
        }

        for owner in &self.owners {
            for template in &self.members {
                check_template(&self.id, &template.instantiate(&self.id, owner))?;
            }
        }
        Ok(())
    }
}

/// The template must parse to one member whose declared shape agrees with
/// the signature recorded for it, otherwise reuse checks would compare
/// against the wrong thing.
fn check_template(rule: &str, spec: &MemberSpec) -> Result<()> {
    let node = parse_member(&spec.source)
        .map_err(|e| Error::template(rule, format!("`{}`: {}", spec.display_name(), e)))?;
    let mismatch = |found: String| {
        Error::template(
            rule,
            format!("`{}` declares {}, expected {}", spec.display_name(), found, spec.describe()),
        )
    };

    match (Member::from_node(node), &spec.signature) {
        (Member::Field(field), MemberSignature::Field { ty, is_static }) => {
            if !field.names().contains(&spec.name)
                || field.declared_type() != *ty
                || field.is_static() != *is_static
            {
                return Err(mismatch(field.describe()));
            }
        }
        (Member::StaticInitializer(_), MemberSignature::Initializer { .. }) => {}
        (
            Member::Method(method),
            MemberSignature::Method {
                params,
                returns,
                is_static,
            },
        ) => {
            if method.name() != spec.name
                || method.parameter_types() != *params
                || method.return_type() != *returns
                || method.is_static() != *is_static
            {
                return Err(mismatch(method.describe()));
            }
        }
        (other, _) => return Err(mismatch(format!("a `{}`", other.node().kind()))),
    }
    Ok(())
}

/// Validated, immutable set of rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut ids = HashSet::new();
        for rule in &rules {
            if !ids.insert(rule.id.as_str()) {
                return Err(Error::RuleTable(format!("duplicate rule id `{}`", rule.id)));
            }
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Every owner type across the table, deduplicated, in table order.
    pub fn owners(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .flat_map(|r| r.owners.iter())
            .filter(|o| seen.insert(o.as_str()))
            .cloned()
            .collect()
    }

    /// Keep only the listed rules.
    pub fn select(self, ids: &[String]) -> Result<Self> {
        if let Some(unknown) = ids.iter().find(|id| self.get(id).is_none()) {
            return Err(Error::RuleTable(format!("unknown rule id `{}`", unknown)));
        }
        Ok(Self {
            rules: self
                .rules
                .into_iter()
                .filter(|r| ids.contains(&r.id))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn table_from(toml_src: &str) -> Result<RuleTable> {
        let file: loader::RulesFile = toml::from_str(toml_src)?;
        RuleTable::new(file.rules)
    }

    const MINIMAL: &str = indoc! {r#"
        [[rules]]
        id = "r"
        owners = ["a.B"]

        [[rules.signatures]]
        method = "m"
        params = ["int"]
        returns = "String"
        helper = "h"

        [[rules.members]]
        kind = "method"
        name = "h"
        returns = "String"
        static = true
        source = "private static String h() { return {owner}.x(); }"
    "#};

    #[test]
    fn test_builtin_table_is_valid() {
        let table = BuiltinRuleLoader.load_rules().and_then(RuleTable::new).unwrap();
        assert_eq!(table.len(), 2);
        let rule = table.get("commons-lang-random-string").unwrap();
        assert_eq!(rule.owners.len(), 2);
        assert!(rule
            .signatures_for("org.apache.commons.lang.RandomStringUtils", "randomNumeric")
            .iter()
            .all(|s| s.params == vec![ParamKind::Int]));
        assert_eq!(
            rule.signatures_for("org.apache.commons.lang3.RandomStringUtils", "randomNumeric")
                .len(),
            2
        );
    }

    #[test]
    fn test_instantiate_replaces_owner() {
        let table = table_from(MINIMAL).unwrap();
        let spec = table.rules()[0].member_specs("a.B").remove(0);
        assert_eq!(spec.source, "private static String h() { return B.x(); }");
        assert_eq!(spec.name, "h");
        assert_eq!(table.rules()[0].imports_for("a.B"), Vec::<String>::new());
    }

    #[test]
    fn test_missing_helper_is_rejected() {
        let src = MINIMAL.replace("helper = \"h\"", "helper = \"nope\"");
        let err = table_from(&src).unwrap_err();
        assert!(err.to_string().contains("has no method template"), "{}", err);
    }

    #[test]
    fn test_helper_return_type_must_match() {
        let src = MINIMAL.replace("returns = \"String\"\nhelper", "returns = \"int\"\nhelper");
        let err = table_from(&src).unwrap_err();
        assert!(err.to_string().contains("returns"), "{}", err);
    }

    #[test]
    fn test_template_shape_must_match_declaration() {
        let src = MINIMAL.replace("String h()", "String other()");
        let err = table_from(&src).unwrap_err();
        assert!(matches!(err, Error::Template { .. }), "{}", err);
    }

    #[test]
    fn test_duplicate_rule_ids() {
        let doubled = format!("{}\n{}", MINIMAL, MINIMAL);
        let err = table_from(&doubled).unwrap_err();
        assert!(err.to_string().contains("duplicate rule id"));
    }

    #[test]
    fn test_positional_index_out_of_range() {
        let src = MINIMAL
            .replace("helper = \"h\"", "helper = \"h\"\narguments = { positional = [3] }")
            .replace("returns = \"String\"\nstatic", "params = [\"int\"]\nreturns = \"String\"\nstatic")
            .replace("String h()", "String h(int n)");
        let err = table_from(&src).unwrap_err();
        assert!(err.to_string().contains("no argument at index 3"), "{}", err);
    }

    #[test]
    fn test_select_unknown_rule() {
        let table = table_from(MINIMAL).unwrap();
        assert!(table.clone().select(&["r".to_string()]).is_ok());
        assert!(table.select(&["missing".to_string()]).is_err());
    }
}
