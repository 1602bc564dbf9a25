//! Finds call sites of insecure signatures.
//!
//! Matching is read-only. [`Matcher::matches`] returns a lazy iterator that
//! walks one type declaration at a time; calling it again starts over.

pub mod apparent;

use crate::resolve::{ImportScope, TypeIndex};
use crate::rules::{RuleTable, Signature};
use crate::syntax::tree::Preorder;
use crate::syntax::{ast, CallExpr, CompilationUnit, NodeId, TypeDecl, TypeKind};
use apparent::arguments_fit;
use std::collections::HashSet;
use tracing::debug;

/// Type declaration that encloses a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    pub id: NodeId,
    pub name: String,
    pub kind: TypeKind,
    pub line: usize,
}

impl HostRef {
    pub fn can_host_members(&self) -> bool {
        self.kind.can_host_members()
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub call: NodeId,
    pub line: usize,
    pub host: HostRef,
    pub rule: String,
    pub owner: String,
    pub signature: Signature,
}

impl MatchResult {
    pub fn describe(&self) -> String {
        let (_, simple) = crate::resolve::split_qualified(&self.owner);
        format!("{}.{}", simple, self.signature.describe())
    }
}

pub struct Matcher<'a> {
    rules: &'a RuleTable,
    index: Option<&'a TypeIndex>,
    type_filter: Vec<glob::Pattern>,
    owners: Vec<String>,
    methods: HashSet<&'a str>,
}

impl<'a> Matcher<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self {
            rules,
            index: None,
            type_filter: Vec::new(),
            owners: rules.owners(),
            methods: rules
                .rules()
                .iter()
                .flat_map(|r| r.signatures.iter().map(|s| s.method.as_str()))
                .collect(),
        }
    }

    pub fn with_type_index(mut self, index: Option<&'a TypeIndex>) -> Self {
        self.index = index;
        self
    }

    /// Only hosts whose simple name matches one of the patterns are scanned.
    /// An empty filter admits every host.
    pub fn with_type_filter(mut self, patterns: Vec<glob::Pattern>) -> Self {
        self.type_filter = patterns;
        self
    }

    fn admits(&self, host_name: &str) -> bool {
        self.type_filter.is_empty() || self.type_filter.iter().any(|p| p.matches(host_name))
    }

    /// Cheap pre-check: can the unit refer to any owner at all?
    pub fn may_match(&self, unit: &CompilationUnit) -> bool {
        let package = unit.package_name().unwrap_or_default();
        let mentions_owner = |path: &str| {
            self.owners.iter().any(|owner| {
                let (owner_pkg, _) = crate::resolve::split_qualified(owner);
                path == owner
                    || path.starts_with(&format!("{}.", owner))
                    || path == owner_pkg
            })
        };
        if unit.imports().iter().any(|i| mentions_owner(&i.path())) {
            return true;
        }
        if self
            .owners
            .iter()
            .any(|o| crate::resolve::split_qualified(o).0 == package)
        {
            return true;
        }

        // Fully-qualified references need no import.
        let simple_names: HashSet<&str> = self
            .owners
            .iter()
            .map(|o| crate::resolve::split_qualified(o).1)
            .collect();
        let mut found = false;
        unit.root().for_each_token(&mut |token| {
            found |= token.kind() == "identifier" && simple_names.contains(token.text());
        });
        found
    }

    /// Lazy sequence of matches in source order, host by host.
    pub fn matches<'u>(&'u self, unit: &'u CompilationUnit) -> Matches<'u> {
        let hosts = if self.may_match(unit) {
            unit.all_type_declarations()
        } else {
            debug!("No reference to a rule owner, skipping scan");
            Vec::new()
        };
        Matches {
            matcher: self,
            scope: ImportScope::new(unit, self.index),
            hosts: hosts.into_iter(),
            current: None,
        }
    }

    fn match_call(
        &self,
        scope: &ImportScope<'_>,
        host: &HostState,
        call: &CallExpr,
    ) -> Option<(String, &'a str, &'a Signature)> {
        let name = call.name()?;
        if !self.methods.contains(name.as_str()) {
            return None;
        }

        let owners = match call.qualifier() {
            Some(qualifier) => scope
                .resolve_qualifier(&qualifier, &self.owners)
                .into_iter()
                .collect(),
            None if call.has_receiver() => return None,
            None if host.method_names.contains(&name) => return None,
            None => scope.resolve_static_member(&name),
        };

        let args = call.arguments();
        for owner in owners {
            let mut candidates = 0;
            for rule in self.rules.rules().iter().filter(|r| r.owns(&owner)) {
                for signature in rule.signatures_for(&owner, &name) {
                    candidates += 1;
                    if arguments_fit(&args, &signature.params) {
                        return Some((owner, rule.id.as_str(), signature));
                    }
                }
            }
            if candidates > 0 {
                debug!(
                    owner = %owner,
                    method = %name,
                    arity = args.len(),
                    "Unsupported overload, leaving call unchanged"
                );
            }
        }
        None
    }
}

struct HostState {
    host: HostRef,
    method_names: Vec<String>,
    walk: Preorder,
}

pub struct Matches<'u> {
    matcher: &'u Matcher<'u>,
    scope: ImportScope<'u>,
    hosts: std::vec::IntoIter<(TypeDecl, usize)>,
    current: Option<HostState>,
}

impl Matches<'_> {
    fn next_host(&mut self) -> Option<HostState> {
        for (decl, line) in self.hosts.by_ref() {
            let name = decl.name();
            if !self.matcher.admits(&name) {
                continue;
            }
            let mut walk = decl.node().preorder_from(line);
            // The declaration node itself.
            walk.next();
            return Some(HostState {
                host: HostRef {
                    id: decl.id(),
                    name,
                    kind: decl.kind(),
                    line,
                },
                method_names: decl.method_names(),
                walk,
            });
        }
        None
    }
}

impl Iterator for Matches<'_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<MatchResult> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.next_host()?);
            }
            let state = self.current.as_mut()?;
            let Some(entry) = state.walk.next() else {
                self.current = None;
                continue;
            };
            if ast::is_type_declaration(entry.node.kind()) {
                // Nested types are hosts of their own.
                state.walk.skip_subtree();
                continue;
            }
            let Some(call) = CallExpr::cast(entry.node) else {
                continue;
            };
            let state = self.current.as_ref()?;
            if let Some((owner, rule, signature)) = self.matcher.match_call(&self.scope, state, &call) {
                return Some(MatchResult {
                    call: call.id(),
                    line: entry.line,
                    host: state.host.clone(),
                    rule: rule.to_string(),
                    owner,
                    signature: signature.clone(),
                });
            }
        }
    }
}

/// All matches of `rules` in `unit`.
pub fn find_matches(unit: &CompilationUnit, rules: &RuleTable) -> Vec<MatchResult> {
    Matcher::new(rules).matches(unit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{BuiltinRuleLoader, RuleLoader};
    use crate::syntax::parse;
    use indoc::indoc;

    fn table() -> RuleTable {
        BuiltinRuleLoader.load_rules().and_then(RuleTable::new).unwrap()
    }

    fn matched(source: &str) -> Vec<(String, usize)> {
        let unit = parse(source).unwrap();
        find_matches(&unit, &table())
            .into_iter()
            .map(|m| (m.describe(), m.line))
            .collect()
    }

    #[test]
    fn test_imported_owner() {
        let found = matched(indoc! {"
            package p;

            import org.apache.commons.lang3.RandomStringUtils;

            class A {
                String f(int n) {
                    return RandomStringUtils.randomAlphanumeric(n);
                }
            }
        "});
        assert_eq!(
            found,
            vec![("RandomStringUtils.randomAlphanumeric(int)".to_string(), 7)]
        );
    }

    #[test]
    fn test_unrelated_owner_does_not_match() {
        let found = matched(indoc! {"
            import org.apache.commons.lang3.RandomStringUtils;
            import com.acme.Other;

            class A {
                String f() {
                    return Other.randomAlphanumeric(10);
                }
            }
        "});
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_import_short_circuits() {
        let rules = table();
        let matcher = Matcher::new(&rules);
        let plain = parse("class A { int f() { return 1; } }").unwrap();
        assert!(!matcher.may_match(&plain));

        let unimported = parse("class A { int f() { return RandomUtils.nextInt(); } }").unwrap();
        assert!(matcher.matches(&unimported).next().is_none());
    }

    #[test]
    fn test_fully_qualified_call() {
        let found = matched(indoc! {"
            class A {
                String f() {
                    return org.apache.commons.lang.RandomStringUtils.randomNumeric(8);
                }
            }
        "});
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_static_import_call() {
        let found = matched(indoc! {"
            import static org.apache.commons.lang3.RandomStringUtils.randomAlphabetic;

            class A {
                String f() {
                    return randomAlphabetic(8);
                }
            }
        "});
        assert_eq!(found, vec![("RandomStringUtils.randomAlphabetic(int)".to_string(), 5)]);
    }

    #[test]
    fn test_local_method_shadows_static_import() {
        let found = matched(indoc! {"
            import static org.apache.commons.lang3.RandomStringUtils.*;

            class A {
                String random(int n) { return \"x\"; }
                String f() { return random(8); }
            }
        "});
        assert!(found.is_empty());
    }

    #[test]
    fn test_overloads_are_distinguished() {
        let found = matched(indoc! {r#"
            import org.apache.commons.lang3.RandomStringUtils;
            import java.util.Random;

            class A {
                void f(Random rnd) {
                    RandomStringUtils.random(5, "abc");
                    RandomStringUtils.random(5, true, false);
                    RandomStringUtils.random(5, 0, 0, true, true, null, rnd);
                    RandomStringUtils.random("abc");
                }
            }
        "#});
        let names: Vec<_> = found.into_iter().map(|(d, _)| d).collect();
        assert_eq!(
            names,
            vec![
                "RandomStringUtils.random(int, String)",
                "RandomStringUtils.random(int, boolean, boolean)",
            ]
        );
    }

    #[test]
    fn test_lang2_has_no_range_overloads() {
        let found = matched(indoc! {"
            import org.apache.commons.lang.RandomStringUtils;

            class A {
                String f() { return RandomStringUtils.randomNumeric(4, 8); }
            }
        "});
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_types_are_their_own_hosts() {
        let unit = parse(indoc! {"
            import org.apache.commons.lang3.RandomStringUtils;

            class Outer {
                String a() { return RandomStringUtils.randomNumeric(4); }

                static class Inner {
                    String b() { return RandomStringUtils.randomNumeric(4); }
                }

                interface Api {
                    default String c() { return RandomStringUtils.randomNumeric(4); }
                }
            }
        "})
        .unwrap();
        let hosts: Vec<_> = find_matches(&unit, &table())
            .into_iter()
            .map(|m| (m.host.name.clone(), m.host.can_host_members()))
            .collect();
        assert_eq!(
            hosts,
            vec![
                ("Outer".to_string(), true),
                ("Inner".to_string(), true),
                ("Api".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_type_filter() {
        let unit = parse(indoc! {"
            import org.apache.commons.lang3.RandomStringUtils;
            class RandomUtil { String a() { return RandomStringUtils.randomNumeric(4); } }
            class Other { String b() { return RandomStringUtils.randomNumeric(4); } }
        "})
        .unwrap();
        let rules = table();
        let matcher = Matcher::new(&rules)
            .with_type_filter(vec![glob::Pattern::new("RandomUtil").unwrap()]);
        let hosts: Vec<_> = matcher.matches(&unit).map(|m| m.host.name).collect();
        assert_eq!(hosts, vec!["RandomUtil"]);
    }

    #[test]
    fn test_matches_is_restartable() {
        let unit = parse(indoc! {"
            import org.apache.commons.lang3.RandomUtils;
            class A { int f() { return RandomUtils.nextInt() + RandomUtils.nextInt(1, 5); } }
        "})
        .unwrap();
        let rules = table();
        let matcher = Matcher::new(&rules);
        let first: Vec<_> = matcher.matches(&unit).map(|m| m.call).collect();
        let second: Vec<_> = matcher.matches(&unit).map(|m| m.call).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }
}
