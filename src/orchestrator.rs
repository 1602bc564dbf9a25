//! Per-unit transformation: scan, plan, rewrite.
//!
//! A unit moves through `Scanning -> Planning -> Rewriting -> Done`, or ends
//! in `Skipped` when scanning finds nothing to rewrite. Failures are scoped
//! to one host type: a conflicting type keeps its insecure calls and gets a
//! diagnostic, the rest of the unit is still rewritten.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::Result;
use crate::matcher::{HostRef, MatchResult, Matcher};
use crate::observability::{set_current_type, set_phase, FixPhase};
use crate::resolve::{ImportScope, ImportStatus, TypeIndex};
use crate::rewriter::{HostEdit, Rewriter};
use crate::rules::RuleTable;
use crate::synthesis::{plan, union_specs, MemberKind, MemberSpec};
use crate::syntax::{parse, CompilationUnit, NodeId, TypeDecl};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, debug_span, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformState {
    Scanning,
    Planning,
    Rewriting,
    Done,
    Skipped,
}

/// Rewritten call sites in one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRewrites {
    pub type_name: String,
    pub calls: usize,
}

#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub state: TransformState,
    pub unit: CompilationUnit,
    pub changed: bool,
    pub rewrites: Vec<TypeRewrites>,
    pub members_added: usize,
    pub imports_added: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformOutcome {
    fn skipped(unit: &CompilationUnit, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            state: TransformState::Skipped,
            unit: unit.clone(),
            changed: false,
            rewrites: Vec::new(),
            members_added: 0,
            imports_added: Vec::new(),
            diagnostics,
        }
    }

    pub fn calls_rewritten(&self) -> usize {
        self.rewrites.iter().map(|r| r.calls).sum()
    }
}

/// Applies a rule table to compilation units. Cheap to clone and share
/// between worker threads.
#[derive(Debug, Clone)]
pub struct Transformer {
    rules: Arc<RuleTable>,
    type_filter: Vec<glob::Pattern>,
    type_index: Option<Arc<TypeIndex>>,
}

impl Transformer {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            rules,
            type_filter: Vec::new(),
            type_index: None,
        }
    }

    /// Only rewrite hosts whose simple name matches one of `patterns`.
    pub fn with_type_filter(mut self, patterns: Vec<glob::Pattern>) -> Self {
        self.type_filter = patterns;
        self
    }

    pub fn with_type_index(mut self, index: Option<Arc<TypeIndex>>) -> Self {
        self.type_index = index;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn transform_source(&self, source: &str) -> Result<TransformOutcome> {
        let unit = parse(source)?;
        self.transform(&unit)
    }

    pub fn transform(&self, unit: &CompilationUnit) -> Result<TransformOutcome> {
        let span = debug_span!("transform_unit", package = unit.package_name().as_deref());
        let _enter = span.enter();
        let index = self.type_index.as_deref();

        let matches = {
            let _phase = set_phase(FixPhase::Scanning);
            let matcher = Matcher::new(&self.rules)
                .with_type_index(index)
                .with_type_filter(self.type_filter.clone());
            if !matcher.may_match(unit) {
                return Ok(TransformOutcome::skipped(unit, Vec::new()));
            }
            matcher.matches(unit).collect::<Vec<_>>()
        };

        let mut diagnostics = Vec::new();
        let (matches, unsupported): (Vec<MatchResult>, Vec<MatchResult>) =
            matches.into_iter().partition(|m| m.host.can_host_members());
        for m in &unsupported {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnsupportedHost,
                    format!(
                        "`{}` left alone: {} `{}` cannot declare the helper members",
                        m.describe(),
                        m.host.kind.keyword(),
                        m.host.name
                    ),
                )
                .at_line(m.line)
                .in_type(m.host.name.clone()),
            );
        }
        if matches.is_empty() {
            return Ok(TransformOutcome::skipped(unit, diagnostics));
        }

        let edits = {
            let _phase = set_phase(FixPhase::Planning);
            let scope = ImportScope::new(unit, index);
            let mut edits = Vec::new();
            for (host, group) in group_by_host(&matches) {
                let _ty = set_current_type(host.name.clone());
                match self.plan_host(unit, &scope, host, &group) {
                    Ok(edit) => edits.push(edit),
                    Err(diagnostic) => diagnostics.push(diagnostic),
                }
            }
            edits
        };
        if edits.is_empty() {
            debug!(diagnostics = diagnostics.len(), "No host could be rewritten");
            return Ok(TransformOutcome::skipped(unit, diagnostics));
        }

        let output = {
            let _phase = set_phase(FixPhase::Rewriting);
            Rewriter::new(index).rewrite(unit, &matches, &edits)?
        };
        diagnostics.extend(output.diagnostics);

        let rewrites: Vec<TypeRewrites> = output
            .rewrites
            .into_iter()
            .map(|(type_name, calls)| TypeRewrites { type_name, calls })
            .collect();
        let changed = !output.unit.same_version(unit);
        info!(
            calls = rewrites.iter().map(|r| r.calls).sum::<usize>(),
            members = output.members_added,
            diagnostics = diagnostics.len(),
            "Unit transformed"
        );

        if rewrites.is_empty() && !changed {
            return Ok(TransformOutcome::skipped(unit, diagnostics));
        }

        Ok(TransformOutcome {
            state: TransformState::Done,
            unit: output.unit,
            changed,
            rewrites,
            members_added: output.members_added,
            imports_added: output.imports_added,
            diagnostics,
        })
    }

    /// Members and imports one host needs, or the diagnostic that rules it out.
    fn plan_host(
        &self,
        unit: &CompilationUnit,
        scope: &ImportScope<'_>,
        host: &HostRef,
        group: &[&MatchResult],
    ) -> std::result::Result<HostEdit, Diagnostic> {
        let conflict = |message: String| {
            Diagnostic::new(DiagnosticKind::NameConflict, message)
                .at_line(host.line)
                .in_type(host.name.clone())
        };

        let mut specs: Vec<MemberSpec> = Vec::new();
        let mut imports: Vec<String> = Vec::new();
        for (rule_id, calls) in group_by_rule(group) {
            let Some(rule) = self.rules.get(rule_id) else {
                continue;
            };
            let Some(owner) = choose_owner(scope, &calls) else {
                continue;
            };
            debug!(host = %host.name, rule = rule_id, owner = %owner, "Planning host");
            // Only the helpers these calls are rewritten to.
            specs.extend(rule.member_specs(&owner).into_iter().filter(|spec| {
                spec.kind() != MemberKind::Method
                    || calls.iter().any(|m| m.signature.helper == spec.name)
            }));
            imports.extend(rule.imports_for(&owner));
        }

        let required = union_specs(&host.name, specs).map_err(|e| conflict(e.to_string()))?;
        let decl = unit
            .root()
            .find(host.id)
            .and_then(TypeDecl::cast)
            .ok_or_else(|| conflict(format!("type `{}` not found in unit", host.name)))?;
        let calls: Vec<NodeId> = group.iter().map(|m| m.call).collect();
        let plan = plan(&decl, &required, &calls).map_err(|e| conflict(e.to_string()))?;
        debug!(
            host = %host.name,
            added = plan.additions.len(),
            reused = plan.reused.len(),
            "Synthesis planned"
        );
        Ok(HostEdit { plan, imports })
    }
}

fn group_by_host(matches: &[MatchResult]) -> Vec<(&HostRef, Vec<&MatchResult>)> {
    let mut groups: Vec<(NodeId, &HostRef, Vec<&MatchResult>)> = Vec::new();
    for m in matches {
        match groups.iter_mut().find(|(id, _, _)| *id == m.host.id) {
            Some((_, _, group)) => group.push(m),
            None => groups.push((m.host.id, &m.host, vec![m])),
        }
    }
    groups.into_iter().map(|(_, host, group)| (host, group)).collect()
}

fn group_by_rule<'m>(matches: &[&'m MatchResult]) -> Vec<(&'m str, Vec<&'m MatchResult>)> {
    let mut groups: Vec<(&str, Vec<&MatchResult>)> = Vec::new();
    for &m in matches {
        match groups.iter_mut().find(|(rule, _)| *rule == m.rule) {
            Some((_, group)) => group.push(m),
            None => groups.push((m.rule.as_str(), vec![m])),
        }
    }
    groups
}

/// The owner a host's helpers refer to: one already visible by its simple
/// name if possible, otherwise the first matched.
fn choose_owner(scope: &ImportScope<'_>, calls: &[&MatchResult]) -> Option<String> {
    calls
        .iter()
        .map(|m| &m.owner)
        .find(|owner| scope.import_status(owner) == ImportStatus::Present)
        .or_else(|| calls.first().map(|m| &m.owner))
        .cloned()
}
