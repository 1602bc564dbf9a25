//! Applies matches and synthesis plans to a compilation unit.
//!
//! Everything happens in one bottom-up [`SyntaxNode::rewrite`] pass: matched
//! calls become helper invocations, host bodies receive their planned
//! members, and the unit gets the imports the new code needs. Nodes outside
//! those paths are shared with the input tree.

pub mod imports;
pub mod layout;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::errors::Result;
use crate::matcher::MatchResult;
use crate::resolve::{ImportScope, TypeIndex};
use crate::rules::{ArgumentMapping, Signature};
use crate::synthesis::{MemberKind, Placement, SynthesisPlan};
use crate::syntax::tree::TRIVIA;
use crate::syntax::{
    parse_member, CallExpr, Child, CompilationUnit, NodeId, SyntaxElement, SyntaxNode, SyntaxToken,
    TypeDecl,
};
use imports::{insert_imports, plan_imports};
use layout::BodyLayout;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Changes for one host type.
#[derive(Debug, Clone)]
pub struct HostEdit {
    pub plan: SynthesisPlan,
    /// Qualified names the host's new code refers to.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub unit: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
    /// Rewritten call sites per host name.
    pub rewrites: Vec<(String, usize)>,
    pub members_added: usize,
    pub imports_added: Vec<String>,
}

struct PreparedMember {
    kind: MemberKind,
    placement: Placement,
    node: SyntaxNode,
}

struct PreparedHost {
    layout: BodyLayout,
    members: Vec<PreparedMember>,
}

pub struct Rewriter<'a> {
    index: Option<&'a TypeIndex>,
}

impl<'a> Rewriter<'a> {
    pub fn new(index: Option<&'a TypeIndex>) -> Self {
        Self { index }
    }

    /// Rewrite `matches` whose host has an edit. Matches without one are
    /// left alone, so a host is either fully rewritten or untouched.
    pub fn rewrite(
        &self,
        unit: &CompilationUnit,
        matches: &[MatchResult],
        edits: &[HostEdit],
    ) -> Result<RewriteOutput> {
        let mut diagnostics = Vec::new();
        let mut bodies: HashMap<NodeId, PreparedHost> = HashMap::new();
        let mut ready_hosts: HashSet<NodeId> = HashSet::new();
        let mut required_imports: Vec<String> = Vec::new();

        for edit in edits {
            match prepare_host(unit, &edit.plan) {
                Ok(Some((body, prepared))) => {
                    bodies.insert(body, prepared);
                }
                Ok(None) => {}
                Err(message) => {
                    warn!(host = %edit.plan.host_name, "{}", message);
                    diagnostics.push(
                        Diagnostic::new(DiagnosticKind::TemplateError, message)
                            .in_type(edit.plan.host_name.clone()),
                    );
                    continue;
                }
            }
            ready_hosts.insert(edit.plan.host);
            required_imports.extend(edit.imports.iter().cloned());
        }

        let calls: HashMap<NodeId, &Signature> = matches
            .iter()
            .filter(|m| ready_hosts.contains(&m.host.id))
            .map(|m| (m.call, &m.signature))
            .collect();

        let mut rewritten: HashSet<NodeId> = HashSet::new();
        let mut members_added = 0;
        let root = unit.root().rewrite(&mut |node: &SyntaxNode| {
            if let Some(signature) = calls.get(&node.id()) {
                rewritten.insert(node.id());
                return Some(helper_invocation(node, signature));
            }
            let prepared = bodies.get(&node.id())?;
            members_added += prepared.members.len();
            Some(insert_members(node, prepared))
        });

        let mut rewrites: Vec<(String, usize)> = Vec::new();
        for m in matches.iter().filter(|m| rewritten.contains(&m.call)) {
            match rewrites.iter_mut().find(|(name, _)| *name == m.host.name) {
                Some((_, count)) => *count += 1,
                None => rewrites.push((m.host.name.clone(), 1)),
            }
        }

        let scope = ImportScope::new(unit, self.index);
        let import_plan = plan_imports(&scope, &required_imports);
        for (required, bound) in &import_plan.conflicts {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ImportConflict,
                format!(
                    "`{}` is needed but its simple name is bound to `{}`; qualify references or resolve the import manually",
                    required, bound
                ),
            ));
        }
        let newline = if root.text().contains("\r\n") { "\r\n" } else { "\n" };
        let root = insert_imports(&root, &import_plan.add, newline)?;

        debug!(
            calls = rewritten.len(),
            members = members_added,
            imports = import_plan.add.len(),
            "Rewrite applied"
        );
        Ok(RewriteOutput {
            unit: CompilationUnit::from_root(root),
            diagnostics,
            rewrites,
            members_added,
            imports_added: import_plan.add,
        })
    }
}

/// Parse the planned members with the host's layout. `Ok(None)` when
/// nothing has to be added.
fn prepare_host(
    unit: &CompilationUnit,
    plan: &SynthesisPlan,
) -> std::result::Result<Option<(NodeId, PreparedHost)>, String> {
    if plan.is_empty() {
        return Ok(None);
    }
    let host = unit
        .root()
        .find(plan.host)
        .and_then(TypeDecl::cast)
        .ok_or_else(|| format!("type `{}` is no longer in the unit", plan.host_name))?;
    let body = host
        .body()
        .ok_or_else(|| format!("type `{}` has no body", plan.host_name))?;
    let layout = BodyLayout::detect(unit.root(), host.node(), body);

    let members = plan
        .additions
        .iter()
        .map(|planned| {
            let text = layout.reindent(&planned.spec.source);
            parse_member(&text)
                .map(|node| PreparedMember {
                    kind: planned.spec.kind(),
                    placement: planned.placement,
                    node,
                })
                .map_err(|e| {
                    format!(
                        "template for `{}` (rule `{}`) does not parse: {}",
                        planned.spec.display_name(),
                        planned.spec.rule,
                        e
                    )
                })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some((body.id(), PreparedHost { layout, members })))
}

fn token(kind: &'static str, text: &str) -> Child {
    Child::unnamed(SyntaxToken::new(kind, text))
}

/// `helper(kept, args)` in place of the matched call.
fn helper_invocation(call: &SyntaxNode, signature: &Signature) -> SyntaxNode {
    let args = CallExpr::cast(call.clone())
        .map(|c| c.arguments())
        .unwrap_or_default();

    let mut list = vec![token("(", "(")];
    if let ArgumentMapping::Positional(indices) = &signature.arguments {
        for (n, arg) in indices.iter().filter_map(|i| args.get(*i)).enumerate() {
            if n > 0 {
                list.push(token(",", ","));
                list.push(Child::trivia(" "));
            }
            list.push(Child::unnamed(arg.clone()));
        }
    }
    list.push(token(")", ")"));

    SyntaxNode::new(
        "method_invocation",
        [
            Child::new(Some("name"), SyntaxToken::new("identifier", signature.helper.as_str())),
            Child::new(Some("arguments"), SyntaxNode::new("argument_list", list)),
        ],
    )
}

fn is_whitespace(element: &SyntaxElement) -> bool {
    element.kind() == TRIVIA
}

fn is_comment(element: &SyntaxElement) -> bool {
    element.is_trivia() && !is_whitespace(element)
}

fn newlines(element: &SyntaxElement) -> usize {
    match element.as_token() {
        Some(t) if t.kind() == TRIVIA => t.text().matches('\n').count(),
        _ => 0,
    }
}

/// Body with the prepared members placed per the plan.
fn insert_members(body: &SyntaxNode, host: &PreparedHost) -> SyntaxNode {
    let layout = &host.layout;
    let children: Vec<Child> = body.children().cloned().collect();
    let open = children
        .iter()
        .position(|c| c.element().kind() == "{")
        .unwrap_or(0);
    let close = children
        .iter()
        .rposition(|c| c.element().kind() == "}")
        .unwrap_or(children.len());
    let inner = open + 1..close.max(open + 1);

    let top: Vec<&PreparedMember> = host
        .members
        .iter()
        .filter(|m| m.placement == Placement::Top)
        .collect();
    let end: Vec<&PreparedMember> = host
        .members
        .iter()
        .filter(|m| m.placement == Placement::End)
        .collect();
    let after = |id: NodeId| {
        host.members
            .iter()
            .filter(move |m| m.placement == Placement::After(id))
    };

    // Last element before `}` that is not whitespace; comments count.
    let last_content = inner
        .clone()
        .rev()
        .find(|i| !is_whitespace(children[*i].element()));
    let first_member = inner
        .clone()
        .find(|i| !children[*i].element().is_trivia())
        .map(|i| children[i].element().kind());

    let mut out: Vec<Child> = children[..(open + 1).min(children.len())].to_vec();
    let mut previous: Option<MemberKind> = None;
    for member in &top {
        let blank = previous.is_some()
            && (member.kind == MemberKind::StaticInitializer
                || previous == Some(MemberKind::StaticInitializer));
        out.push(Child::trivia(if blank {
            layout.blank_line_break()
        } else {
            layout.member_break()
        }));
        out.push(Child::unnamed(member.node.clone()));
        previous = Some(member.kind);
    }
    if let (Some(last), Some(next)) = (previous, first_member) {
        let separated = children
            .get(open + 1)
            .map(|c| newlines(c.element()) >= 2)
            .unwrap_or(false);
        if !separated && (last == MemberKind::StaticInitializer || next != "field_declaration") {
            out.push(Child::trivia(layout.newline));
        }
    }

    let push_end = |out: &mut Vec<Child>, has_content: bool| {
        for (n, member) in end.iter().enumerate() {
            let sep = if n == 0 && !has_content {
                layout.member_break()
            } else {
                layout.blank_line_break()
            };
            out.push(Child::trivia(sep));
            out.push(Child::unnamed(member.node.clone()));
        }
    };

    if last_content.is_none() {
        push_end(&mut out, !top.is_empty());
    }

    // A first member sharing the line of `{` moves below the new members.
    let opens_inline = !top.is_empty()
        && first_member.is_some()
        && match children.get(inner.start).map(Child::element) {
            Some(e) if is_whitespace(e) => {
                newlines(e) == 0
                    && children
                        .get(inner.start + 1)
                        .is_some_and(|c| !is_comment(c.element()))
            }
            Some(e) => !e.is_trivia(),
            None => false,
        };

    let mut i = inner.start;
    if opens_inline {
        out.push(Child::trivia(layout.member_break()));
        if is_whitespace(children[i].element()) {
            i += 1;
        }
    }
    while i < inner.end {
        out.push(children[i].clone());
        let Some(id) = children[i].element().as_node().map(SyntaxNode::id) else {
            if Some(i) == last_content {
                push_end(&mut out, true);
            }
            i += 1;
            continue;
        };
        let anchored: Vec<&PreparedMember> = after(id).collect();
        if !anchored.is_empty() {
            // Keep a same-line trailing comment with its member.
            let mut j = i;
            let at = |k: usize| children.get(k).filter(|_| k < inner.end).map(Child::element);
            match (at(j + 1), at(j + 2)) {
                (Some(ws), Some(comment))
                    if is_whitespace(ws) && newlines(ws) == 0 && is_comment(comment) =>
                {
                    j += 2
                }
                (Some(comment), _) if is_comment(comment) => j += 1,
                _ => {}
            }
            for k in i + 1..=j {
                out.push(children[k].clone());
            }
            for member in &anchored {
                out.push(Child::trivia(layout.blank_line_break()));
                out.push(Child::unnamed(member.node.clone()));
            }
            let follows = (j + 1..inner.end).any(|k| !children[k].element().is_trivia());
            let next_blank = at(j + 1).map(|e| newlines(e) >= 2).unwrap_or(false);
            if follows && !next_blank {
                out.push(Child::trivia(layout.newline));
            }
            if last_content.is_some_and(|l| l <= j && l >= i) {
                push_end(&mut out, true);
            }
            i = j + 1;
            continue;
        }
        if Some(i) == last_content {
            push_end(&mut out, true);
        }
        i += 1;
    }

    let closes_on_new_line = inner
        .clone()
        .rev()
        .take_while(|k| is_whitespace(children[*k].element()))
        .any(|k| newlines(children[k].element()) > 0);
    if !closes_on_new_line {
        while out
            .last()
            .is_some_and(|c| is_whitespace(c.element()) && newlines(c.element()) == 0)
        {
            out.pop();
        }
        out.push(Child::trivia(format!("{}{}", layout.newline, layout.closing_indent)));
    }
    out.extend(children[close.min(children.len())..].iter().cloned());

    body.with_children(out)
}
