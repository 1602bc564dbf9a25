//! Adding single-type imports to a compilation unit.

use crate::errors::Result;
use crate::resolve::{split_qualified, ImportScope, ImportStatus};
use crate::syntax::tree::TRIVIA;
use crate::syntax::{parse_import, Child, ImportDecl, SyntaxElement, SyntaxNode};
use tracing::debug;

/// Outcome of checking the imports a rewrite needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    /// Qualified names to import, in order.
    pub add: Vec<String>,
    /// (required, already bound to)
    pub conflicts: Vec<(String, String)>,
}

/// Decide which of `required` must be imported.
pub fn plan_imports(scope: &ImportScope<'_>, required: &[String]) -> ImportPlan {
    let mut plan = ImportPlan::default();
    for name in required {
        if plan.add.contains(name) {
            continue;
        }
        // Two new imports may not bind the same simple name either.
        let (_, simple) = split_qualified(name);
        if let Some(bound) = plan.add.iter().find(|a| split_qualified(a).1 == simple) {
            plan.conflicts.push((name.clone(), bound.clone()));
            continue;
        }
        match scope.import_status(name) {
            ImportStatus::Present => {}
            ImportStatus::Missing => plan.add.push(name.clone()),
            ImportStatus::Conflict(existing) => plan.conflicts.push((name.clone(), existing)),
        }
    }
    plan
}

/// `java.` and `javax.` imports form their own group.
fn import_group(path: &str) -> u8 {
    if path.starts_with("java.") || path.starts_with("javax.") {
        0
    } else {
        1
    }
}

/// Index just past the line of `children[i]`: a trailing comment on the
/// same line stays with the declaration it follows.
fn after_line_of(children: &[Child], i: usize) -> usize {
    let same_line_space =
        |e: &SyntaxElement| e.kind() == TRIVIA && !e.text().contains('\n');
    let comment = |e: &SyntaxElement| e.is_trivia() && e.kind() != TRIVIA;
    let at = |k: usize| children.get(k).map(Child::element);
    match (at(i + 1), at(i + 2)) {
        (Some(space), Some(c)) if same_line_space(space) && comment(c) => i + 3,
        (Some(c), _) if comment(c) => i + 2,
        _ => i + 1,
    }
}

/// New root with `names` imported, laid out next to the existing imports.
pub fn insert_imports(root: &SyntaxNode, names: &[String], newline: &str) -> Result<SyntaxNode> {
    if names.is_empty() {
        return Ok(root.clone());
    }
    let nodes = names
        .iter()
        .map(|n| parse_import(n).map(|node| (n.as_str(), node)))
        .collect::<Result<Vec<_>>>()?;

    let children: Vec<Child> = root.children().cloned().collect();
    let last_import = children
        .iter()
        .rposition(|c| c.element().kind() == "import_declaration");
    let package = children
        .iter()
        .position(|c| c.element().kind() == "package_declaration");

    let mut inserted = Vec::new();
    let index = match (last_import, package) {
        (Some(i), _) => {
            let mut previous = children[i]
                .element()
                .as_node()
                .and_then(|n| ImportDecl::cast(n.clone()))
                .map(|import| import.path())
                .unwrap_or_default();
            for (name, node) in nodes {
                let separator = if import_group(&previous) == import_group(name) {
                    newline.to_string()
                } else {
                    newline.repeat(2)
                };
                inserted.push(Child::trivia(separator));
                inserted.push(Child::unnamed(node));
                previous = name.to_string();
            }
            after_line_of(&children, i)
        }
        (None, Some(p)) => {
            let mut previous: Option<&str> = None;
            for (name, node) in nodes {
                let separator = match previous {
                    Some(prev) if import_group(prev) == import_group(name) => newline.to_string(),
                    _ => newline.repeat(2),
                };
                inserted.push(Child::trivia(separator));
                inserted.push(Child::unnamed(node));
                previous = Some(name);
            }
            after_line_of(&children, p)
        }
        (None, None) => {
            // Ahead of the first declaration, after any header comment.
            let first = children
                .iter()
                .position(|c| !c.element().is_trivia())
                .unwrap_or(children.len());
            let mut previous: Option<&str> = None;
            for (name, node) in nodes {
                if let Some(prev) = previous {
                    let separator = if import_group(prev) == import_group(name) {
                        newline.to_string()
                    } else {
                        newline.repeat(2)
                    };
                    inserted.push(Child::trivia(separator));
                }
                inserted.push(Child::unnamed(node));
                previous = Some(name);
            }
            inserted.push(Child::trivia(newline.repeat(2)));
            first
        }
    };

    debug!(count = names.len(), "Adding imports");
    let mut new_children = children;
    new_children.splice(index..index, inserted);
    Ok(root.with_children(new_children))
}
