//! Tree-sitter parser integration for Java
//!
//! Parses with the tree-sitter Java grammar and lowers the result into the
//! crate's own lossless [`SyntaxNode`] tree. The gaps between tree-sitter
//! nodes (whitespace) become trivia tokens, so the lowered tree prints back
//! to exactly the input.

use super::ast::CompilationUnit;
use super::tree::{Child, SyntaxElement, SyntaxNode, SyntaxToken};
use crate::errors::{Error, Result};
use std::cell::RefCell;
use tree_sitter::{Language, Node, Parser};

thread_local! {
    /// One parser per worker thread; creating and configuring one is not free.
    static JAVA_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// Get the tree-sitter language for Java
fn get_language() -> Language {
    tree_sitter_java::LANGUAGE.into()
}

fn with_parser<R>(f: impl FnOnce(&mut Parser) -> Result<R>) -> Result<R> {
    JAVA_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let mut parser = Parser::new();
            parser
                .set_language(&get_language())
                .map_err(|e| Error::Parser(format!("Failed to set tree-sitter language: {}", e)))?;
            *slot = Some(parser);
        }
        match slot.as_mut() {
            Some(parser) => f(parser),
            None => Err(Error::Parser("parser slot is empty".into())),
        }
    })
}

/// Parse Java source into a compilation unit.
///
/// Fails with [`Error::Syntax`] at the first error or missing node.
pub fn parse(source: &str) -> Result<CompilationUnit> {
    parse_tree(source).map(CompilationUnit::from_root)
}

/// Parse Java source into a raw `program` node.
pub fn parse_tree(source: &str) -> Result<SyntaxNode> {
    with_parser(|parser| {
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::Parser("Failed to parse source code".into()))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root));
        }
        Ok(lower(root, 0, source.len(), source))
    })
}

/// Parse a single class member (field, initializer, method) from template
/// text. The text must already carry its final indentation on every line
/// after the first.
pub fn parse_member(source: &str) -> Result<SyntaxNode> {
    const PREFIX: &str = "class CwefixTemplate {\n";
    let wrapped = format!("{}{}\n}}\n", PREFIX, source);
    let program = parse_tree(&wrapped)?;
    let body = program
        .first_child_of_kind("class_declaration")
        .and_then(|class| class.node_by_field("body"))
        .ok_or_else(|| Error::Parser("template did not produce a class body".into()))?;
    let mut members = body
        .child_nodes()
        .filter(|n| !super::tree::is_comment_kind(n.kind()));
    match (members.next(), members.next()) {
        (Some(member), None) => Ok(member.clone()),
        (None, _) => Err(Error::Parser("template is empty".into())),
        (Some(_), Some(_)) => Err(Error::Parser(
            "template must declare exactly one member".into(),
        )),
    }
}

/// Build an `import_declaration` node for a qualified type name.
pub fn parse_import(qualified_name: &str) -> Result<SyntaxNode> {
    let program = parse_tree(&format!("import {};\n", qualified_name))?;
    program
        .first_child_of_kind("import_declaration")
        .cloned()
        .ok_or_else(|| Error::Parser(format!("`{}` is not an importable name", qualified_name)))
}

fn lower(node: Node<'_>, start: usize, end: usize, source: &str) -> SyntaxNode {
    let mut children = Vec::with_capacity(node.child_count() * 2);
    let mut pos = start;
    let mut cursor = node.walk();

    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            let child_start = child.start_byte().max(pos);
            let child_end = child.end_byte().max(child_start);

            if child_start > pos {
                children.push(Child::trivia(&source[pos..child_start]));
            }
            let element = if child.child_count() == 0 {
                SyntaxElement::Token(SyntaxToken::new(
                    child.kind(),
                    &source[child_start..child_end],
                ))
            } else {
                SyntaxElement::Node(lower(child, child_start, child_end, source))
            };
            children.push(Child::new(field, element));
            pos = child_end;

            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    if end > pos {
        children.push(Child::trivia(&source[pos..end]));
    }
    SyntaxNode::new(node.kind(), children)
}

fn first_error(root: Node<'_>) -> Error {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            let pos = node.start_position();
            return Error::syntax(
                pos.row + 1,
                pos.column + 1,
                format!("missing `{}`", node.kind()),
            );
        }
        if node.is_error() {
            let pos = node.start_position();
            return Error::syntax(pos.row + 1, pos.column + 1, "unexpected input");
        }
        if node.has_error() {
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    Error::syntax(1, 1, "unparseable input")
}
