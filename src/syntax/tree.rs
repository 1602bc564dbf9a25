//! Lossless, immutable concrete syntax tree.
//!
//! Every byte of the source lives in exactly one token, whitespace and
//! comments included, so printing a tree is concatenating its tokens. Nodes
//! are reference counted and their children are persistent vectors: an edit
//! rebuilds the path from the edited node to the root and shares everything
//! else with the previous version.
//!
//! Each node carries a [`NodeId`]. Fresh nodes get a new id; a node rebuilt
//! because one of its descendants changed keeps its id, so an id names the
//! same logical node across the versions produced by one transformation.

use im::Vector;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Grammar kind of a node or token (tree-sitter kind names).
pub type SyntaxKind = &'static str;

/// Kind given to the whitespace between tree-sitter tokens.
pub const TRIVIA: SyntaxKind = "trivia";

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    kind: SyntaxKind,
    text: Arc<str>,
}

impl SyntaxToken {
    pub fn new(kind: SyntaxKind, text: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn trivia(text: impl Into<Arc<str>>) -> Self {
        Self::new(TRIVIA, text)
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whitespace or a comment.
    pub fn is_trivia(&self) -> bool {
        self.kind == TRIVIA || is_comment_kind(self.kind)
    }

    fn newline_count(&self) -> usize {
        self.text.bytes().filter(|b| *b == b'\n').count()
    }
}

pub(crate) fn is_comment_kind(kind: SyntaxKind) -> bool {
    kind == "line_comment" || kind == "block_comment" || kind == "comment"
}

#[derive(Debug, Clone)]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(SyntaxToken),
}

impl SyntaxElement {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            Self::Node(node) => node.kind(),
            Self::Token(token) => token.kind(),
        }
    }

    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&SyntaxToken> {
        match self {
            Self::Token(token) => Some(token),
            Self::Node(_) => None,
        }
    }

    pub fn is_trivia(&self) -> bool {
        match self {
            Self::Node(node) => is_comment_kind(node.kind()),
            Self::Token(token) => token.is_trivia(),
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Text with whitespace and comments dropped; see [`SyntaxNode::normalized_text`].
    pub fn normalized_text(&self) -> String {
        match self {
            Self::Node(node) => node.normalized_text(),
            Self::Token(token) if token.is_trivia() => String::new(),
            Self::Token(token) => token.text().to_string(),
        }
    }

    pub fn write_to(&self, out: &mut String) {
        match self {
            Self::Node(node) => node.write_to(out),
            Self::Token(token) => out.push_str(token.text()),
        }
    }

    fn text_len(&self) -> usize {
        match self {
            Self::Node(node) => node.text_len(),
            Self::Token(token) => token.text.len(),
        }
    }

    fn newline_count(&self) -> usize {
        match self {
            Self::Node(node) => node.newline_count(),
            Self::Token(token) => token.newline_count(),
        }
    }
}

impl From<SyntaxNode> for SyntaxElement {
    fn from(node: SyntaxNode) -> Self {
        Self::Node(node)
    }
}

impl From<SyntaxToken> for SyntaxElement {
    fn from(token: SyntaxToken) -> Self {
        Self::Token(token)
    }
}

/// A child slot: an element plus the grammar field it fills, if any.
#[derive(Debug, Clone)]
pub struct Child {
    field: Option<&'static str>,
    element: SyntaxElement,
}

impl Child {
    pub fn new(field: Option<&'static str>, element: impl Into<SyntaxElement>) -> Self {
        Self {
            field,
            element: element.into(),
        }
    }

    pub fn unnamed(element: impl Into<SyntaxElement>) -> Self {
        Self::new(None, element)
    }

    pub fn trivia(text: impl Into<Arc<str>>) -> Self {
        Self::unnamed(SyntaxToken::trivia(text))
    }

    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn element(&self) -> &SyntaxElement {
        &self.element
    }

    pub fn with_element(&self, element: impl Into<SyntaxElement>) -> Self {
        Self::new(self.field, element)
    }
}

#[derive(Clone)]
pub struct SyntaxNode(Arc<NodeData>);

struct NodeData {
    id: NodeId,
    kind: SyntaxKind,
    children: Vector<Child>,
    text_len: usize,
    newline_count: usize,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, children: impl IntoIterator<Item = Child>) -> Self {
        Self::from_parts(NodeId::fresh(), kind, children.into_iter().collect())
    }

    fn from_parts(id: NodeId, kind: SyntaxKind, children: Vector<Child>) -> Self {
        let text_len = children.iter().map(|c| c.element.text_len()).sum();
        let newline_count = children.iter().map(|c| c.element.newline_count()).sum();
        Self(Arc::new(NodeData {
            id,
            kind,
            children,
            text_len,
            newline_count,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> SyntaxKind {
        self.0.kind
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = &Child> + '_ {
        self.0.children.iter()
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> + '_ {
        self.children().filter_map(|c| c.element.as_node())
    }

    pub fn element_by_field(&self, field: &str) -> Option<&SyntaxElement> {
        self.children()
            .find(|c| c.field == Some(field))
            .map(|c| &c.element)
    }

    pub fn elements_by_field<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a SyntaxElement> + 'a {
        self.children()
            .filter(move |c| c.field == Some(field))
            .map(|c| &c.element)
    }

    pub fn node_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.element_by_field(field).and_then(SyntaxElement::as_node)
    }

    pub fn first_child_of_kind(&self, kind: &str) -> Option<&SyntaxNode> {
        self.child_nodes().find(|n| n.kind() == kind)
    }

    /// Whether any direct token child has exactly this text.
    pub fn has_token(&self, text: &str) -> bool {
        self.children()
            .filter_map(|c| c.element.as_token())
            .any(|t| t.text() == text)
    }

    pub fn text_len(&self) -> usize {
        self.0.text_len
    }

    pub fn newline_count(&self) -> usize {
        self.0.newline_count
    }

    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.text_len());
        self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, out: &mut String) {
        for child in self.children() {
            child.element.write_to(out);
        }
    }

    /// Token text without whitespace or comments. Adjacent word tokens are
    /// separated by one space so `new byte[64]` stays distinguishable from
    /// `newbyte[64]`.
    pub fn normalized_text(&self) -> String {
        let mut out = String::new();
        self.for_each_token(&mut |token| {
            if token.is_trivia() {
                return;
            }
            push_normalized(&mut out, token.text());
        });
        out
    }

    pub fn for_each_token(&self, f: &mut impl FnMut(&SyntaxToken)) {
        for child in self.children() {
            match &child.element {
                SyntaxElement::Node(node) => node.for_each_token(f),
                SyntaxElement::Token(token) => f(token),
            }
        }
    }

    /// Same allocation, i.e. the very same version of the node.
    pub fn ptr_eq(&self, other: &SyntaxNode) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Rebuild this node with new children, keeping its identity.
    pub fn with_children(&self, children: impl IntoIterator<Item = Child>) -> SyntaxNode {
        Self::from_parts(self.id(), self.kind(), children.into_iter().collect())
    }

    /// Bottom-up structural substitution.
    ///
    /// Children are rewritten first; `f` then sees the (possibly rebuilt)
    /// node and may return a replacement. Replacements are not visited again.
    /// Subtrees where nothing changed are returned as the same allocation.
    pub fn rewrite<F>(&self, f: &mut F) -> SyntaxNode
    where
        F: FnMut(&SyntaxNode) -> Option<SyntaxNode>,
    {
        let mut rebuilt: Option<Vector<Child>> = None;
        for (index, child) in self.children().enumerate() {
            let SyntaxElement::Node(node) = &child.element else {
                if let Some(children) = rebuilt.as_mut() {
                    children.push_back(child.clone());
                }
                continue;
            };
            let new_node = node.rewrite(f);
            if new_node.ptr_eq(node) {
                if let Some(children) = rebuilt.as_mut() {
                    children.push_back(child.clone());
                }
            } else {
                let children =
                    rebuilt.get_or_insert_with(|| self.0.children.take(index));
                children.push_back(child.with_element(new_node));
            }
        }

        let node = match rebuilt {
            Some(children) => Self::from_parts(self.id(), self.kind(), children),
            None => self.clone(),
        };
        f(&node).unwrap_or(node)
    }

    /// Pre-order walk of this subtree, annotated with 1-based start lines.
    pub fn preorder(&self) -> Preorder {
        Preorder::new(self.clone(), 1)
    }

    /// Pre-order walk where `self` starts at `line`.
    pub fn preorder_from(&self, line: usize) -> Preorder {
        Preorder::new(self.clone(), line)
    }

    pub fn find(&self, id: NodeId) -> Option<SyntaxNode> {
        self.preorder().map(|entry| entry.node).find(|n| n.id() == id)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn push_normalized(out: &mut String, piece: &str) {
    let joins_words = matches!(
        (out.chars().last(), piece.chars().next()),
        (Some(a), Some(b)) if is_word_char(a) && is_word_char(b)
    );
    if joins_words {
        out.push(' ');
    }
    out.push_str(piece);
}

/// Whitespace normalization for source snippets that are not trees yet
/// (template signatures and types from rule files).
pub fn normalize_source_text(text: &str) -> String {
    let mut out = String::new();
    for piece in text.split_whitespace() {
        push_normalized(&mut out, piece);
    }
    out
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {:?}", self.kind(), self.id(), self.text())
    }
}

#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub node: SyntaxNode,
    pub line: usize,
}

/// Lazy pre-order iterator. Like `walkdir`, the subtree of the entry that
/// was just yielded can be pruned with [`Preorder::skip_subtree`].
pub struct Preorder {
    stack: Vec<(SyntaxNode, usize)>,
    pending: Option<(SyntaxNode, usize)>,
}

impl Preorder {
    fn new(root: SyntaxNode, line: usize) -> Self {
        Self {
            stack: vec![(root, line)],
            pending: None,
        }
    }

    /// Do not descend into the node returned by the last call to `next`.
    pub fn skip_subtree(&mut self) {
        self.pending = None;
    }

    fn expand(&mut self, node: &SyntaxNode, mut line: usize) {
        let mut entries = Vec::new();
        for child in node.children() {
            if let SyntaxElement::Node(child_node) = &child.element {
                entries.push((child_node.clone(), line));
            }
            line += child.element.newline_count();
        }
        self.stack.extend(entries.into_iter().rev());
    }
}

impl Iterator for Preorder {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        if let Some((node, line)) = self.pending.take() {
            self.expand(&node, line);
        }
        let (node, line) = self.stack.pop()?;
        self.pending = Some((node.clone(), line));
        Some(WalkEntry { node, line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: SyntaxKind, text: &str) -> Child {
        Child::unnamed(SyntaxToken::new(kind, text))
    }

    fn sample() -> SyntaxNode {
        let args = SyntaxNode::new(
            "argument_list",
            [token("(", "("), token("decimal_integer_literal", "5"), token(")", ")")],
        );
        let call = SyntaxNode::new(
            "method_invocation",
            [
                Child::new(Some("name"), SyntaxToken::new("identifier", "f")),
                Child::new(Some("arguments"), args),
            ],
        );
        SyntaxNode::new(
            "expression_statement",
            [Child::unnamed(call), token(";", ";"), Child::trivia("\n")],
        )
    }

    #[test]
    fn test_text_is_concatenation_of_tokens() {
        let node = sample();
        assert_eq!(node.text(), "f(5);\n");
        assert_eq!(node.text_len(), 6);
        assert_eq!(node.newline_count(), 1);
    }

    #[test]
    fn test_field_lookup() {
        let node = sample();
        let call = node.first_child_of_kind("method_invocation").unwrap();
        let name = call.element_by_field("name").unwrap();
        assert_eq!(name.text(), "f");
        assert!(call.node_by_field("arguments").is_some());
        assert!(call.node_by_field("object").is_none());
    }

    #[test]
    fn test_field_lookup_outlives_field_name() {
        let node = sample();
        let call = node.first_child_of_kind("method_invocation").unwrap();
        let name = {
            let field = String::from("name");
            call.element_by_field(&field)
        };
        assert_eq!(name.map(SyntaxElement::text).as_deref(), Some("f"));
    }

    #[test]
    fn test_rewrite_without_changes_shares_root() {
        let node = sample();
        let same = node.rewrite(&mut |_: &SyntaxNode| None);
        assert!(same.ptr_eq(&node));
    }

    #[test]
    fn test_rewrite_replaces_and_keeps_parent_identity() {
        let node = sample();
        let call_id = node.first_child_of_kind("method_invocation").unwrap().id();
        let replacement = SyntaxNode::new("identifier", [token("identifier", "g()")]);
        let new_root = node.rewrite(&mut |n: &SyntaxNode| (n.id() == call_id).then(|| replacement.clone()));

        assert_eq!(new_root.text(), "g();\n");
        assert_eq!(new_root.id(), node.id());
        assert!(!new_root.ptr_eq(&node));
        assert_eq!(node.text(), "f(5);\n", "original version is untouched");
    }

    #[test]
    fn test_rewrite_shares_untouched_siblings() {
        let left = sample();
        let right = sample();
        let root = SyntaxNode::new("block", [Child::unnamed(left.clone()), Child::unnamed(right)]);
        let target = root.child_nodes().nth(1).unwrap().id();
        let new_root = root.rewrite(&mut |n: &SyntaxNode| {
            (n.id() == target).then(|| SyntaxNode::new("empty", std::iter::empty()))
        });
        let first = new_root.child_nodes().next().unwrap();
        assert!(first.ptr_eq(&left));
        assert_eq!(new_root.text(), "f(5);\n");
    }

    #[test]
    fn test_preorder_lines_and_skip() {
        let root = SyntaxNode::new(
            "program",
            [
                Child::unnamed(sample()),
                Child::unnamed(sample()),
            ],
        );
        let mut walk = root.preorder();
        let mut statements = Vec::new();
        while let Some(entry) = walk.next() {
            if entry.node.kind() == "expression_statement" {
                statements.push(entry.line);
                walk.skip_subtree();
            }
            assert_ne!(entry.node.kind(), "argument_list", "subtree was skipped");
        }
        assert_eq!(statements, vec![1, 2]);
    }

    #[test]
    fn test_normalized_text_keeps_word_boundaries() {
        assert_eq!(
            normalize_source_text("  new   byte [ 64 ] "),
            "new byte[64]"
        );
        assert_eq!(normalize_source_text("java.util .List< String >"), "java.util.List<String>");
    }

    #[test]
    fn test_find_by_id() {
        let node = sample();
        let args = node
            .first_child_of_kind("method_invocation")
            .and_then(|c| c.node_by_field("arguments"))
            .unwrap()
            .clone();
        assert_eq!(node.find(args.id()).unwrap().text(), "(5)");
    }
}
