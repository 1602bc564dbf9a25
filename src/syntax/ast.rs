//! Typed views over the Java syntax tree.
//!
//! Views are cheap wrappers around a [`SyntaxNode`]; they read the tree and
//! never change it. Edits go through [`SyntaxNode::rewrite`] and produce a
//! new [`CompilationUnit`].

use super::tree::{SyntaxElement, SyntaxNode, WalkEntry};
use crate::syntax::tree::NodeId;

/// Node kinds that declare a type.
pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

pub fn is_type_declaration(kind: &str) -> bool {
    TYPE_DECLARATION_KINDS.contains(&kind)
}

/// Root entity for one source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    root: SyntaxNode,
}

impl CompilationUnit {
    pub fn from_root(root: SyntaxNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Source text of the unit. Untouched subtrees print byte-identically.
    pub fn print(&self) -> String {
        self.root.text()
    }

    /// Whether `other` is the very same version of the tree.
    pub fn same_version(&self, other: &CompilationUnit) -> bool {
        self.root.ptr_eq(&other.root)
    }

    pub fn package_name(&self) -> Option<String> {
        self.root
            .first_child_of_kind("package_declaration")
            .and_then(qualified_name_child)
    }

    pub fn package_declaration(&self) -> Option<&SyntaxNode> {
        self.root.first_child_of_kind("package_declaration")
    }

    pub fn imports(&self) -> Vec<ImportDecl> {
        self.root
            .child_nodes()
            .filter(|n| n.kind() == "import_declaration")
            .map(|n| ImportDecl { node: n.clone() })
            .collect()
    }

    /// Top-level type declarations in source order.
    pub fn type_declarations(&self) -> Vec<TypeDecl> {
        self.root
            .child_nodes()
            .filter_map(|n| TypeDecl::cast(n.clone()))
            .collect()
    }

    /// Every type declaration in the unit, nested and local ones included,
    /// with the line it starts on.
    pub fn all_type_declarations(&self) -> Vec<(TypeDecl, usize)> {
        self.root
            .preorder()
            .filter_map(|WalkEntry { node, line }| TypeDecl::cast(node).map(|t| (t, line)))
            .collect()
    }
}

/// Text of the first `identifier`/`scoped_identifier` child, whitespace removed.
fn qualified_name_child(node: &SyntaxNode) -> Option<String> {
    node.children()
        .map(|c| c.element())
        .find(|e| matches!(e.kind(), "identifier" | "scoped_identifier"))
        .map(SyntaxElement::normalized_text)
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    node: SyntaxNode,
}

impl ImportDecl {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        (node.kind() == "import_declaration").then_some(Self { node })
    }

    pub fn node(&self) -> &SyntaxNode {
        &self.node
    }

    /// Imported name without the trailing `.*`.
    pub fn path(&self) -> String {
        qualified_name_child(&self.node).unwrap_or_default()
    }

    pub fn is_static(&self) -> bool {
        self.node.has_token("static")
    }

    pub fn is_wildcard(&self) -> bool {
        self.node.children().any(|c| c.element().kind() == "asterisk")
    }

    /// Last segment of the path.
    pub fn simple_name(&self) -> String {
        let path = self.path();
        match path.rsplit_once('.') {
            Some((_, simple)) => simple.to_string(),
            None => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(Self::Class),
            "interface_declaration" => Some(Self::Interface),
            "enum_declaration" => Some(Self::Enum),
            "record_declaration" => Some(Self::Record),
            "annotation_type_declaration" => Some(Self::Annotation),
            _ => None,
        }
    }

    /// Whether static fields, static initializers and static methods can be
    /// added to a body of this kind without restructuring it.
    pub fn can_host_members(self) -> bool {
        matches!(self, Self::Class | Self::Record)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Annotation => "@interface",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    node: SyntaxNode,
    kind: TypeKind,
}

impl TypeDecl {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        TypeKind::from_kind(node.kind()).map(|kind| Self { node, kind })
    }

    pub fn node(&self) -> &SyntaxNode {
        &self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.node
            .element_by_field("name")
            .map(SyntaxElement::normalized_text)
            .unwrap_or_default()
    }

    pub fn body(&self) -> Option<&SyntaxNode> {
        self.node.node_by_field("body")
    }

    /// Member declarations of the body, in source order.
    pub fn members(&self) -> Vec<Member> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let declarations = match self.kind {
            TypeKind::Enum => body
                .first_child_of_kind("enum_body_declarations")
                .map(|n| n.child_nodes().cloned().collect())
                .unwrap_or_default(),
            _ => body.child_nodes().cloned().collect::<Vec<_>>(),
        };
        declarations
            .into_iter()
            .filter(|n| !super::tree::is_comment_kind(n.kind()))
            .map(Member::from_node)
            .collect()
    }

    /// Names of methods declared directly in this type.
    pub fn method_names(&self) -> Vec<String> {
        self.members()
            .iter()
            .filter_map(|m| match m {
                Member::Method(method) => Some(method.name()),
                _ => None,
            })
            .collect()
    }
}

/// Member declaration of a type body.
#[derive(Debug, Clone)]
pub enum Member {
    Field(FieldDecl),
    StaticInitializer(Initializer),
    Method(MethodDecl),
    /// Constructors, nested types, instance initializers.
    Other(SyntaxNode),
}

impl Member {
    pub fn from_node(node: SyntaxNode) -> Self {
        match node.kind() {
            "field_declaration" => Self::Field(FieldDecl { node }),
            "static_initializer" => Self::StaticInitializer(Initializer { node }),
            "method_declaration" => Self::Method(MethodDecl { node }),
            _ => Self::Other(node),
        }
    }

    pub fn node(&self) -> &SyntaxNode {
        match self {
            Self::Field(f) => &f.node,
            Self::StaticInitializer(i) => &i.node,
            Self::Method(m) => &m.node,
            Self::Other(node) => node,
        }
    }
}

fn has_modifier(node: &SyntaxNode, modifier: &str) -> bool {
    node.first_child_of_kind("modifiers")
        .is_some_and(|m| m.has_token(modifier))
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    node: SyntaxNode,
}

impl FieldDecl {
    /// Declared names; `int a, b;` declares two.
    pub fn names(&self) -> Vec<String> {
        self.node
            .elements_by_field("declarator")
            .filter_map(SyntaxElement::as_node)
            .filter_map(|d| d.element_by_field("name"))
            .map(SyntaxElement::normalized_text)
            .collect()
    }

    pub fn declared_type(&self) -> String {
        self.node
            .element_by_field("type")
            .map(SyntaxElement::normalized_text)
            .unwrap_or_default()
    }

    pub fn is_static(&self) -> bool {
        has_modifier(&self.node, "static")
    }

    /// Human readable signature used in conflict reports.
    pub fn describe(&self) -> String {
        describe_field(self.is_static(), &self.declared_type(), &self.names().join(", "))
    }
}

pub(crate) fn describe_field(is_static: bool, ty: &str, name: &str) -> String {
    format!("{}{} {}", if is_static { "static " } else { "" }, ty, name)
}

#[derive(Debug, Clone)]
pub struct Initializer {
    node: SyntaxNode,
}

impl Initializer {
    /// Normalized text of the whole `static { ... }` declaration.
    pub fn normalized_text(&self) -> String {
        self.node.normalized_text()
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    node: SyntaxNode,
}

impl MethodDecl {
    pub fn name(&self) -> String {
        self.node
            .element_by_field("name")
            .map(SyntaxElement::normalized_text)
            .unwrap_or_default()
    }

    pub fn return_type(&self) -> String {
        self.node
            .element_by_field("type")
            .map(SyntaxElement::normalized_text)
            .unwrap_or_default()
    }

    pub fn parameter_types(&self) -> Vec<String> {
        let Some(params) = self.node.node_by_field("parameters") else {
            return Vec::new();
        };
        params
            .child_nodes()
            .filter_map(|p| match p.kind() {
                "formal_parameter" => p.element_by_field("type").map(SyntaxElement::normalized_text),
                "spread_parameter" => Some(spread_parameter_type(p)),
                _ => None,
            })
            .collect()
    }

    pub fn is_static(&self) -> bool {
        has_modifier(&self.node, "static")
    }

    pub fn describe(&self) -> String {
        describe_method(
            self.is_static(),
            &self.return_type(),
            &self.name(),
            &self.parameter_types(),
        )
    }
}

pub(crate) fn describe_method(is_static: bool, returns: &str, name: &str, params: &[String]) -> String {
    format!(
        "{}{} {}({})",
        if is_static { "static " } else { "" },
        returns,
        name,
        params.join(", ")
    )
}

/// `char... chars` has its type as an unnamed child ahead of the `...` token.
fn spread_parameter_type(param: &SyntaxNode) -> String {
    let mut ty = String::new();
    for child in param.children() {
        let element = child.element();
        if element.kind() == "..." {
            break;
        }
        if element.kind() == "modifiers" || element.is_trivia() {
            continue;
        }
        ty.push_str(&element.normalized_text());
    }
    ty.push_str("...");
    ty
}

/// A `method_invocation` node.
#[derive(Debug, Clone)]
pub struct CallExpr {
    node: SyntaxNode,
}

impl CallExpr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        (node.kind() == "method_invocation").then_some(Self { node })
    }

    pub fn node(&self) -> &SyntaxNode {
        &self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn name(&self) -> Option<String> {
        self.node
            .element_by_field("name")
            .map(SyntaxElement::normalized_text)
    }

    pub fn has_receiver(&self) -> bool {
        self.node.element_by_field("object").is_some()
    }

    /// Receiver written as a (possibly dotted) name, e.g. `RandomStringUtils`
    /// or `org.apache.commons.lang3.RandomStringUtils`. `None` when there is
    /// no receiver or the receiver is any other expression.
    pub fn qualifier(&self) -> Option<String> {
        let object = self.node.element_by_field("object")?;
        if !matches!(object.kind(), "identifier" | "field_access" | "scoped_identifier") {
            return None;
        }
        let text = object.normalized_text();
        let is_name = !text.is_empty()
            && text
                .split('.')
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
        is_name.then_some(text)
    }

    /// Argument expressions in order, punctuation and comments dropped.
    pub fn arguments(&self) -> Vec<SyntaxElement> {
        let Some(list) = self.node.node_by_field("arguments") else {
            return Vec::new();
        };
        list.children()
            .map(|c| c.element())
            .filter(|e| !e.is_trivia() && !matches!(e.kind(), "(" | ")" | ","))
            .cloned()
            .collect()
    }
}
