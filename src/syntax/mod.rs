//! Java syntax: lossless tree, tree-sitter adapter and typed views.

pub mod ast;
pub mod parser;
pub mod tree;

pub use ast::{
    CallExpr, CompilationUnit, FieldDecl, ImportDecl, Initializer, Member, MethodDecl, TypeDecl,
    TypeKind,
};
pub use parser::{parse, parse_import, parse_member, parse_tree};
pub use tree::{normalize_source_text, Child, NodeId, SyntaxElement, SyntaxNode, SyntaxToken, WalkEntry};
