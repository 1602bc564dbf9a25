//! Argument types readable straight off the tree.
//!
//! There is no type checker behind this: literals, array creations, casts and
//! string concatenations have an apparent type, everything else is
//! [`ApparentType::Unknown`] and is assumed to fit any parameter.

use crate::rules::ParamKind;
use crate::syntax::SyntaxElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApparentType {
    Int,
    Long,
    Boolean,
    Char,
    String,
    CharArray,
    Null,
    /// Known, but none of the kinds signatures talk about (`1.5`, `new int[3]`).
    Other,
    Unknown,
}

impl ApparentType {
    fn from_type_name(name: &str) -> Self {
        match name {
            "int" | "short" | "byte" | "Integer" => Self::Int,
            "long" | "Long" => Self::Long,
            "boolean" | "Boolean" => Self::Boolean,
            "char" | "Character" => Self::Char,
            "String" | "java.lang.String" => Self::String,
            "char[]" => Self::CharArray,
            "float" | "double" | "Float" | "Double" => Self::Other,
            _ => Self::Unknown,
        }
    }

    /// Whether an argument of this type can be passed for `param`.
    pub fn fits(self, param: ParamKind) -> bool {
        use ApparentType as A;
        match (self, param) {
            (A::Unknown, _) | (_, ParamKind::Object) => true,
            (A::Int, ParamKind::Int | ParamKind::Long) => true,
            (A::Char, ParamKind::Char | ParamKind::Int | ParamKind::Long) => true,
            (A::Long, ParamKind::Long) => true,
            (A::Boolean, ParamKind::Boolean) => true,
            (A::String, ParamKind::String) => true,
            (A::CharArray, ParamKind::CharArray) => true,
            (A::Null, ParamKind::String | ParamKind::CharArray) => true,
            _ => false,
        }
    }
}

fn integer_literal(text: &str) -> ApparentType {
    if text.ends_with(['l', 'L']) {
        ApparentType::Long
    } else {
        ApparentType::Int
    }
}

pub fn apparent_type(expr: &SyntaxElement) -> ApparentType {
    match expr.kind() {
        "decimal_integer_literal"
        | "hex_integer_literal"
        | "octal_integer_literal"
        | "binary_integer_literal" => integer_literal(&expr.normalized_text()),
        "decimal_floating_point_literal" | "hex_floating_point_literal" => ApparentType::Other,
        "true" | "false" => ApparentType::Boolean,
        "character_literal" => ApparentType::Char,
        "string_literal" | "text_block" => ApparentType::String,
        "null_literal" => ApparentType::Null,
        _ => match expr.as_node() {
            Some(node) => composite_type(node),
            None => ApparentType::Unknown,
        },
    }
}

fn composite_type(node: &crate::syntax::SyntaxNode) -> ApparentType {
    match node.kind() {
        "parenthesized_expression" => node
            .children()
            .map(|c| c.element())
            .find(|e| !e.is_trivia() && !matches!(e.kind(), "(" | ")"))
            .map(apparent_type)
            .unwrap_or(ApparentType::Unknown),
        "cast_expression" => node
            .element_by_field("type")
            .map(|t| ApparentType::from_type_name(&t.normalized_text()))
            .unwrap_or(ApparentType::Unknown),
        "array_creation_expression" => {
            let element = node
                .element_by_field("type")
                .map(SyntaxElement::normalized_text)
                .unwrap_or_default();
            let dimensions: usize = node
                .elements_by_field("dimensions")
                .map(|d| d.normalized_text().matches('[').count())
                .sum();
            if element == "char" && dimensions == 1 {
                ApparentType::CharArray
            } else {
                ApparentType::Other
            }
        }
        "binary_expression" => {
            let operator = node
                .element_by_field("operator")
                .map(SyntaxElement::normalized_text);
            let sides = [node.element_by_field("left"), node.element_by_field("right")];
            let any_string = sides
                .iter()
                .flatten()
                .any(|side| apparent_type(side) == ApparentType::String);
            match operator.as_deref() {
                Some("+") if any_string => ApparentType::String,
                Some("==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||") => ApparentType::Boolean,
                _ => ApparentType::Unknown,
            }
        }
        "unary_expression" => {
            let operand = node.element_by_field("operand").map(apparent_type);
            match operand {
                Some(ApparentType::Char) => ApparentType::Int,
                Some(t @ (ApparentType::Int | ApparentType::Long | ApparentType::Boolean)) => t,
                _ => ApparentType::Unknown,
            }
        }
        "method_invocation" => {
            let name = node.element_by_field("name").map(SyntaxElement::normalized_text);
            match name.as_deref() {
                Some("toCharArray") => ApparentType::CharArray,
                Some("toString") => ApparentType::String,
                _ => ApparentType::Unknown,
            }
        }
        _ => ApparentType::Unknown,
    }
}

/// Whether the call's arguments can bind to `params`.
pub fn arguments_fit(args: &[SyntaxElement], params: &[ParamKind]) -> bool {
    args.len() == params.len()
        && args
            .iter()
            .zip(params)
            .all(|(arg, param)| apparent_type(arg).fits(*param))
}
