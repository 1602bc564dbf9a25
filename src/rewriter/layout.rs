//! Indentation and line-ending conventions of an existing type body.

use crate::syntax::tree::TRIVIA;
use crate::syntax::{NodeId, SyntaxElement, SyntaxNode};

/// Indent unit used in member templates.
const TEMPLATE_INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLayout {
    /// Indentation of members inside the body.
    pub member_indent: String,
    /// Indentation of the closing brace.
    pub closing_indent: String,
    /// One level of indentation.
    pub unit: String,
    pub newline: &'static str,
}

impl BodyLayout {
    pub fn detect(root: &SyntaxNode, host: &SyntaxNode, body: &SyntaxNode) -> Self {
        let newline = if root.text().contains("\r\n") { "\r\n" } else { "\n" };

        let trivia: Vec<(usize, &str)> = body
            .children()
            .enumerate()
            .filter_map(|(i, c)| {
                c.element()
                    .as_token()
                    .filter(|t| t.kind() == TRIVIA)
                    .map(|t| (i, t.text()))
            })
            .collect();
        let last_index = body.children().count().saturating_sub(1);

        let closing_indent = trivia
            .iter()
            .find(|(i, _)| *i + 1 == last_index)
            .and_then(|(_, text)| indent_after_newline(text))
            .unwrap_or_else(|| leading_whitespace(&line_prefix_of(root, host.id())));

        let member_indent = trivia
            .iter()
            .filter(|(i, _)| *i + 1 < last_index)
            .find_map(|(_, text)| indent_after_newline(text));

        let (member_indent, unit) = match member_indent {
            Some(member) => {
                let unit = match member.strip_prefix(closing_indent.as_str()) {
                    Some(rest) if !rest.is_empty() => rest.to_string(),
                    _ if member.contains('\t') => "\t".to_string(),
                    _ => TEMPLATE_INDENT.to_string(),
                };
                (member, unit)
            }
            None => {
                let unit = if closing_indent.contains('\t') {
                    "\t".to_string()
                } else {
                    TEMPLATE_INDENT.to_string()
                };
                (format!("{}{}", closing_indent, unit), unit)
            }
        };

        Self {
            member_indent,
            closing_indent,
            unit,
            newline,
        }
    }

    /// Template text indented for this body. The first line carries no
    /// indentation; the inserting separator provides it.
    pub fn reindent(&self, template: &str) -> String {
        template
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    return line.trim_start().to_string();
                }
                if line.trim().is_empty() {
                    return String::new();
                }
                let content = line.trim_start_matches(' ');
                let spaces = line.len() - content.len();
                format!(
                    "{}{}{}{}",
                    self.member_indent,
                    self.unit.repeat(spaces / TEMPLATE_INDENT.len()),
                    " ".repeat(spaces % TEMPLATE_INDENT.len()),
                    content
                )
            })
            .collect::<Vec<_>>()
            .join(self.newline)
    }

    /// Line break followed by member indentation.
    pub fn member_break(&self) -> String {
        format!("{}{}", self.newline, self.member_indent)
    }

    /// Blank line followed by member indentation.
    pub fn blank_line_break(&self) -> String {
        format!("{}{}{}", self.newline, self.newline, self.member_indent)
    }
}

fn indent_after_newline(text: &str) -> Option<String> {
    let (_, after) = text.rsplit_once('\n')?;
    after
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then(|| after.to_string())
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').collect()
}

/// Text between the last line break before `target` and its first token.
fn line_prefix_of(root: &SyntaxNode, target: NodeId) -> String {
    fn walk(node: &SyntaxNode, target: NodeId, line: &mut String) -> bool {
        if node.id() == target {
            return true;
        }
        for child in node.children() {
            match child.element() {
                SyntaxElement::Node(n) => {
                    if walk(n, target, line) {
                        return true;
                    }
                }
                SyntaxElement::Token(t) => match t.text().rfind('\n') {
                    Some(i) => {
                        line.clear();
                        line.push_str(&t.text()[i + 1..]);
                    }
                    None => line.push_str(t.text()),
                },
            }
        }
        false
    }

    let mut line = String::new();
    walk(root, target, &mut line);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use indoc::indoc;

    fn layout_of(source: &str, type_name: &str) -> BodyLayout {
        let unit = parse(source).unwrap();
        let (decl, _) = unit
            .all_type_declarations()
            .into_iter()
            .find(|(t, _)| t.name() == type_name)
            .unwrap();
        BodyLayout::detect(unit.root(), decl.node(), decl.body().unwrap())
    }

    #[test]
    fn test_four_space_body() {
        let layout = layout_of("class A {\n    int x;\n}\n", "A");
        assert_eq!(layout.member_indent, "    ");
        assert_eq!(layout.closing_indent, "");
        assert_eq!(layout.unit, "    ");
        assert_eq!(layout.newline, "\n");
    }

    #[test]
    fn test_nested_two_space_body() {
        let source = indoc! {"
            class A {
              static class B {
                int x;
              }
            }
        "};
        let layout = layout_of(source, "B");
        assert_eq!(layout.member_indent, "    ");
        assert_eq!(layout.closing_indent, "  ");
        assert_eq!(layout.unit, "  ");
    }

    #[test]
    fn test_empty_nested_body_uses_host_line() {
        let source = "class A {\n\tstatic class B {}\n}\n";
        let layout = layout_of(source, "B");
        assert_eq!(layout.closing_indent, "\t");
        assert_eq!(layout.member_indent, "\t\t");
        assert_eq!(layout.unit, "\t");
    }

    #[test]
    fn test_crlf_is_detected() {
        let layout = layout_of("class A {\r\n    int x;\r\n}\r\n", "A");
        assert_eq!(layout.newline, "\r\n");
        assert_eq!(layout.member_indent, "    ");
    }

    #[test]
    fn test_reindent_template() {
        let layout = BodyLayout {
            member_indent: "\t".into(),
            closing_indent: String::new(),
            unit: "\t".into(),
            newline: "\n",
        };
        let text = layout.reindent("static {\n    SECURE_RANDOM.nextBytes(new byte[64]);\n}");
        assert_eq!(text, "static {\n\t\tSECURE_RANDOM.nextBytes(new byte[64]);\n\t}");
    }
}
