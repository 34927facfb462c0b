//! Import specifier extraction from a parsed syntax tree
//!
//! Recognized forms, in document order:
//! - `import ... from "x"` and side-effect `import "x"`
//! - `export ... from "x"`
//! - `import x = require("x")`
//! - `require("x")` and dynamic `import("x")` with a literal argument

use tree_sitter::{Node, Tree};

/// Raw specifiers as written in the source, before resolution.
pub fn extract_specifiers(tree: &Tree, source: &[u8]) -> Vec<String> {
    let mut specifiers = Vec::new();
    let mut cursor = tree.walk();

    loop {
        if let Some(specifier) = specifier_of(cursor.node(), source) {
            specifiers.push(specifier);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return specifiers;
            }
        }
    }
}

fn specifier_of(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "import_statement" | "export_statement" => {
            string_literal(node.child_by_field_name("source")?, source)
        }
        "import_require_clause" => {
            let literal = node
                .child_by_field_name("source")
                .or_else(|| first_child_of_kind(node, "string"))?;
            string_literal(literal, source)
        }
        "call_expression" => {
            let function = node.child_by_field_name("function")?;
            let is_loader = match function.kind() {
                "import" => true,
                "identifier" => function.utf8_text(source).ok()? == "require",
                _ => false,
            };
            if !is_loader {
                return None;
            }
            let arguments = node.child_by_field_name("arguments")?;
            string_literal(arguments.named_child(0)?, source)
        }
        _ => None,
    }
}

fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Text of a string or substitution-free template literal, quotes removed.
fn string_literal(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            if first_child_of_kind(node, "template_substitution").is_some() {
                return None;
            }
        }
        _ => return None,
    }

    let text = node.utf8_text(source).ok()?;
    let inner = text
        .strip_prefix(['"', '\'', '`'])
        .and_then(|t| t.strip_suffix(['"', '\'', '`']))?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_string())
}
