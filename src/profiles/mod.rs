pub mod javascript;
#[cfg(feature = "lang-typescript")]
pub mod typescript;

use tree_sitter::Node;

fn node_text<'a>(src: &'a str, node: Node) -> &'a str {
    std::str::from_utf8(&src.as_bytes()[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Shared `export` / declaration-keyword prefix logic for the ECMAScript
/// family. Three shapes to cover:
///
/// 1. `export const x = 1;` — node is the *declarator*; fold the keyword into
///    the prefix ("export const ", "let ", ...).
/// 2. `export class Foo {}` / `export function f() {}` — node's parent is the
///    export statement.
/// 3. `export const f = () => {}` — node is the declarator's *value*; walk
///    declarator -> declaration -> export statement.
fn ecma_visibility_prefix(node: Node, src: &str) -> String {
    let Some(parent) = node.parent() else {
        return String::new();
    };

    let is_decl =
        |kind: &str| -> bool { kind == "lexical_declaration" || kind == "variable_declaration" };

    if node.kind() == "variable_declarator" && is_decl(parent.kind()) {
        let keyword = parent
            .child(0)
            .map(|k| node_text(src, k))
            .unwrap_or_default();
        let exported = parent
            .parent()
            .is_some_and(|gp| gp.kind() == "export_statement");

        let mut prefix = String::new();
        if exported {
            prefix.push_str("export ");
        }
        if !keyword.is_empty() {
            prefix.push_str(keyword);
            prefix.push(' ');
        }
        return prefix;
    }

    if parent.kind() == "export_statement" {
        return "export ".to_string();
    }

    if parent.kind() == "variable_declarator" {
        if let Some(decl) = parent.parent().filter(|d| is_decl(d.kind())) {
            if decl
                .parent()
                .is_some_and(|e| e.kind() == "export_statement")
            {
                return "export ".to_string();
            }
        }
    }

    String::new()
}
