use std::path::Path;
use tree_sitter::{Language, Node};

use crate::model::{CodeUnit, SkeletonType, MODULE_CONTAINER};
use crate::profile::LanguageProfile;
use crate::profiles::ecma_visibility_prefix;

/// TypeScript profile.
///
/// Interfaces, abstract classes and enums are class-like; signature-only
/// members (`method_signature`, `property_signature`) extract like their
/// implemented counterparts. Type aliases are captured by the query but
/// deliberately skipped: they have no body worth summarizing, and the skip
/// exercises the `create_code_unit -> None` path.
pub struct TypeScriptProfile;

impl LanguageProfile for TypeScriptProfile {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        // TSX needs the separate tsx grammar; not wired up yet.
        &["ts", "mts", "cts"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn query_resource(&self) -> &'static str {
        include_str!("../../queries/typescript.scm")
    }

    fn create_code_unit(
        &self,
        file: &Path,
        capture_tag: &str,
        simple_name: &str,
        _namespace_hint: &str,
        class_chain: &str,
    ) -> Option<CodeUnit> {
        let pkg = crate::model::package_path_for(file);
        match capture_tag {
            "class.definition" => {
                let short = if class_chain.is_empty() {
                    simple_name.to_string()
                } else {
                    format!("{class_chain}${simple_name}")
                };
                Some(CodeUnit::cls(file, &pkg, &short))
            }
            "function.definition" => {
                let short = if class_chain.is_empty() {
                    simple_name.to_string()
                } else {
                    format!("{class_chain}.{simple_name}")
                };
                Some(CodeUnit::func(file, &pkg, &short))
            }
            "field.definition" => {
                let short = if class_chain.is_empty() {
                    format!("{MODULE_CONTAINER}.{simple_name}")
                } else {
                    format!("{class_chain}.{simple_name}")
                };
                Some(CodeUnit::field(file, &pkg, &short))
            }
            "type.definition" => {
                tracing::debug!(name = simple_name, "skipping type alias");
                None
            }
            other => {
                tracing::debug!(
                    capture = other,
                    name = simple_name,
                    chain = class_chain,
                    "ignoring capture in TypeScript profile"
                );
                None
            }
        }
    }

    fn body_placeholder(&self) -> &'static str {
        "{...}"
    }

    fn skeleton_type_for(&self, capture_tag: &str) -> SkeletonType {
        match capture_tag {
            "class.definition" => SkeletonType::ClassLike,
            "function.definition" => SkeletonType::FunctionLike,
            "field.definition" => SkeletonType::FieldLike,
            _ => SkeletonType::Unsupported,
        }
    }

    fn render_function_signature(
        &self,
        node: Node,
        _src: &str,
        export_prefix: &str,
        async_prefix: &str,
        name: &str,
        params: &str,
        return_type: &str,
    ) -> String {
        let ret_suffix = if return_type.is_empty() {
            String::new()
        } else {
            format!(": {return_type}")
        };
        match node.kind() {
            "arrow_function" => {
                format!("{export_prefix}{async_prefix}{name}{params}{ret_suffix} =>")
            }
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                format!("{export_prefix}{async_prefix}{name}{params}{ret_suffix}")
            }
            _ => format!("{export_prefix}{async_prefix}function {name}{params}{ret_suffix}"),
        }
    }

    fn visibility_prefix(&self, node: Node, src: &str) -> String {
        ecma_visibility_prefix(node, src)
    }

    fn render_class_header(
        &self,
        _node: Node,
        _src: &str,
        export_prefix: &str,
        signature_text: &str,
    ) -> String {
        format!("{export_prefix}{signature_text} {{")
    }

    fn closer(&self, unit: &CodeUnit) -> &'static str {
        if unit.is_class() {
            "}"
        } else {
            ""
        }
    }

    fn is_class_like(&self, node: Node) -> bool {
        matches!(
            node.kind(),
            "class_declaration"
                | "abstract_class_declaration"
                | "class"
                | "class_expression"
                | "interface_declaration"
                | "enum_declaration"
        )
    }
}
