use std::path::Path;
use tree_sitter::{Language, Node};

use crate::model::{CodeUnit, SkeletonType, MODULE_CONTAINER};
use crate::profile::LanguageProfile;
use crate::profiles::ecma_visibility_prefix;

/// JavaScript profile.
///
/// Normalizes the grammar's many function shapes (declarations, methods,
/// arrow and function expressions bound to declarators, generators) and the
/// class-expression forms (`const Foo = class {}`, `static Inner = class {}`)
/// into the uniform code-unit model.
pub struct JavaScriptProfile;

impl LanguageProfile for JavaScriptProfile {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn grammar(&self) -> Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn query_resource(&self) -> &'static str {
        include_str!("../../queries/javascript.scm")
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
            other => {
                tracing::debug!(
                    capture = other,
                    name = simple_name,
                    chain = class_chain,
                    "ignoring capture in JavaScript profile"
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
            // Methods render without the `function` keyword.
            "method_definition" => format!("{export_prefix}{async_prefix}{name}{params}{ret_suffix}"),
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
        // Classes can be declarations or expressions; "class_expression" for
        // older/generic grammars.
        matches!(node.kind(), "class_declaration" | "class" | "class_expression")
    }
}
