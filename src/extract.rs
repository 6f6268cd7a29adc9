use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, QueryCursor, StreamingIterator};

use crate::error::{AnalyzerError, ExtractFailure};
use crate::model::{package_path_for, CodeUnit, CodeUnitKind, SkeletonType, NESTED_CLASS_SEP};
use crate::profile::{LanguageProfile, ProfileEntry};

/// One extracted unit plus everything the renderer and the usage scanner
/// need later, so neither has to touch the parse tree again.
#[derive(Debug, Clone)]
pub struct OutlineUnit {
    pub unit: CodeUnit,
    pub skeleton_type: SkeletonType,
    /// Pre-rendered one-liner: class header, function signature (no body),
    /// or the literal field declaration.
    pub rendered: String,
    pub start_byte: usize,
    pub end_byte: usize,
    /// Byte range of the name token, so usage scans can tell the definition
    /// site apart from references inside the same unit.
    pub name_start_byte: usize,
    pub name_end_byte: usize,
}

/// The ordered outline of a single successfully extracted file.
#[derive(Debug, Clone)]
pub struct FileOutline {
    pub file: PathBuf,
    pub language: &'static str,
    /// Source order preserved; never reordered after extraction.
    pub units: Vec<OutlineUnit>,
}

/// Result of one extraction pass over one file. Failures here are local to
/// the pass and never abort a batch.
#[derive(Debug)]
pub enum ExtractOutcome {
    Extracted(FileOutline),
    Failed(ExtractFailure),
}

struct RawMatch<'q, 't> {
    tag: &'q str,
    def: Node<'t>,
    name: Node<'t>,
}

/// Dedup priority when several patterns claim the same name node: an arrow
/// declarator is a function, not a field; a class-valued field is a class.
fn tag_priority(tag: &str) -> u8 {
    if tag.starts_with("class.") {
        0
    } else if tag.starts_with("function.") {
        1
    } else if tag.starts_with("field.") {
        2
    } else {
        3
    }
}

fn node_text<'a>(src: &'a str, node: Node) -> &'a str {
    std::str::from_utf8(&src.as_bytes()[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Parse one file and materialize its ordered code-unit outline.
///
/// The profile's query is compiled once per language and cached; a compile
/// failure is the one fatal condition and surfaces as `Err`. Everything
/// file-local (parse errors, unknown captures) degrades to
/// [`ExtractOutcome::Failed`] or a skipped match.
pub fn extract_outline(
    entry: &ProfileEntry,
    file: &Path,
    src: &str,
) -> Result<ExtractOutcome, AnalyzerError> {
    let profile = entry.profile();
    let query = entry.compiled_query()?;

    let mut parser = Parser::new();
    parser
        .set_language(&profile.grammar())
        .map_err(|e| AnalyzerError::GrammarUnavailable {
            language: profile.name(),
            message: e.to_string(),
        })?;

    let Some(tree) = parser.parse(src, None) else {
        tracing::warn!(file = %file.display(), "parse failed; file excluded for this pass");
        return Ok(ExtractOutcome::Failed(ExtractFailure::ParseFailed));
    };
    let root = tree.root_node();
    if root.has_error() {
        tracing::warn!(file = %file.display(), "syntax errors; file excluded for this pass");
        return Ok(ExtractOutcome::Failed(ExtractFailure::ParseFailed));
    }

    // Pass 1: collect raw matches, pairing each definition capture with its
    // name capture.
    let ignored = profile.ignored_captures();
    let mut raw: Vec<RawMatch> = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, root, src.as_bytes());
    while let Some(m) = matches.next() {
        let mut def: Option<(&str, Node)> = None;
        let mut name: Option<Node> = None;

        for cap in m.captures {
            let cap_name = query.capture_names()[cap.index as usize];
            if ignored.contains(&cap_name) {
                continue;
            }
            if cap_name.ends_with(".definition") {
                def = Some((cap_name, cap.node));
            } else if cap_name.ends_with(".name") {
                name = Some(cap.node);
            } else {
                tracing::debug!(capture = cap_name, "unrecognized capture; skipping");
            }
        }

        match (def, name) {
            (Some((tag, def)), Some(name)) => raw.push(RawMatch { tag, def, name }),
            (Some((tag, _)), None) => {
                tracing::debug!(capture = tag, "definition without a name; skipping")
            }
            _ => {}
        }
    }

    // Pass 2: resolve pattern overlap. Stable sort by priority, then first
    // claim on a name node wins.
    raw.sort_by_key(|r| tag_priority(r.tag));
    let mut claimed_names: HashSet<usize> = HashSet::new();
    let mut by_def: HashMap<usize, RawMatch> = HashMap::new();
    for r in raw {
        if !claimed_names.insert(r.name.id()) {
            continue;
        }
        by_def.entry(r.def.id()).or_insert(r);
    }

    // Pass 3: single iterative depth-first walk with an explicit class-chain
    // stack, bounded by tree depth. Units are emitted in document order.
    let namespace_hint = package_path_for(file);
    let mut units: Vec<OutlineUnit> = Vec::new();
    let mut seen: HashSet<(CodeUnitKind, String)> = HashSet::new();
    let mut chain: Vec<(usize, String)> = Vec::new();
    let mut stack: Vec<(Node, bool)> = vec![(root, false)];

    while let Some((node, exiting)) = stack.pop() {
        if exiting {
            if chain.last().is_some_and(|(id, _)| *id == node.id()) {
                chain.pop();
            }
            continue;
        }

        if let Some(r) = by_def.get(&node.id()) {
            let simple_name = node_text(src, r.name).trim();
            let chain_str = join_chain(&chain);
            if let Some(unit) =
                profile.create_code_unit(file, r.tag, simple_name, &namespace_hint, &chain_str)
            {
                let skeleton_type = profile.skeleton_type_for(r.tag);
                if seen.insert((unit.kind(), unit.short_name().to_string())) {
                    let rendered =
                        render_unit_line(profile, src, node, simple_name, skeleton_type);
                    units.push(OutlineUnit {
                        unit,
                        skeleton_type,
                        rendered,
                        start_byte: node.start_byte(),
                        end_byte: node.end_byte(),
                        name_start_byte: r.name.start_byte(),
                        name_end_byte: r.name.end_byte(),
                    });
                } else {
                    tracing::debug!(
                        name = unit.short_name(),
                        "duplicate qualified name within (file, kind); dropping"
                    );
                }
            }
        }

        let push_name = if profile.is_class_like(node) {
            class_chain_name(src, node, &by_def)
        } else {
            None
        };

        stack.push((node, true));
        if let Some(n) = push_name {
            chain.push((node.id(), n));
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push((child, false));
            }
        }
    }

    Ok(ExtractOutcome::Extracted(FileOutline {
        file: file.to_path_buf(),
        language: profile.name(),
        units,
    }))
}

fn join_chain(chain: &[(usize, String)]) -> String {
    let mut out = String::new();
    for (_, name) in chain {
        if !out.is_empty() {
            out.push(NESTED_CLASS_SEP);
        }
        out.push_str(name);
    }
    out
}

/// Display name for a class-like node entering the chain: prefer the query's
/// name capture (covers `const Foo = class {}`), fall back to the grammar's
/// `name` field, skip nameless expressions entirely.
fn class_chain_name(src: &str, node: Node, by_def: &HashMap<usize, RawMatch>) -> Option<String> {
    if let Some(r) = by_def.get(&node.id()) {
        if r.tag.starts_with("class.") {
            return Some(node_text(src, r.name).trim().to_string());
        }
    }
    node.child_by_field_name("name")
        .map(|n| node_text(src, n).trim().to_string())
        .filter(|n| !n.is_empty())
}

fn render_unit_line(
    profile: &dyn LanguageProfile,
    src: &str,
    def: Node,
    name: &str,
    skeleton_type: SkeletonType,
) -> String {
    match skeleton_type {
        SkeletonType::ClassLike => {
            let prefix = profile.visibility_prefix(def, src);
            let sig = class_signature_text(src, def, name);
            profile.render_class_header(def, src, &prefix, &sig)
        }
        SkeletonType::FunctionLike => {
            let prefix = profile.visibility_prefix(def, src);
            let async_prefix = async_prefix_of(def);
            let params = params_text(src, def);
            let return_type = return_type_text(src, def);
            profile.render_function_signature(
                def,
                src,
                &prefix,
                &async_prefix,
                name,
                &params,
                &return_type,
            )
        }
        SkeletonType::FieldLike => {
            let prefix = profile.visibility_prefix(def, src);
            let decl = node_text(src, def).trim();
            if decl.ends_with(';') {
                format!("{prefix}{decl}")
            } else {
                format!("{prefix}{decl};")
            }
        }
        SkeletonType::Unsupported => String::new(),
    }
}

/// `class Foo extends Bar` — everything before the body. Anonymous class
/// expressions rebuild the header from the declarator-provided name.
fn class_signature_text(src: &str, def: Node, name: &str) -> String {
    if def.child_by_field_name("name").is_none() {
        return format!("class {name}");
    }
    match def.child_by_field_name("body") {
        Some(body) => src[def.start_byte()..body.start_byte()].trim().to_string(),
        None => node_text(src, def).trim().to_string(),
    }
}

fn async_prefix_of(def: Node) -> String {
    for i in 0..def.child_count() {
        if let Some(child) = def.child(i) {
            if child.kind() == "async" {
                return "async ".to_string();
            }
            // Stop once the declaration's own name starts.
            if child.kind() == "identifier" || child.kind() == "property_identifier" {
                break;
            }
        }
    }
    String::new()
}

fn params_text(src: &str, def: Node) -> String {
    if let Some(p) = def.child_by_field_name("parameters") {
        return node_text(src, p).to_string();
    }
    // Single-parameter arrow functions (`x => ...`) use a bare identifier.
    if let Some(p) = def.child_by_field_name("parameter") {
        return format!("({})", node_text(src, p));
    }
    "()".to_string()
}

fn return_type_text(src: &str, def: Node) -> String {
    match def.child_by_field_name("return_type") {
        Some(rt) => node_text(src, rt)
            .trim_start_matches(':')
            .trim()
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeUnitKind;
    use crate::profile::registry;

    fn extract(src: &str) -> FileOutline {
        let entry = registry().entry_for_path(Path::new("lib.js")).unwrap();
        match extract_outline(entry, Path::new("lib.js"), src).unwrap() {
            ExtractOutcome::Extracted(o) => o,
            ExtractOutcome::Failed(f) => panic!("extraction failed: {f}"),
        }
    }

    fn short_names(outline: &FileOutline) -> Vec<&str> {
        outline.units.iter().map(|u| u.unit.short_name()).collect()
    }

    #[test]
    fn top_level_declarations_in_source_order() {
        let outline = extract("function a() {}\nclass B {}\nconst c = 1;\n");
        assert_eq!(short_names(&outline), vec!["a", "B", "_module_.c"]);
    }

    #[test]
    fn nested_class_members_use_dollar_chain() {
        let outline = extract("class Outer { static Inner = class { m() {} } }\n");
        let names = short_names(&outline);
        assert!(names.contains(&"Outer"));
        assert!(names.contains(&"Outer$Inner"));
        assert!(names.contains(&"Outer$Inner.m"));
    }

    #[test]
    fn arrow_declarator_is_a_function_not_a_field() {
        let outline = extract("export const f = async (x) => x + 1;\n");
        assert_eq!(outline.units.len(), 1);
        let u = &outline.units[0];
        assert_eq!(u.unit.kind(), CodeUnitKind::Function);
        assert_eq!(u.unit.short_name(), "f");
        assert_eq!(u.rendered, "export async f(x) =>");
    }

    #[test]
    fn exported_module_field_keeps_prefix() {
        let outline = extract("export const x = 1;\n");
        let u = &outline.units[0];
        assert_eq!(u.unit.kind(), CodeUnitKind::Field);
        assert_eq!(u.unit.short_name(), "_module_.x");
        assert_eq!(u.rendered, "export const x = 1;");
    }

    #[test]
    fn class_methods_join_with_dot() {
        let outline = extract("export class Foo { bar() {} }\n");
        let names = short_names(&outline);
        assert_eq!(names, vec!["Foo", "Foo.bar"]);
        assert_eq!(outline.units[0].rendered, "export class Foo {");
        assert_eq!(outline.units[1].rendered, "bar()");
    }

    #[test]
    fn var_bound_functions_classify_as_functions() {
        let outline = extract("var legacy = function (a) { return a; };\nvar shout = (s) => s.toUpperCase();\n");
        assert_eq!(short_names(&outline), vec!["legacy", "shout"]);
        assert!(outline
            .units
            .iter()
            .all(|u| u.unit.kind() == CodeUnitKind::Function));
    }

    #[test]
    fn broken_source_fails_locally() {
        let entry = registry().entry_for_path(Path::new("bad.js")).unwrap();
        let outcome = extract_outline(entry, Path::new("bad.js"), "class {{{{{").unwrap();
        assert!(matches!(
            outcome,
            ExtractOutcome::Failed(ExtractFailure::ParseFailed)
        ));
    }

    #[test]
    fn extraction_is_idempotent() {
        let src = "export class Foo { bar() {} }\nconst x = 2;\n";
        let a = extract(src);
        let b = extract(src);
        assert_eq!(short_names(&a), short_names(&b));
        let ra: Vec<&str> = a.units.iter().map(|u| u.rendered.as_str()).collect();
        let rb: Vec<&str> = b.units.iter().map(|u| u.rendered.as_str()).collect();
        assert_eq!(ra, rb);
    }
}
