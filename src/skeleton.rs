use std::collections::HashMap;

use crate::extract::{FileOutline, OutlineUnit};
use crate::model::SkeletonType;
use crate::profile::LanguageProfile;

const INDENT: &str = "  ";

/// Body-elided rendering of extracted code units.
///
/// Deterministic by construction: child ordering comes from the extraction
/// pass (source order) and parent lookup uses the units' own names, so
/// identical source always produces byte-identical text.
struct Tree<'a> {
    units: &'a [OutlineUnit],
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl<'a> Tree<'a> {
    fn build(units: &'a [OutlineUnit]) -> Self {
        let mut class_by_name: HashMap<&str, usize> = HashMap::new();
        for (idx, u) in units.iter().enumerate() {
            if u.skeleton_type == SkeletonType::ClassLike {
                class_by_name.entry(u.unit.short_name()).or_insert(idx);
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
        let mut roots: Vec<usize> = Vec::new();
        for (idx, u) in units.iter().enumerate() {
            let container = u.unit.container();
            match class_by_name.get(container) {
                Some(&parent) if !container.is_empty() && parent != idx => {
                    children[parent].push(idx)
                }
                // Units whose container was not indexed render at top level
                // rather than disappearing.
                _ => roots.push(idx),
            }
        }

        Self {
            units,
            children,
            roots,
        }
    }

    fn render_into(&self, profile: &dyn LanguageProfile, idx: usize, depth: usize, out: &mut String) {
        let u = &self.units[idx];
        let indent = INDENT.repeat(depth);
        match u.skeleton_type {
            SkeletonType::ClassLike => {
                out.push_str(&indent);
                out.push_str(&u.rendered);
                out.push('\n');
                for &child in &self.children[idx] {
                    self.render_into(profile, child, depth + 1, out);
                }
                let closer = profile.closer(&u.unit);
                if !closer.is_empty() {
                    out.push_str(&indent);
                    out.push_str(closer);
                    out.push('\n');
                }
            }
            SkeletonType::FunctionLike => {
                out.push_str(&indent);
                out.push_str(&u.rendered);
                out.push(' ');
                out.push_str(profile.body_placeholder());
                out.push('\n');
            }
            SkeletonType::FieldLike => {
                out.push_str(&indent);
                out.push_str(&u.rendered);
                out.push('\n');
            }
            SkeletonType::Unsupported => {}
        }
    }
}

/// Render the skeleton of every top-level unit of a file, in source order.
pub fn render_file(profile: &dyn LanguageProfile, outline: &FileOutline) -> String {
    let tree = Tree::build(&outline.units);
    let mut out = String::new();
    for &root in &tree.roots {
        tree.render_into(profile, root, 0, &mut out);
    }
    out
}

/// Render one unit (and, for classes, its nested members) by qualified short
/// name. Returns `None` when the file declares no such unit.
pub fn render_unit(
    profile: &dyn LanguageProfile,
    outline: &FileOutline,
    short_name: &str,
) -> Option<String> {
    let tree = Tree::build(&outline.units);
    let idx = outline
        .units
        .iter()
        .position(|u| u.unit.short_name() == short_name || u.unit.fq_name() == short_name)?;
    if outline.units[idx].skeleton_type == SkeletonType::Unsupported {
        return None;
    }
    let mut out = String::new();
    tree.render_into(profile, idx, 0, &mut out);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_outline, ExtractOutcome};
    use crate::profile::registry;
    use std::path::Path;

    fn outline(src: &str) -> FileOutline {
        let entry = registry().entry_for_path(Path::new("lib.js")).unwrap();
        match extract_outline(entry, Path::new("lib.js"), src).unwrap() {
            ExtractOutcome::Extracted(o) => o,
            ExtractOutcome::Failed(f) => panic!("extraction failed: {f}"),
        }
    }

    fn profile() -> &'static dyn LanguageProfile {
        registry()
            .entry_for_path(Path::new("lib.js"))
            .unwrap()
            .profile()
    }

    #[test]
    fn exported_class_with_method() {
        let o = outline("export class Foo { bar() {} }\n");
        let text = render_file(profile(), &o);
        assert_eq!(text, "export class Foo {\n  bar() {...}\n}\n");
    }

    #[test]
    fn fields_render_verbatim_functions_elide_bodies() {
        let o = outline("const limit = 10;\nfunction go(a, b) { return a + b; }\n");
        let text = render_file(profile(), &o);
        assert_eq!(text, "const limit = 10;\nfunction go(a, b) {...}\n");
    }

    #[test]
    fn nested_classes_indent_per_level() {
        let o = outline("class Outer { static Inner = class { m() {} } }\n");
        let text = render_file(profile(), &o);
        assert_eq!(
            text,
            "class Outer {\n  class Inner {\n    m() {...}\n  }\n}\n"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let src = "export class A { x = 1; f() {} }\nexport const g = () => 1;\n";
        let o1 = outline(src);
        let o2 = outline(src);
        assert_eq!(render_file(profile(), &o1), render_file(profile(), &o2));
    }

    #[test]
    fn render_single_unit_by_name() {
        let o = outline("class A { m() {} }\nclass B {}\n");
        let text = render_unit(profile(), &o, "A").unwrap();
        assert_eq!(text, "class A {\n  m() {...}\n}\n");
        assert!(render_unit(profile(), &o, "Nope").is_none());
    }
}
