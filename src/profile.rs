use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tree_sitter::{Language, Node, Query};

use crate::error::AnalyzerError;
use crate::model::{CodeUnit, SkeletonType};

/// Per-language extension contract.
///
/// Everything language-specific lives behind this trait so the extraction
/// engine stays generic. Implementations are stateless, freely shared across
/// threads, and every operation is pure. A new language is one impl plus one
/// query resource under `queries/`; the engine never changes.
pub trait LanguageProfile: Send + Sync {
    /// Stable language key ("javascript", "typescript").
    fn name(&self) -> &'static str;

    /// Primary file extensions handled by this profile (lowercase, no dot).
    fn extensions(&self) -> &'static [&'static str];

    fn grammar(&self) -> Language;

    /// Declarative capture-pattern source, embedded from `queries/<lang>.scm`.
    fn query_resource(&self) -> &'static str;

    /// Materialize a code unit for a capture, or `None` to skip captures that
    /// are not semantically meaningful for this language. Must never fail on
    /// malformed but syntactically valid input; unknown tags are logged by
    /// the implementation and skipped.
    fn create_code_unit(
        &self,
        file: &Path,
        capture_tag: &str,
        simple_name: &str,
        namespace_hint: &str,
        class_chain: &str,
    ) -> Option<CodeUnit>;

    /// Capture tags the engine silently drops before dispatch (grammar noise).
    fn ignored_captures(&self) -> &'static [&'static str] {
        &[]
    }

    /// Literal used in place of an elided function/method body.
    fn body_placeholder(&self) -> &'static str;

    /// Rendering strategy for a capture tag; unrecognized tags are
    /// [`SkeletonType::Unsupported`].
    fn skeleton_type_for(&self, capture_tag: &str) -> SkeletonType;

    /// One-line signature text without a body. `export_prefix`, `async_prefix`
    /// and `return_type` are empty strings when absent, never errors.
    #[allow(clippy::too_many_arguments)]
    fn render_function_signature(
        &self,
        node: Node,
        src: &str,
        export_prefix: &str,
        async_prefix: &str,
        name: &str,
        params: &str,
        return_type: &str,
    ) -> String;

    /// Export/visibility token for a declaration, possibly empty. Must look
    /// through enclosing declaration/export wrappers, including the case
    /// where a variable declarator's *value* is the exported entity.
    fn visibility_prefix(&self, node: Node, src: &str) -> String;

    /// One-line class header ending in the opening delimiter when the
    /// language uses block delimiters.
    fn render_class_header(
        &self,
        node: Node,
        src: &str,
        export_prefix: &str,
        signature_text: &str,
    ) -> String;

    /// Closing delimiter for a class-like unit; empty for delimiter-free
    /// languages.
    fn closer(&self, unit: &CodeUnit) -> &'static str;

    /// Class-shaped node predicate (declarations, expressions and any
    /// language-specific class-like forms) for class-chain bookkeeping.
    fn is_class_like(&self, node: Node) -> bool;
}

/// A registered profile plus its lazily compiled query.
///
/// Grammar/query compilation is the only expensive per-language step; it runs
/// once behind a `OnceLock` and the compiled query is shared by every
/// extraction thread afterwards.
pub struct ProfileEntry {
    profile: &'static dyn LanguageProfile,
    query: OnceLock<Result<Query, String>>,
}

impl ProfileEntry {
    fn new(profile: &'static dyn LanguageProfile) -> Self {
        Self {
            profile,
            query: OnceLock::new(),
        }
    }

    pub fn profile(&self) -> &'static dyn LanguageProfile {
        self.profile
    }

    /// The compiled query for this language. Compilation failure is the one
    /// fatal per-language condition: the engine cannot function for the
    /// language at all.
    pub fn compiled_query(&self) -> Result<&Query, AnalyzerError> {
        let cached = self.query.get_or_init(|| {
            Query::new(&self.profile.grammar(), self.profile.query_resource())
                .map_err(|e| e.to_string())
        });
        match cached {
            Ok(q) => Ok(q),
            // QueryError is not Clone; keep the first error's message.
            Err(msg) => Err(AnalyzerError::QueryCompile {
                language: self.profile.name(),
                message: msg.clone(),
            }),
        }
    }
}

/// Static table of registered language profiles, keyed by file extension.
pub struct ProfileRegistry {
    entries: Vec<ProfileEntry>,
    by_ext: HashMap<&'static str, usize>,
}

impl ProfileRegistry {
    fn build() -> Self {
        let mut entries: Vec<ProfileEntry> = vec![ProfileEntry::new(
            &crate::profiles::javascript::JavaScriptProfile,
        )];

        #[cfg(feature = "lang-typescript")]
        entries.push(ProfileEntry::new(
            &crate::profiles::typescript::TypeScriptProfile,
        ));

        let mut by_ext = HashMap::new();
        for (idx, e) in entries.iter().enumerate() {
            for ext in e.profile.extensions() {
                by_ext.insert(*ext, idx);
            }
        }

        Self { entries, by_ext }
    }

    pub fn entry_for_path(&self, path: &Path) -> Option<&ProfileEntry> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.by_ext.get(ext.as_str()).map(|&idx| &self.entries[idx])
    }

    pub fn entry_for_language(&self, name: &str) -> Option<&ProfileEntry> {
        self.entries.iter().find(|e| e.profile.name() == name)
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.entry_for_path(path).is_some()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_ext.keys().copied()
    }
}

pub fn registry() -> &'static ProfileRegistry {
    static REG: OnceLock<ProfileRegistry> = OnceLock::new();
    REG.get_or_init(ProfileRegistry::build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_is_registered() {
        let reg = registry();
        assert!(reg.supports(Path::new("a.js")));
        assert!(reg.supports(Path::new("a.mjs")));
        assert!(!reg.supports(Path::new("a.unknown")));
    }

    #[test]
    fn queries_compile_once() {
        let entry = registry().entry_for_path(Path::new("a.js")).unwrap();
        let first = entry.compiled_query().expect("javascript query compiles");
        let second = entry.compiled_query().expect("cached");
        assert!(std::ptr::eq(first, second));
    }
}
