use serde::Serialize;
use std::path::{Path, PathBuf};

/// What kind of symbol a [`CodeUnit`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeUnitKind {
    Class,
    Function,
    Field,
}

/// Rendering strategy for a code unit, derived per capture tag by the
/// language profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonType {
    ClassLike,
    FunctionLike,
    FieldLike,
    /// Excluded from skeleton rendering entirely.
    Unsupported,
}

/// Synthetic container for top-level (module-scope) fields.
///
/// `export const x = 1;` becomes `_module_.x` so every field keeps the
/// uniform `container.member` shape. This is a naming convention, not a
/// semantic container.
pub const MODULE_CONTAINER: &str = "_module_";

/// Separator between an enclosing class chain and a nested class name.
pub const NESTED_CLASS_SEP: char = '$';

/// Separator between a container and one of its members.
pub const MEMBER_SEP: char = '.';

/// The uniform, immutable symbol record produced by extraction.
///
/// Identity is (owning file, package path, kind, qualified short name);
/// the qualified short name is unique within (file, kind). Instances are
/// created only by a language profile and owned by the symbol index, which
/// replaces a file's units wholesale on re-extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CodeUnit {
    file: PathBuf,
    package: String,
    kind: CodeUnitKind,
    short_name: String,
}

impl CodeUnit {
    pub fn cls(file: &Path, package: &str, short_name: &str) -> Self {
        Self::new(file, package, CodeUnitKind::Class, short_name)
    }

    pub fn func(file: &Path, package: &str, short_name: &str) -> Self {
        Self::new(file, package, CodeUnitKind::Function, short_name)
    }

    /// Fields must carry the `container.member` shape; top-level fields use
    /// [`MODULE_CONTAINER`] as their container.
    pub fn field(file: &Path, package: &str, short_name: &str) -> Self {
        debug_assert!(
            short_name.contains(MEMBER_SEP),
            "field short name must be container.member: {short_name}"
        );
        Self::new(file, package, CodeUnitKind::Field, short_name)
    }

    fn new(file: &Path, package: &str, kind: CodeUnitKind, short_name: &str) -> Self {
        Self {
            file: file.to_path_buf(),
            package: package.to_string(),
            kind,
            short_name: short_name.to_string(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn kind(&self) -> CodeUnitKind {
        self.kind
    }

    /// Qualified short name, e.g. `Outer$Inner.m` or `_module_.x`.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Fully qualified name: package + qualified short name.
    pub fn fq_name(&self) -> String {
        if self.package.is_empty() {
            self.short_name.clone()
        } else {
            format!("{}{}{}", self.package, MEMBER_SEP, self.short_name)
        }
    }

    /// Last segment of the qualified short name (`m` for `Outer$Inner.m`).
    pub fn identifier(&self) -> &str {
        self.short_name
            .rsplit([MEMBER_SEP, NESTED_CLASS_SEP])
            .next()
            .unwrap_or(&self.short_name)
    }

    pub fn is_class(&self) -> bool {
        self.kind == CodeUnitKind::Class
    }

    /// The class chain this unit belongs to, i.e. everything before the last
    /// separator. Empty for top-level units; [`MODULE_CONTAINER`] fields are
    /// treated as top-level since their container is synthetic.
    pub fn container(&self) -> &str {
        if let Some(prefix) = self.short_name.strip_suffix(self.identifier()) {
            let prefix = prefix.trim_end_matches([MEMBER_SEP, NESTED_CLASS_SEP]);
            if prefix == MODULE_CONTAINER {
                return "";
            }
            return prefix;
        }
        ""
    }
}

/// Directory-derived package path: path components of the file's parent
/// directory joined with `.` (`src/app/util.js` -> `src.app`).
pub fn package_path_for(file: &Path) -> String {
    let Some(parent) = file.parent() else {
        return String::new();
    };
    let mut parts: Vec<&str> = Vec::new();
    for comp in parent.components() {
        if let std::path::Component::Normal(os) = comp {
            if let Some(s) = os.to_str() {
                if !s.is_empty() {
                    parts.push(s);
                }
            }
        }
    }
    parts.join(".")
}
