use serde::{Deserialize, Serialize};
use std::path::Path;

/// Controls workspace scanning behavior (what to skip).
///
/// Note: `.gitignore` is always respected by the scanner; these are
/// additional hard skips for noisy monorepo directories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory *names* to skip anywhere in the tree (e.g. "generated").
    ///
    /// These are compared against path components, not full paths.
    pub exclude_dir_names: Vec<String>,
}

/// Hard safety ceiling: files larger than this are **always** skipped,
/// regardless of config. This protects low-RAM machines from trying to
/// parse a 10 MB minified bundle.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 1_000_000; // 1 MB

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Settings that govern file discovery and exclusion.
    pub scan: ScanConfig,
    /// Per-file size cap; clamped to [`ABSOLUTE_MAX_FILE_BYTES`].
    pub max_file_bytes: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            // 512 KB default — enough for any real source file, blocks
            // log/generated bloat.
            max_file_bytes: 512 * 1024,
        }
    }
}

impl AnalyzerConfig {
    pub fn effective_max_file_bytes(&self) -> u64 {
        self.max_file_bytes.min(ABSOLUTE_MAX_FILE_BYTES)
    }
}

pub fn load_config(project_root: &Path) -> AnalyzerConfig {
    let primary = project_root.join(".codeatlas.json");

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else {
        return AnalyzerConfig::default();
    };

    serde_json::from_str::<AnalyzerConfig>(&text).unwrap_or_else(|e| {
        tracing::warn!(path = %primary.display(), error = %e, "invalid config; using defaults");
        AnalyzerConfig::default()
    })
}
