use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::AnalyzerConfig;
use crate::profile::registry;

fn default_overrides(project_root: &Path, exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(project_root);

    // Common high-noise artifacts. Override globs use ripgrep -g semantics:
    // a leading `!` excludes. For directories, add patterns for both the
    // directory entry and its descendants, otherwise walkers may still
    // descend into the directory.
    ob.add("!**/*.lock")?;
    ob.add("!**/*.min.js")?;
    ob.add("!**/*.map")?;

    for d in [
        ".git",
        "node_modules",
        "target",
        "dist",
        "build",
        "coverage",
        ".next",
        ".nuxt",
        "out",
    ] {
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    // Project-specific excluded dirs
    for d in exclude_dir_names {
        let d = d.trim().trim_matches('/');
        if d.is_empty() {
            continue;
        }
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    Ok(ob.build()?)
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub bytes: u64,
}

/// Discover the analyzable files under a project root: standard ignore
/// filters, junk overrides, size caps, and only extensions some registered
/// language profile claims. Deterministically sorted by relative path.
pub fn scan_project(project_root: &Path, config: &AnalyzerConfig) -> Result<Vec<FileEntry>> {
    let max_bytes = config.effective_max_file_bytes();
    let overrides = default_overrides(project_root, &config.scan.exclude_dir_names)?;

    let walker = WalkBuilder::new(project_root)
        .standard_filters(true) // .gitignore, .ignore, hidden, etc.
        .overrides(overrides)
        .build();

    let mut entries = Vec::new();
    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(_) => continue,
        };

        if !dent.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = dent.into_path();
        if !registry().supports(&abs_path) {
            continue;
        }

        let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
            Ok(b) => b,
            Err(_) => continue,
        };
        if bytes == 0 || bytes > max_bytes {
            continue;
        }

        let rel_path = abs_path
            .strip_prefix(project_root)
            .with_context(|| {
                format!(
                    "{} is not under {}",
                    abs_path.display(),
                    project_root.display()
                )
            })?
            .to_path_buf();

        entries.push(FileEntry {
            abs_path,
            rel_path,
            bytes,
        });
    }

    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}
