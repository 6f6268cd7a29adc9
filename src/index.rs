use anyhow::Result;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::AnalyzerConfig;
use crate::error::ExtractFailure;
use crate::extract::{extract_outline, ExtractOutcome, FileOutline};
use crate::model::{CodeUnit, CodeUnitKind};
use crate::profile::registry;
use crate::scanner::scan_project;
use crate::skeleton;

/// Everything the index keeps for one successfully extracted file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub source_hash: u64,
    pub text: Arc<str>,
    pub outline: FileOutline,
}

/// A file excluded from the index this pass, plus the content hash observed
/// at the attempt (0 when the bytes were never readable). The hash lets
/// `resume()` notice when a previously failed file was edited while paused.
#[derive(Debug, Clone, Copy)]
pub struct FailedFile {
    pub failure: ExtractFailure,
    pub source_hash: u64,
}

/// One fully built, immutable view of the project.
///
/// Readers always hold an `Arc` to a complete snapshot; rebuilds construct a
/// new snapshot off to the side and swap it in. Files that failed to parse
/// are excluded from `files` and tracked separately until the next attempt.
#[derive(Debug, Default)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, FileRecord>,
    failed: BTreeMap<PathBuf, FailedFile>,
}

impl Snapshot {
    pub fn file(&self, rel: &Path) -> Option<&FileRecord> {
        self.files.get(rel)
    }

    pub fn indexed_files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(|p| p.as_path())
    }

    pub fn failed_files(&self) -> impl Iterator<Item = (&Path, ExtractFailure)> {
        self.failed.iter().map(|(p, f)| (p.as_path(), f.failure))
    }

    pub fn unit_count(&self) -> usize {
        self.files.values().map(|r| r.outline.units.len()).sum()
    }
}

/// How a usage hit was resolved. The textual strategy is an explicit,
/// documented imprecision: it is a raw substring containment scan, it *will*
/// over-match substrings, and it is kept separate so callers and tests can
/// distinguish precise from heuristic hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStrategy {
    Structural,
    TextualContainment,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageHit {
    pub unit: CodeUnit,
    pub strategy: UsageStrategy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildReport {
    pub indexed: usize,
    pub failed: usize,
    /// Rebuild was requested while paused and will run on resume.
    pub deferred: bool,
    /// A newer rebuild started first; this result was discarded, not merged.
    pub superseded: bool,
}

struct Inner {
    root: PathBuf,
    config: AnalyzerConfig,
    snapshot: RwLock<Arc<Snapshot>>,
    paused: AtomicBool,
    rebuild_pending: AtomicBool,
    /// Generation of the most recently *started* rebuild.
    generation: AtomicU64,
    /// Generation of the most recently *applied* snapshot; 0 = never built.
    applied: AtomicU64,
}

/// Thread-safe query surface over the extracted project.
///
/// Cloning is cheap and every clone shares the same state; all operations
/// are safe to call from any thread. Queries read the last fully built
/// snapshot and never block on an in-flight rebuild.
#[derive(Clone)]
pub struct SymbolIndex {
    inner: Arc<Inner>,
}

impl SymbolIndex {
    pub fn new(project_root: impl Into<PathBuf>, config: AnalyzerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: project_root.into(),
                config,
                snapshot: RwLock::new(Arc::new(Snapshot::default())),
                paused: AtomicBool::new(false),
                rebuild_pending: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                applied: AtomicU64::new(0),
            }),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.inner.root
    }

    /// The last fully built snapshot, building lazily on first use.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.ensure_built();
        self.current()
    }

    fn current(&self) -> Arc<Snapshot> {
        let guard = self
            .inner
            .snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn ensure_built(&self) {
        if self.inner.applied.load(Ordering::Acquire) == 0
            && !self.inner.paused.load(Ordering::Acquire)
        {
            if let Err(e) = rebuild_now(&self.inner) {
                tracing::error!(error = %e, "initial index build failed");
            }
        }
    }

    /// Synchronous full rebuild. Deferred while paused; superseded by any
    /// newer rebuild that starts before this one swaps its snapshot in.
    pub fn rebuild(&self) -> Result<RebuildReport> {
        rebuild_now(&self.inner)
    }

    /// Fire-and-forget rebuild on a worker thread.
    pub fn request_rebuild(&self) -> std::thread::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        std::thread::spawn(move || {
            if let Err(e) = rebuild_now(&inner) {
                tracing::error!(error = %e, "background rebuild failed");
            }
        })
    }

    /// Stop starting new extraction passes. Callers about to mutate tracked
    /// files signal this first; queries keep serving the last snapshot.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::Release);
        tracing::debug!("analyzer paused");
    }

    /// Re-enable scanning. Triggers a background rebuild when one was
    /// deferred while paused or when tracked content changed on disk;
    /// returns the worker handle when a rebuild was started.
    pub fn resume(&self) -> Option<std::thread::JoinHandle<()>> {
        self.inner.paused.store(false, Ordering::Release);
        tracing::debug!("analyzer resumed");

        let pending = self.inner.rebuild_pending.swap(false, Ordering::AcqRel);
        if pending || self.changed_since_snapshot() {
            return Some(self.request_rebuild());
        }
        None
    }

    fn changed_since_snapshot(&self) -> bool {
        let snap = self.current();
        for (rel, rec) in &snap.files {
            let abs = self.inner.root.join(rel);
            match std::fs::read(&abs) {
                Ok(bytes) => {
                    if xxh3_64(&bytes) != rec.source_hash {
                        return true;
                    }
                }
                // Deleted or unreadable; the rescan will drop it.
                Err(_) => return true,
            }
        }
        // A failed file edited while paused (e.g. a syntax error fixed) must
        // trigger the catch-up pass too.
        for (rel, failed) in &snap.failed {
            let abs = self.inner.root.join(rel);
            match std::fs::read(&abs) {
                Ok(bytes) => {
                    if xxh3_64(&bytes) != failed.source_hash {
                        return true;
                    }
                }
                Err(_) => return true,
            }
        }
        // Files created while paused appear in neither map.
        match scan_project(&self.inner.root, &self.inner.config) {
            Ok(entries) => entries
                .iter()
                .any(|e| !snap.files.contains_key(&e.rel_path) && !snap.failed.contains_key(&e.rel_path)),
            Err(_) => true,
        }
    }

    /// CLASS units declared in a file, in source order.
    pub fn classes_in_file(&self, file: &Path) -> Vec<CodeUnit> {
        let rel = self.rel_key(file);
        let snap = self.snapshot();
        let Some(rec) = snap.file(&rel) else {
            return Vec::new();
        };
        rec.outline
            .units
            .iter()
            .filter(|u| u.unit.kind() == CodeUnitKind::Class)
            .map(|u| u.unit.clone())
            .collect()
    }

    /// Rendered skeleton text for every unit matching one of `names`,
    /// concatenated with a blank-line separator.
    pub fn skeleton_of(&self, names: &[&str]) -> String {
        let snap = self.snapshot();
        let mut parts: Vec<String> = Vec::new();
        for rec in snap.files.values() {
            let Some(entry) = registry().entry_for_language(rec.outline.language) else {
                continue;
            };
            for name in names {
                if let Some(text) = skeleton::render_unit(entry.profile(), &rec.outline, name) {
                    parts.push(text);
                }
            }
        }
        parts.join("\n")
    }

    /// Whole-file outline: every top-level unit of the file, body-elided.
    pub fn skeleton_of_file(&self, file: &Path) -> Option<String> {
        let rel = self.rel_key(file);
        let snap = self.snapshot();
        let rec = snap.file(&rel)?;
        let entry = registry().entry_for_language(rec.outline.language)?;
        Some(skeleton::render_file(entry.profile(), &rec.outline))
    }

    /// Best-effort usage scan for an identifier.
    ///
    /// When the identifier names a known unit, matches are word-bounded and
    /// attributed to the innermost enclosing unit, with the definition name
    /// tokens themselves excluded (`Structural`); a recursive call inside
    /// the defining unit still counts. Otherwise this degrades to a raw
    /// substring containment scan (`TextualContainment`) that trades
    /// precision for recall and will over-match substrings. Matches outside
    /// any indexed unit's byte range (module top-level statements) have no
    /// unit to attribute to and produce no hit. Never fails; partial results
    /// are returned even when some files failed to parse.
    pub fn usages_of(&self, identifier: &str) -> Vec<UsageHit> {
        if identifier.is_empty() {
            return Vec::new();
        }
        let snap = self.snapshot();

        let defined = snap.files.values().any(|r| {
            r.outline
                .units
                .iter()
                .any(|u| u.unit.identifier() == identifier)
        });

        let mut hits: Vec<UsageHit> = Vec::new();
        let mut seen: HashSet<CodeUnit> = HashSet::new();

        if defined {
            let pattern = format!(r"\b{}\b", regex::escape(identifier));
            let Ok(re) = Regex::new(&pattern) else {
                return Vec::new();
            };
            for rec in snap.files.values() {
                for m in re.find_iter(&rec.text) {
                    // The name token of a same-named unit is the definition,
                    // not a usage.
                    let at_definition = rec.outline.units.iter().any(|u| {
                        u.unit.identifier() == identifier
                            && u.name_start_byte <= m.start()
                            && m.start() < u.name_end_byte
                    });
                    if at_definition {
                        continue;
                    }
                    let Some(unit) = innermost_unit(&rec.outline, m.start()) else {
                        continue;
                    };
                    if seen.insert(unit.clone()) {
                        hits.push(UsageHit {
                            unit,
                            strategy: UsageStrategy::Structural,
                        });
                    }
                }
            }
        } else {
            // Heuristic containment scan: substring matches, no boundaries.
            for rec in snap.files.values() {
                for (pos, _) in rec.text.match_indices(identifier) {
                    let Some(unit) = innermost_unit(&rec.outline, pos) else {
                        continue;
                    };
                    if seen.insert(unit.clone()) {
                        hits.push(UsageHit {
                            unit,
                            strategy: UsageStrategy::TextualContainment,
                        });
                    }
                }
            }
        }

        hits
    }

    fn rel_key(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.strip_prefix(&self.inner.root)
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|_| file.to_path_buf())
        } else {
            file.to_path_buf()
        }
    }
}

/// The smallest indexed unit whose byte range contains `pos`.
fn innermost_unit(outline: &FileOutline, pos: usize) -> Option<CodeUnit> {
    outline
        .units
        .iter()
        .filter(|u| u.start_byte <= pos && pos < u.end_byte)
        .min_by_key(|u| u.end_byte - u.start_byte)
        .map(|u| u.unit.clone())
}

fn rebuild_now(inner: &Inner) -> Result<RebuildReport> {
    if inner.paused.load(Ordering::Acquire) {
        inner.rebuild_pending.store(true, Ordering::Release);
        tracing::debug!("rebuild deferred while paused");
        return Ok(RebuildReport {
            deferred: true,
            ..Default::default()
        });
    }

    let gen = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
    let entries = scan_project(&inner.root, &inner.config)?;

    let results: Vec<(PathBuf, Result<Result<FileRecord, FailedFile>>)> = entries
        .par_iter()
        .map(|e| (e.rel_path.clone(), extract_file(&e.abs_path, &e.rel_path)))
        .collect();

    let mut snapshot = Snapshot::default();
    for (rel, result) in results {
        match result {
            Ok(Ok(record)) => {
                snapshot.files.insert(rel, record);
            }
            Ok(Err(failed)) => {
                snapshot.failed.insert(rel, failed);
            }
            // Grammar/query load failure: the one fatal condition.
            Err(e) => return Err(e),
        }
    }

    let report = RebuildReport {
        indexed: snapshot.files.len(),
        failed: snapshot.failed.len(),
        ..Default::default()
    };

    // A pause that arrived mid-rebuild wins: discard and retry on resume.
    if inner.paused.load(Ordering::Acquire) {
        inner.rebuild_pending.store(true, Ordering::Release);
        return Ok(RebuildReport {
            deferred: true,
            ..Default::default()
        });
    }

    let mut guard = inner.snapshot.write().unwrap_or_else(|e| e.into_inner());
    if inner.generation.load(Ordering::Acquire) != gen {
        tracing::debug!(generation = gen, "rebuild superseded; discarding snapshot");
        return Ok(RebuildReport {
            superseded: true,
            ..Default::default()
        });
    }
    *guard = Arc::new(snapshot);
    inner.applied.store(gen, Ordering::Release);
    drop(guard);

    tracing::info!(
        indexed = report.indexed,
        failed = report.failed,
        "index rebuilt"
    );
    Ok(report)
}

/// Extract one file: hash, parse, and re-hash afterwards so a file mutated
/// underneath the pass is discarded and marked stale instead of surfacing
/// half-written units.
fn extract_file(abs: &Path, rel: &Path) -> Result<Result<FileRecord, FailedFile>> {
    let failed = |failure: ExtractFailure, source_hash: u64| {
        Ok(Err(FailedFile {
            failure,
            source_hash,
        }))
    };

    let Some(entry) = registry().entry_for_path(abs) else {
        return failed(ExtractFailure::UnsupportedLanguage, 0);
    };

    let Ok(bytes) = std::fs::read(abs) else {
        return failed(ExtractFailure::SourceChanged, 0);
    };
    let source_hash = xxh3_64(&bytes);
    if bytes.contains(&0u8) {
        tracing::debug!(file = %rel.display(), "binary content; skipping");
        return failed(ExtractFailure::ParseFailed, source_hash);
    }
    let text: Arc<str> = Arc::from(String::from_utf8_lossy(&bytes).into_owned());

    let outcome = extract_outline(entry, rel, &text)?;
    let outline = match outcome {
        ExtractOutcome::Extracted(o) => o,
        ExtractOutcome::Failed(f) => return failed(f, source_hash),
    };

    match std::fs::read(abs) {
        Ok(after) if xxh3_64(&after) == source_hash => Ok(Ok(FileRecord {
            source_hash,
            text,
            outline,
        })),
        _ => {
            tracing::warn!(file = %rel.display(), "content changed during extraction; marked stale");
            failed(ExtractFailure::SourceChanged, source_hash)
        }
    }
}
