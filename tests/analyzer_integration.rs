use codeatlas::config::AnalyzerConfig;
use codeatlas::{CodeUnitKind, SymbolIndex, UsageStrategy};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, SymbolIndex) {
    let dir = TempDir::new().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    let index = SymbolIndex::new(dir.path(), AnalyzerConfig::default());
    index.rebuild().expect("rebuild");
    (dir, index)
}

#[test]
fn classes_in_file_returns_exactly_the_declared_classes() {
    let (_dir, index) = project(&[(
        "shapes.js",
        "class Circle {}\nfunction area() {}\nclass Square {}\nclass Triangle {}\n",
    )]);

    let classes = index.classes_in_file(Path::new("shapes.js"));
    let names: Vec<&str> = classes.iter().map(|c| c.short_name()).collect();
    assert_eq!(names, vec!["Circle", "Square", "Triangle"]);
    assert!(classes.iter().all(|c| c.kind() == CodeUnitKind::Class));
}

#[test]
fn nested_class_methods_get_dollar_joined_names() {
    let (_dir, index) = project(&[(
        "nested.js",
        "class Outer { static Inner = class { m() {} } }\n",
    )]);

    let snap = index.snapshot();
    let rec = snap.file(Path::new("nested.js")).unwrap();
    let names: Vec<&str> = rec
        .outline
        .units
        .iter()
        .map(|u| u.unit.short_name())
        .collect();
    assert!(names.contains(&"Outer$Inner.m"));
}

#[test]
fn exported_module_field_naming_and_prefix() {
    let (_dir, index) = project(&[("consts.js", "export const x = 1;\n")]);

    let text = index.skeleton_of(&["_module_.x"]);
    assert_eq!(text, "export const x = 1;\n");
}

#[test]
fn exported_class_skeleton_is_exact() {
    let (_dir, index) = project(&[("foo.js", "export class Foo { bar() {} }\n")]);

    assert_eq!(
        index.skeleton_of(&["Foo"]),
        "export class Foo {\n  bar() {...}\n}\n"
    );
}

#[test]
fn skeletons_of_multiple_units_are_blank_line_separated() {
    let (_dir, index) = project(&[("two.js", "class A {}\nclass B {}\n")]);

    assert_eq!(
        index.skeleton_of(&["A", "B"]),
        "class A {\n}\n\nclass B {\n}\n"
    );
}

#[test]
fn reindexing_unchanged_content_is_idempotent() {
    let (_dir, index) = project(&[(
        "lib.js",
        "export class Foo { bar() {} }\nexport const version = 3;\n",
    )]);

    let first_classes = index.classes_in_file(Path::new("lib.js"));
    let first_skeleton = index.skeleton_of_file(Path::new("lib.js")).unwrap();

    index.rebuild().expect("second rebuild");

    assert_eq!(index.classes_in_file(Path::new("lib.js")), first_classes);
    assert_eq!(
        index.skeleton_of_file(Path::new("lib.js")).unwrap(),
        first_skeleton
    );
}

#[test]
fn one_broken_file_never_poisons_the_batch() {
    let mut files: Vec<(String, String)> = (0..9)
        .map(|i| (format!("ok{i}.js"), format!("class C{i} {{ m() {{}} }}\n")))
        .collect();
    files.push(("broken.js".to_string(), "class {{{{{".to_string()));

    let dir = TempDir::new().unwrap();
    for (name, content) in &files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let index = SymbolIndex::new(dir.path(), AnalyzerConfig::default());
    let report = index.rebuild().expect("rebuild");

    assert_eq!(report.indexed, 9);
    assert_eq!(report.failed, 1);

    let snap = index.snapshot();
    assert!(snap.file(Path::new("broken.js")).is_none());
    assert_eq!(snap.failed_files().count(), 1);

    // Query surface returns partial results rather than failing wholesale.
    let hits = index.usages_of("C3");
    assert!(hits.iter().all(|h| h.unit.file() != Path::new("broken.js")));
}

#[test]
fn usages_distinguish_structural_from_containment_hits() {
    let (_dir, index) = project(&[
        ("a.js", "export function helper() { return 1; }\n"),
        (
            "b.js",
            "export function caller() { return helper(); }\n",
        ),
    ]);

    // `helper` is a known unit: word-bounded scan, definition excluded.
    let hits = index.usages_of("helper");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].unit.short_name(), "caller");
    assert_eq!(hits[0].strategy, UsageStrategy::Structural);

    // Unknown identifier: substring containment, deliberately over-matching.
    let hits = index.usages_of("elpe");
    assert_eq!(hits.len(), 2);
    assert!(hits
        .iter()
        .all(|h| h.strategy == UsageStrategy::TextualContainment));
}

#[test]
fn pause_defers_rebuilds_and_resume_catches_up() {
    let (dir, index) = project(&[("watched.js", "function original() {}\n")]);

    index.pause();

    // Deliberate mid-write state: half a declaration on disk.
    fs::write(dir.path().join("watched.js"), "class Half {").unwrap();
    let report = index.rebuild().expect("rebuild while paused");
    assert!(report.deferred);

    // Readers still see the last fully built snapshot.
    let snap = index.snapshot();
    let rec = snap.file(Path::new("watched.js")).unwrap();
    assert_eq!(rec.outline.units[0].unit.short_name(), "original");

    // Finish the write, then resume; the deferred rebuild runs.
    fs::write(dir.path().join("watched.js"), "class Half { m() {} }\n").unwrap();
    let handle = index.resume().expect("resume triggers rebuild");
    handle.join().unwrap();

    let classes = index.classes_in_file(Path::new("watched.js"));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].short_name(), "Half");
}

#[test]
fn resume_reindexes_files_changed_while_paused() {
    let (dir, index) = project(&[("quiet.js", "const a = 1;\n")]);

    index.pause();
    fs::write(dir.path().join("quiet.js"), "const a = 1;\nconst b = 2;\n").unwrap();

    // No rebuild was requested while paused; the content diff alone
    // triggers one on resume.
    let handle = index.resume().expect("content changed while paused");
    handle.join().unwrap();

    let snap = index.snapshot();
    let rec = snap.file(Path::new("quiet.js")).unwrap();
    assert_eq!(rec.outline.units.len(), 2);
}

#[test]
fn resume_reindexes_a_file_fixed_while_paused() {
    let (dir, index) = project(&[
        ("good.js", "class Good {}\n"),
        ("broken.js", "class {{{{{"),
    ]);
    assert_eq!(index.snapshot().failed_files().count(), 1);

    index.pause();
    fs::write(dir.path().join("broken.js"), "class Fixed { m() {} }\n").unwrap();

    let handle = index.resume().expect("fixed file triggers rebuild");
    handle.join().unwrap();

    let classes = index.classes_in_file(Path::new("broken.js"));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].short_name(), "Fixed");
    assert_eq!(index.snapshot().failed_files().count(), 0);
}

#[test]
fn resume_picks_up_files_created_while_paused() {
    let (dir, index) = project(&[("a.js", "class A {}\n")]);

    index.pause();
    fs::write(dir.path().join("b.js"), "class B {}\n").unwrap();

    let handle = index.resume().expect("new file triggers rebuild");
    handle.join().unwrap();

    let classes = index.classes_in_file(Path::new("b.js"));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].short_name(), "B");
}

#[test]
fn recursive_calls_count_as_usages_of_the_function_itself() {
    let (_dir, index) = project(&[(
        "fact.js",
        "function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }\n",
    )]);

    let hits = index.usages_of("fact");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].unit.short_name(), "fact");
    assert_eq!(hits[0].strategy, UsageStrategy::Structural);
}

#[test]
fn concurrent_readers_during_rebuild_see_complete_snapshots() {
    let files: Vec<(String, String)> = (0..20)
        .map(|i| (format!("mod{i}.js"), format!("class M{i} {{ f() {{}} g() {{}} }}\n")))
        .collect();
    let dir = TempDir::new().unwrap();
    for (name, content) in &files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let index = SymbolIndex::new(dir.path(), AnalyzerConfig::default());
    index.rebuild().expect("initial build");

    let mut readers = Vec::new();
    for _ in 0..4 {
        let idx = index.clone();
        readers.push(std::thread::spawn(move || {
            for _ in 0..50 {
                let snap = idx.snapshot();
                // A snapshot is all-or-nothing: every indexed file carries
                // its full unit sequence.
                for rel in snap.indexed_files() {
                    let rec = snap.file(rel).unwrap();
                    assert_eq!(rec.outline.units.len(), 3);
                }
            }
        }));
    }

    for _ in 0..3 {
        index.request_rebuild().join().unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }
}

#[cfg(feature = "lang-typescript")]
#[test]
fn typescript_interfaces_index_and_type_aliases_skip() {
    let (_dir, index) = project(&[(
        "api.ts",
        "export interface Client { fetch(url: string): Promise<string>; }\ntype Alias = string;\n",
    )]);

    let classes = index.classes_in_file(Path::new("api.ts"));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].short_name(), "Client");

    let snap = index.snapshot();
    let rec = snap.file(Path::new("api.ts")).unwrap();
    assert!(rec
        .outline
        .units
        .iter()
        .all(|u| u.unit.short_name() != "Alias"));

    let text = index.skeleton_of(&["Client"]);
    assert_eq!(
        text,
        "export interface Client {\n  fetch(url: string): Promise<string> {...}\n}\n"
    );
}
