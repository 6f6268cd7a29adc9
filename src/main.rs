use anyhow::Result;
use clap::Parser;
use codeatlas::config::load_config;
use codeatlas::SymbolIndex;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "codeatlas")]
#[command(version)]
#[command(about = "Query-driven static source analyzer (code units, skeletons, usages)")]
struct Cli {
    /// Project root to analyze.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// List the classes declared in a file (JSON, source order).
    #[arg(long, value_name = "FILE_PATH")]
    classes: Option<PathBuf>,

    /// Output the body-elided skeleton of a whole file.
    #[arg(long, value_name = "FILE_PATH")]
    outline: Option<PathBuf>,

    /// Output the skeletons of one or more units by qualified short name
    /// (e.g. "Outer$Inner" or "Foo.bar").
    #[arg(long, num_args = 1.., value_name = "NAME")]
    skeleton: Option<Vec<String>>,

    /// Scan for usages of an identifier across the project (JSON; each hit
    /// is tagged with its resolution strategy).
    #[arg(long, value_name = "IDENTIFIER")]
    usages: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.root);
    let index = SymbolIndex::new(cli.root.clone(), config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("indexing project...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let report = index.rebuild()?;
    spinner.finish_and_clear();

    if let Some(file) = cli.classes {
        let classes = index.classes_in_file(&file);
        println!("{}", serde_json::to_string_pretty(&classes)?);
        return Ok(());
    }

    if let Some(file) = cli.outline {
        match index.skeleton_of_file(&file) {
            Some(text) => print!("{text}"),
            None => anyhow::bail!("no indexed units for {}", file.display()),
        }
        return Ok(());
    }

    if let Some(names) = cli.skeleton {
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let text = index.skeleton_of(&refs);
        if text.is_empty() {
            anyhow::bail!("no units matched: {}", names.join(", "));
        }
        print!("{text}");
        return Ok(());
    }

    if let Some(ident) = cli.usages {
        let hits = index.usages_of(&ident);
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    // No query: print an index summary.
    let snap = index.snapshot();
    let failed: Vec<String> = snap
        .failed_files()
        .map(|(p, f)| format!("{} ({f})", p.display()))
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "indexed_files": report.indexed,
            "code_units": snap.unit_count(),
            "failed_files": failed,
        }))?
    );
    Ok(())
}
