use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

use sara::config::Settings;
use sara::context::AppContext;
use sara::ingest::{FileStatus, IngestReport, NamedFile};
use sara::{logging, server};

#[derive(Parser)]
#[command(name = "sara")]
#[command(about = "Similarity retrieval service for research papers and patents")]
struct Cli {
    /// Path to a configuration file (defaults to ./sara.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Run the HTTP service
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ingest every PDF under a directory into the store
    Ingest {
        /// Directory to scan for PDF files
        dir: PathBuf,

        /// Replace the entire store contents instead of appending
        #[arg(long)]
        replace: bool,
    },

    /// Run a one-shot similarity query from the terminal
    Search {
        query: String,

        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Settings::load().context("failed to load configuration")?,
    };
    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created configuration at: {}", path.display());
            println!("Set database.url before starting the service.");
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let context = Arc::new(AppContext::from_settings(settings).await?);
            let result = server::serve(Arc::clone(&context), &bind).await;
            context.shutdown().await;
            result?;
        }

        Commands::Ingest { dir, replace } => {
            let files = collect_pdfs(&dir)?;
            if files.is_empty() {
                anyhow::bail!("no PDF files found under {}", dir.display());
            }
            println!("Found {} PDF file(s) under {}", files.len(), dir.display());

            let context = AppContext::from_settings(settings).await?;
            let pipeline = context.ingest_pipeline();

            let spinner = ProgressBar::new_spinner().with_message("chunking and embedding");
            spinner.set_style(ProgressStyle::default_spinner());
            spinner.enable_steady_tick(Duration::from_millis(120));

            let batch = pipeline.process_files(files).await;
            let report = if replace {
                let chunks = batch.chunks.len();
                context.datastore.initialize(&batch.chunks).await?;
                IngestReport {
                    files: batch.outcomes,
                    chunks_stored: chunks,
                }
            } else {
                pipeline.store(batch).await?
            };
            spinner.finish_and_clear();

            print_report(&report);
            context.shutdown().await;
        }

        Commands::Search { query, top_k } => {
            let context = AppContext::from_settings(settings).await?;
            let results = context.query_engine().search(&query, top_k).await?;

            if results.is_empty() {
                println!("No results.");
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{:2}. [{:.3}] {} ({})",
                    rank + 1,
                    result.similarity,
                    result.title,
                    result.source_filename
                );
                println!("    {}", preview(&result.content, 200));
            }
            context.shutdown().await;
        }
    }

    Ok(())
}

/// Recursively collect PDF files under `dir`, reading each into memory.
fn collect_pdfs(dir: &Path) -> anyhow::Result<Vec<NamedFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        files.push(NamedFile { name, bytes });
    }
    Ok(files)
}

fn print_report(report: &IngestReport) {
    for outcome in &report.files {
        match &outcome.status {
            FileStatus::Ingested { chunks, skipped } => {
                if *skipped > 0 {
                    println!(
                        "  ok    {} ({chunks} chunks, {skipped} skipped)",
                        outcome.filename
                    );
                } else {
                    println!("  ok    {} ({chunks} chunks)", outcome.filename);
                }
            }
            FileStatus::Failed { reason } => {
                println!("  FAIL  {}: {reason}", outcome.filename);
            }
        }
    }
    println!("Stored {} chunks total.", report.chunks_stored);
}

fn preview(content: &str, max_chars: usize) -> String {
    let collapsed: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}
