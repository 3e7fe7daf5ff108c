use clap::{Parser, Subcommand};
use folio::{book, config, generate, output, scan};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Paginate a markdown handbook into a flipbook site")]
#[command(long_about = "\
Paginate a markdown handbook into a flipbook site

Your filesystem is the data source. Markdown files become chapters,
directories become sections of the contents, and everything is ordered by
numeric prefix.

Chapters structure:

  chapters/
  ├── config.toml                  # Book config (optional)
  ├── cover.png                    # Cover image (set book.cover_image)
  ├── 010-welcome.md               # Chapter (title from leading # heading)
  ├── 020-policies/                # Section
  │   ├── config.toml              # Pagination overrides for this section
  │   ├── 010-office-hours.md      # No heading: title from filename
  │   └── 020-grading.md
  └── 030-appendix.md

Pipeline:
  scan      chapters/  →  manifest.json   (measured blocks per chapter)
  paginate  manifest   →  pages.json      (numbered pages)
  generate  pages      →  dist/           (flipbook views + print document)

Run 'folio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Chapters directory
    #[arg(long, default_value = "chapters", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (manifest.json, pages.json)
    #[arg(long, default_value = ".folio-temp", global = true)]
    temp_dir: PathBuf,

    /// Log pipeline decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the chapters directory into a manifest
    Scan,
    /// Split every chapter into numbered pages
    Paginate,
    /// Produce the flipbook site from the paged book
    Generate,
    /// Run the full pipeline: scan → paginate → generate
    Build,
    /// Validate the chapters directory without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let manifest_path = cli.temp_dir.join("manifest.json");
    let pages_path = cli.temp_dir.join("pages.json");

    match cli.command {
        Command::Scan => {
            let manifest = scan::scan(&cli.source)?;
            write_json(&manifest_path, &manifest)?;
            output::print_scan_output(&manifest, &cli.source);
        }
        Command::Paginate => {
            let manifest: scan::Manifest = read_json(&manifest_path)?;
            init_thread_pool(&manifest.config.processing);
            let book = book::paginate_book(&manifest)?;
            write_json(&pages_path, &book)?;
            output::print_paginate_output(&book);
        }
        Command::Generate => {
            generate::generate(&pages_path, &cli.source, &cli.output)?;
            let book: book::PagedBook = read_json(&pages_path)?;
            output::print_generate_output(&book);
        }
        Command::Build => {
            println!("==> Stage 1: Scanning {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            write_json(&manifest_path, &manifest)?;
            output::print_scan_output(&manifest, &cli.source);

            println!("==> Stage 2: Paginating");
            init_thread_pool(&manifest.config.processing);
            let book = book::paginate_book(&manifest)?;
            write_json(&pages_path, &book)?;
            output::print_paginate_output(&book);

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            generate::generate(&pages_path, &cli.source, &cli.output)?;
            output::print_generate_output(&book);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            output::print_scan_output(&manifest, &cli.source);
            init_thread_pool(&manifest.config.processing);
            let book = book::paginate_book(&manifest)?;
            println!(
                "==> Handbook is valid: {} chapters, {} pages",
                book.chapters.len(),
                book.pages.len()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
