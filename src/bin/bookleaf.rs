//! CLI binary for bookleaf.
//!
//! A thin shim over the library crate: maps flags to configs, renders an
//! indicatif progress bar from the library's progress callbacks, and prints
//! results.

use anyhow::{Context, Result};
use bookleaf::{
    build_pages_from_paths, publish_album, read_album, AlbumStore, CreateAlbumRequest, FileKind,
    PublishConfig, StudioConfig, StudioProgressCallback, TextExtractor,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a file-level progress bar with per-page and
/// per-skip log lines above it.
struct CliProgress {
    bar: ProgressBar,
    files_started: AtomicUsize,
}

impl CliProgress {
    /// Create a callback whose bar length is set by `on_batch_start` (fired
    /// once archives are expanded and the real file count is known).
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            files_started: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Building");
    }
}

impl StudioProgressCallback for CliProgress {
    fn on_batch_start(&self, file_count: usize) {
        self.activate_bar(file_count);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {file_count} files…"))
        ));
    }

    fn on_file_start(&self, name: &str, kind: FileKind) {
        // The bar advances when the next file starts; the final file is
        // closed out by on_batch_complete.
        let started = self.files_started.fetch_add(1, Ordering::SeqCst);
        if started > 0 {
            self.bar.inc(1);
        }
        self.bar.set_message(format!("{name} ({kind})"));
    }

    fn on_file_skipped(&self, name: &str, reason: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            yellow("⚠"),
            name,
            dim(reason)
        ));
    }

    fn on_page_ready(&self, index: usize, name: &str) {
        self.bar
            .println(format!("  {} page {:>3}  {}", green("✓"), index, dim(name)));
    }

    fn on_batch_complete(&self, page_count: usize, skipped_count: usize) {
        self.bar.finish_and_clear();
        if skipped_count == 0 {
            eprintln!(
                "{} {} pages built",
                green("✔"),
                bold(&page_count.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages built  ({} files skipped)",
                if page_count == 0 { yellow("⚠") } else { green("✔") },
                bold(&page_count.to_string()),
                yellow(&skipped_count.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Publish photos as an album (stored under ./data/books)
  bookleaf publish vacation/*.jpg --title "Summer 2025"

  # Publish a scanned PDF with page text extraction (build with --features ocr)
  bookleaf publish scan.pdf --title "Meeting notes" --ocr

  # Publish a ZIP straight from a phone export, with a public share origin
  bookleaf publish camera-roll.zip --base-url https://books.example.com

  # Also write the share QR code to a file
  bookleaf publish photos.zip --qr-out share.png

  # Look an album up by its slug
  bookleaf show a1b2c3d4

  # Full album record as JSON (pages included)
  bookleaf show a1b2c3d4 --json

  # Dry run: how would these files expand and order?
  bookleaf inspect photos.zip extra.jpg

ENVIRONMENT VARIABLES:
  BOOKLEAF_BASE_URL     Share URL origin (default http://localhost:3000)
  BOOKLEAF_DATA_DIR     Filesystem store directory (default data/books)
  BOOKLEAF_BLOB_URL     Remote blob store base URL
  BOOKLEAF_BLOB_TOKEN   Bearer token for the blob store
  BOOKLEAF_LANG         Text-extraction language (default eng)

STORAGE:
  Albums are stored as one JSON record per slug. With no configuration they
  land in ./data/books/{slug}.json; set BOOKLEAF_BLOB_URL and
  BOOKLEAF_BLOB_TOKEN to publish to a remote blob store instead.

SETUP:
  Rasterising PDF pages needs the PDFium shared library. Download a build for
  your platform from the pdfium-binaries releases and place libpdfium next to
  the executable, or install it system-wide. Image-only albums need no setup.
"#;

/// Build and publish digital flipbook albums from photos, PDFs, and ZIPs.
#[derive(Parser, Debug)]
#[command(
    name = "bookleaf",
    version,
    about = "Build and publish digital flipbook albums from photos, PDFs, and ZIPs",
    long_about = "Turn loose photos, scanned PDF documents, and ZIP archives into a uniform \
page sequence and publish it as an immutable album behind a short share URL with a QR code.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build pages from files and publish them as a new album.
    Publish {
        /// Image, PDF, or ZIP files to include.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Album title. Empty becomes "Untitled Album".
        #[arg(short, long, default_value = "")]
        title: String,

        /// Share URL origin; the album lands at {base-url}/book/{slug}.
        #[arg(long, env = "BOOKLEAF_BASE_URL")]
        base_url: Option<String>,

        /// Filesystem store directory.
        #[arg(long, env = "BOOKLEAF_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Remote blob store base URL (requires --blob-token).
        #[arg(long, env = "BOOKLEAF_BLOB_URL", requires = "blob_token")]
        blob_url: Option<String>,

        /// Bearer token for the blob store.
        #[arg(long, env = "BOOKLEAF_BLOB_TOKEN")]
        blob_token: Option<String>,

        /// Extract text from pages (needs a build with --features ocr).
        #[arg(long)]
        ocr: bool,

        /// Text-extraction language code.
        #[arg(long, env = "BOOKLEAF_LANG", default_value = "eng")]
        lang: String,

        /// Also write the share QR code PNG to this path.
        #[arg(long)]
        qr_out: Option<PathBuf>,

        /// Print the full publish response as JSON.
        #[arg(long)]
        json: bool,

        /// Disable the progress bar.
        #[arg(long)]
        no_progress: bool,
    },

    /// Read a published album by slug and print it.
    Show {
        /// The album slug (the tail of the share URL).
        slug: String,

        /// Filesystem store directory.
        #[arg(long, env = "BOOKLEAF_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Remote blob store base URL (requires --blob-token).
        #[arg(long, env = "BOOKLEAF_BLOB_URL", requires = "blob_token")]
        blob_url: Option<String>,

        /// Bearer token for the blob store.
        #[arg(long, env = "BOOKLEAF_BLOB_TOKEN")]
        blob_token: Option<String>,

        /// Print the complete record as JSON (pages included).
        #[arg(long)]
        json: bool,
    },

    /// Classify and expand files without decoding any pixels.
    Inspect {
        /// Files to classify.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the expansion as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs would tear through the progress bar, so the default level
    // stays quiet while the bar runs; -v overrides always win.
    let show_progress = match &cli.command {
        Command::Publish {
            no_progress, json, ..
        } => !cli.quiet && !no_progress && !json,
        _ => false,
    };
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => {
                if show_progress {
                    "error"
                } else {
                    "warn"
                }
            }
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Publish {
            files,
            title,
            base_url,
            data_dir,
            blob_url,
            blob_token,
            ocr,
            lang,
            qr_out,
            json,
            no_progress: _,
        } => {
            run_publish(PublishArgs {
                files,
                title,
                base_url,
                data_dir,
                blob_url,
                blob_token,
                ocr,
                lang,
                qr_out,
                json,
                show_progress,
                quiet: cli.quiet,
            })
            .await
        }
        Command::Show {
            slug,
            data_dir,
            blob_url,
            blob_token,
            json,
        } => run_show(slug, data_dir, blob_url, blob_token, json).await,
        Command::Inspect { files, json } => run_inspect(files, json).await,
    }
}

struct PublishArgs {
    files: Vec<PathBuf>,
    title: String,
    base_url: Option<String>,
    data_dir: Option<PathBuf>,
    blob_url: Option<String>,
    blob_token: Option<String>,
    ocr: bool,
    lang: String,
    qr_out: Option<PathBuf>,
    json: bool,
    show_progress: bool,
    quiet: bool,
}

async fn run_publish(args: PublishArgs) -> Result<()> {
    let store = select_store(args.data_dir, args.blob_url, args.blob_token);
    tracing::debug!("Album store: {}", store.describe());

    let mut publish_builder = PublishConfig::builder();
    if let Some(ref url) = args.base_url {
        publish_builder = publish_builder.base_url(url.clone());
    }
    let publish_config = publish_builder.build().context("Invalid configuration")?;

    // ── Build pages ──────────────────────────────────────────────────────
    let progress = if args.show_progress {
        Some(CliProgress::new())
    } else {
        None
    };

    let mut studio_builder = StudioConfig::builder();
    if let Some(ref cb) = progress {
        studio_builder = studio_builder.progress(Arc::clone(cb) as Arc<dyn StudioProgressCallback>);
    }
    if args.ocr {
        studio_builder = studio_builder.text_extractor(make_extractor(&args.lang)?);
    }
    let studio_config = studio_builder.build().context("Invalid configuration")?;

    let output = build_pages_from_paths(&args.files, &studio_config)
        .await
        .context("Failed to build pages")?;
    let summary = output.summary;

    // ── Publish ──────────────────────────────────────────────────────────
    let response = publish_album(
        &store,
        CreateAlbumRequest {
            title: args.title,
            pages: output.pages,
        },
        &publish_config,
    )
    .await
    .context("Publish failed")?;

    if let Some(ref qr_path) = args.qr_out {
        let png = bookleaf::qr::share_code_png(&response.short_url, &publish_config)
            .context("Failed to render QR code")?;
        tokio::fs::write(qr_path, &png)
            .await
            .with_context(|| format!("Failed to write QR code to {}", qr_path.display()))?;
        if !args.quiet {
            eprintln!("   {} {}", dim("QR code →"), qr_path.display());
        }
    }

    // ── Print result ─────────────────────────────────────────────────────
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialise response")?
        );
    } else {
        // The share URL is the one machine-readable line on stdout.
        println!("{}", response.short_url);
        if !args.quiet {
            eprintln!(
                "{} {} — {} pages ({}, {} spreads)",
                green("✔"),
                bold(&response.metadata.title),
                response.metadata.page_count,
                response.metadata.dominant_orientation,
                response.metadata.double_page_spreads.len(),
            );
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} files in, {} after expansion, {} skipped, {}ms",
                    summary.files_received,
                    summary.files_expanded,
                    summary.files_skipped,
                    summary.total_duration_ms
                ))
            );
        }
    }

    Ok(())
}

async fn run_show(
    slug: String,
    data_dir: Option<PathBuf>,
    blob_url: Option<String>,
    blob_token: Option<String>,
    json: bool,
) -> Result<()> {
    let store = select_store(data_dir, blob_url, blob_token);

    let Some(record) = read_album(&store, &slug)
        .await
        .context("Failed to read album")?
    else {
        // A dead link is an outcome, not a failure dump.
        eprintln!("No album found for slug '{slug}'");
        std::process::exit(1);
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("Failed to serialise album")?
        );
    } else {
        let meta = &record.metadata;
        println!("Title:        {}", meta.title);
        println!("Slug:         {}", meta.slug);
        println!("Share URL:    {}", meta.short_url);
        println!("Created:      {}", meta.created_at.to_rfc3339());
        println!("Pages:        {}", meta.page_count);
        println!("Orientation:  {}", meta.dominant_orientation);
        println!("Spreads:      {}", meta.double_page_spreads.len());
        let with_text = record.pages.iter().filter(|p| p.ocr_text.is_some()).count();
        if with_text > 0 {
            println!("With text:    {with_text}");
        }
    }

    Ok(())
}

async fn run_inspect(files: Vec<PathBuf>, json: bool) -> Result<()> {
    let loaded = bookleaf::studio::load_input_files(&files)
        .await
        .context("Failed to read inputs")?;
    let expanded = bookleaf::pipeline::expand::expand_files(loaded)
        .await
        .context("Failed to expand archives")?;

    if json {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Entry<'a> {
            position: usize,
            name: &'a str,
            kind: FileKind,
            bytes: usize,
        }
        let entries: Vec<Entry> = expanded
            .iter()
            .enumerate()
            .map(|(i, f)| Entry {
                position: i,
                name: &f.name,
                kind: f.kind(),
                bytes: f.bytes.len(),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise entries")?
        );
    } else {
        for (i, f) in expanded.iter().enumerate() {
            println!(
                "{:>3}  {:<12} {:>10}  {}",
                i,
                f.kind().to_string(),
                human_size(f.bytes.len()),
                f.name
            );
        }
        let pages: usize = expanded
            .iter()
            .filter(|f| matches!(f.kind(), FileKind::Image | FileKind::Document))
            .count();
        eprintln!(
            "{}",
            dim(&format!(
                "{} files after expansion, {} will contribute pages",
                expanded.len(),
                pages
            ))
        );
    }

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn select_store(
    data_dir: Option<PathBuf>,
    blob_url: Option<String>,
    blob_token: Option<String>,
) -> AlbumStore {
    match (blob_url, blob_token) {
        (Some(url), Some(token)) => AlbumStore::remote(url, token),
        _ => match data_dir {
            Some(dir) => AlbumStore::filesystem(dir),
            None => AlbumStore::filesystem(bookleaf::store::DEFAULT_DATA_DIR),
        },
    }
}

#[cfg(feature = "ocr")]
fn make_extractor(lang: &str) -> Result<Arc<dyn TextExtractor>> {
    let extractor = bookleaf::TesseractTextExtractor::new(lang)
        .map_err(|e| anyhow::anyhow!("Failed to initialise text extraction: {e}"))?;
    Ok(Arc::new(extractor))
}

#[cfg(not(feature = "ocr"))]
fn make_extractor(_lang: &str) -> Result<Arc<dyn TextExtractor>> {
    anyhow::bail!("This build has no text extraction; rebuild with --features ocr")
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
