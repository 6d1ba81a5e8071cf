//! CLI binary for pdf2zpl.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2zpl::{
    convert, inspect, write_output, Compression, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, LabelSize, PageSelection, ProgressCallback, RotationPolicy,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} labels  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages to labels…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, zpl_len: usize) {
        let elapsed = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{zpl_len:>8} bytes")),
            dim(&format!("{elapsed:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed_secs();
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(first_line),
            dim(&format!("{elapsed:.2}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} labels generated",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # 4x6 in label at 203 dpi, ZPL on stdout
  pdf2zpl shipping-label.pdf > label.zpl

  # Write to a file
  pdf2zpl shipping-label.pdf -o label.zpl

  # 300 dpi printer, 100x150 mm labels
  pdf2zpl --dpi 300 --label-mm 100x150 invoice.pdf -o invoice.zpl

  # Landscape page kept upright, darker threshold
  pdf2zpl --rotation never --threshold 160 label.pdf

  # Print the second page three times
  pdf2zpl --pages 2 --copies 3 labels.pdf | nc printer.local 9100

  # Page sizes and metadata only
  pdf2zpl --inspect-only labels.pdf

  # Check what the printer will see
  pdf2zpl --preview previews/ label.pdf -o label.zpl

  # JSON output with per-page commands and stats
  pdf2zpl --json labels.pdf > labels.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PDF2ZPL_*               Every flag has a PDF2ZPL_<FLAG> fallback
  RUST_LOG                Override the log filter (e.g. pdf2zpl=debug)
"#;

/// Convert PDF documents to ZPL label printer commands.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2zpl",
    version,
    about = "Convert PDF documents to ZPL label printer commands",
    long_about = "Rasterise each page of a PDF at the printer's dot density, fit it onto the \
label, threshold it to one bit per dot and emit one self-contained ^XA…^XZ block per page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write ZPL to this file instead of stdout.
    #[arg(short, long, env = "PDF2ZPL_OUTPUT")]
    output: Option<PathBuf>,

    /// Printer resolution in dots per inch (72–600).
    #[arg(long, env = "PDF2ZPL_DPI", default_value_t = 203,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Label width in inches.
    #[arg(long, env = "PDF2ZPL_WIDTH", default_value_t = 4.0)]
    width: f64,

    /// Label height in inches.
    #[arg(long, env = "PDF2ZPL_HEIGHT", default_value_t = 6.0)]
    height: f64,

    /// Label size in millimetres as WIDTHxHEIGHT; overrides --width/--height.
    #[arg(long, env = "PDF2ZPL_LABEL_MM")]
    label_mm: Option<String>,

    /// Luminance below which a pixel prints as ink (0–255).
    #[arg(long, env = "PDF2ZPL_THRESHOLD", default_value_t = 128)]
    threshold: u8,

    /// Page rotation: auto, never, always.
    #[arg(long, env = "PDF2ZPL_ROTATION", value_enum, default_value = "auto")]
    rotation: RotationArg,

    /// ^GF payload encoding: zpl (compressed) or hex.
    #[arg(long, env = "PDF2ZPL_COMPRESSION", value_enum, default_value = "zpl")]
    compression: CompressionArg,

    /// Print quantity per label (^PQ).
    #[arg(long, env = "PDF2ZPL_COPIES", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    copies: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2ZPL_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2ZPL_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Largest uncompressed ^GF field accepted per page, in bytes.
    #[arg(long, env = "PDF2ZPL_MAX_FIELD_BYTES", default_value_t = pdf2zpl::pipeline::zpl::DEFAULT_MAX_FIELD_BYTES)]
    max_field_bytes: usize,

    /// Also write each label as a black/white PNG into this directory.
    #[arg(long, env = "PDF2ZPL_PREVIEW")]
    preview: Option<PathBuf>,

    /// Print structured JSON (ConversionOutput) to stdout instead of raw ZPL.
    #[arg(long, env = "PDF2ZPL_JSON", conflicts_with = "output")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2ZPL_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata and page sizes only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2ZPL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2ZPL_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RotationArg {
    Auto,
    Never,
    Always,
}

impl From<RotationArg> for RotationPolicy {
    fn from(v: RotationArg) -> Self {
        match v {
            RotationArg::Auto => RotationPolicy::Auto,
            RotationArg::Never => RotationPolicy::Never,
            RotationArg::Always => RotationPolicy::Always,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    Zpl,
    Hex,
}

impl From<CompressionArg> for Compression {
    fn from(v: CompressionArg) -> Self {
        match v {
            CompressionArg::Zpl => Compression::Zpl,
            CompressionArg::Hex => Compression::Hex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            let dpi = config.dpi as f32;
            for (i, (w, h)) in meta.page_sizes.iter().enumerate() {
                println!(
                    "  Page {:>3}:   {:.1}×{:.1} pt  ({:.2}×{:.2} in, {}×{} dots @ {} dpi)",
                    i + 1,
                    w,
                    h,
                    w / 72.0,
                    h / 72.0,
                    (w / 72.0 * dpi).round(),
                    (h / 72.0 * dpi).round(),
                    config.dpi,
                );
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if let Some(ref output_path) = cli.output {
        write_output(&output, output_path)
            .await
            .context("Failed to write ZPL")?;
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.to_zpl().as_bytes())
            .context("Failed to write to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }

    if let Some(ref dir) = cli.preview {
        write_previews(&output, dir)?;
    }

    if !cli.quiet {
        let stats = &output.stats;
        let target = cli
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            green("✔"),
            stats.converted_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&target),
        );
        eprintln!(
            "   {} bitmap bytes  →  {} ZPL bytes  ({:.0}%)",
            dim(&stats.bitmap_bytes.to_string()),
            dim(&stats.zpl_bytes.to_string()),
            stats.compression_ratio() * 100.0,
        );
    }

    Ok(())
}

/// Decode every emitted label and save it as `page-NNN.png` in `dir`.
fn write_previews(output: &ConversionOutput, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory {}", dir.display()))?;
    for label in &output.labels {
        let bitmap = label
            .to_bitmap()
            .with_context(|| format!("Label for page {} does not decode", label.page_num))?;
        let path = dir.join(format!("page-{:03}.png", label.page_num));
        bitmap
            .to_luma_image()
            .save(&path)
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let label = match cli.label_mm {
        Some(ref mm) => parse_label_mm(mm)?,
        None => LabelSize::inches(cli.width, cli.height),
    };

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .label(label)
        .threshold(cli.threshold)
        .rotation(cli.rotation.into())
        .compression(cli.compression.into())
        .copies(cli.copies)
        .max_field_bytes(cli.max_field_bytes)
        .pages(parse_pages(&cli.pages)?);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--label-mm` (`100x150`) into a millimetre label size.
fn parse_label_mm(s: &str) -> Result<LabelSize> {
    let (w, h) = s
        .trim()
        .to_lowercase()
        .split_once(&['x', '×'][..])
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .with_context(|| format!("Label size must look like 100x150, got '{s}'"))?;
    let width: f64 = w.parse().context("Invalid label width")?;
    let height: f64 = h.parse().context("Invalid label height")?;
    Ok(LabelSize::millimetres(width, height))
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_all_single_range_set() {
        assert!(matches!(parse_pages("ALL").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5)));
        assert!(matches!(
            parse_pages("3-15").unwrap(),
            PageSelection::Range(3, 15)
        ));
        match parse_pages("1, 3,5").unwrap() {
            PageSelection::Set(p) => assert_eq!(p, vec![1, 3, 5]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pages_rejects_zero_and_backwards_ranges() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("0-3").is_err());
        assert!(parse_pages("9-3").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("two").is_err());
    }

    #[test]
    fn label_mm_parses_both_separators() {
        assert_eq!(
            parse_label_mm("100x150").unwrap(),
            LabelSize::millimetres(100.0, 150.0)
        );
        assert_eq!(
            parse_label_mm("57 × 32").unwrap(),
            LabelSize::millimetres(57.0, 32.0)
        );
        assert!(parse_label_mm("100").is_err());
        assert!(parse_label_mm("ax150").is_err());
    }

    #[test]
    fn previews_are_written_per_label() {
        let mut bm = pdf2zpl::MonochromeBitmap::new(16, 2);
        bm.set(3, 1, true);
        let label = pdf2zpl::pipeline::zpl::ZplEncoder::default()
            .encode(&bm, 4)
            .unwrap();
        let output = ConversionOutput {
            labels: vec![label],
            stats: Default::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        write_previews(&output, dir.path()).unwrap();

        let img = image::open(dir.path().join("page-004.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(img.dimensions(), (16, 2));
        assert_eq!(img.get_pixel(3, 1).0, [0]);
        assert_eq!(img.get_pixel(0, 0).0, [255]);
    }

    #[test]
    fn cli_defaults_build_four_by_six() {
        let cli = Cli::parse_from(["pdf2zpl", "in.pdf"]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, 203);
        let g = config.geometry().unwrap();
        assert_eq!((g.width(), g.height()), (812, 1218));
    }

    #[test]
    fn json_and_output_file_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["pdf2zpl", "in.pdf", "--json", "-o", "out.zpl"])
            .err()
            .expect("--json with -o must be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        assert!(Cli::try_parse_from(["pdf2zpl", "in.pdf", "--json"]).is_ok());
    }
}
