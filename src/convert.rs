//! Conversion entry points.
//!
//! [`convert_document`] is the synchronous core: it drives one
//! [`RasterSource`] through rasterise → fit → threshold → encode for every
//! selected page, in document order. The async functions read input, bind
//! pdfium on a blocking worker thread and call the core there.
//!
//! ## Why abort on the first failing page?
//!
//! A label job is printed as a whole. Emitting pages 1, 2 and 4 of a
//! four-page shipment silently loses a parcel label, so any failure on any
//! page fails the conversion and nothing is returned.

use crate::config::{ConversionConfig, PageSelection};
use crate::error::Pdf2ZplError;
use crate::geometry::LabelGeometry;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, LabelCommand};
use crate::pipeline::render::{PdfiumRasterSource, RasterDocument, RasterSource};
use crate::pipeline::zpl::ZplEncoder;
use crate::pipeline::{fit, input, monochrome};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Convert a local PDF file to one ZPL label command per selected page.
///
/// # Errors
/// Every error is fatal; no partial output is returned.
pub async fn convert(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ZplError> {
    let input_path = input_path.as_ref();
    info!("Starting conversion: {}", input_path.display());
    let bytes = input::read_document(input_path).await?;
    convert_blocking(bytes, config.clone()).await
}

/// Convert PDF bytes held in memory.
///
/// # Example
/// ```rust,no_run
/// use pdf2zpl::{convert_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("shipping-label.pdf")?;
/// let output = convert_bytes(bytes, &ConversionConfig::default()).await?;
/// print!("{}", output.to_zpl());
/// # Ok(())
/// # }
/// ```
pub async fn convert_bytes(
    bytes: impl Into<Vec<u8>>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ZplError> {
    let bytes = bytes.into();
    input::validate_magic(&bytes, "<memory>")?;
    convert_blocking(bytes, config.clone()).await
}

/// Convert a PDF and write the concatenated ZPL to `output_path`.
///
/// Uses atomic write (temp file + rename), so a failed conversion never
/// leaves a truncated print file behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2ZplError> {
    let output = convert(input_path, config).await?;
    write_output(&output, output_path).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ZplError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2ZplError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_path, config))
}

/// Read document metadata and page sizes without rendering.
///
/// Only `password` and `pdfium_lib` are taken from `config`.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2ZplError> {
    let bytes = input::read_document(input_path).await?;
    let lib = config.pdfium_lib.clone();
    let password = config.password.clone();
    tokio::task::spawn_blocking(move || {
        PdfiumRasterSource::bind(lib.as_deref())?
            .with_password(password)
            .metadata(&bytes)
    })
    .await
    .map_err(|e| Pdf2ZplError::Internal(format!("inspect task failed: {}", e)))?
}

/// Write every label command of `output` to `path`, atomically.
pub async fn write_output(
    output: &ConversionOutput,
    path: impl AsRef<Path>,
) -> Result<(), Pdf2ZplError> {
    let path = path.as_ref();
    let write_failed = |e: std::io::Error| Pdf2ZplError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("zpl.tmp");
    tokio::fs::write(&tmp_path, output.to_zpl())
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    debug!(
        "Wrote {} labels ({} bytes) to {}",
        output.labels.len(),
        output.stats.zpl_bytes,
        path.display()
    );
    Ok(())
}

/// Run the pipeline over `document` with an already-constructed source.
///
/// Pages are processed strictly in ascending document order. Each page's
/// raster, fitted image and bitmap live only inside its loop iteration.
pub fn convert_document<S: RasterSource>(
    source: &S,
    document: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ZplError> {
    let total_start = Instant::now();
    let resolution = config.resolution()?;
    let geometry = config.geometry()?;
    let encoder = config.encoder();

    debug!("Opening document ({} bytes) at {}", document.len(), resolution);
    let doc = source.open(document, resolution)?;
    let total_pages = doc.page_count();

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2ZplError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    let selected = page_indices.len();
    info!(
        "Converting {} of {} pages onto {} at {}",
        selected, total_pages, geometry, resolution
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let mut labels = Vec::with_capacity(selected);
    let mut timings = StageTimings::default();

    for index in page_indices {
        let page_num = index + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }

        match convert_page(&doc, index, geometry, config, &encoder, &mut timings) {
            Ok(label) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(page_num, selected, label.zpl.len());
                }
                labels.push(label);
            }
            Err(e) => {
                warn!("Page {} failed, aborting: {}", page_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    let stats = ConversionStats {
        total_pages,
        converted_pages: labels.len(),
        bitmap_bytes: labels.iter().map(|l| l.total_bytes).sum(),
        zpl_bytes: labels.iter().map(|l| l.zpl.len()).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms: timings.render.as_millis() as u64,
        encode_duration_ms: timings.encode.as_millis() as u64,
    };

    info!(
        "Conversion complete: {} labels, {} bytes of ZPL, {}ms total",
        stats.converted_pages, stats.zpl_bytes, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected);
    }

    Ok(ConversionOutput { labels, stats })
}

// ── Internal helpers ─────────────────────────────────────────────────────

#[derive(Default)]
struct StageTimings {
    render: Duration,
    encode: Duration,
}

fn convert_page<D: RasterDocument>(
    doc: &D,
    index: usize,
    geometry: LabelGeometry,
    config: &ConversionConfig,
    encoder: &ZplEncoder,
    timings: &mut StageTimings,
) -> Result<LabelCommand, Pdf2ZplError> {
    let page_num = index + 1;

    debug!("Page {}: rasterizing", page_num);
    let started = Instant::now();
    let raster = doc.render_page(index)?;
    timings.render += started.elapsed();

    let started = Instant::now();
    debug!("Page {}: fitting", page_num);
    let fitted = fit::fit(raster, geometry, config.rotation)?;
    let bitmap = monochrome::to_monochrome(&fitted, config.threshold);
    drop(fitted);

    debug!("Page {}: encoding {} ink dots", page_num, bitmap.ink_count());
    let label = encoder.encode(&bitmap, page_num)?;
    timings.encode += started.elapsed();

    debug!("Page {}: emitting {} bytes", page_num, label.zpl.len());
    Ok(label)
}

async fn convert_blocking(
    bytes: Vec<u8>,
    config: ConversionConfig,
) -> Result<ConversionOutput, Pdf2ZplError> {
    tokio::task::spawn_blocking(move || {
        let geometry = config.geometry()?;
        let source = PdfiumRasterSource::bind(config.pdfium_lib.as_deref())?
            .with_password(config.password.clone())
            .with_max_edge(Some(geometry.width().max(geometry.height())));
        convert_document(&source, &bytes, &config)
    })
    .await
    .map_err(|e| Pdf2ZplError::Internal(format!("conversion task failed: {}", e)))?
}

/// The page number to report when a selection matches nothing.
fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().max().unwrap_or(1),
    }
}
