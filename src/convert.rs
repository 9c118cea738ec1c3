//! Conversion entry points.
//!
//! A run is strictly linear: every stage consumes the previous stage's
//! output, and the first failure aborts the run with that stage's error.
//! The scratch tree lives for exactly one call and is removed on every
//! exit path.

use crate::config::ConversionConfig;
use crate::error::Slide2RomError;
use crate::output::{ConversionOutput, ConversionStats, SlideRecord};
use crate::pipeline::build::{ContainerRuntime, Toolchain};
use crate::pipeline::manifest::{ManifestBuilder, SlideAsset};
use crate::pipeline::rasterize::Rasterizer;
use crate::pipeline::scratch::ScratchDir;
use crate::pipeline::select::PageSpec;
use crate::pipeline::transform::{ImageTool, Transformer};
use crate::pipeline::{input, template};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a slide deck to a ROM.
///
/// `slides` is a path to a PDF, optionally followed by an inclusive page
/// range: `deck.pdf` or `deck.pdf@3-5`.
///
/// # Errors
/// Returns the first stage failure. No file is written at `rom_path`
/// unless the conversion succeeds.
///
/// # Example
/// ```rust,no_run
/// use slide2rom::{convert, ConversionConfig, Dithering};
///
/// let config = ConversionConfig::builder()
///     .dithering(Dithering::FloydSteinberg)
///     .build()?;
/// let output = convert("talk.pdf@2-12", "talk.bin", &config)?;
/// println!("{} slides, {} bytes", output.stats.slide_count, output.stats.rom_bytes);
/// # Ok::<(), slide2rom::Slide2RomError>(())
/// ```
pub fn convert(
    slides: impl AsRef<str>,
    rom_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Slide2RomError> {
    let spec = PageSpec::parse(slides.as_ref())?;
    convert_spec(&spec, rom_path.as_ref(), config)
}

/// Convert an already-parsed [`PageSpec`] to a ROM at `rom_path`.
pub fn convert_spec(
    spec: &PageSpec,
    rom_path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Slide2RomError> {
    let total_start = Instant::now();
    let runner = config.runner.as_ref();
    let callback = config.progress_callback.as_ref();
    info!("Starting conversion: {}", spec);

    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::validate_pdf(spec.source_path())?;

    // ── Step 2: Resolve tools ────────────────────────────────────────────
    let image_tool = ImageTool::resolve(config.image_tool.as_deref())?;
    let runtime = match config.runtime {
        Some(runtime) => runtime,
        None => ContainerRuntime::detect()?,
    };
    debug!(
        "Using image tool {} and runtime {}",
        image_tool.program().display(),
        runtime
    );

    // ── Step 3: Acquire scratch ──────────────────────────────────────────
    let scratch = ScratchDir::acquire(config.scratch_root.as_deref())?;
    scratch.grant_container_access(runner)?;
    let res_dir = scratch.build_dir().join("res");

    // ── Step 4: Rasterise ────────────────────────────────────────────────
    if let Some(cb) = callback {
        cb.on_stage(Stage::Rasterizing);
    }
    let rasterize_start = Instant::now();
    let pages = Rasterizer::new(&config.rasterizer, config.dpi).rasterize(
        runner,
        &pdf_path,
        scratch.pages_dir(),
    )?;
    let rasterize_duration_ms = rasterize_start.elapsed().as_millis() as u64;
    let total_pages = pages.len() as u32;

    let range = spec
        .page_range(total_pages)
        .ok_or_else(|| Slide2RomError::NoSlidesSelected {
            range: spec.describe_range(),
            total: total_pages,
        })?;
    let total_slides = spec.selected_count(total_pages) as usize;
    info!(
        "Selected pages {}-{} of {} ({} slides)",
        range.start(),
        range.end(),
        total_pages,
        total_slides
    );

    // ── Step 5: Transform selected pages ─────────────────────────────────
    if let Some(cb) = callback {
        cb.on_conversion_start(total_slides);
        cb.on_stage(Stage::Transforming);
    }
    let transform_start = Instant::now();
    let transformer = Transformer::new(image_tool, &config.background, config.dithering)
        .verify(config.verify_slides);
    let mut manifest = ManifestBuilder::new();
    let mut slides = Vec::with_capacity(total_slides);

    for page in pages.iter().filter(|p| spec.selects(p.sequence_number)) {
        let image_path = transformer.transform_page(runner, page, &res_dir)?;
        let asset = SlideAsset {
            index: manifest.next_index(),
            page_number: page.sequence_number,
            file_name: page.file_name(),
            image_path,
        };
        manifest.push(&asset)?;
        slides.push(SlideRecord {
            index: asset.index,
            page_num: asset.page_number,
            file_name: asset.file_name,
        });
        if let Some(cb) = callback {
            cb.on_slide_complete(manifest.len(), total_slides, page.sequence_number);
        }
    }
    let transform_duration_ms = transform_start.elapsed().as_millis() as u64;
    let manifest = manifest.finalize();
    info!(
        "Transformed {} slides in {}ms",
        manifest.num_slides(),
        transform_duration_ms
    );

    // ── Step 6: Materialise build tree ───────────────────────────────────
    if let Some(cb) = callback {
        cb.on_stage(Stage::Materializing);
    }
    let copied = template::populate(&config.skeleton, &manifest, scratch.build_dir())?;
    info!("Build tree ready ({} skeleton files)", copied);

    // ── Step 7: Build ROM ────────────────────────────────────────────────
    if let Some(cb) = callback {
        cb.on_stage(Stage::Building);
    }
    let build_start = Instant::now();
    let toolchain = Toolchain::new(runtime, &config.toolchain_image);
    let rom_bytes = toolchain.build(runner, scratch.build_dir(), rom_path)?;
    let build_duration_ms = build_start.elapsed().as_millis() as u64;

    // ── Step 8: Clean up and report ──────────────────────────────────────
    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(
            "Failed to remove scratch directory {}: {}",
            scratch_path.display(),
            e
        );
    }

    let stats = ConversionStats {
        total_pages,
        first_page: *range.start(),
        last_page: *range.end(),
        slide_count: manifest.num_slides(),
        rom_bytes,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        rasterize_duration_ms,
        transform_duration_ms,
        build_duration_ms,
    };

    info!(
        "Conversion complete: {} slides, {} bytes, {}ms total",
        stats.slide_count, stats.rom_bytes, stats.total_duration_ms
    );

    if let Some(cb) = callback {
        cb.on_conversion_complete(stats.slide_count, rom_bytes);
    }

    Ok(ConversionOutput {
        rom_path: rom_path.to_path_buf(),
        slides,
        stats,
    })
}
