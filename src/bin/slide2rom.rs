//! CLI binary for slide2rom.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slide2rom::{
    convert_spec, ContainerRuntime, ConversionConfig, ConversionProgressCallback, Dithering,
    PageSpec, ProgressCallback, Skeleton, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while rasterising and building, a bar while slides are
/// transformed.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Checking input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix("Processing");
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER)
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_slides: usize) {
        self.activate_bar(total_slides);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_slides} slides…"))
        ));
    }

    fn on_stage(&self, stage: Stage) {
        match stage {
            // The bar takes over in on_conversion_start.
            Stage::Transforming => {}
            Stage::Rasterizing => {
                self.bar.set_prefix("Rasterising");
                self.bar.set_message(stage.describe());
            }
            Stage::Materializing | Stage::Building => {
                self.bar.set_style(spinner_style());
                self.bar.set_prefix("Building");
                self.bar.set_message(stage.describe());
            }
        }
    }

    fn on_slide_complete(&self, slide: usize, total: usize, page_num: u32) {
        self.bar.println(format!(
            "  {} Processed {:>3} / {:<3} {}",
            green("✓"),
            slide,
            total,
            dim(&format!("page {page_num}")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, _total_slides: usize, _rom_bytes: u64) {
        self.bar.finish_and_clear();
    }
}

/// Plain `Processed X / Y` lines for non-interactive runs.
struct PlainProgressCallback;

impl ConversionProgressCallback for PlainProgressCallback {
    fn on_stage(&self, stage: Stage) {
        eprintln!("{}", stage.describe());
    }

    fn on_slide_complete(&self, slide: usize, total: usize, _page_num: u32) {
        eprintln!("Processed {slide} / {total}");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole deck
  slide2rom talk.pdf talk.bin

  # Pages 3 to 12 only
  slide2rom talk.pdf@3-12 talk.bin

  # Error-diffusion dithering (bare flag = FloydSteinberg)
  slide2rom talk.pdf talk.bin --dithering

  # Ordered dithering on a white backdrop
  slide2rom talk.pdf talk.bin --dithering o4x4 --background white

  # Custom viewer sources, rootless podman
  slide2rom talk.pdf talk.bin --template ./my-viewer --runtime podman

DITHERING METHODS:
  FloydSteinberg, Riemersma          error diffusion
  o2x2, o3x3, o4x4, o8x8, checks     ordered patterns
  (flag absent)                      no dithering

REQUIREMENTS:
  pdftoppm     poppler-utils
  magick       ImageMagick 7 (ImageMagick 6 `convert` also works)
  docker       or podman; pulls ghcr.io/stephane-d/sgdk:latest on first run

ENVIRONMENT VARIABLES:
  Every option can also be set as SLIDE2ROM_<OPTION>, e.g.
  SLIDE2ROM_DITHERING=o8x8. RUST_LOG overrides the log filter.
"#;

/// Convert a PDF slide deck into a Sega Genesis ROM.
#[derive(Parser, Debug)]
#[command(
    name = "slide2rom",
    version,
    about = "Convert a PDF slide deck into a Sega Genesis / Mega Drive ROM",
    long_about = "Convert a PDF slide deck into a Sega Genesis / Mega Drive ROM. Each selected \
page becomes a 320×224, 15-color slide; left and right on the pad move between slides.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Slide deck PDF, optionally with an inclusive page range: talk.pdf@3-12
    #[arg(value_name = "SLIDES.PDF", value_parser = parse_slides)]
    slides: PageSpec,

    /// Where to write the ROM.
    #[arg(value_name = "ROM.BIN")]
    rom: PathBuf,

    /// Dither while reducing colors. A bare flag means FloydSteinberg.
    #[arg(
        long,
        env = "SLIDE2ROM_DITHERING",
        value_enum,
        ignore_case = true,
        num_args = 0..=1,
        default_missing_value = "FloydSteinberg",
        value_name = "METHOD"
    )]
    dithering: Option<DitheringArg>,

    /// Padding color for slides that aren't 10:7 (ImageMagick color).
    #[arg(long, env = "SLIDE2ROM_BACKGROUND", default_value = "black")]
    background: String,

    /// Rasterisation DPI (72–400).
    #[arg(long, env = "SLIDE2ROM_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Viewer skeleton directory to use instead of the built-in one.
    #[arg(long, env = "SLIDE2ROM_TEMPLATE", value_name = "DIR")]
    template: Option<PathBuf>,

    /// Container runtime. Default: docker if found, else podman.
    #[arg(long, env = "SLIDE2ROM_RUNTIME", value_enum)]
    runtime: Option<RuntimeArg>,

    /// SGDK toolchain image.
    #[arg(long, env = "SLIDE2ROM_TOOLCHAIN_IMAGE", default_value = slide2rom::config::DEFAULT_TOOLCHAIN_IMAGE)]
    toolchain_image: String,

    /// ImageMagick program. Default: magick, falling back to convert.
    #[arg(long, env = "SLIDE2ROM_IMAGE_TOOL", value_name = "PROGRAM")]
    image_tool: Option<PathBuf>,

    /// PDF rasterizer program.
    #[arg(long, env = "SLIDE2ROM_RASTERIZER", default_value = "pdftoppm", value_name = "PROGRAM")]
    rasterizer: PathBuf,

    /// Skip decoding each slide to check its size and color count.
    #[arg(long, env = "SLIDE2ROM_NO_VERIFY")]
    no_verify: bool,

    /// Print the run summary (ConversionOutput) as JSON on stdout.
    #[arg(long, env = "SLIDE2ROM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SLIDE2ROM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDE2ROM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDE2ROM_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DitheringArg {
    #[value(name = "FloydSteinberg")]
    FloydSteinberg,
    #[value(name = "Riemersma")]
    Riemersma,
    #[value(name = "o2x2")]
    O2x2,
    #[value(name = "o3x3")]
    O3x3,
    #[value(name = "o4x4")]
    O4x4,
    #[value(name = "o8x8")]
    O8x8,
    #[value(name = "checks")]
    Checks,
}

impl From<DitheringArg> for Dithering {
    fn from(v: DitheringArg) -> Self {
        match v {
            DitheringArg::FloydSteinberg => Dithering::FloydSteinberg,
            DitheringArg::Riemersma => Dithering::Riemersma,
            DitheringArg::O2x2 => Dithering::O2x2,
            DitheringArg::O3x3 => Dithering::O3x3,
            DitheringArg::O4x4 => Dithering::O4x4,
            DitheringArg::O8x8 => Dithering::O8x8,
            DitheringArg::Checks => Dithering::Checks,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RuntimeArg {
    Docker,
    Podman,
}

impl From<RuntimeArg> for ContainerRuntime {
    fn from(v: RuntimeArg) -> Self {
        match v {
            RuntimeArg::Docker => ContainerRuntime::Docker,
            RuntimeArg::Podman => ContainerRuntime::Podman,
        }
    }
}

/// Parsed at argument time so a bad range is a usage error (exit 2).
fn parse_slides(s: &str) -> std::result::Result<PageSpec, String> {
    PageSpec::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else if !cli.quiet && !cli.json {
        Some(Arc::new(PlainProgressCallback) as ProgressCallback)
    } else {
        None
    };

    let config = build_config(&cli, progress)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_spec(&cli.slides, &cli.rom, &config).context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} slides  →  {}  {}",
            green("✔"),
            output.stats.slide_count,
            bold(&output.rom_path.display().to_string()),
            dim(&format!(
                "{} KiB, {}ms",
                output.stats.rom_bytes.div_ceil(1024),
                output.stats.total_duration_ms
            )),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dithering(cli.dithering.map(Dithering::from).unwrap_or_default())
        .background(&cli.background)
        .dpi(cli.dpi)
        .rasterizer(&cli.rasterizer)
        .toolchain_image(&cli.toolchain_image)
        .verify_slides(!cli.no_verify);

    if let Some(ref dir) = cli.template {
        builder = builder.skeleton(Skeleton::Directory(dir.clone()));
    }
    if let Some(runtime) = cli.runtime {
        builder = builder.runtime(runtime.into());
    }
    if let Some(ref tool) = cli.image_tool {
        builder = builder.image_tool(tool);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_dithering_flag_means_floyd_steinberg() {
        let cli = Cli::try_parse_from(["slide2rom", "talk.pdf", "talk.bin", "--dithering"]).unwrap();
        assert!(matches!(cli.dithering, Some(DitheringArg::FloydSteinberg)));
    }

    #[test]
    fn absent_dithering_flag_disables_it() {
        let cli = Cli::try_parse_from(["slide2rom", "talk.pdf", "talk.bin"]).unwrap();
        assert!(cli.dithering.is_none());
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dithering, Dithering::None);
    }

    #[test]
    fn named_dithering_method_is_accepted() {
        let cli =
            Cli::try_parse_from(["slide2rom", "talk.pdf", "talk.bin", "--dithering", "o8x8"]).unwrap();
        assert_eq!(build_config(&cli, None).unwrap().dithering, Dithering::O8x8);
    }

    #[test]
    fn page_range_is_parsed_at_argument_time() {
        let cli = Cli::try_parse_from(["slide2rom", "talk.pdf@3-5", "talk.bin"]).unwrap();
        assert_eq!(cli.slides.start_page(), 3);
        assert_eq!(cli.slides.end_page(), Some(5));
    }

    #[test]
    fn reversed_range_is_a_usage_error() {
        let err = Cli::try_parse_from(["slide2rom", "talk.pdf@5-3", "talk.bin"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_dithering_method_is_a_usage_error() {
        let err = Cli::try_parse_from(["slide2rom", "talk.pdf", "talk.bin", "--dithering", "bayer"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
