//! Configuration types for PDF-to-ROM conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The console constraints themselves
//! (320×224, 15 colors, 3 bits per channel) are constants, not knobs: a ROM
//! built with any other values would not display correctly.

use crate::error::Slide2RomError;
use crate::pipeline::build::ContainerRuntime;
use crate::pipeline::template::Skeleton;
use crate::progress::ProgressCallback;
use crate::runner::{SystemRunner, ToolRunner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Horizontal resolution of the console's default display mode.
pub const SLIDE_WIDTH: u32 = 320;
/// Vertical resolution of the console's default (NTSC) display mode.
pub const SLIDE_HEIGHT: u32 = 224;
/// Colors per slide. One of the 16 palette entries is the backdrop.
pub const MAX_COLORS: u32 = 15;
/// Bits per channel the palette is pre-reduced to.
pub const CHANNEL_DEPTH: u32 = 3;
/// Container image holding the SGDK toolchain.
pub const DEFAULT_TOOLCHAIN_IMAGE: &str = "ghcr.io/stephane-d/sgdk:latest";

/// Configuration for a PDF-to-ROM conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use slide2rom::{ConversionConfig, Dithering};
///
/// let config = ConversionConfig::builder()
///     .dithering(Dithering::O4x4)
///     .background("white")
///     .build()
///     .unwrap();
/// assert_eq!(config.dithering, Dithering::O4x4);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Dithering applied while quantising each slide. Default: disabled.
    pub dithering: Dithering,

    /// Color used to pad slides whose aspect ratio isn't 10:7. Any
    /// ImageMagick color name or `#rrggbb`. Default: `black`.
    pub background: String,

    /// Rasterisation DPI passed to `pdftoppm`. Range: 72–400. Default: 150.
    ///
    /// Every page is scaled down to 320×224 afterwards, so this only
    /// affects how much detail survives the downscale.
    pub dpi: u32,

    /// Rasterizer program. Default: `pdftoppm` from PATH.
    pub rasterizer: PathBuf,

    /// Image tool program. If None, `magick` is preferred and the legacy
    /// `convert` is used as a fallback; resolved once per run.
    pub image_tool: Option<PathBuf>,

    /// Container runtime. If None, `docker` then `podman` are probed.
    pub runtime: Option<ContainerRuntime>,

    /// Toolchain container image reference.
    pub toolchain_image: String,

    /// Project skeleton copied into the build tree. Default: embedded.
    pub skeleton: Skeleton,

    /// Decode each transformed slide and check its size and color count.
    /// Default: true.
    pub verify_slides: bool,

    /// Parent directory for the per-run scratch directory. If None, the
    /// system temp directory is used.
    pub scratch_root: Option<PathBuf>,

    /// Runs external tools. Default: [`SystemRunner`].
    pub runner: Arc<dyn ToolRunner>,

    /// Optional progress callback for per-slide events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dithering: Dithering::default(),
            background: "black".to_string(),
            dpi: 150,
            rasterizer: PathBuf::from("pdftoppm"),
            image_tool: None,
            runtime: None,
            toolchain_image: DEFAULT_TOOLCHAIN_IMAGE.to_string(),
            skeleton: Skeleton::default(),
            verify_slides: true,
            scratch_root: None,
            runner: Arc::new(SystemRunner),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dithering", &self.dithering)
            .field("background", &self.background)
            .field("dpi", &self.dpi)
            .field("rasterizer", &self.rasterizer)
            .field("image_tool", &self.image_tool)
            .field("runtime", &self.runtime)
            .field("toolchain_image", &self.toolchain_image)
            .field("skeleton", &self.skeleton)
            .field("verify_slides", &self.verify_slides)
            .field("scratch_root", &self.scratch_root)
            .field("runner", &"<dyn ToolRunner>")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn dithering(mut self, dithering: Dithering) -> Self {
        self.config.dithering = dithering;
        self
    }

    pub fn background(mut self, color: impl Into<String>) -> Self {
        self.config.background = color.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn rasterizer(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.rasterizer = program.into();
        self
    }

    pub fn image_tool(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.image_tool = Some(program.into());
        self
    }

    pub fn runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.config.runtime = Some(runtime);
        self
    }

    pub fn toolchain_image(mut self, image: impl Into<String>) -> Self {
        self.config.toolchain_image = image.into();
        self
    }

    pub fn skeleton(mut self, skeleton: Skeleton) -> Self {
        self.config.skeleton = skeleton;
        self
    }

    pub fn verify_slides(mut self, v: bool) -> Self {
        self.config.verify_slides = v;
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.config.runner = runner;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Slide2RomError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Slide2RomError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.background.trim().is_empty() {
            return Err(Slide2RomError::InvalidConfig(
                "Background color must not be empty".into(),
            ));
        }
        if c.toolchain_image.trim().is_empty() {
            return Err(Slide2RomError::InvalidConfig(
                "Toolchain image reference must not be empty".into(),
            ));
        }
        if let Skeleton::Directory(ref dir) = c.skeleton {
            if !dir.is_dir() {
                return Err(Slide2RomError::InvalidConfig(format!(
                    "Template directory '{}' does not exist",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Dithering policy applied during color reduction.
///
/// The names are the ImageMagick method names, which is also what the CLI
/// accepts. Error diffusion spreads quantisation error to neighbouring
/// pixels; ordered dithering tiles a fixed threshold pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dithering {
    /// No dithering: hard edges between quantised colors. (default)
    #[default]
    None,
    FloydSteinberg,
    Riemersma,
    O2x2,
    O3x3,
    O4x4,
    O8x8,
    Checks,
}

impl Dithering {
    /// Every named method, in CLI order.
    pub const METHODS: [Dithering; 7] = [
        Dithering::FloydSteinberg,
        Dithering::Riemersma,
        Dithering::O2x2,
        Dithering::O3x3,
        Dithering::O4x4,
        Dithering::O8x8,
        Dithering::Checks,
    ];

    /// ImageMagick name of the method; `"none"` when disabled.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dithering::None => "none",
            Dithering::FloydSteinberg => "FloydSteinberg",
            Dithering::Riemersma => "Riemersma",
            Dithering::O2x2 => "o2x2",
            Dithering::O3x3 => "o3x3",
            Dithering::O4x4 => "o4x4",
            Dithering::O8x8 => "o8x8",
            Dithering::Checks => "checks",
        }
    }

    pub fn is_error_diffusion(&self) -> bool {
        matches!(self, Dithering::FloydSteinberg | Dithering::Riemersma)
    }

    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Dithering::O2x2 | Dithering::O3x3 | Dithering::O4x4 | Dithering::O8x8 | Dithering::Checks
        )
    }

    /// Image tool arguments selecting this policy.
    pub fn tool_args(&self) -> Vec<&'static str> {
        if self.is_error_diffusion() {
            vec!["-dither", self.as_str()]
        } else if self.is_ordered() {
            vec!["-ordered-dither", self.as_str()]
        } else {
            vec!["+dither"]
        }
    }
}

impl fmt::Display for Dithering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dithering {
    type Err = Slide2RomError;

    /// Case-insensitive; accepts `none`/`off` for disabled.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("off") {
            return Ok(Dithering::None);
        }
        Dithering::METHODS
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Dithering::METHODS.iter().map(|d| d.as_str()).collect();
                Slide2RomError::InvalidConfig(format!(
                    "Unknown dithering method '{s}'. Expected one of: {}",
                    names.join(", ")
                ))
            })
    }
}
