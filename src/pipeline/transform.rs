//! Slide image transformation via ImageMagick.
//!
//! Each selected page goes through one image-tool invocation whose
//! operator order matters:
//!
//! 1. `-scale 320x224` fits the page inside the screen, keeping aspect.
//! 2. `-background C -gravity center -extent 320x224` pads it to exactly
//!    the screen size. Image resources must be a multiple of 8 pixels in
//!    each dimension; 320×224 is.
//! 3. `-depth 3` drops to 3 bits per channel *before* the palette is
//!    chosen, so the palette lands on colors the VDP can show (its CRAM is
//!    9-bit BGR) instead of being snapped there afterwards.
//! 4. The dithering policy.
//! 5. `-colors 15` and a `PNG8:` output: one palette line, with entry 0
//!    left for the backdrop.
//!
//! When verification is on, the written PNG is decoded and checked before
//! it is accepted.

use crate::config::{Dithering, CHANNEL_DEPTH, MAX_COLORS, SLIDE_HEIGHT, SLIDE_WIDTH};
use crate::error::Slide2RomError;
use crate::pipeline::rasterize::RasterPage;
use crate::runner::{spawn_error, Invocation, ToolRunner};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolved image-tool binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTool {
    program: PathBuf,
}

impl ImageTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `configured` if given, otherwise look up `magick` and then the
    /// ImageMagick 6 `convert` on PATH.
    pub fn resolve(configured: Option<&Path>) -> Result<Self, Slide2RomError> {
        match configured {
            Some(program) => Ok(Self::new(program)),
            None => Self::detect(),
        }
    }

    pub fn detect() -> Result<Self, Slide2RomError> {
        if let Ok(path) = which::which("magick") {
            return Ok(Self::new(path));
        }
        // On Windows `convert` is the FAT-to-NTFS disk utility.
        if !cfg!(windows) {
            if let Ok(path) = which::which("convert") {
                warn!("`magick` not found, falling back to legacy `convert`");
                return Ok(Self::new(path));
            }
        }
        Err(Slide2RomError::ToolNotFound {
            tool: "magick".into(),
            hint: "Install ImageMagick (Ubuntu: apt install imagemagick).".into(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Turns rasterised pages into console-ready slide images.
#[derive(Debug, Clone)]
pub struct Transformer {
    tool: ImageTool,
    background: String,
    dithering: Dithering,
    verify: bool,
}

impl Transformer {
    pub fn new(tool: ImageTool, background: impl Into<String>, dithering: Dithering) -> Self {
        Self {
            tool,
            background: background.into(),
            dithering,
            verify: true,
        }
    }

    /// Enable or disable decoding and checking each written slide.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn dithering(&self) -> Dithering {
        self.dithering
    }

    /// Full command line turning `input` into an indexed PNG at `output`.
    pub fn invocation(&self, input: &Path, output: &Path) -> Invocation {
        let geometry = format!("{SLIDE_WIDTH}x{SLIDE_HEIGHT}");
        let mut target = OsString::from("PNG8:");
        target.push(output.as_os_str());

        Invocation::new(self.tool.program())
            .arg(input)
            .args(["-scale", geometry.as_str()])
            .args(["-background", self.background.as_str()])
            .args(["-gravity", "center"])
            .args(["-extent", geometry.as_str()])
            .args(["-depth".to_string(), CHANNEL_DEPTH.to_string()])
            .args(self.dithering.tool_args())
            .args(["-colors".to_string(), MAX_COLORS.to_string()])
            .arg(target)
    }

    /// Transform one page into `res_dir/<raster file name>`.
    pub fn transform_page(
        &self,
        runner: &dyn ToolRunner,
        page: &RasterPage,
        res_dir: &Path,
    ) -> Result<PathBuf, Slide2RomError> {
        let output_path = res_dir.join(page.file_name());
        let invocation = self.invocation(&page.image_path, &output_path);

        let output = runner
            .run(&invocation)
            .map_err(|e| spawn_error(&invocation, e))?;
        if !output.success {
            return Err(Slide2RomError::Transform {
                page: page.sequence_number,
                detail: output.describe_failure(&invocation),
            });
        }

        if self.verify {
            let colors = verify_slide(&output_path, page.sequence_number)?;
            debug!(
                "Page {} → {} ({} colors)",
                page.sequence_number,
                output_path.display(),
                colors
            );
        }

        Ok(output_path)
    }
}

/// Decode a transformed slide and check it is exactly 320×224 with at
/// most 15 distinct colors. Returns the color count.
pub fn verify_slide(path: &Path, page: u32) -> Result<usize, Slide2RomError> {
    let img = image::open(path).map_err(|e| Slide2RomError::Transform {
        page,
        detail: format!("cannot read {}: {}", path.display(), e),
    })?;

    if img.width() != SLIDE_WIDTH || img.height() != SLIDE_HEIGHT {
        return Err(Slide2RomError::Transform {
            page,
            detail: format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                img.width(),
                img.height(),
                SLIDE_WIDTH,
                SLIDE_HEIGHT
            ),
        });
    }

    let mut colors = HashSet::new();
    for pixel in img.to_rgba8().pixels() {
        colors.insert(pixel.0);
        if colors.len() > MAX_COLORS as usize {
            return Err(Slide2RomError::Transform {
                page,
                detail: format!(
                    "{} has more than {} colors",
                    path.display(),
                    MAX_COLORS
                ),
            });
        }
    }

    Ok(colors.len())
}
