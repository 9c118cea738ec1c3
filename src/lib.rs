//! # slide2rom
//!
//! Turn a PDF slide deck into a Sega Mega Drive / Genesis ROM that shows
//! one slide per screen, navigated with left and right on the pad.
//!
//! ## Why this crate?
//!
//! The console can show a 320×224 image built from a single 16-entry
//! palette of 9-bit colors. Getting a presentation onto that screen means
//! rendering, fitting, padding and quantising every page, generating the
//! SGDK resource glue, and compiling a cartridge image. This crate drives
//! the tools that are good at each of those steps and generates the glue
//! in between.
//!
//! ## Pipeline Overview
//!
//! ```text
//! deck.pdf@3-5
//!  │
//!  ├─ 1. Select     parse the optional page range
//!  ├─ 2. Input      check the file is a readable PDF
//!  ├─ 3. Rasterise  pdftoppm, every page once
//!  ├─ 4. Transform  ImageMagick: fit 320×224, 3-bit depth, 15 colors, PNG8
//!  ├─ 5. Manifest   slide_data.res + slides.h, dense slide order
//!  ├─ 6. Template   viewer skeleton + generated files into the build tree
//!  └─ 7. Build      SGDK container → out/rom.bin → ROM.BIN
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slide2rom::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("talk.pdf", "talk.bin", &config)?;
//!     eprintln!("{} slides, {} bytes", output.stats.slide_count, output.stats.rom_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for | Override |
//! |------|----------|----------|
//! | `pdftoppm` (poppler) | rasterisation | [`ConversionConfigBuilder::rasterizer`] |
//! | `magick` / `convert` (ImageMagick) | slide transformation | [`ConversionConfigBuilder::image_tool`] |
//! | `docker` / `podman` | running the SGDK toolchain | [`ConversionConfigBuilder::runtime`] |
//!
//! Every invocation goes through the [`ToolRunner`] trait, so tests and
//! embedders can substitute their own.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slide2rom` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ```toml
//! slide2rom = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod runner;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, Dithering};
pub use convert::{convert, convert_spec};
pub use error::Slide2RomError;
pub use output::{ConversionOutput, ConversionStats, SlideRecord};
pub use pipeline::build::ContainerRuntime;
pub use pipeline::select::PageSpec;
pub use pipeline::template::Skeleton;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use runner::{Invocation, SystemRunner, ToolOutput, ToolRunner};
