//! Pipeline stages for PDF-to-ROM conversion.
//!
//! Each submodule implements exactly one step and only consumes values
//! produced by earlier steps.
//!
//! ## Data Flow
//!
//! ```text
//! select ──▶ input ──▶ scratch ──▶ rasterize ──▶ transform ──▶ manifest ──▶ template ──▶ build
//! (path@N-M) (%PDF)    (tempdir)   (pdftoppm)    (magick)      (.res/.h)   (skeleton)   (SGDK)
//! ```
//!
//! 1. [`select`]: parse the `<path>[@<start>-<end>]` argument
//! 2. [`input`]: check the file exists, is readable, and is a PDF
//! 3. [`scratch`]: per-run temporary tree, removed on drop
//! 4. [`rasterize`]: render every page once with `pdftoppm`
//! 5. [`transform`]: fit, pad and quantise each selected page to a
//!    320×224, 15-color indexed PNG
//! 6. [`manifest`]: resource declarations and slide pointer table
//! 7. [`template`]: copy the viewer skeleton and write generated files
//! 8. [`build`]: run the toolchain container and install the ROM

pub mod build;
pub mod input;
pub mod manifest;
pub mod rasterize;
pub mod scratch;
pub mod select;
pub mod template;
pub mod transform;
