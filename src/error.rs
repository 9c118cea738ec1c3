//! Error types for the slide2rom library.
//!
//! Every stage of the pipeline either hands the next stage a fully valid
//! value or aborts the whole run with a [`Slide2RomError`]. There is no
//! per-page "soft" failure: a ROM with a missing slide would silently shift
//! every following slide, so a single bad page is fatal.
//!
//! Two variants ([`Slide2RomError::InvalidRange`] and
//! [`Slide2RomError::InvalidPath`]) are raised while parsing the command
//! line, before any scratch resources exist. The CLI reports those with a
//! usage message; everything else is a stage failure.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the slide2rom library.
#[derive(Debug, Error)]
pub enum Slide2RomError {
    // ── Selector errors ───────────────────────────────────────────────────
    /// Page range in `<path>@<start>-<end>` is not a valid inclusive range.
    #[error("Invalid page range in '{token}': {reason}")]
    InvalidRange { token: String, reason: String },

    /// The path part of the slides argument is empty.
    #[error("Invalid slides path in '{token}': the path is empty")]
    InvalidPath { token: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Tooling errors ────────────────────────────────────────────────────
    /// An external program could not be found or spawned.
    #[error("Required tool '{tool}' is not available.\n{hint}")]
    ToolNotFound { tool: String, hint: String },

    /// The per-run scratch directory could not be created or prepared.
    #[error("Failed to prepare scratch directory: {detail}")]
    ScratchDir { detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The rasterizer failed or produced an unusable page sequence.
    #[error("Rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// The requested range does not overlap the document.
    #[error("No slides selected: pages {range} are outside the document ({total} pages)")]
    NoSlidesSelected { range: String, total: u32 },

    /// The image tool failed, or produced an image the console can't use.
    #[error("Image transform failed for page {page}: {detail}")]
    Transform { page: u32, detail: String },

    /// A slide was handed to the manifest builder out of dense order.
    #[error("Manifest out of order: expected slide {expected}, got slide {got}")]
    ManifestOutOfOrder { expected: u32, got: u32 },

    /// Copying the skeleton or writing a generated file failed.
    #[error("Failed to materialise build tree at '{path}': {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Build errors ──────────────────────────────────────────────────────
    /// The containerised toolchain (or its image pull) exited non-zero.
    #[error("ROM build failed: {detail}")]
    Build { detail: String },

    /// The toolchain reported success but did not produce the ROM.
    #[error("Toolchain finished but no ROM was produced at '{path}'")]
    ArtifactMissing { path: PathBuf },

    /// Could not write the final ROM to the requested output path.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Slide2RomError {
    /// True for malformed command-line input, raised before any run state
    /// is allocated.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Slide2RomError::InvalidRange { .. } | Slide2RomError::InvalidPath { .. }
        )
    }

    /// Short name of the pipeline stage that raised this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Slide2RomError::InvalidRange { .. } | Slide2RomError::InvalidPath { .. } => "select",
            Slide2RomError::FileNotFound { .. }
            | Slide2RomError::PermissionDenied { .. }
            | Slide2RomError::NotAPdf { .. } => "input",
            Slide2RomError::ToolNotFound { .. } => "tools",
            Slide2RomError::ScratchDir { .. } => "scratch",
            Slide2RomError::Rasterization { .. } | Slide2RomError::NoSlidesSelected { .. } => {
                "rasterize"
            }
            Slide2RomError::Transform { .. } => "transform",
            Slide2RomError::ManifestOutOfOrder { .. } => "manifest",
            Slide2RomError::Materialize { .. } => "materialize",
            Slide2RomError::Build { .. }
            | Slide2RomError::ArtifactMissing { .. }
            | Slide2RomError::OutputWriteFailed { .. } => "build",
            Slide2RomError::InvalidConfig(_) => "config",
            Slide2RomError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_flagged() {
        let e = Slide2RomError::InvalidRange {
            token: "deck.pdf@5-3".into(),
            reason: "start page 5 is after end page 3".into(),
        };
        assert!(e.is_usage_error());
        assert_eq!(e.stage(), "select");

        let e = Slide2RomError::Build {
            detail: "exit status 2".into(),
        };
        assert!(!e.is_usage_error());
        assert_eq!(e.stage(), "build");
    }

    #[test]
    fn transform_display_names_page() {
        let e = Slide2RomError::Transform {
            page: 7,
            detail: "convert: unable to open image".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 7"), "got: {msg}");
        assert!(msg.contains("unable to open image"), "got: {msg}");
    }

    #[test]
    fn no_slides_display() {
        let e = Slide2RomError::NoSlidesSelected {
            range: "12-14".into(),
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("12-14"));
        assert!(msg.contains("10 pages"));
    }

    #[test]
    fn artifact_missing_display() {
        let e = Slide2RomError::ArtifactMissing {
            path: PathBuf::from("/tmp/app/out/rom.bin"),
        };
        assert!(e.to_string().contains("out/rom.bin"));
    }
}
