//! PDF rasterisation via `pdftoppm`.
//!
//! The whole document is rendered in one invocation. `pdftoppm` names its
//! output `<prefix>-<N>.png` with `N` 1-based and zero-padded to the width
//! of the page count, so a lexicographic sort of the file names is also the
//! page order. That property is checked here rather than trusted: a gap, a
//! duplicate, or mixed padding widths would silently reorder or drop
//! slides.

use crate::error::Slide2RomError;
use crate::runner::{spawn_error, Invocation, ToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-name prefix handed to the rasterizer.
pub const PAGE_PREFIX: &str = "page";

static RE_PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page-(\d+)\.png$").unwrap());

/// One rendered PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    /// 1-indexed page number in the PDF.
    pub sequence_number: u32,
    pub image_path: PathBuf,
}

impl RasterPage {
    /// File name of the rendered image, e.g. `page-07.png`.
    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The external rasterizer and its settings.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: PathBuf,
    dpi: u32,
}

impl Rasterizer {
    pub fn new(program: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }

    /// `pdftoppm -png -r <dpi> <pdf> <pages_dir>/page`
    pub fn invocation(&self, pdf_path: &Path, pages_dir: &Path) -> Invocation {
        Invocation::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf_path)
            .arg(pages_dir.join(PAGE_PREFIX))
    }

    /// Render every page of `pdf_path` into `pages_dir` and return them in
    /// page order.
    pub fn rasterize(
        &self,
        runner: &dyn ToolRunner,
        pdf_path: &Path,
        pages_dir: &Path,
    ) -> Result<Vec<RasterPage>, Slide2RomError> {
        let invocation = self.invocation(pdf_path, pages_dir);
        debug!("Rasterising: {}", invocation);

        let output = runner
            .run(&invocation)
            .map_err(|e| spawn_error(&invocation, e))?;
        if !output.success {
            return Err(Slide2RomError::Rasterization {
                detail: output.describe_failure(&invocation),
            });
        }

        let pages = collect_pages(pages_dir)?;
        info!("PDF rasterised: {} pages", pages.len());
        Ok(pages)
    }
}

/// Gather `page-N.png` files from `pages_dir`, sorted by name, and verify
/// they number exactly `1..=N` with uniform padding.
pub fn collect_pages(pages_dir: &Path) -> Result<Vec<RasterPage>, Slide2RomError> {
    let entries = fs::read_dir(pages_dir).map_err(|e| Slide2RomError::Rasterization {
        detail: format!("cannot read {}: {}", pages_dir.display(), e),
    })?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Slide2RomError::Rasterization {
            detail: format!("cannot read {}: {}", pages_dir.display(), e),
        })?;
        if let Some(name) = entry.file_name().to_str() {
            if RE_PAGE_FILE.is_match(name) {
                names.push(name.to_string());
            }
        }
    }

    if names.is_empty() {
        return Err(Slide2RomError::Rasterization {
            detail: "the rasterizer produced no pages".into(),
        });
    }

    names.sort();

    let mut pages = Vec::with_capacity(names.len());
    let mut width = None;
    for (i, name) in names.iter().enumerate() {
        // Matched above; the capture is always present.
        let digits = RE_PAGE_FILE
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or_default();

        match width {
            None => width = Some(digits.len()),
            Some(w) if w != digits.len() => {
                return Err(Slide2RomError::Rasterization {
                    detail: format!(
                        "inconsistent page numbering: '{name}' is padded to {} digits, expected {w}",
                        digits.len()
                    ),
                });
            }
            Some(_) => {}
        }

        let expected = i as u32 + 1;
        let number: u32 = digits.parse().map_err(|_| Slide2RomError::Rasterization {
            detail: format!("page number in '{name}' is out of range"),
        })?;
        if number != expected {
            return Err(Slide2RomError::Rasterization {
                detail: format!(
                    "page sequence has a gap or duplicate: expected page {expected}, found '{name}'"
                ),
            });
        }

        pages.push(RasterPage {
            sequence_number: number,
            image_path: pages_dir.join(name),
        });
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolOutput;
    use std::io;
    use std::sync::Mutex;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"png").unwrap();
        }
    }

    #[test]
    fn invocation_renders_whole_document_once() {
        let r = Rasterizer::new("pdftoppm", 150);
        let inv = r.invocation(Path::new("deck.pdf"), Path::new("/tmp/s/pages"));
        assert_eq!(inv.program_name(), "pdftoppm");
        assert_eq!(
            inv.arg_strings(),
            vec!["-png", "-r", "150", "deck.pdf", "/tmp/s/pages/page"]
        );
    }

    #[test]
    fn collects_padded_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (1..=12).rev().map(|n| format!("page-{n:02}.png")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        touch(dir.path(), &refs);
        touch(dir.path(), &["notes.txt"]);

        let pages = collect_pages(dir.path()).unwrap();
        assert_eq!(pages.len(), 12);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.sequence_number, i as u32 + 1);
        }
        assert_eq!(pages[0].file_name(), "page-01.png");
        assert_eq!(pages[11].file_name(), "page-12.png");
    }

    #[test]
    fn empty_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_pages(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no pages"));
    }

    #[test]
    fn gap_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["page-1.png", "page-2.png", "page-4.png"]);
        let err = collect_pages(dir.path()).unwrap_err();
        assert!(err.to_string().contains("expected page 3"), "{err}");
    }

    #[test]
    fn sequence_not_starting_at_one_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["page-2.png", "page-3.png"]);
        assert!(collect_pages(dir.path()).is_err());
    }

    #[test]
    fn mixed_padding_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        // Unpadded names would sort 1, 10, 2, ...
        touch(dir.path(), &["page-01.png", "page-2.png"]);
        let err = collect_pages(dir.path()).unwrap_err();
        assert!(err.to_string().contains("inconsistent"), "{err}");
    }

    struct Scripted {
        result: Mutex<Option<io::Result<ToolOutput>>>,
    }

    impl ToolRunner for Scripted {
        fn run(&self, _inv: &Invocation) -> io::Result<ToolOutput> {
            self.result.lock().unwrap().take().expect("called once")
        }
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted {
            result: Mutex::new(Some(Ok(ToolOutput::failed(
                1,
                "Syntax Error: Couldn't read xref table",
            )))),
        };
        let err = Rasterizer::new("pdftoppm", 150)
            .rasterize(&runner, Path::new("broken.pdf"), dir.path())
            .unwrap_err();
        match err {
            Slide2RomError::Rasterization { detail } => {
                assert!(detail.contains("xref table"), "{detail}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Scripted {
            result: Mutex::new(Some(Err(io::Error::from(io::ErrorKind::NotFound)))),
        };
        let err = Rasterizer::new("pdftoppm", 150)
            .rasterize(&runner, Path::new("deck.pdf"), dir.path())
            .unwrap_err();
        assert!(matches!(err, Slide2RomError::ToolNotFound { .. }));
    }
}
