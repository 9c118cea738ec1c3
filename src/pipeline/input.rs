//! Input validation: make sure the slides argument names a readable PDF.
//!
//! `pdftoppm` reports a missing or non-PDF input with a terse message and a
//! generic exit code. Checking up front turns those into specific errors
//! and avoids allocating a scratch tree for a run that can't succeed.

use crate::error::Slide2RomError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check that `path` exists, is readable, and starts with `%PDF`.
///
/// Files shorter than four bytes are let through; the rasterizer will
/// reject them with its own message.
pub fn validate_pdf(path: &Path) -> Result<PathBuf, Slide2RomError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Slide2RomError::FileNotFound { path });
    }

    let mut file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(Slide2RomError::PermissionDenied { path });
        }
        Err(_) => return Err(Slide2RomError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
        return Err(Slide2RomError::NotAPdf { path, magic });
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_pdf_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%...").unwrap();
        let path = validate_pdf(f.path()).expect("valid pdf header");
        assert_eq!(path, f.path());
    }

    #[test]
    fn rejects_missing_file() {
        let err = validate_pdf(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(matches!(err, Slide2RomError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_pdf(dir.path()).unwrap_err();
        assert!(matches!(err, Slide2RomError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_non_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\x89PNG\r\n\x1a\n").unwrap();
        match validate_pdf(f.path()).unwrap_err() {
            Slide2RomError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
