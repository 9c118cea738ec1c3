//! Per-run scratch tree.
//!
//! ```text
//! slide2rom-XXXXXX/
//!  ├── pages/        rasterizer output, one PNG per PDF page
//!  └── app/          build tree handed to the toolchain container
//!       ├── src/
//!       └── res/
//! ```
//!
//! The whole tree is owned by one [`ScratchDir`] and deleted when it is
//! dropped, so every exit path (success, tool failure, panic unwind)
//! cleans up.

use crate::error::Slide2RomError;
use crate::runner::{Invocation, ToolRunner};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const PREFIX: &str = "slide2rom-";

/// The scratch tree of one conversion run.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    pages_dir: PathBuf,
    build_dir: PathBuf,
}

impl ScratchDir {
    /// Create the scratch tree under `root`, or the system temp directory.
    pub fn acquire(root: Option<&Path>) -> Result<Self, Slide2RomError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| scratch_error("create scratch directory", e))?;

        let pages_dir = dir.path().join("pages");
        let build_dir = dir.path().join("app");
        for sub in [
            pages_dir.clone(),
            build_dir.join("src"),
            build_dir.join("res"),
        ] {
            fs::create_dir_all(&sub)
                .map_err(|e| scratch_error(&format!("create {}", sub.display()), e))?;
        }

        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self {
            dir,
            pages_dir,
            build_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Make the scratch tree writable from inside the toolchain container.
    ///
    /// On Windows, temp directories get an ACL that Docker Desktop's file
    /// sharing can't write through; copying the parent's ACL fixes that.
    /// Elsewhere the container runs as the invoking user and nothing needs
    /// to change.
    pub fn grant_container_access(&self, runner: &dyn ToolRunner) -> Result<(), Slide2RomError> {
        if !cfg!(windows) {
            return Ok(());
        }
        let Some(parent) = self.path().parent() else {
            return Ok(());
        };
        let invocation = acl_copy_invocation(parent, self.path());
        let output = runner
            .run(&invocation)
            .map_err(|e| crate::runner::spawn_error(&invocation, e))?;
        if !output.success {
            return Err(Slide2RomError::ScratchDir {
                detail: output.describe_failure(&invocation),
            });
        }
        Ok(())
    }

    /// Delete the tree now, reporting failures instead of ignoring them as
    /// `Drop` does.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// `powershell -Command "Get-Acl '<from>' | Set-Acl '<to>'"`.
pub(crate) fn acl_copy_invocation(from: &Path, to: &Path) -> Invocation {
    Invocation::new("powershell").arg("-Command").arg(format!(
        "Get-Acl {} | Set-Acl {}",
        ps_quote(from),
        ps_quote(to)
    ))
}

/// Single-quote a path for PowerShell; embedded quotes are doubled.
fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

fn scratch_error(action: &str, e: io::Error) -> Slide2RomError {
    Slide2RomError::ScratchDir {
        detail: format!("{action}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SystemRunner;

    #[test]
    fn acquire_creates_layout() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::acquire(Some(root.path())).unwrap();
        assert!(scratch.pages_dir().is_dir());
        assert!(scratch.build_dir().join("src").is_dir());
        assert!(scratch.build_dir().join("res").is_dir());
        assert!(scratch
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PREFIX));
    }

    #[test]
    fn drop_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::acquire(Some(root.path())).unwrap();
            fs::write(scratch.pages_dir().join("page-1.png"), b"x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn close_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::acquire(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn missing_root_is_a_scratch_error() {
        let err = ScratchDir::acquire(Some(Path::new("/definitely/not/here"))).unwrap_err();
        assert!(matches!(err, Slide2RomError::ScratchDir { .. }));
    }

    #[cfg(not(windows))]
    #[test]
    fn container_access_is_a_no_op_off_windows() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::acquire(Some(root.path())).unwrap();
        scratch.grant_container_access(&SystemRunner).unwrap();
    }

    #[test]
    fn acl_invocation_quotes_paths() {
        let inv = acl_copy_invocation(Path::new(r"C:\Temp"), Path::new(r"C:\Temp\it's"));
        assert_eq!(inv.program_name(), "powershell");
        assert_eq!(
            inv.arg_strings(),
            vec![
                "-Command".to_string(),
                r"Get-Acl 'C:\Temp' | Set-Acl 'C:\Temp\it''s'".to_string(),
            ]
        );
    }
}
