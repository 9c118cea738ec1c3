//! Build tree materialisation.
//!
//! The slide viewer is a small SGDK project: navigation code in
//! `src/main.c`, the cartridge header in `src/boot/rom_head.c`. Those files
//! never change between runs; only `src/slides.h` and
//! `res/slide_data.res` are generated. The skeleton is copied first, with
//! overwrite, then the generated files are written on top.
//!
//! The default skeleton is the crate's `template/` directory, embedded at
//! compile time so the binary is self-contained. A directory on disk can
//! be used instead to customise the viewer.

use crate::error::Slide2RomError;
use crate::pipeline::manifest::{ResourceManifest, HEADER_FILE, RESOURCE_FILE};
use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

static EMBEDDED_SKELETON: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/template");

/// Source of the project skeleton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Skeleton {
    /// The viewer bundled with this crate. (default)
    #[default]
    Embedded,
    /// A skeleton directory on disk, laid out like `template/`.
    Directory(PathBuf),
}

/// Copy every skeleton file into `build_dir`, replacing files that already
/// exist at the same relative path. Returns the number of files copied.
pub fn materialize(skeleton: &Skeleton, build_dir: &Path) -> Result<usize, Slide2RomError> {
    let copied = match skeleton {
        Skeleton::Embedded => extract_embedded(&EMBEDDED_SKELETON, build_dir)?,
        Skeleton::Directory(dir) => copy_directory(dir, build_dir)?,
    };
    debug!("Copied {} skeleton files into {}", copied, build_dir.display());
    Ok(copied)
}

/// Write `src/slides.h` and `res/slide_data.res` for `manifest`.
pub fn write_generated(manifest: &ResourceManifest, build_dir: &Path) -> Result<(), Slide2RomError> {
    write_file(
        &build_dir.join("src").join(HEADER_FILE),
        manifest.render_header().as_bytes(),
    )?;
    write_file(
        &build_dir.join("res").join(RESOURCE_FILE),
        manifest.render_resource_file().as_bytes(),
    )
}

/// [`materialize`] followed by [`write_generated`].
pub fn populate(
    skeleton: &Skeleton,
    manifest: &ResourceManifest,
    build_dir: &Path,
) -> Result<usize, Slide2RomError> {
    let copied = materialize(skeleton, build_dir)?;
    write_generated(manifest, build_dir)?;
    Ok(copied)
}

fn extract_embedded(dir: &Dir<'_>, build_dir: &Path) -> Result<usize, Slide2RomError> {
    let mut copied = 0;
    for file in dir.files() {
        write_file(&build_dir.join(file.path()), file.contents())?;
        copied += 1;
    }
    for sub in dir.dirs() {
        copied += extract_embedded(sub, build_dir)?;
    }
    Ok(copied)
}

fn copy_directory(skeleton_dir: &Path, build_dir: &Path) -> Result<usize, Slide2RomError> {
    let mut copied = 0;
    for entry in WalkDir::new(skeleton_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Slide2RomError::Materialize {
            path: e.path().unwrap_or(skeleton_dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(skeleton_dir)
            .map_err(|e| Slide2RomError::Internal(format!("skeleton walk escaped root: {e}")))?;
        let target = build_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| materialize_error(parent, e))?;
        }
        fs::copy(entry.path(), &target).map_err(|e| materialize_error(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), Slide2RomError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| materialize_error(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| materialize_error(path, e))
}

fn materialize_error(path: &Path, source: std::io::Error) -> Slide2RomError {
    Slide2RomError::Materialize {
        path: path.to_path_buf(),
        source,
    }
}
