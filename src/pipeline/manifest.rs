//! Resource manifest: the SGDK resource list and the slide pointer table.
//!
//! Two files are generated from the same ordered list of slides:
//!
//! * `res/slide_data.res`: one `IMAGE slide_<i> <file> BEST` line per
//!   slide; `rescomp` turns it into `slide_data.h` with one `Image` per line.
//! * `src/slides.h`: `const Image* slides[]` pointing at those images in
//!   the same order, plus `num_slides`.
//!
//! The viewer indexes `slides[]` directly, so both lists must agree
//! position for position. The builder enforces dense, gap-free indices
//! starting at 1.

use crate::error::Slide2RomError;
use std::fmt::Write as _;
use std::path::PathBuf;

/// File name of the generated pointer-table header, under `src/`.
pub const HEADER_FILE: &str = "slides.h";
/// File name of the generated resource list, under `res/`.
pub const RESOURCE_FILE: &str = "slide_data.res";

/// One transformed slide, ready to be declared as a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideAsset {
    /// Dense 1-indexed position among the selected slides.
    pub index: u32,
    /// Original 1-indexed PDF page number.
    pub page_number: u32,
    /// Image file name inside `res/`.
    pub file_name: String,
    pub image_path: PathBuf,
}

impl SlideAsset {
    /// C identifier of this slide's image resource.
    pub fn symbol(&self) -> String {
        format!("slide_{}", self.index)
    }
}

/// Accumulates the manifest one slide at a time.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    declarations: Vec<String>,
    pointer_table: Vec<String>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next pushed slide must carry.
    pub fn next_index(&self) -> u32 {
        self.declarations.len() as u32 + 1
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Append `asset` to both lists.
    ///
    /// Fails with [`Slide2RomError::ManifestOutOfOrder`] unless
    /// `asset.index` is exactly [`Self::next_index`].
    pub fn push(&mut self, asset: &SlideAsset) -> Result<(), Slide2RomError> {
        let expected = self.next_index();
        if asset.index != expected {
            return Err(Slide2RomError::ManifestOutOfOrder {
                expected,
                got: asset.index,
            });
        }
        let symbol = asset.symbol();
        self.declarations
            .push(format!("IMAGE {} {} BEST", symbol, asset.file_name));
        self.pointer_table.push(format!("&{symbol}"));
        Ok(())
    }

    pub fn finalize(self) -> ResourceManifest {
        ResourceManifest {
            declarations: self.declarations,
            pointer_table: self.pointer_table,
        }
    }
}

/// The finished, paired resource declarations and pointer table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManifest {
    declarations: Vec<String>,
    pointer_table: Vec<String>,
}

impl ResourceManifest {
    pub fn declarations(&self) -> &[String] {
        &self.declarations
    }

    pub fn pointer_table(&self) -> &[String] {
        &self.pointer_table
    }

    pub fn num_slides(&self) -> usize {
        self.declarations.len()
    }

    /// Contents of `res/slide_data.res`.
    pub fn render_resource_file(&self) -> String {
        let mut out = String::new();
        for line in &self.declarations {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Contents of `src/slides.h`.
    pub fn render_header(&self) -> String {
        let mut out = String::new();
        out.push_str("// Generated by slide2rom. Do not edit.\n");
        out.push_str("#ifndef _SLIDE2ROM_SLIDES_H_\n");
        out.push_str("#define _SLIDE2ROM_SLIDES_H_\n\n");
        out.push_str("#include \"slide_data.h\"\n\n");
        out.push_str("const Image* slides[] = {\n");
        for pointer in &self.pointer_table {
            let _ = writeln!(out, "  {pointer},");
        }
        out.push_str("};\n\n");
        let _ = writeln!(out, "const int num_slides = {};", self.num_slides());
        out.push_str("\n#endif // _SLIDE2ROM_SLIDES_H_\n");
        out
    }
}
