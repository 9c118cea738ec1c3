//! Result types returned by a successful conversion.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a caller may want to know about a finished run.
///
/// Serialisable so the CLI can print it with `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Where the ROM was written.
    pub rom_path: PathBuf,
    /// One record per slide, in ROM order.
    pub slides: Vec<SlideRecord>,
    pub stats: ConversionStats,
}

/// Mapping from a slide in the ROM back to the PDF page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-indexed position in the ROM (`slide_<index>`).
    pub index: u32,
    /// 1-indexed page number in the source PDF.
    pub page_num: u32,
    /// Image resource file name inside the build tree's `res/`.
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source PDF.
    pub total_pages: u32,
    /// First selected page (1-indexed, inclusive).
    pub first_page: u32,
    /// Last selected page (1-indexed, inclusive).
    pub last_page: u32,
    /// Slides in the ROM.
    pub slide_count: usize,
    /// Size of the written ROM in bytes.
    pub rom_bytes: u64,
    pub total_duration_ms: u64,
    pub rasterize_duration_ms: u64,
    pub transform_duration_ms: u64,
    pub build_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_serialises_to_json() {
        let output = ConversionOutput {
            rom_path: PathBuf::from("talk.bin"),
            slides: vec![SlideRecord {
                index: 1,
                page_num: 3,
                file_name: "page-03.png".into(),
            }],
            stats: ConversionStats {
                total_pages: 10,
                first_page: 3,
                last_page: 3,
                slide_count: 1,
                rom_bytes: 131072,
                ..ConversionStats::default()
            },
        };
        let json = serde_json::to_value(&output).expect("serialise");
        assert_eq!(json["slides"][0]["page_num"], 3);
        assert_eq!(json["stats"]["slide_count"], 1);
        assert_eq!(json["rom_path"], "talk.bin");
    }
}
