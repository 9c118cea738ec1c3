//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and transforms each
//! slide. The library itself never prints; the CLI renders these events as
//! a progress bar.
//!
//! # Example
//!
//! ```rust
//! use slide2rom::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_slide_complete(&self, slide: usize, total: usize, page_num: u32) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Processed {slide} / {total} (page {page_num})");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Coarse pipeline stages reported through [`ConversionProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterizing,
    Transforming,
    Materializing,
    Building,
}

impl Stage {
    /// Human-readable description, suitable for a status line.
    pub fn describe(&self) -> &'static str {
        match self {
            Stage::Rasterizing => "Splitting PDF into page images",
            Stage::Transforming => "Processing slides into console image resources",
            Stage::Materializing => "Bootstrapping slide viewer sources",
            Stage::Building => "Compiling ROM",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Called by the conversion pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, so calls never
/// overlap; the `Send + Sync` bound only lets the callback live inside a
/// shareable [`crate::ConversionConfig`].
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after rasterisation, when the number of selected
    /// slides is known.
    fn on_conversion_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called when the pipeline enters a new stage.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after each slide has been transformed.
    ///
    /// # Arguments
    /// * `slide`: 1-indexed dense slide index
    /// * `total`: number of selected slides
    /// * `page_num`: original 1-indexed PDF page number
    fn on_slide_complete(&self, slide: usize, total: usize, page_num: u32) {
        let _ = (slide, total, page_num);
    }

    /// Called once after the ROM has been written.
    fn on_conversion_complete(&self, total_slides: usize, rom_bytes: u64) {
        let _ = (total_slides, rom_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, total_slides: usize) {
            self.events.lock().unwrap().push(format!("start {total_slides}"));
        }

        fn on_stage(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("stage {stage:?}"));
        }

        fn on_slide_complete(&self, slide: usize, total: usize, page_num: u32) {
            self.events
                .lock()
                .unwrap()
                .push(format!("slide {slide}/{total} p{page_num}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_stage(Stage::Building);
        cb.on_slide_complete(1, 5, 3);
        cb.on_conversion_complete(5, 1 << 17);
    }

    #[test]
    fn partial_override_records_only_overridden_events() {
        let rec = Recorder::default();
        rec.on_stage(Stage::Transforming);
        rec.on_conversion_start(2);
        rec.on_slide_complete(1, 2, 3);
        rec.on_slide_complete(2, 2, 4);
        rec.on_conversion_complete(2, 4096);

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "stage Transforming",
                "start 2",
                "slide 1/2 p3",
                "slide 2/2 p4",
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage(Stage::Rasterizing);
        assert_eq!(Stage::Building.to_string(), "Compiling ROM");
    }
}
