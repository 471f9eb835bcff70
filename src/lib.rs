#![forbid(unsafe_code)]

//! Signal Analyzer Viz (sav): a simulated logic-analyzer display.
//!
//! A square-wave trace is periodically drawn across a grid while its bits and
//! decoded characters are revealed in lock-step with the drawing:
//! 1. **Payload source**: cycles a fixed message or emits random bits
//! 2. **Grid**: pixel geometry kept correct under resize, with rebuild hysteresis
//! 3. **Trace loop**: exactly one trace animates at a time, on a virtual clock
//!
//! Host surfaces (container, canvases, text panels, indicator) are injected
//! as trait objects; [`render::surface`] ships in-memory implementations.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use signal_analyzer_viz::prelude::*;
//!
//! let doc = MemoryDocument::standard(Rect::new(1600.0, 400.0));
//! let bus = ResizeBus::new();
//! let mut slot = AnalyzerSlot::new();
//! let analyzer = slot.init(
//!     doc.resolve(&AnchorIds::default()),
//!     &AnalyzerConfig::default(),
//!     AnalyzerContext::new(bus.clone()).with_seed(7),
//! );
//! analyzer.advance(Duration::from_millis(16));
//! ```

pub mod prelude;

pub mod analyzer;
pub mod core;
pub mod logger;
pub mod render;
pub mod signal;
pub mod timeline;
