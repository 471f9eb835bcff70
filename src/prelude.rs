//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use signal_analyzer_viz::prelude::*;
//! ```

// Core
pub use crate::core::config::{AnalyzerConfig, PayloadMode};
pub use crate::core::errors::{Result, SavError};

// Signal
pub use crate::signal::bits::{binary_to_hex, string_to_binary};
pub use crate::signal::source::{DataSourceManager, Payload};

// Render
pub use crate::render::display::DisplayManager;
pub use crate::render::grid::{GridManager, GridUpdate};
pub use crate::render::surface::{
    AnchorIds, Anchors, Container, Indicator, MemoryDocument, Rect, TextSink, VectorCanvas,
};

// Timeline
pub use crate::timeline::{Easing, Timeline};

// Analyzer
pub use crate::analyzer::orchestrator::{TraceAnimationOrchestrator, TraceHandle};
pub use crate::analyzer::{
    AnalyzerContext, AnalyzerController, AnalyzerPhase, AnalyzerSlot, ResizeBus,
};

// Logging
pub use crate::logger::{ActivitySink, JsonlWriter, MemorySink};
