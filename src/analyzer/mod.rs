//! The analyzer instance: trace loop, effect scheduling, resize delivery and
//! single-instance ownership.

pub mod controller;
pub mod orchestrator;
pub mod resize;
pub mod slot;

pub use controller::{AnalyzerContext, AnalyzerController, AnalyzerPhase, AnalyzerStats};
pub use resize::{ResizeBus, ResizeSubscription};
pub use slot::AnalyzerSlot;
