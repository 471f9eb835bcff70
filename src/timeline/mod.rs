//! Minimal internal animation scheduler driven by an explicit clock.

pub mod easing;
pub mod engine;

pub use easing::Easing;
pub use engine::{Advance, Fired, Scheduled, Timeline};
