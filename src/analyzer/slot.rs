//! Single-live-instance ownership.
//!
//! A host that may initialize the analyzer repeatedly (page re-renders,
//! hot reloads) keeps one [`AnalyzerSlot`]. Installing a new controller tears
//! the previous one down first, so resize subscriptions and trace loops never
//! accumulate.

#![allow(missing_docs)]

use crate::analyzer::controller::{AnalyzerContext, AnalyzerController};
use crate::core::config::AnalyzerConfig;
use crate::render::surface::Anchors;

#[derive(Debug, Default)]
pub struct AnalyzerSlot {
    current: Option<AnalyzerController>,
    generation: u64,
}

impl AnalyzerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean up any previous instance, then build and hold a new one.
    pub fn init(
        &mut self,
        anchors: Anchors,
        config: &AnalyzerConfig,
        ctx: AnalyzerContext,
    ) -> &mut AnalyzerController {
        self.teardown();
        self.generation += 1;
        self.current
            .insert(AnalyzerController::init(anchors, config, ctx))
    }

    /// Clean up and release the held instance. Returns `false` when empty.
    pub fn teardown(&mut self) -> bool {
        match self.current.take() {
            Some(mut previous) => {
                previous.cleanup();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&AnalyzerController> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut AnalyzerController> {
        self.current.as_mut()
    }

    /// Number of instances installed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
