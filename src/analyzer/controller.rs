//! One analyzer instance: geometry under resize, the self-rescheduling trace
//! loop, hover gating and teardown.
//!
//! Time is virtual. The host calls [`AnalyzerController::advance`] with the
//! elapsed wall time; the inter-trace delay and the active trace timeline
//! both run off that one clock.
//!
//! ```text
//!   init ──► Waiting(initial delay) ──► Animating ──► Waiting(random interval) ──► …
//!                 ▲  fewer than two grid lines  │
//!                 └─────────────────────────────┘
//!   cleanup from any state ──► Stopped
//! ```

#![allow(missing_docs)]

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

use crate::analyzer::orchestrator::{
    DrawnPath, LEVEL_DIM, LEVEL_HOVER, TraceAnimationOrchestrator, TraceHandle, TraceTargets,
    TraceTiming, apply_indicator_level,
};
use crate::analyzer::resize::{ResizeBus, ResizeSubscription};
use crate::core::config::AnalyzerConfig;
use crate::logger::{ActivitySink, DiscardSink, EventType, LogEntry, Severity};
use crate::render::display::DisplayManager;
use crate::render::geometry::{pick_baseline, square_wave_path};
use crate::render::grid::{GridGeometry, GridManager, GridUpdate};
use crate::render::surface::{
    Anchors, CanvasElement, Container, Indicator, Rect, VectorCanvas, format_number,
};
use crate::signal::source::DataSourceManager;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerPhase {
    /// Required anchors were missing; nothing ever happens.
    Inert,
    Waiting,
    Animating,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerStats {
    pub traces_started: u64,
    pub traces_completed: u64,
    pub traces_skipped: u64,
    pub grid_rebuilds: u64,
    pub resize_events: u64,
}

/// Host services an analyzer is wired to.
pub struct AnalyzerContext {
    pub resize: ResizeBus,
    pub rng: Box<dyn RngCore>,
    pub activity: Box<dyn ActivitySink>,
}

impl AnalyzerContext {
    /// OS-seeded randomness and no activity log.
    #[must_use]
    pub fn new(resize: ResizeBus) -> Self {
        Self {
            resize,
            rng: Box::new(StdRng::from_os_rng()),
            activity: Box::new(DiscardSink),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Box::new(StdRng::seed_from_u64(seed));
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    #[must_use]
    pub fn with_activity(mut self, activity: impl ActivitySink + 'static) -> Self {
        self.activity = Box::new(activity);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting { remaining: Duration },
    Animating,
    Stopped,
}

struct LiveAnalyzer {
    id: String,
    container: Box<dyn Container>,
    grid_canvas: Box<dyn VectorCanvas>,
    trace_canvas: Box<dyn VectorCanvas>,
    indicator: Option<Box<dyn Indicator>>,
    display: DisplayManager,
    grid: GridManager,
    source: DataSourceManager,
    orchestrator: TraceAnimationOrchestrator,
    subscription: Option<ResizeSubscription>,
    rng: Box<dyn RngCore>,
    activity: Box<dyn ActivitySink>,
    line_opacity: f64,
    line_width: f64,
    min_interval_ms: u64,
    max_interval_ms: u64,
    hover_attached: bool,
    hovered: bool,
    phase: Phase,
    current: Option<TraceHandle>,
    clock: Duration,
    stats: AnalyzerStats,
}

pub struct AnalyzerController {
    id: String,
    config: AnalyzerConfig,
    live: Option<LiveAnalyzer>,
}

impl std::fmt::Debug for AnalyzerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerController")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn clock_ms(clock: Duration) -> u64 {
    u64::try_from(clock.as_millis()).unwrap_or(u64::MAX)
}

impl AnalyzerController {
    /// Wire an analyzer to `anchors`.
    ///
    /// Out-of-range config values are repaired with a `[SAV-CONFIG]`
    /// diagnostic. Missing required anchors produce an inert controller.
    pub fn init(anchors: Anchors, config: &AnalyzerConfig, ctx: AnalyzerContext) -> Self {
        let AnalyzerContext {
            resize,
            rng,
            mut activity,
        } = ctx;

        let (config, notes) = config.sanitized();
        for note in &notes {
            eprintln!("[SAV-CONFIG] repaired {note}");
            let mut entry = LogEntry::new(EventType::ConfigWarning, Severity::Warning);
            entry.details = Some(note.clone());
            activity.record(&entry);
        }

        let missing = anchors.missing_required();
        let Anchors {
            container,
            grid_canvas,
            trace_canvas,
            binary_sink,
            ascii_sink,
            indicator,
        } = anchors;
        let id = container
            .as_ref()
            .map(|c| c.id().to_string())
            .unwrap_or_default();

        let (Some(container), Some(grid_canvas), Some(trace_canvas)) =
            (container, grid_canvas, trace_canvas)
        else {
            let mut entry = LogEntry::new(EventType::AnalyzerInert, Severity::Warning);
            entry.instance = Some(id.clone()).filter(|i| !i.is_empty());
            entry.details = Some(format!("missing anchors: {}", missing.join(", ")));
            activity.record(&entry);
            return Self {
                id,
                config,
                live: None,
            };
        };

        let mut live = LiveAnalyzer {
            id: id.clone(),
            container,
            grid_canvas,
            trace_canvas,
            indicator,
            display: DisplayManager::new(binary_sink, ascii_sink, config.timing.fade_duration_ms),
            grid: GridManager::new(&config.grid),
            source: DataSourceManager::new(&config),
            orchestrator: TraceAnimationOrchestrator::new(
                TraceTiming::from(&config.timing),
                config.payload.mode,
                config.grid.byte_count,
            ),
            subscription: None,
            rng,
            activity,
            line_opacity: config.grid.line_opacity,
            line_width: config.grid.line_width,
            min_interval_ms: config.timing.min_interval_ms,
            max_interval_ms: config.timing.max_interval_ms,
            hover_attached: false,
            hovered: false,
            phase: Phase::Waiting {
                remaining: Duration::from_millis(config.timing.initial_delay_ms),
            },
            current: None,
            clock: Duration::ZERO,
            stats: AnalyzerStats::default(),
        };

        let rect = live.container.content_rect();
        live.apply_geometry(rect);
        live.subscription = Some(resize.subscribe());
        if let Some(indicator) = live.indicator.as_deref_mut() {
            indicator.set_hover_listening(true);
            apply_indicator_level(indicator, LEVEL_DIM);
            live.hover_attached = true;
        }
        live.display.clear_binary_buffer();

        let mut entry = LogEntry::new(EventType::AnalyzerInit, Severity::Info);
        entry.width = Some(rect.width);
        entry.height = Some(rect.height);
        entry.grid_size = Some(live.grid.grid_size());
        entry.config_hash = config.stable_hash().ok();
        entry.details = Some(format!("mode={}", config.payload.mode));
        live.log(entry);

        Self {
            id,
            config,
            live: Some(live),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The effective (sanitized) configuration.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.live.is_none()
    }

    #[must_use]
    pub fn phase(&self) -> AnalyzerPhase {
        match self.live.as_ref().map(|l| l.phase) {
            None => AnalyzerPhase::Inert,
            Some(Phase::Waiting { .. }) => AnalyzerPhase::Waiting,
            Some(Phase::Animating) => AnalyzerPhase::Animating,
            Some(Phase::Stopped) => AnalyzerPhase::Stopped,
        }
    }

    /// Time left before the next trace starts, while waiting.
    #[must_use]
    pub fn next_trace_in(&self) -> Option<Duration> {
        match self.live.as_ref()?.phase {
            Phase::Waiting { remaining } => Some(remaining),
            Phase::Animating | Phase::Stopped => None,
        }
    }

    #[must_use]
    pub fn current_trace(&self) -> Option<&TraceHandle> {
        self.live.as_ref()?.current.as_ref()
    }

    #[must_use]
    pub fn has_active_trace(&self) -> bool {
        self.current_trace().is_some_and(TraceHandle::is_active)
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&GridGeometry> {
        self.live.as_ref().map(|l| l.grid.geometry())
    }

    /// Read position of the payload source.
    #[must_use]
    pub fn source_position(&self) -> Option<usize> {
        self.live.as_ref().map(|l| l.source.position())
    }

    #[must_use]
    pub fn accumulated_text(&self) -> Option<&str> {
        self.live.as_ref().map(|l| l.display.accumulated_text())
    }

    #[must_use]
    pub fn stats(&self) -> AnalyzerStats {
        self.live.as_ref().map(|l| l.stats).unwrap_or_default()
    }

    #[must_use]
    pub fn clock(&self) -> Duration {
        self.live.as_ref().map_or(Duration::ZERO, |l| l.clock)
    }

    #[must_use]
    pub fn is_hover_attached(&self) -> bool {
        self.live.as_ref().is_some_and(|l| l.hover_attached)
    }

    /// Move the virtual clock forward by `dt`.
    ///
    /// Queued resize notifications are applied first, in arrival order.
    pub fn advance(&mut self, dt: Duration) {
        if let Some(live) = self.live.as_mut() {
            live.advance(dt);
        }
    }

    /// Jump the active trace to its end and arm the next cycle. Returns
    /// `false` when no trace was running.
    pub fn finish_current_trace(&mut self) -> bool {
        self.live
            .as_mut()
            .is_some_and(LiveAnalyzer::finish_current_trace)
    }

    pub fn pointer_enter(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.set_hover(true);
        }
    }

    pub fn pointer_leave(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.set_hover(false);
        }
    }

    /// Tear everything down. Safe to call any number of times; returns
    /// `true` only for the call that actually cleaned up.
    pub fn cleanup(&mut self) -> bool {
        self.live.as_mut().is_some_and(LiveAnalyzer::cleanup)
    }
}

impl LiveAnalyzer {
    fn log(&mut self, mut entry: LogEntry) {
        entry.instance = Some(self.id.clone());
        entry.clock_ms = Some(clock_ms(self.clock));
        self.activity.record(&entry);
    }

    fn apply_geometry(&mut self, rect: Rect) -> GridUpdate {
        let outcome = self.grid.update_dimensions(
            rect,
            self.grid_canvas.as_mut(),
            self.trace_canvas.as_mut(),
        );
        if let GridUpdate::Rebuilt {
            horizontal,
            vertical,
        } = outcome
        {
            self.stats.grid_rebuilds += 1;
            let mut entry = LogEntry::new(EventType::GridRebuild, Severity::Info);
            entry.width = Some(self.grid.geometry().width);
            entry.height = Some(self.grid.geometry().height);
            entry.grid_size = Some(self.grid.grid_size());
            entry.details = Some(format!("lines h={horizontal} v={vertical}"));
            self.log(entry);
        }
        outcome
    }

    fn apply_pending_resizes(&mut self) {
        let rects = self
            .subscription
            .as_ref()
            .map(ResizeSubscription::drain)
            .unwrap_or_default();
        for rect in rects {
            self.stats.resize_events += 1;
            self.apply_geometry(rect);
        }
    }

    fn next_delay(&mut self) -> Duration {
        let (min, max) = (self.min_interval_ms, self.max_interval_ms);
        let ms = if min >= max {
            min
        } else {
            let rng: &mut dyn RngCore = self.rng.as_mut();
            rng.random_range(min..=max)
        };
        Duration::from_millis(ms)
    }

    fn advance(&mut self, dt: Duration) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.clock += dt;
        self.apply_pending_resizes();

        let mut budget = dt;
        loop {
            match self.phase {
                Phase::Stopped => break,
                Phase::Waiting { remaining } => {
                    if budget < remaining {
                        self.phase = Phase::Waiting {
                            remaining: remaining - budget,
                        };
                        break;
                    }
                    budget -= remaining;
                    if !self.start_trace() {
                        break;
                    }
                }
                Phase::Animating => {
                    let Some(trace) = self.current.as_mut() else {
                        self.schedule_next();
                        continue;
                    };
                    let mut targets = TraceTargets {
                        display: &mut self.display,
                        canvas: self.trace_canvas.as_mut(),
                        indicator: self.indicator.as_deref_mut(),
                    };
                    let step = trace.advance(budget, &mut targets);
                    if !step.completed {
                        break;
                    }
                    self.complete_trace();
                    budget = step.leftover;
                }
            }
        }
    }

    /// Begin one trace. Returns `false` when the cycle was skipped.
    fn start_trace(&mut self) -> bool {
        let Some(baseline) = pick_baseline(self.grid.grid_lines(), self.rng.as_mut()) else {
            self.stats.traces_skipped += 1;
            let delay = self.schedule_next();
            let mut entry = LogEntry::new(EventType::TraceSkip, Severity::Info);
            entry.duration_ms = Some(clock_ms(delay));
            entry.details = Some(format!(
                "{} grid lines, need at least 2",
                self.grid.grid_lines().len()
            ));
            self.log(entry);
            return false;
        };

        let payload = self.source.next_payload(self.rng.as_mut());
        let wave = square_wave_path(&payload.binary_data, self.grid.grid_size(), baseline);
        let length = format_number(wave.length);
        let element = CanvasElement::path(wave.d)
            .with("fill", "none")
            .with("stroke", "currentColor")
            .with("stroke-opacity", format_number(self.line_opacity))
            .with("stroke-width", format_number(self.line_width))
            .with("stroke-dasharray", length.clone())
            .with("stroke-dashoffset", length);
        let id = self.trace_canvas.append(element);
        self.display.clear_binary_buffer();

        let handle = self.orchestrator.start(
            DrawnPath {
                id,
                length: wave.length,
            },
            &payload,
            self.indicator.is_some(),
        );

        let mut entry = LogEntry::new(EventType::TraceStart, Severity::Info);
        entry.bits = Some(payload.binary_data.clone());
        entry.chunk = Some(payload.current_chunk.clone()).filter(|c| !c.is_empty());
        entry.looped = Some(payload.looped_to_start);
        entry.duration_ms = Duration::try_from_secs_f64(handle.duration())
            .ok()
            .map(clock_ms);
        self.log(entry);

        self.stats.traces_started += 1;
        self.current = Some(handle);
        self.phase = Phase::Animating;
        true
    }

    fn schedule_next(&mut self) -> Duration {
        let delay = self.next_delay();
        self.phase = Phase::Waiting { remaining: delay };
        delay
    }

    fn complete_trace(&mut self) {
        if let Some(trace) = self.current.take() {
            self.trace_canvas.remove(trace.path().id);
        }
        self.stats.traces_completed += 1;
        let delay = self.schedule_next();
        let mut entry = LogEntry::new(EventType::TraceComplete, Severity::Info);
        entry.duration_ms = Some(clock_ms(delay));
        self.log(entry);
    }

    fn finish_current_trace(&mut self) -> bool {
        if self.phase != Phase::Animating {
            return false;
        }
        let Some(trace) = self.current.as_mut() else {
            return false;
        };
        let mut targets = TraceTargets {
            display: &mut self.display,
            canvas: self.trace_canvas.as_mut(),
            indicator: self.indicator.as_deref_mut(),
        };
        trace.force_complete(&mut targets);
        self.complete_trace();
        true
    }

    fn set_hover(&mut self, hovered: bool) {
        if !self.hover_attached {
            return;
        }
        self.hovered = hovered;
        if self.current.as_ref().is_some_and(TraceHandle::is_active) {
            return;
        }
        if let Some(indicator) = self.indicator.as_deref_mut() {
            let level = if hovered { LEVEL_HOVER } else { LEVEL_DIM };
            apply_indicator_level(indicator, level);
        }
    }

    fn cleanup(&mut self) -> bool {
        if self.phase == Phase::Stopped {
            return false;
        }
        let discarded = self.current.take().map_or(0, |mut trace| trace.kill());
        self.subscription = None;
        self.trace_canvas.clear();
        if let Some(indicator) = self.indicator.as_deref_mut() {
            indicator.set_hover_listening(false);
            apply_indicator_level(indicator, LEVEL_DIM);
        }
        self.hover_attached = false;
        self.hovered = false;
        self.display.reset_all();
        self.phase = Phase::Stopped;

        let mut entry = LogEntry::new(EventType::AnalyzerCleanup, Severity::Info);
        entry.details = Some(format!("discarded {discarded} pending effects"));
        self.log(entry);
        self.activity.flush();
        true
    }
}
