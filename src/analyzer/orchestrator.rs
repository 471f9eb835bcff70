//! Builds the time-ordered effect schedule of one trace and applies it.
//!
//! ```text
//! t = 0                     energize indicator (0.2s), start drawing the path
//! t = (i+1)·draw/bits       reveal bit i
//! t = (j+1)·draw/chars      append decoded character j (fixed-message mode)
//! t = draw                  hex readout (random mode), de-energize (0.3s)
//! t = F = draw+fade_delay   fade binary buffer
//! t = F+fade+clear          reset binary buffer
//! t = F+0.5                 fade decoded panel (only when the message looped)
//! t = F+0.5+fade+clear      clear decoded panel (only when the message looped)
//! ```

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::config::{PayloadMode, TimingConfig};
use crate::render::display::DisplayManager;
use crate::render::surface::{ElementId, Indicator, VectorCanvas, format_number};
use crate::signal::bits::binary_to_hex;
use crate::signal::source::Payload;
use crate::timeline::{Easing, Fired, Scheduled, Timeline};

pub const ENERGIZE_SECS: f64 = 0.2;
pub const DEENERGIZE_SECS: f64 = 0.3;
/// Lag of the decoded-panel fade behind the binary-buffer fade.
pub const ASCII_FADE_LAG_SECS: f64 = 0.5;

// ──────────────────── indicator energy ────────────────────

pub const LEVEL_DIM: f64 = 0.0;
pub const LEVEL_HOVER: f64 = 0.5;
pub const LEVEL_ENERGIZED: f64 = 1.0;

/// Render an energy level as scale and brightness.
pub fn apply_indicator_level(indicator: &mut dyn Indicator, level: f64) {
    let level = if level.is_finite() { level } else { LEVEL_DIM };
    indicator.set_style(
        "transform",
        &format!("scale({})", format_number(1.0 + 0.1 * level)),
    );
    indicator.set_style(
        "filter",
        &format!("brightness({})", format_number(0.6 + 0.8 * level)),
    );
}

// ──────────────────── schedule vocabulary ────────────────────

/// Zero-duration effects on the text panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum TraceCue {
    RevealBit { bit: char, index: usize },
    AppendChar { ch: char },
    SetAsciiText { text: String },
    FadeBinary,
    ResetBinary,
    FadeAscii,
    ClearAscii,
}

impl fmt::Display for TraceCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RevealBit { bit, index } => write!(f, "reveal_bit[{index}] = {bit}"),
            Self::AppendChar { ch } => write!(f, "append_char {ch:?}"),
            Self::SetAsciiText { text } => write!(f, "set_ascii_text {text:?}"),
            Self::FadeBinary => f.write_str("fade_binary"),
            Self::ResetBinary => f.write_str("reset_binary"),
            Self::FadeAscii => f.write_str("fade_ascii"),
            Self::ClearAscii => f.write_str("clear_ascii"),
        }
    }
}

/// Continuous properties driven by tweens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceTarget {
    PathDashOffset,
    IndicatorLevel,
}

impl fmt::Display for TraceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PathDashOffset => "path_dash_offset",
            Self::IndicatorLevel => "indicator_level",
        })
    }
}

pub type TraceTimeline = Timeline<TraceCue, TraceTarget>;

/// Timing of one trace, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceTiming {
    pub draw: f64,
    pub fade_delay: f64,
    pub fade_duration: f64,
    pub clear_delay: f64,
}

impl From<&TimingConfig> for TraceTiming {
    fn from(timing: &TimingConfig) -> Self {
        let secs = |ms: u64| ms as f64 / 1000.0;
        Self {
            draw: secs(timing.draw_duration_ms),
            fade_delay: secs(timing.fade_delay_ms),
            fade_duration: secs(timing.fade_duration_ms),
            clear_delay: secs(timing.clear_delay_ms),
        }
    }
}

/// The path element a trace animates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawnPath {
    pub id: ElementId,
    pub length: f64,
}

// ──────────────────── orchestrator ────────────────────

#[derive(Debug, Clone)]
pub struct TraceAnimationOrchestrator {
    timing: TraceTiming,
    mode: PayloadMode,
    byte_count: usize,
}

impl TraceAnimationOrchestrator {
    #[must_use]
    /// Characters are revealed one per byte cell, so `byte_count` sets the
    /// decoded-panel cadence even when a chunk is shorter.
    pub fn new(timing: TraceTiming, mode: PayloadMode, byte_count: usize) -> Self {
        Self {
            timing,
            mode,
            byte_count: byte_count.max(1),
        }
    }

    #[must_use]
    pub fn timing(&self) -> TraceTiming {
        self.timing
    }

    /// Lay out every effect of one trace on a fresh timeline.
    #[must_use]
    pub fn build_timeline(
        &self,
        path_length: f64,
        payload: &Payload,
        has_indicator: bool,
    ) -> TraceTimeline {
        let TraceTiming {
            draw,
            fade_delay,
            fade_duration,
            clear_delay,
        } = self.timing;
        let mut timeline = TraceTimeline::new();

        if has_indicator {
            timeline.tween(
                0.0,
                TraceTarget::IndicatorLevel,
                LEVEL_DIM,
                LEVEL_ENERGIZED,
                ENERGIZE_SECS,
                Easing::PowerOut,
            );
        }
        timeline.tween(
            0.0,
            TraceTarget::PathDashOffset,
            path_length,
            0.0,
            draw,
            Easing::Linear,
        );

        let bit_count = payload.binary_data.chars().count();
        for (index, bit) in payload.binary_data.chars().enumerate() {
            let at = (index + 1) as f64 * draw / bit_count as f64;
            timeline.call(at, TraceCue::RevealBit { bit, index });
        }

        match self.mode {
            PayloadMode::FixedMessage => {
                let cells = self.byte_count as f64;
                for (j, ch) in payload.current_chunk.chars().enumerate() {
                    let at = (j + 1) as f64 * draw / cells;
                    timeline.call(at, TraceCue::AppendChar { ch });
                }
            }
            PayloadMode::Random => {
                let text = binary_to_hex(&payload.binary_data);
                timeline.call(draw, TraceCue::SetAsciiText { text });
            }
        }

        if has_indicator {
            timeline.tween(
                draw,
                TraceTarget::IndicatorLevel,
                LEVEL_ENERGIZED,
                LEVEL_DIM,
                DEENERGIZE_SECS,
                Easing::EaseInOut,
            );
        }

        let fade_at = draw + fade_delay;
        timeline.call(fade_at, TraceCue::FadeBinary);
        timeline.call(fade_at + fade_duration + clear_delay, TraceCue::ResetBinary);

        if payload.looped_to_start {
            let ascii_fade_at = fade_at + ASCII_FADE_LAG_SECS;
            timeline.call(ascii_fade_at, TraceCue::FadeAscii);
            timeline.call(
                ascii_fade_at + fade_duration + clear_delay,
                TraceCue::ClearAscii,
            );
        }

        timeline
    }

    /// Build the schedule for `payload` and bind it to `path`.
    #[must_use]
    pub fn start(&self, path: DrawnPath, payload: &Payload, has_indicator: bool) -> TraceHandle {
        TraceHandle {
            timeline: self.build_timeline(path.length, payload, has_indicator),
            path,
        }
    }
}

// ──────────────────── applying effects ────────────────────

/// Everything a trace mutates.
pub struct TraceTargets<'a> {
    pub display: &'a mut DisplayManager,
    pub canvas: &'a mut dyn VectorCanvas,
    pub indicator: Option<&'a mut (dyn Indicator + 'static)>,
}

impl TraceTargets<'_> {
    fn apply(&mut self, path: ElementId, fired: Fired<TraceCue, TraceTarget>) {
        match fired {
            Fired::Tween {
                target: TraceTarget::PathDashOffset,
                value,
                ..
            } => {
                self.canvas
                    .set_attribute(path, "stroke-dashoffset", &format_number(value));
            }
            Fired::Tween {
                target: TraceTarget::IndicatorLevel,
                value,
                ..
            } => {
                if let Some(indicator) = self.indicator.as_deref_mut() {
                    apply_indicator_level(indicator, value);
                }
            }
            Fired::Cue(cue) => match cue {
                TraceCue::RevealBit { bit, index } => self.display.reveal_bit(bit, index),
                TraceCue::AppendChar { ch } => self.display.append_character(ch),
                TraceCue::SetAsciiText { text } => self.display.set_ascii_text(&text),
                TraceCue::FadeBinary => self.display.fade_binary_buffer(),
                TraceCue::ResetBinary => self.display.reset_binary_buffer(),
                TraceCue::FadeAscii => self.display.fade_ascii_display(),
                TraceCue::ClearAscii => self.display.clear_ascii_display(),
            },
        }
    }
}

/// Outcome of one [`TraceHandle::advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStep {
    pub applied: usize,
    pub completed: bool,
    pub leftover: Duration,
}

/// The live schedule of one trace.
#[derive(Debug, Clone)]
pub struct TraceHandle {
    timeline: TraceTimeline,
    path: DrawnPath,
}

impl TraceHandle {
    #[must_use]
    pub fn path(&self) -> DrawnPath {
        self.path
    }

    /// Total scheduled length in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.timeline.duration()
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.timeline.elapsed()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timeline.is_active()
    }

    #[must_use]
    pub fn timeline(&self) -> &TraceTimeline {
        &self.timeline
    }

    pub fn advance(&mut self, dt: Duration, targets: &mut TraceTargets<'_>) -> TraceStep {
        let step = self.timeline.advance(dt);
        let applied = step.fired.len();
        for fired in step.fired {
            targets.apply(self.path.id, fired);
        }
        TraceStep {
            applied,
            completed: step.completed,
            leftover: step.leftover,
        }
    }

    /// Apply every remaining effect at its final state.
    pub fn force_complete(&mut self, targets: &mut TraceTargets<'_>) -> usize {
        let fired = self.timeline.force_complete();
        let applied = fired.len();
        for f in fired {
            targets.apply(self.path.id, f);
        }
        applied
    }

    /// Discard unfired effects without applying any of them.
    pub fn kill(&mut self) -> usize {
        self.timeline.kill()
    }
}

/// One printable schedule line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub at_ms: f64,
    pub end_ms: f64,
    pub effect: String,
}

/// Flatten a timeline's pending entries for display.
#[must_use]
pub fn schedule_rows(timeline: &TraceTimeline) -> Vec<ScheduleRow> {
    timeline
        .pending()
        .map(|entry| match entry {
            Scheduled::Cue { at, cue } => ScheduleRow {
                at_ms: at * 1000.0,
                end_ms: at * 1000.0,
                effect: cue.to_string(),
            },
            Scheduled::Tween {
                at,
                target,
                from,
                to,
                duration,
                easing,
            } => ScheduleRow {
                at_ms: at * 1000.0,
                end_ms: (at + duration) * 1000.0,
                effect: format!(
                    "{target} {} -> {} ({})",
                    format_number(from),
                    format_number(to),
                    easing.as_str()
                ),
            },
        })
        .collect()
}
