//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SavError};

/// Full analyzer configuration model.
///
/// Built once when a controller is constructed and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub grid: GridConfig,
    pub payload: PayloadConfig,
    pub timing: TimingConfig,
}

/// Grid geometry and stroke styling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Stroke opacity of the background grid lines.
    pub opacity: f64,
    /// Bytes per payload (one decoded character each).
    pub byte_count: usize,
    /// Bits per byte cell on the grid.
    pub bits_per_byte: usize,
    /// Stroke opacity of the trace path.
    pub line_opacity: f64,
    /// Stroke width of the trace path.
    pub line_width: f64,
}

/// Where payload bits come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadMode {
    /// Cycle through a fixed message, `byte_count` characters per trace.
    #[default]
    FixedMessage,
    /// Independent random bits every trace.
    Random,
}

impl PayloadMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedMessage => "fixed-message",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixed-message" | "fixed_message" | "fixed" => Ok(Self::FixedMessage),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown payload mode {other:?}")),
        }
    }
}

/// Payload source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PayloadConfig {
    pub mode: PayloadMode,
    pub message: String,
}

/// Trace scheduling and animation timings, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before the very first trace.
    pub initial_delay_ms: u64,
    /// Lower bound of the random pause between traces.
    pub min_interval_ms: u64,
    /// Upper bound of the random pause between traces.
    pub max_interval_ms: u64,
    /// Time the trace takes to draw across the grid.
    pub draw_duration_ms: u64,
    /// Hold time after drawing before the binary buffer fades.
    pub fade_delay_ms: u64,
    /// Length of the opacity fade on both text panels.
    pub fade_duration_ms: u64,
    /// Pause after a fade before the panel is reset.
    pub clear_delay_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            opacity: 0.15,
            byte_count: 2,
            bits_per_byte: 8,
            line_opacity: 0.9,
            line_width: 2.0,
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            mode: PayloadMode::FixedMessage,
            message: "HELLO, WORLD! ".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            min_interval_ms: 3_000,
            max_interval_ms: 7_000,
            draw_duration_ms: 2_000,
            fade_delay_ms: 800,
            fade_duration_ms: 200,
            clear_delay_ms: 300,
        }
    }
}

impl AnalyzerConfig {
    /// Total bits drawn per trace.
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.grid.byte_count.saturating_mul(self.grid.bits_per_byte)
    }

    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[SAV-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        home_dir.join(".config").join("sav").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SavError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(SavError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // grid
        override_parsed(&mut lookup, "SAV_GRID_OPACITY", &mut self.grid.opacity)?;
        override_parsed(&mut lookup, "SAV_GRID_BYTE_COUNT", &mut self.grid.byte_count)?;
        override_parsed(
            &mut lookup,
            "SAV_GRID_BITS_PER_BYTE",
            &mut self.grid.bits_per_byte,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_GRID_LINE_OPACITY",
            &mut self.grid.line_opacity,
        )?;
        override_parsed(&mut lookup, "SAV_GRID_LINE_WIDTH", &mut self.grid.line_width)?;

        // payload
        override_parsed(&mut lookup, "SAV_PAYLOAD_MODE", &mut self.payload.mode)?;
        if let Some(raw) = lookup("SAV_PAYLOAD_MESSAGE") {
            self.payload.message = raw;
        }

        // timing
        let timing = &mut self.timing;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_INITIAL_DELAY_MS",
            &mut timing.initial_delay_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_MIN_INTERVAL_MS",
            &mut timing.min_interval_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_MAX_INTERVAL_MS",
            &mut timing.max_interval_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_DRAW_DURATION_MS",
            &mut timing.draw_duration_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_FADE_DELAY_MS",
            &mut timing.fade_delay_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_FADE_DURATION_MS",
            &mut timing.fade_duration_ms,
        )?;
        override_parsed(
            &mut lookup,
            "SAV_TIMING_CLEAR_DELAY_MS",
            &mut timing.clear_delay_ms,
        )?;

        Ok(())
    }

    /// Reject configurations the visualization cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.grid.byte_count == 0 || self.grid.bits_per_byte == 0 {
            return Err(SavError::InvalidConfig {
                details: "grid.byte_count and grid.bits_per_byte must be >= 1".to_string(),
            });
        }

        for (name, val) in [
            ("opacity", self.grid.opacity),
            ("line_opacity", self.grid.line_opacity),
        ] {
            if !(0.0..=1.0).contains(&val) {
                return Err(SavError::InvalidConfig {
                    details: format!("grid.{name} must be in [0,1], got {val}"),
                });
            }
        }

        if !(self.grid.line_width.is_finite() && self.grid.line_width > 0.0) {
            return Err(SavError::InvalidConfig {
                details: format!(
                    "grid.line_width must be > 0, got {}",
                    self.grid.line_width
                ),
            });
        }

        if self.timing.draw_duration_ms == 0 {
            return Err(SavError::InvalidConfig {
                details: "timing.draw_duration_ms must be > 0".to_string(),
            });
        }

        if self.timing.min_interval_ms > self.timing.max_interval_ms {
            return Err(SavError::InvalidConfig {
                details: format!(
                    "timing.min_interval_ms ({}) must be <= timing.max_interval_ms ({})",
                    self.timing.min_interval_ms, self.timing.max_interval_ms
                ),
            });
        }

        Ok(())
    }

    /// Repair every condition [`validate`](Self::validate) rejects.
    ///
    /// Returns the repaired config and one note per adjusted field. The
    /// controller uses this instead of failing construction.
    #[must_use]
    pub fn sanitized(&self) -> (Self, Vec<String>) {
        let defaults = Self::default();
        let mut cfg = self.clone();
        let mut notes = Vec::new();

        if cfg.grid.byte_count == 0 {
            cfg.grid.byte_count = defaults.grid.byte_count;
            notes.push(format!("grid.byte_count 0 -> {}", cfg.grid.byte_count));
        }
        if cfg.grid.bits_per_byte == 0 {
            cfg.grid.bits_per_byte = defaults.grid.bits_per_byte;
            notes.push(format!("grid.bits_per_byte 0 -> {}", cfg.grid.bits_per_byte));
        }
        for (name, slot) in [
            ("opacity", &mut cfg.grid.opacity),
            ("line_opacity", &mut cfg.grid.line_opacity),
        ] {
            let repaired = clamp_unit(*slot);
            if repaired.to_bits() != slot.to_bits() {
                notes.push(format!("grid.{name} {slot} -> {repaired}"));
                *slot = repaired;
            }
        }
        if !(cfg.grid.line_width.is_finite() && cfg.grid.line_width > 0.0) {
            notes.push(format!(
                "grid.line_width {} -> {}",
                cfg.grid.line_width, defaults.grid.line_width
            ));
            cfg.grid.line_width = defaults.grid.line_width;
        }
        if cfg.timing.draw_duration_ms == 0 {
            cfg.timing.draw_duration_ms = defaults.timing.draw_duration_ms;
            notes.push(format!(
                "timing.draw_duration_ms 0 -> {}",
                cfg.timing.draw_duration_ms
            ));
        }
        if cfg.timing.min_interval_ms > cfg.timing.max_interval_ms {
            std::mem::swap(
                &mut cfg.timing.min_interval_ms,
                &mut cfg.timing.max_interval_ms,
            );
            notes.push(format!(
                "timing interval bounds swapped to [{}, {}]",
                cfg.timing.min_interval_ms, cfg.timing.max_interval_ms
            ));
        }

        (cfg, notes)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn override_parsed<F, T>(lookup: &mut F, name: &str, slot: &mut T) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse::<T>()
            .map_err(|error| SavError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}
