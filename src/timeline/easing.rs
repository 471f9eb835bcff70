//! Progress curves for tweens.

use serde::Serialize;

/// Shape of a tween's progress over its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// Constant rate.
    #[default]
    Linear,
    /// Quadratic deceleration.
    PowerOut,
    /// Cubic deceleration.
    EaseOut,
    /// Cubic acceleration then deceleration.
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` (clamped to `[0, 1]`) through the curve.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::PowerOut => 1.0 - (1.0 - t).powi(2),
            Self::EaseOut => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }

    /// Name used in schedule listings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::PowerOut => "power-out",
            Self::EaseOut => "ease-out",
            Self::EaseInOut => "ease-in-out",
        }
    }
}
