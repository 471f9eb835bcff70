//! Grid math and square-wave path construction.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use rand::{Rng, RngCore};
use serde::Serialize;

use crate::render::surface::format_number;

/// Width of one bit cell. Non-finite results (zero bit count) become `0.0`.
#[must_use]
pub fn calculate_grid_size(width: f64, byte_count: usize, bits_per_byte: usize) -> f64 {
    let bit_count = byte_count.saturating_mul(bits_per_byte);
    let size = width / bit_count as f64;
    if size.is_finite() { size } else { 0.0 }
}

/// Horizontal line offsets `grid_size, 2·grid_size, …` strictly below `height`.
#[must_use]
pub fn generate_grid_lines(height: f64, grid_size: f64) -> Vec<f64> {
    if !(grid_size.is_finite() && grid_size > 0.0 && height.is_finite()) {
        return Vec::new();
    }
    (1..)
        .map(|k: u32| f64::from(k) * grid_size)
        .take_while(|y| *y < height)
        .collect()
}

/// Vertical line offsets `0, grid_size, …, bit_count·grid_size`, both edges included.
#[must_use]
pub fn vertical_line_positions(bit_count: usize, grid_size: f64) -> Vec<f64> {
    (0..=bit_count).map(|i| i as f64 * grid_size).collect()
}

/// The high/low levels one trace is drawn between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    /// y of a `'1'` bit (the upper line).
    pub high: f64,
    /// y of a `'0'` bit (the lower line).
    pub low: f64,
}

/// Pick a random pair of adjacent grid lines; `None` with fewer than two lines.
pub fn pick_baseline(grid_lines: &[f64], rng: &mut dyn RngCore) -> Option<Baseline> {
    if grid_lines.len() < 2 {
        return None;
    }
    let index = rng.random_range(0..grid_lines.len() - 1);
    Some(Baseline {
        high: grid_lines[index],
        low: grid_lines[index + 1],
    })
}

/// A drawn waveform: the `d` attribute and its total stroke length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquareWave {
    pub d: String,
    pub length: f64,
}

/// Build a square wave across `bits`, one `grid_size` cell per bit.
///
/// Levels change with a vertical edge at the cell boundary, so the total
/// length is the grid width plus one `|high - low|` per transition.
#[must_use]
pub fn square_wave_path(bits: &str, grid_size: f64, baseline: Baseline) -> SquareWave {
    let level = |bit: u8| {
        if bit == b'1' {
            baseline.high
        } else {
            baseline.low
        }
    };

    let bytes = bits.as_bytes();
    let Some(&first) = bytes.first() else {
        return SquareWave {
            d: String::new(),
            length: 0.0,
        };
    };

    let mut y = level(first);
    let mut d = format!("M0,{}", format_number(y));
    let mut length = 0.0;

    for (i, &bit) in bytes.iter().enumerate() {
        let x = i as f64 * grid_size;
        let target = level(bit);
        if (target - y).abs() > f64::EPSILON {
            d.push_str(&format!(" L{},{}", format_number(x), format_number(target)));
            length += (target - y).abs();
            y = target;
        }
        let x_end = (i + 1) as f64 * grid_size;
        d.push_str(&format!(" L{},{}", format_number(x_end), format_number(y)));
        length += grid_size;
    }

    SquareWave { d, length }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn grid_size_divides_width_by_bit_count() {
        assert!((calculate_grid_size(1600.0, 2, 8) - 100.0).abs() < f64::EPSILON);
        assert!(calculate_grid_size(1600.0, 0, 8).abs() < f64::EPSILON);
        assert!(calculate_grid_size(f64::INFINITY, 2, 8).abs() < f64::EPSILON);
    }

    #[test]
    fn grid_lines_start_at_one_cell_and_stop_below_height() {
        let lines = generate_grid_lines(1000.0, 100.0);
        let expected: Vec<f64> = (1u32..=9).map(|k| f64::from(k) * 100.0).collect();
        assert_eq!(lines, expected);
        assert_eq!(generate_grid_lines(1001.0, 100.0).len(), 10);
    }

    #[test]
    fn grid_lines_empty_for_degenerate_sizes() {
        assert!(generate_grid_lines(1000.0, 0.0).is_empty());
        assert!(generate_grid_lines(1000.0, -5.0).is_empty());
        assert!(generate_grid_lines(1000.0, f64::NAN).is_empty());
        assert!(generate_grid_lines(50.0, 100.0).is_empty());
    }

    #[test]
    fn vertical_lines_include_both_edges() {
        let xs = vertical_line_positions(16, 100.0);
        assert_eq!(xs.len(), 17);
        assert!(xs[0].abs() < f64::EPSILON);
        assert!((xs[16] - 1600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn baseline_needs_two_lines() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(pick_baseline(&[], &mut rng).is_none());
        assert!(pick_baseline(&[100.0], &mut rng).is_none());
        let baseline = pick_baseline(&[100.0, 200.0], &mut rng).expect("one pair");
        assert_eq!(baseline, Baseline { high: 100.0, low: 200.0 });
    }

    #[test]
    fn square_wave_traces_levels_and_length() {
        let wave = square_wave_path("101", 10.0, Baseline { high: 0.0, low: 20.0 });
        assert_eq!(wave.d, "M0,0 L10,0 L10,20 L20,20 L20,0 L30,0");
        assert!((wave.length - 70.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bits_give_empty_path() {
        let wave = square_wave_path("", 10.0, Baseline { high: 0.0, low: 20.0 });
        assert!(wave.d.is_empty());
        assert!(wave.length.abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn wave_length_is_width_plus_edges(bits in "[01]{1,64}", grid in 1.0f64..200.0, gap in 1.0f64..100.0) {
            let wave = square_wave_path(&bits, grid, Baseline { high: 10.0, low: 10.0 + gap });
            let transitions = bits.as_bytes().windows(2).filter(|w| w[0] != w[1]).count();
            let expected = bits.len() as f64 * grid + transitions as f64 * gap;
            prop_assert!((wave.length - expected).abs() < 1e-6);
        }

        #[test]
        fn baseline_lines_are_adjacent(count in 2usize..40, seed in any::<u64>()) {
            let lines = generate_grid_lines(count as f64 * 10.0 + 5.0, 10.0);
            let mut rng = StdRng::seed_from_u64(seed);
            let baseline = pick_baseline(&lines, &mut rng).expect("at least two lines");
            prop_assert!((baseline.low - baseline.high - 10.0).abs() < 1e-9);
        }
    }
}
