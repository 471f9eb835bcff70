//! Grid geometry tracking with hysteresis-gated line rebuilds.
//!
//! A continuous resize drag fires many notifications. Rebuilding every line
//! element is the expensive step, so it only happens once the width has moved
//! more than [`REBUILD_THRESHOLD_PX`] from the last rebuild. The numeric
//! geometry (grid size, line offsets) is refreshed on every notification so
//! traces are always placed correctly.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::config::GridConfig;
use crate::render::geometry::{calculate_grid_size, generate_grid_lines, vertical_line_positions};
use crate::render::surface::{CanvasElement, Rect, VectorCanvas, format_number};

/// Width change (exclusive) that triggers a full line rebuild.
pub const REBUILD_THRESHOLD_PX: f64 = 10.0;

/// What a dimension update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridUpdate {
    /// Line elements were cleared and redrawn.
    Rebuilt { horizontal: usize, vertical: usize },
    /// Only the numeric line offsets were refreshed.
    Recomputed,
    /// Width was zero or invalid; the line list is empty.
    Emptied,
}

/// Snapshot of the current geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGeometry {
    pub width: f64,
    pub height: f64,
    pub grid_size: f64,
    pub grid_lines: Vec<f64>,
    pub last_rebuilt_width: f64,
}

#[derive(Debug, Clone)]
pub struct GridManager {
    byte_count: usize,
    bits_per_byte: usize,
    opacity: f64,
    geometry: GridGeometry,
}

impl GridManager {
    #[must_use]
    pub fn new(config: &GridConfig) -> Self {
        Self {
            byte_count: config.byte_count,
            bits_per_byte: config.bits_per_byte,
            opacity: config.opacity,
            geometry: GridGeometry {
                width: 0.0,
                height: 0.0,
                grid_size: 0.0,
                grid_lines: Vec::new(),
                last_rebuilt_width: 0.0,
            },
        }
    }

    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.byte_count.saturating_mul(self.bits_per_byte)
    }

    #[must_use]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[must_use]
    pub fn grid_size(&self) -> f64 {
        self.geometry.grid_size
    }

    #[must_use]
    pub fn grid_lines(&self) -> &[f64] {
        &self.geometry.grid_lines
    }

    /// Strictly more than [`REBUILD_THRESHOLD_PX`] away from the last rebuild.
    #[must_use]
    pub fn should_rebuild(&self, new_width: f64) -> bool {
        (new_width - self.geometry.last_rebuilt_width).abs() > REBUILD_THRESHOLD_PX
    }

    /// Apply a new container size.
    ///
    /// The viewport is written to both canvases every time; line elements on
    /// `grid_canvas` are only touched when [`should_rebuild`](Self::should_rebuild).
    pub fn update_dimensions(
        &mut self,
        rect: Rect,
        grid_canvas: &mut dyn VectorCanvas,
        trace_canvas: &mut dyn VectorCanvas,
    ) -> GridUpdate {
        let width = if rect.width.is_finite() { rect.width } else { 0.0 };
        let height = if rect.height.is_finite() { rect.height } else { 0.0 };
        self.geometry.width = width;
        self.geometry.height = height;
        self.geometry.grid_size = calculate_grid_size(width, self.byte_count, self.bits_per_byte);

        let view_box = Rect::new(width, height).view_box();
        grid_canvas.set_viewport(&view_box);
        trace_canvas.set_viewport(&view_box);

        if self.should_rebuild(width) {
            grid_canvas.clear();
            self.geometry.grid_lines = generate_grid_lines(height, self.geometry.grid_size);
            let horizontal = self.draw_horizontal(grid_canvas);
            let vertical = self.draw_vertical(grid_canvas);
            self.geometry.last_rebuilt_width = width;
            GridUpdate::Rebuilt {
                horizontal,
                vertical,
            }
        } else if self.geometry.grid_size.is_finite() && self.geometry.grid_size > 0.0 {
            self.geometry.grid_lines = generate_grid_lines(height, self.geometry.grid_size);
            GridUpdate::Recomputed
        } else {
            self.geometry.grid_lines.clear();
            GridUpdate::Emptied
        }
    }

    fn styled(&self, element: CanvasElement) -> CanvasElement {
        element
            .with("stroke", "currentColor")
            .with("stroke-opacity", format_number(self.opacity))
            .with("stroke-width", "1")
    }

    fn draw_horizontal(&self, canvas: &mut dyn VectorCanvas) -> usize {
        for &y in &self.geometry.grid_lines {
            canvas.append(self.styled(CanvasElement::line(0.0, y, self.geometry.width, y)));
        }
        self.geometry.grid_lines.len()
    }

    fn draw_vertical(&self, canvas: &mut dyn VectorCanvas) -> usize {
        if !(self.geometry.grid_size.is_finite() && self.geometry.grid_size > 0.0) {
            return 0;
        }
        let xs = vertical_line_positions(self.bit_count(), self.geometry.grid_size);
        for &x in &xs {
            canvas.append(self.styled(CanvasElement::line(x, 0.0, x, self.geometry.height)));
        }
        xs.len()
    }
}
