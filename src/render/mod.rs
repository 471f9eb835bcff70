//! Host surfaces, grid geometry and the text panels.

pub mod display;
pub mod geometry;
pub mod grid;
pub mod surface;
