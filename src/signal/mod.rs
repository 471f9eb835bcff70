//! Bit encoding and the payload source.

pub mod bits;
pub mod source;
