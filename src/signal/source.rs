//! Payload source: cycles a fixed message or emits random bits, one payload per trace.

#![allow(missing_docs)]

use rand::RngCore;
use serde::Serialize;

use crate::core::config::{AnalyzerConfig, PayloadMode};
use crate::signal::bits::{fit_bits, random_bits, string_to_binary};

/// One trace's worth of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    /// Exactly `bit_count` characters of `'0'`/`'1'`.
    pub binary_data: String,
    /// Decoded characters for this trace; empty outside fixed-message mode.
    pub current_chunk: String,
    /// This slice reached the end of the message. The caller clears the
    /// decoded panel; the source has already rewound for the next call.
    pub looped_to_start: bool,
}

/// Produces successive payloads.
///
/// In fixed-message mode the read position always satisfies
/// `position < message length` (or is 0 for an empty message).
#[derive(Debug, Clone)]
pub struct DataSourceManager {
    mode: PayloadMode,
    message: Vec<char>,
    byte_count: usize,
    bit_count: usize,
    position: usize,
}

impl DataSourceManager {
    #[must_use]
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            mode: config.payload.mode,
            message: config.payload.message.chars().collect(),
            byte_count: config.grid.byte_count,
            bit_count: config.bit_count(),
            position: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PayloadMode {
        self.mode
    }

    /// Produce the next payload, advancing (or rewinding) the message position.
    pub fn next_payload(&mut self, rng: &mut dyn RngCore) -> Payload {
        match self.mode {
            PayloadMode::FixedMessage => self.next_message_slice(),
            PayloadMode::Random => Payload {
                binary_data: random_bits(rng, self.bit_count),
                current_chunk: String::new(),
                looped_to_start: false,
            },
        }
    }

    fn next_message_slice(&mut self) -> Payload {
        let start = self.position.min(self.message.len());
        let end = start.saturating_add(self.byte_count).min(self.message.len());
        let chunk: String = self.message[start..end].iter().collect();

        let binary_data = fit_bits(string_to_binary(&chunk), self.bit_count);
        let looped_to_start = start.saturating_add(self.byte_count) >= self.message.len();
        self.position = if looped_to_start { 0 } else { end };

        Payload {
            binary_data,
            current_chunk: chunk,
            looped_to_start,
        }
    }

    /// Rewind to the start of the message.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Current read position; always 0 in random mode.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}
