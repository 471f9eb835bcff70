//! Binary buffer and decoded-text panel rendering.
//!
//! Both sinks are optional; every operation quietly does nothing when its
//! sink is absent.

#![allow(missing_docs)]

use crate::render::surface::TextSink;
use crate::signal::bits::BITS_PER_CHAR;

/// Shown in an empty binary buffer so the line keeps its height.
pub const PLACEHOLDER: &str = " ";

pub struct DisplayManager {
    binary: Option<Box<dyn TextSink>>,
    ascii: Option<Box<dyn TextSink>>,
    accumulated_text: String,
    fade_ms: u64,
}

impl std::fmt::Debug for DisplayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayManager")
            .field("binary", &self.binary.is_some())
            .field("ascii", &self.ascii.is_some())
            .field("accumulated_text", &self.accumulated_text)
            .field("fade_ms", &self.fade_ms)
            .finish()
    }
}

impl DisplayManager {
    #[must_use]
    pub fn new(
        binary: Option<Box<dyn TextSink>>,
        ascii: Option<Box<dyn TextSink>>,
        fade_ms: u64,
    ) -> Self {
        Self {
            binary,
            ascii,
            accumulated_text: String::new(),
            fade_ms,
        }
    }

    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    #[must_use]
    pub fn binary_text(&self) -> Option<String> {
        self.binary.as_ref().map(|sink| sink.text())
    }

    #[must_use]
    pub fn ascii_text(&self) -> Option<String> {
        self.ascii.as_ref().map(|sink| sink.text())
    }

    fn fade_transition(&self) -> String {
        format!("opacity {}ms ease-out", self.fade_ms)
    }

    // ──────────────────── binary buffer ────────────────────

    /// Placeholder, full opacity, no transition.
    pub fn clear_binary_buffer(&mut self) {
        if let Some(sink) = self.binary.as_mut() {
            sink.set_text(PLACEHOLDER);
            sink.set_style("opacity", "1");
            sink.set_style("transition", "");
        }
    }

    /// Append one revealed bit. Index 0 replaces the placeholder; every
    /// eighth bit after that is preceded by a space.
    pub fn reveal_bit(&mut self, bit: char, index: usize) {
        let Some(sink) = self.binary.as_mut() else {
            return;
        };
        let mut text = if index == 0 { String::new() } else { sink.text() };
        if index > 0 && index % BITS_PER_CHAR == 0 {
            text.push(' ');
        }
        text.push(bit);
        sink.set_text(&text);
    }

    pub fn fade_binary_buffer(&mut self) {
        let transition = self.fade_transition();
        if let Some(sink) = self.binary.as_mut() {
            sink.set_style("transition", &transition);
            sink.set_style("opacity", "0");
        }
    }

    /// Placeholder and full opacity; the transition is left as is.
    pub fn reset_binary_buffer(&mut self) {
        if let Some(sink) = self.binary.as_mut() {
            sink.set_text(PLACEHOLDER);
            sink.set_style("opacity", "1");
        }
    }

    // ──────────────────── decoded panel ────────────────────

    pub fn append_character(&mut self, ch: char) {
        self.accumulated_text.push(ch);
        if let Some(sink) = self.ascii.as_mut() {
            sink.set_style("opacity", "1");
            sink.set_style("transition", "");
            sink.set_text(&self.accumulated_text);
        }
    }

    /// Show `text` verbatim without touching the accumulated text.
    pub fn set_ascii_text(&mut self, text: &str) {
        if let Some(sink) = self.ascii.as_mut() {
            sink.set_style("opacity", "1");
            sink.set_style("transition", "");
            sink.set_text(text);
        }
    }

    pub fn fade_ascii_display(&mut self) {
        let transition = self.fade_transition();
        if let Some(sink) = self.ascii.as_mut() {
            sink.set_style("transition", &transition);
            sink.set_style("opacity", "0");
        }
    }

    pub fn clear_ascii_display(&mut self) {
        self.accumulated_text.clear();
        if let Some(sink) = self.ascii.as_mut() {
            sink.set_text("");
            sink.set_style("opacity", "1");
        }
    }

    /// Return both sinks to their resting state. Used on teardown.
    pub fn reset_all(&mut self) {
        self.clear_binary_buffer();
        self.accumulated_text.clear();
        if let Some(sink) = self.ascii.as_mut() {
            sink.set_text("");
            sink.set_style("opacity", "1");
            sink.set_style("transition", "");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::MemoryTextSink;

    fn display() -> (DisplayManager, MemoryTextSink, MemoryTextSink) {
        let binary = MemoryTextSink::new();
        let ascii = MemoryTextSink::new();
        let manager = DisplayManager::new(
            Some(Box::new(binary.clone())),
            Some(Box::new(ascii.clone())),
            200,
        );
        (manager, binary, ascii)
    }

    #[test]
    fn reveal_groups_bits_in_bytes() {
        let (mut display, binary, _) = display();
        display.clear_binary_buffer();
        assert_eq!(binary.text(), " ");
        for (i, bit) in "101100100".chars().enumerate() {
            display.reveal_bit(bit, i);
        }
        assert_eq!(binary.text(), "10110010 0");
    }

    #[test]
    fn fade_then_reset_keeps_transition() {
        let (mut display, binary, _) = display();
        display.reveal_bit('1', 0);
        display.fade_binary_buffer();
        assert_eq!(binary.style("opacity").as_deref(), Some("0"));
        assert_eq!(
            binary.style("transition").as_deref(),
            Some("opacity 200ms ease-out")
        );
        display.reset_binary_buffer();
        assert_eq!(binary.text(), " ");
        assert_eq!(binary.style("opacity").as_deref(), Some("1"));
        assert!(binary.style("transition").is_some());
        display.clear_binary_buffer();
        assert!(binary.style("transition").is_none());
    }

    #[test]
    fn set_text_does_not_accumulate() {
        let (mut display, _, ascii) = display();
        display.append_character('H');
        display.append_character('E');
        assert_eq!(ascii.text(), "HE");
        display.set_ascii_text("48 45");
        assert_eq!(ascii.text(), "48 45");
        assert_eq!(display.accumulated_text(), "HE");
        display.append_character('L');
        assert_eq!(ascii.text(), "HEL");
    }

    #[test]
    fn clear_ascii_resets_accumulated_text() {
        let (mut display, _, ascii) = display();
        display.append_character('O');
        display.fade_ascii_display();
        assert_eq!(ascii.style("opacity").as_deref(), Some("0"));
        display.clear_ascii_display();
        assert_eq!(ascii.text(), "");
        assert_eq!(display.accumulated_text(), "");
        assert_eq!(ascii.style("opacity").as_deref(), Some("1"));
    }

    #[test]
    fn missing_sinks_are_silent() {
        let mut display = DisplayManager::new(None, None, 200);
        display.clear_binary_buffer();
        display.reveal_bit('1', 3);
        display.fade_binary_buffer();
        display.reset_binary_buffer();
        display.append_character('x');
        display.set_ascii_text("x");
        display.fade_ascii_display();
        display.clear_ascii_display();
        assert!(display.binary_text().is_none());
        assert!(display.ascii_text().is_none());
    }

    #[test]
    fn fade_duration_follows_config() {
        let binary = MemoryTextSink::new();
        let mut display = DisplayManager::new(Some(Box::new(binary.clone())), None, 450);
        display.fade_binary_buffer();
        assert_eq!(
            binary.style("transition").as_deref(),
            Some("opacity 450ms ease-out")
        );
    }
}
