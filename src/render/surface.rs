//! Host surfaces the visualization draws into, plus in-memory implementations.
//!
//! The traits mirror the handful of DOM capabilities the analyzer needs: a
//! container with a live content box, two vector canvases, two text sinks and
//! an optional indicator. Memory implementations are cheap shared handles
//! (`Clone` shares state) so a caller can keep one copy for inspection while
//! the controller owns another.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

/// Content-box size of the observed container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `"0 0 {w} {h}"`, the viewport string written to both canvases.
    #[must_use]
    pub fn view_box(&self) -> String {
        format!(
            "0 0 {} {}",
            format_number(self.width),
            format_number(self.height)
        )
    }
}

/// Compact coordinate formatting for attribute strings: at most two decimals,
/// no trailing zeros.
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut text = format!("{value:.2}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if text == "-0" { "0".to_string() } else { text }
}

pub trait Container {
    /// Identifier used to namespace the container's text sinks.
    fn id(&self) -> &str;
    fn content_rect(&self) -> Rect;
}

pub type ElementId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Line,
    Path,
}

impl ElementKind {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Path => "path",
        }
    }
}

/// A child element of a vector canvas: a tag plus string attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanvasElement {
    pub kind: ElementKind,
    pub attributes: BTreeMap<String, String>,
}

impl CanvasElement {
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(ElementKind::Line)
            .with("x1", format_number(x1))
            .with("y1", format_number(y1))
            .with("x2", format_number(x2))
            .with("y2", format_number(y2))
    }

    #[must_use]
    pub fn path(d: impl Into<String>) -> Self {
        Self::new(ElementKind::Path).with("d", d)
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub trait VectorCanvas {
    fn set_viewport(&mut self, view_box: &str);
    fn append(&mut self, element: CanvasElement) -> ElementId;
    /// Returns `false` when the element is no longer attached.
    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> bool;
    fn remove(&mut self, id: ElementId) -> bool;
    fn clear(&mut self);
}

pub trait TextSink {
    fn set_text(&mut self, text: &str);
    fn text(&self) -> String;
    /// Inline style write; an empty value removes the property.
    fn set_style(&mut self, property: &str, value: &str);
}

pub trait Indicator {
    /// Inline style write; an empty value removes the property.
    fn set_style(&mut self, property: &str, value: &str);
    fn set_hover_listening(&mut self, listening: bool);
}

// ──────────────────── in-memory container ────────────────────

#[derive(Debug, Clone)]
pub struct MemoryContainer {
    id: String,
    rect: Arc<Mutex<Rect>>,
}

impl MemoryContainer {
    #[must_use]
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect: Arc::new(Mutex::new(rect)),
        }
    }

    pub fn set_rect(&self, rect: Rect) {
        *self.rect.lock() = rect;
    }
}

impl Container for MemoryContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn content_rect(&self) -> Rect {
        *self.rect.lock()
    }
}

// ──────────────────── in-memory canvas ────────────────────

#[derive(Debug, Default)]
struct CanvasState {
    viewport: Option<String>,
    next_id: ElementId,
    children: Vec<(ElementId, CanvasElement)>,
    structural_writes: u64,
}

/// Vector canvas backed by a shared child list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCanvas {
    state: Arc<Mutex<CanvasState>>,
}

impl MemoryCanvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn viewport(&self) -> Option<String> {
        self.state.lock().viewport.clone()
    }

    #[must_use]
    pub fn children(&self) -> Vec<CanvasElement> {
        self.state
            .lock()
            .children
            .iter()
            .map(|(_, element)| element.clone())
            .collect()
    }

    #[must_use]
    pub fn count(&self, kind: ElementKind) -> usize {
        self.state
            .lock()
            .children
            .iter()
            .filter(|(_, element)| element.kind == kind)
            .count()
    }

    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<CanvasElement> {
        self.state
            .lock()
            .children
            .iter()
            .find(|(child, _)| *child == id)
            .map(|(_, element)| element.clone())
    }

    /// Appends, removals and clears so far; attribute and viewport writes
    /// are not counted.
    #[must_use]
    pub fn structural_writes(&self) -> u64 {
        self.state.lock().structural_writes
    }

    /// Serialize the canvas as a standalone SVG document.
    #[must_use]
    pub fn to_markup(&self) -> String {
        layered_markup(&[self])
    }
}

/// One SVG document holding every layer's children, bottom layer first. The
/// viewport comes from the first layer that has one. Layers must be distinct
/// canvases.
#[must_use]
pub fn layered_markup(layers: &[&MemoryCanvas]) -> String {
    let states: Vec<_> = layers.iter().map(|layer| layer.state.lock()).collect();
    let mut out = String::new();
    let _ = write!(out, "<svg xmlns=\"http://www.w3.org/2000/svg\"");
    if let Some(view_box) = states.iter().find_map(|state| state.viewport.as_ref()) {
        let _ = write!(out, " viewBox=\"{view_box}\"");
    }
    out.push_str(">\n");
    for state in &states {
        for (_, element) in &state.children {
            let _ = write!(out, "  <{}", element.kind.tag());
            for (name, value) in &element.attributes {
                let _ = write!(out, " {name}=\"{}\"", escape_attribute(value));
            }
            out.push_str("/>\n");
        }
    }
    out.push_str("</svg>\n");
    out
}

fn escape_attribute(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

impl VectorCanvas for MemoryCanvas {
    fn set_viewport(&mut self, view_box: &str) {
        self.state.lock().viewport = Some(view_box.to_string());
    }

    fn append(&mut self, element: CanvasElement) -> ElementId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.children.push((id, element));
        state.structural_writes += 1;
        id
    }

    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) -> bool {
        let mut state = self.state.lock();
        match state.children.iter_mut().find(|(child, _)| *child == id) {
            Some((_, element)) => {
                element
                    .attributes
                    .insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: ElementId) -> bool {
        let mut state = self.state.lock();
        let before = state.children.len();
        state.children.retain(|(child, _)| *child != id);
        let removed = state.children.len() != before;
        if removed {
            state.structural_writes += 1;
        }
        removed
    }

    fn clear(&mut self) {
        let mut state = self.state.lock();
        state.children.clear();
        state.structural_writes += 1;
    }
}

// ──────────────────── in-memory text sink ────────────────────

#[derive(Debug, Default)]
struct TextState {
    text: String,
    styles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTextSink {
    state: Arc<Mutex<TextState>>,
}

impl MemoryTextSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn style(&self, property: &str) -> Option<String> {
        self.state.lock().styles.get(property).cloned()
    }
}

impl TextSink for MemoryTextSink {
    fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.state.lock().text);
    }

    fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    fn set_style(&mut self, property: &str, value: &str) {
        let mut state = self.state.lock();
        if value.is_empty() {
            state.styles.remove(property);
        } else {
            state.styles.insert(property.to_string(), value.to_string());
        }
    }
}

// ──────────────────── in-memory indicator ────────────────────

#[derive(Debug, Default)]
struct IndicatorState {
    styles: BTreeMap<String, String>,
    listening: bool,
    style_writes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

impl MemoryIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn style(&self, property: &str) -> Option<String> {
        self.state.lock().styles.get(property).cloned()
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state.lock().listening
    }

    #[must_use]
    pub fn style_writes(&self) -> u64 {
        self.state.lock().style_writes
    }
}

impl Indicator for MemoryIndicator {
    fn set_style(&mut self, property: &str, value: &str) {
        let mut state = self.state.lock();
        state.style_writes += 1;
        if value.is_empty() {
            state.styles.remove(property);
        } else {
            state.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn set_hover_listening(&mut self, listening: bool) {
        self.state.lock().listening = listening;
    }
}

// ──────────────────── anchors ────────────────────

/// Resolved handles for one analyzer instance.
///
/// `container`, `grid_canvas` and `trace_canvas` are required; the rest are
/// optional and their absence silently disables the matching output.
#[derive(Default)]
pub struct Anchors {
    pub container: Option<Box<dyn Container>>,
    pub grid_canvas: Option<Box<dyn VectorCanvas>>,
    pub trace_canvas: Option<Box<dyn VectorCanvas>>,
    pub binary_sink: Option<Box<dyn TextSink>>,
    pub ascii_sink: Option<Box<dyn TextSink>>,
    pub indicator: Option<Box<dyn Indicator>>,
}

impl Anchors {
    /// Names of the required anchors that are absent.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.container.is_none() {
            missing.push("container");
        }
        if self.grid_canvas.is_none() {
            missing.push("grid_canvas");
        }
        if self.trace_canvas.is_none() {
            missing.push("trace_canvas");
        }
        missing
    }
}

/// Identifiers used to look anchors up in a [`MemoryDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorIds {
    pub container: String,
    pub grid_canvas: String,
    pub trace_canvas: String,
    pub indicator: Option<String>,
}

impl Default for AnchorIds {
    fn default() -> Self {
        Self {
            container: "signal-analyzer".to_string(),
            grid_canvas: "analyzer-grid".to_string(),
            trace_canvas: "analyzer-trace".to_string(),
            indicator: Some("analyzer-indicator".to_string()),
        }
    }
}

#[must_use]
pub fn binary_sink_id(container_id: &str) -> String {
    format!("{container_id}-binary")
}

#[must_use]
pub fn ascii_sink_id(container_id: &str) -> String {
    format!("{container_id}-ascii")
}

/// A tiny id-addressed document of memory surfaces.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    containers: HashMap<String, MemoryContainer>,
    canvases: HashMap<String, MemoryCanvas>,
    sinks: HashMap<String, MemoryTextSink>,
    indicators: HashMap<String, MemoryIndicator>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding every anchor named by `AnchorIds::default()`.
    #[must_use]
    pub fn standard(rect: Rect) -> Self {
        let ids = AnchorIds::default();
        let mut doc = Self::new();
        doc.insert_container(&ids.container, rect);
        doc.insert_canvas(&ids.grid_canvas);
        doc.insert_canvas(&ids.trace_canvas);
        doc.insert_text_sink(&binary_sink_id(&ids.container));
        doc.insert_text_sink(&ascii_sink_id(&ids.container));
        if let Some(indicator) = &ids.indicator {
            doc.insert_indicator(indicator);
        }
        doc
    }

    pub fn insert_container(&mut self, id: &str, rect: Rect) -> MemoryContainer {
        let container = MemoryContainer::new(id, rect);
        self.containers.insert(id.to_string(), container.clone());
        container
    }

    pub fn insert_canvas(&mut self, id: &str) -> MemoryCanvas {
        let canvas = MemoryCanvas::new();
        self.canvases.insert(id.to_string(), canvas.clone());
        canvas
    }

    pub fn insert_text_sink(&mut self, id: &str) -> MemoryTextSink {
        let sink = MemoryTextSink::new();
        self.sinks.insert(id.to_string(), sink.clone());
        sink
    }

    pub fn insert_indicator(&mut self, id: &str) -> MemoryIndicator {
        let indicator = MemoryIndicator::new();
        self.indicators.insert(id.to_string(), indicator.clone());
        indicator
    }

    pub fn remove(&mut self, id: &str) {
        self.containers.remove(id);
        self.canvases.remove(id);
        self.sinks.remove(id);
        self.indicators.remove(id);
    }

    #[must_use]
    pub fn container(&self, id: &str) -> Option<MemoryContainer> {
        self.containers.get(id).cloned()
    }

    #[must_use]
    pub fn canvas(&self, id: &str) -> Option<MemoryCanvas> {
        self.canvases.get(id).cloned()
    }

    #[must_use]
    pub fn text_sink(&self, id: &str) -> Option<MemoryTextSink> {
        self.sinks.get(id).cloned()
    }

    #[must_use]
    pub fn indicator(&self, id: &str) -> Option<MemoryIndicator> {
        self.indicators.get(id).cloned()
    }

    /// Look every anchor up by id. Sinks are addressed through the container id.
    #[must_use]
    pub fn resolve(&self, ids: &AnchorIds) -> Anchors {
        Anchors {
            container: self
                .container(&ids.container)
                .map(|c| Box::new(c) as Box<dyn Container>),
            grid_canvas: self
                .canvas(&ids.grid_canvas)
                .map(|c| Box::new(c) as Box<dyn VectorCanvas>),
            trace_canvas: self
                .canvas(&ids.trace_canvas)
                .map(|c| Box::new(c) as Box<dyn VectorCanvas>),
            binary_sink: self
                .text_sink(&binary_sink_id(&ids.container))
                .map(|s| Box::new(s) as Box<dyn TextSink>),
            ascii_sink: self
                .text_sink(&ascii_sink_id(&ids.container))
                .map(|s| Box::new(s) as Box<dyn TextSink>),
            indicator: ids
                .indicator
                .as_deref()
                .and_then(|id| self.indicator(id))
                .map(|i| Box::new(i) as Box<dyn Indicator>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_trims_zeros() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
        assert_eq!(format_number(-0.001), "0");
        assert_eq!(format_number(f64::NAN), "0");
        assert_eq!(Rect::new(1600.0, 400.5).view_box(), "0 0 1600 400.5");
    }

    #[test]
    fn canvas_clone_shares_children() {
        let canvas = MemoryCanvas::new();
        let mut owned: Box<dyn VectorCanvas> = Box::new(canvas.clone());
        let id = owned.append(CanvasElement::path("M0,0"));
        assert_eq!(canvas.count(ElementKind::Path), 1);
        assert!(owned.set_attribute(id, "stroke-dashoffset", "4"));
        assert_eq!(
            canvas.element(id).and_then(|e| e.attribute("stroke-dashoffset").map(str::to_string)),
            Some("4".to_string())
        );
        assert!(owned.remove(id));
        assert!(!owned.remove(id));
        assert!(!owned.set_attribute(id, "d", "M1,1"));
        assert_eq!(canvas.structural_writes(), 2);
    }

    #[test]
    fn markup_lists_children_in_order() {
        let mut canvas = MemoryCanvas::new();
        canvas.set_viewport("0 0 10 10");
        canvas.append(CanvasElement::line(0.0, 5.0, 10.0, 5.0));
        canvas.append(CanvasElement::path("M0,0 L10,0"));
        let svg = canvas.to_markup();
        assert!(svg.contains("viewBox=\"0 0 10 10\""));
        let line_at = svg.find("<line").expect("line present");
        let path_at = svg.find("<path").expect("path present");
        assert!(line_at < path_at);
    }

    #[test]
    fn layered_markup_stacks_canvases() {
        let mut grid = MemoryCanvas::new();
        let mut trace = MemoryCanvas::new();
        trace.set_viewport("0 0 20 20");
        grid.append(CanvasElement::line(0.0, 10.0, 20.0, 10.0));
        trace.append(CanvasElement::path("M0,10 L20,10"));
        let svg = layered_markup(&[&grid, &trace]);
        assert!(svg.contains("viewBox=\"0 0 20 20\""));
        assert!(svg.find("<line").expect("grid layer") < svg.find("<path").expect("trace layer"));
    }

    #[test]
    fn empty_style_value_removes_property() {
        let mut sink = MemoryTextSink::new();
        sink.set_style("transition", "opacity 200ms ease-out");
        assert!(sink.style("transition").is_some());
        sink.set_style("transition", "");
        assert!(sink.style("transition").is_none());
    }

    #[test]
    fn resolve_addresses_sinks_through_container_id() {
        let doc = MemoryDocument::standard(Rect::new(800.0, 200.0));
        let anchors = doc.resolve(&AnchorIds::default());
        assert!(anchors.missing_required().is_empty());
        assert!(anchors.binary_sink.is_some());
        assert!(anchors.ascii_sink.is_some());
        assert!(anchors.indicator.is_some());

        let mut doc = doc;
        doc.remove("analyzer-trace");
        let anchors = doc.resolve(&AnchorIds::default());
        assert_eq!(anchors.missing_required(), vec!["trace_canvas"]);
    }
}
