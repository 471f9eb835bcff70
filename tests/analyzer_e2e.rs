//! End-to-end analyzer scenarios against in-memory surfaces.

mod common;

use std::time::Duration;

use common::{Rig, steady_config};
use signal_analyzer_viz::analyzer::{AnalyzerPhase, AnalyzerSlot};
use signal_analyzer_viz::core::config::PayloadMode;
use signal_analyzer_viz::logger::{EventType, JsonlWriter};
use signal_analyzer_viz::render::surface::{AnchorIds, ElementKind, Rect, TextSink};

const TICK: Duration = Duration::from_millis(16);

#[test]
fn message_cycle_reveals_bits_and_characters_in_lockstep() {
    let rig = Rig::new(1600.0, 400.0);
    let mut controller = rig.controller(&steady_config("HELLO"), 11);

    let mut ascii_seen: Vec<String> = Vec::new();
    let mut saw_full_first_pair = false;
    let mut max_paths = 0;
    while controller.stats().traces_completed < 3 {
        controller.advance(TICK);
        max_paths = max_paths.max(rig.trace.count(ElementKind::Path));
        saw_full_first_pair |= rig.binary.text() == "01001000 01000101";
        let ascii = rig.ascii.text();
        if ascii_seen.last() != Some(&ascii) {
            ascii_seen.push(ascii);
        }
        assert!(controller.clock() < Duration::from_secs(60), "loop stalled");
    }

    assert!(saw_full_first_pair);
    assert_eq!(max_paths, 1);
    let expected: Vec<String> = ["", "H", "HE", "HEL", "HELL", "HELLO", ""]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    assert_eq!(ascii_seen, expected);
    assert_eq!(controller.accumulated_text(), Some(""));
    assert_eq!(controller.source_position(), Some(0));
    assert_eq!(rig.log.count(EventType::TraceStart), 3);
    assert_eq!(rig.log.count(EventType::TraceComplete), 3);
}

#[test]
fn binary_buffer_fades_then_resets_between_traces() {
    let rig = Rig::new(1600.0, 400.0);
    let mut controller = rig.controller(&steady_config("HELLO"), 3);

    // just past initial delay + draw + fade delay
    controller.advance(Duration::from_millis(1000 + 2000 + 850));
    assert_eq!(rig.binary.style("opacity").as_deref(), Some("0"));
    assert_eq!(
        rig.binary.style("transition").as_deref(),
        Some("opacity 200ms ease-out")
    );

    controller.advance(Duration::from_millis(550));
    assert_eq!(rig.binary.text(), " ");
    assert_eq!(rig.binary.style("opacity").as_deref(), Some("1"));
    assert_eq!(controller.phase(), AnalyzerPhase::Waiting);
}

#[test]
fn slot_reinit_leaves_one_subscription_and_one_loop() {
    let rig = Rig::new(1600.0, 400.0);
    let config = steady_config("HELLO");
    let mut slot = AnalyzerSlot::new();

    rig.init_in(&mut slot, &config, 1);
    let controller = rig.init_in(&mut slot, &config, 2);
    assert_eq!(rig.bus.live_subscriptions(), 1);

    for _ in 0..400 {
        controller.advance(TICK);
        assert!(rig.trace.count(ElementKind::Path) <= 1);
    }
    assert_eq!(rig.log.count(EventType::AnalyzerInit), 2);
    assert_eq!(rig.log.count(EventType::AnalyzerCleanup), 1);
    assert_eq!(
        rig.log.count(EventType::TraceStart),
        usize::try_from(controller.stats().traces_started).expect("small")
    );
}

#[test]
fn double_cleanup_is_harmless() {
    let rig = Rig::new(1600.0, 400.0);
    let mut controller = rig.controller(&steady_config("HELLO"), 5);
    controller.advance(Duration::from_millis(1500));
    assert!(controller.has_active_trace());

    assert!(controller.cleanup());
    let binary = rig.binary.text();
    let indicator_writes = rig.indicator.style_writes();
    assert!(!controller.cleanup());
    controller.advance(Duration::from_secs(20));
    controller.pointer_enter();

    assert_eq!(rig.binary.text(), binary);
    assert_eq!(rig.indicator.style_writes(), indicator_writes);
    assert_eq!(rig.trace.count(ElementKind::Path), 0);
    assert_eq!(rig.bus.live_subscriptions(), 0);
    assert_eq!(rig.indicator.style("filter").as_deref(), Some("brightness(0.6)"));
}

#[test]
fn small_resizes_do_not_rebuild_grid_lines() {
    let rig = Rig::new(1600.0, 400.0);
    let mut controller = rig.controller(&steady_config("HELLO"), 9);
    let writes = rig.grid.structural_writes();

    rig.bus.publish(Rect::new(1610.0, 400.0));
    rig.bus.publish(Rect::new(1590.0, 400.0));
    controller.advance(TICK);
    assert_eq!(rig.grid.structural_writes(), writes);
    assert_eq!(rig.trace.viewport().as_deref(), Some("0 0 1590 400"));

    rig.bus.publish(Rect::new(1611.0, 400.0));
    controller.advance(TICK);
    assert!(rig.grid.structural_writes() > writes);
    assert_eq!(rig.log.count(EventType::GridRebuild), 2);
}

#[test]
fn missing_required_anchor_leaves_everything_untouched() {
    let mut rig = Rig::new(1600.0, 400.0);
    rig.doc.remove(&AnchorIds::default().container);
    let mut controller = rig.controller(&steady_config("HELLO"), 1);

    controller.advance(Duration::from_secs(30));
    assert!(controller.is_inert());
    assert!(!controller.cleanup());
    assert_eq!(rig.grid.structural_writes(), 0);
    assert!(rig.grid.viewport().is_none());
    assert_eq!(rig.binary.text(), "");
    assert_eq!(rig.bus.live_subscriptions(), 0);
}

#[test]
fn optional_surfaces_may_be_absent() {
    let mut rig = Rig::new(1600.0, 400.0);
    rig.doc.remove("signal-analyzer-binary");
    rig.doc.remove("signal-analyzer-ascii");
    rig.doc.remove("analyzer-indicator");
    let mut controller = rig.controller(&steady_config("HELLO"), 1);
    assert!(!controller.is_inert());
    assert!(!controller.is_hover_attached());

    for _ in 0..600 {
        controller.advance(TICK);
    }
    assert!(controller.stats().traces_completed >= 1);
    assert_eq!(controller.accumulated_text().map(str::is_empty), Some(false));
}

#[test]
fn same_seed_draws_same_random_traces() {
    let mut config = steady_config("unused");
    config.payload.mode = PayloadMode::Random;

    let run = |seed: u64| {
        let rig = Rig::new(1600.0, 400.0);
        let mut controller = rig.controller(&config, seed);
        while controller.stats().traces_completed < 2 {
            controller.advance(TICK);
        }
        rig.log
            .entries()
            .into_iter()
            .filter(|e| e.event == EventType::TraceStart)
            .filter_map(|e| e.bits)
            .collect::<Vec<_>>()
    };

    let a = run(77);
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|bits| bits.len() == 16));
    assert_eq!(a, run(77));
}

#[test]
fn activity_log_is_written_as_jsonl() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("activity.jsonl");
    let rig = Rig::new(1600.0, 400.0);

    let ctx = rig.context(4).with_activity(JsonlWriter::open(&path));
    let mut controller = signal_analyzer_viz::analyzer::AnalyzerController::init(
        rig.doc.resolve(&AnchorIds::default()),
        &steady_config("HELLO"),
        ctx,
    );
    controller.advance(Duration::from_millis(1200));
    controller.cleanup();
    drop(controller);

    let contents = std::fs::read_to_string(&path).expect("log written");
    let events: Vec<String> = contents
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            value["event"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(
        events,
        vec![
            "grid_rebuild",
            "analyzer_init",
            "trace_start",
            "analyzer_cleanup"
        ]
    );
}
