#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use signal_analyzer_viz::analyzer::{AnalyzerContext, AnalyzerController, AnalyzerSlot, ResizeBus};
use signal_analyzer_viz::core::config::AnalyzerConfig;
use signal_analyzer_viz::logger::MemorySink;
use signal_analyzer_viz::render::surface::{
    AnchorIds, MemoryCanvas, MemoryDocument, MemoryIndicator, MemoryTextSink, Rect,
    ascii_sink_id, binary_sink_id,
};

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_sav") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "sav.exe" } else { "sav" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve sav binary path for integration test"),
    }
}

/// Run the `sav` binary and keep a transcript next to the temp dir.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("sav-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("HOME", &root)
        .env_remove("SAV_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute sav command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let transcript = format!(
        "case={case_name}\nbin={}\nargs={args:?}\nstatus={}\n----- stdout -----\n{stdout}\n----- stderr -----\n{stderr}\n",
        bin_path.display(),
        output.status
    );
    fs::write(&log_path, transcript).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── analyzer rig ────────────────────

/// A standard in-memory document plus handles to every surface in it.
pub struct Rig {
    pub doc: MemoryDocument,
    pub bus: ResizeBus,
    pub log: MemorySink,
    pub grid: MemoryCanvas,
    pub trace: MemoryCanvas,
    pub binary: MemoryTextSink,
    pub ascii: MemoryTextSink,
    pub indicator: MemoryIndicator,
}

impl Rig {
    pub fn new(width: f64, height: f64) -> Self {
        let ids = AnchorIds::default();
        let doc = MemoryDocument::standard(Rect::new(width, height));
        Self {
            grid: doc.canvas(&ids.grid_canvas).expect("grid canvas"),
            trace: doc.canvas(&ids.trace_canvas).expect("trace canvas"),
            binary: doc
                .text_sink(&binary_sink_id(&ids.container))
                .expect("binary sink"),
            ascii: doc
                .text_sink(&ascii_sink_id(&ids.container))
                .expect("ascii sink"),
            indicator: doc
                .indicator(ids.indicator.as_deref().expect("indicator id"))
                .expect("indicator"),
            doc,
            bus: ResizeBus::new(),
            log: MemorySink::new(),
        }
    }

    pub fn context(&self, seed: u64) -> AnalyzerContext {
        AnalyzerContext::new(self.bus.clone())
            .with_seed(seed)
            .with_activity(self.log.clone())
    }

    pub fn controller(&self, config: &AnalyzerConfig, seed: u64) -> AnalyzerController {
        AnalyzerController::init(
            self.doc.resolve(&AnchorIds::default()),
            config,
            self.context(seed),
        )
    }

    pub fn init_in<'a>(
        &self,
        slot: &'a mut AnalyzerSlot,
        config: &AnalyzerConfig,
        seed: u64,
    ) -> &'a mut AnalyzerController {
        slot.init(self.doc.resolve(&AnchorIds::default()), config, self.context(seed))
    }
}

/// Fixed-message config with a fixed one-second gap between traces.
pub fn steady_config(message: &str) -> AnalyzerConfig {
    let mut cfg = AnalyzerConfig::default();
    cfg.payload.message = message.to_string();
    cfg.timing.min_interval_ms = 1000;
    cfg.timing.max_interval_ms = 1000;
    cfg
}
