//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use signal_analyzer_viz::analyzer::orchestrator::{
    ScheduleRow, TraceAnimationOrchestrator, TraceTiming, schedule_rows,
};
use signal_analyzer_viz::analyzer::{AnalyzerContext, AnalyzerSlot, AnalyzerStats, ResizeBus};
use signal_analyzer_viz::core::config::AnalyzerConfig;
use signal_analyzer_viz::core::errors::SavError;
use signal_analyzer_viz::logger::JsonlWriter;
use signal_analyzer_viz::render::geometry::{pick_baseline, square_wave_path};
use signal_analyzer_viz::render::grid::GridManager;
use signal_analyzer_viz::render::surface::{
    AnchorIds, MemoryCanvas, MemoryDocument, Rect, TextSink, ascii_sink_id, binary_sink_id,
    layered_markup,
};
use signal_analyzer_viz::signal::bits::{binary_to_hex, binary_to_string, parse_bits};
use signal_analyzer_viz::signal::source::DataSourceManager;

/// Headless driver for the logic-analyzer display.
#[derive(Debug, Parser)]
#[command(
    name = "sav",
    author,
    version,
    about = "Signal Analyzer Viz - simulated logic-analyzer traces",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Seed for payload bits, baselines and intervals.
    #[arg(long, global = true, value_name = "N")]
    seed: Option<u64>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print successive payloads from the configured source.
    Payloads(PayloadsArgs),
    /// Print the effect schedule of the next trace.
    Schedule(ScheduleArgs),
    /// Run the analyzer against in-memory surfaces.
    Simulate(SimulateArgs),
    /// Convert a bit string to hex and text.
    Hex(HexArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Serialize)]
struct PayloadsArgs {
    /// Number of payloads to print.
    #[arg(long, default_value_t = 8, value_name = "N")]
    count: usize,
}

#[derive(Debug, Clone, Args, Serialize)]
struct ScheduleArgs {
    /// Container width in pixels.
    #[arg(long, default_value_t = 1600.0, value_name = "PX")]
    width: f64,
    /// Container height in pixels.
    #[arg(long, default_value_t = 400.0, value_name = "PX")]
    height: f64,
    /// Lay out the schedule without indicator tweens.
    #[arg(long)]
    no_indicator: bool,
}

#[derive(Debug, Clone, Args, Serialize)]
struct SimulateArgs {
    /// Stop after this many completed traces.
    #[arg(long, default_value_t = 3, value_name = "N")]
    traces: u64,
    /// Container width in pixels.
    #[arg(long, default_value_t = 1600.0, value_name = "PX")]
    width: f64,
    /// Container height in pixels.
    #[arg(long, default_value_t = 400.0, value_name = "PX")]
    height: f64,
    /// Virtual clock step per tick.
    #[arg(long, default_value_t = 50, value_name = "MS")]
    step_ms: u64,
    /// Give up after this much virtual time.
    #[arg(long, default_value_t = 300, value_name = "SECONDS")]
    max_seconds: u64,
    /// Write an SVG snapshot of the last fully drawn trace.
    #[arg(long, value_name = "PATH")]
    svg: Option<PathBuf>,
    /// Append activity records to a JSONL file.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Serialize)]
struct HexArgs {
    /// Bits, most significant first, e.g. 0100100001000101.
    bits: String,
}

#[derive(Debug, Clone, Args, Serialize, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand, Serialize)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<SavError> for CliError {
    fn from(err: SavError) -> Self {
        match err {
            SavError::InvalidConfig { .. }
            | SavError::MissingConfig { .. }
            | SavError::ConfigParse { .. }
            | SavError::InvalidBits { .. } => Self::User(err.to_string()),
            SavError::Serialization { .. } | SavError::Io { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Payloads(args) => run_payloads(cli, args),
        Command::Schedule(args) => run_schedule(cli, args),
        Command::Simulate(args) => run_simulate(cli, args),
        Command::Hex(args) => run_hex(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig, CliError> {
    Ok(AnalyzerConfig::load(cli.config.as_deref())?)
}

fn make_rng(cli: &Cli) -> StdRng {
    cli.seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

// ──────────────────── payloads ────────────────────

fn run_payloads(cli: &Cli, args: &PayloadsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut rng = make_rng(cli);
    let mut source = DataSourceManager::new(&config);

    match output_mode(cli) {
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            for index in 0..args.count {
                let payload = source.next_payload(&mut rng);
                let looped = if payload.looped_to_start {
                    "looped".yellow().to_string()
                } else {
                    String::new()
                };
                writeln!(
                    stdout,
                    "{:>3}  {}  {:<24}  {:<10} {looped}",
                    index,
                    payload.binary_data.bold(),
                    binary_to_hex(&payload.binary_data).cyan(),
                    format!("{:?}", payload.current_chunk),
                )?;
            }
        }
        OutputMode::Json => {
            let payloads: Vec<Value> = (0..args.count)
                .map(|_| {
                    let payload = source.next_payload(&mut rng);
                    json!({
                        "binary_data": payload.binary_data,
                        "hex": binary_to_hex(&payload.binary_data),
                        "current_chunk": payload.current_chunk,
                        "looped_to_start": payload.looped_to_start,
                    })
                })
                .collect();
            write_json_line(&json!({
                "command": "payloads",
                "mode": config.payload.mode.as_str(),
                "payloads": payloads,
            }))?;
        }
    }
    Ok(())
}

// ──────────────────── schedule ────────────────────

fn run_schedule(cli: &Cli, args: &ScheduleArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut rng = make_rng(cli);

    let mut grid = GridManager::new(&config.grid);
    grid.update_dimensions(
        Rect::new(args.width, args.height),
        &mut MemoryCanvas::new(),
        &mut MemoryCanvas::new(),
    );
    let Some(baseline) = pick_baseline(grid.grid_lines(), &mut rng) else {
        return Err(CliError::User(format!(
            "a {}x{} container has fewer than two grid lines; no trace would be drawn",
            args.width, args.height
        )));
    };

    let payload = DataSourceManager::new(&config).next_payload(&mut rng);
    let wave = square_wave_path(&payload.binary_data, grid.grid_size(), baseline);
    let orchestrator = TraceAnimationOrchestrator::new(
        TraceTiming::from(&config.timing),
        config.payload.mode,
        config.grid.byte_count,
    );
    let timeline = orchestrator.build_timeline(wave.length, &payload, !args.no_indicator);
    let rows = schedule_rows(&timeline);

    match output_mode(cli) {
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            writeln!(
                stdout,
                "{} {}  path length {:.1}px  total {:.3}s",
                "trace".bold(),
                payload.binary_data,
                wave.length,
                timeline.duration()
            )?;
            for row in &rows {
                write_schedule_row(&mut stdout, row)?;
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "schedule",
                "payload": payload,
                "path_length": wave.length,
                "duration_s": timeline.duration(),
                "entries": rows,
            }))?;
        }
    }
    Ok(())
}

fn write_schedule_row(out: &mut impl Write, row: &ScheduleRow) -> io::Result<()> {
    if (row.end_ms - row.at_ms).abs() < f64::EPSILON {
        writeln!(out, "  {:>9.1}ms            {}", row.at_ms, row.effect)
    } else {
        writeln!(
            out,
            "  {:>9.1}ms {}  {}",
            row.at_ms,
            format!("→{:>7.1}ms", row.end_ms).dimmed(),
            row.effect
        )
    }
}

// ──────────────────── simulate ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Frame {
    clock_ms: u64,
    binary: String,
    ascii: String,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    command: &'static str,
    completed: bool,
    clock_ms: u64,
    stats: AnalyzerStats,
    frames: Vec<Frame>,
}

fn run_simulate(cli: &Cli, args: &SimulateArgs) -> Result<(), CliError> {
    if args.step_ms == 0 {
        return Err(CliError::User("--step-ms must be at least 1".to_string()));
    }
    let config = load_config(cli)?;
    let mode = output_mode(cli);

    let ids = AnchorIds::default();
    let doc = MemoryDocument::standard(Rect::new(args.width, args.height));
    let missing_sink = || CliError::Runtime("standard document lacks a text sink".to_string());
    let binary = doc
        .text_sink(&binary_sink_id(&ids.container))
        .ok_or_else(missing_sink)?;
    let ascii = doc
        .text_sink(&ascii_sink_id(&ids.container))
        .ok_or_else(missing_sink)?;
    let grid_canvas = doc.canvas(&ids.grid_canvas).ok_or_else(missing_sink)?;
    let trace_canvas = doc.canvas(&ids.trace_canvas).ok_or_else(missing_sink)?;

    let mut ctx = AnalyzerContext::new(ResizeBus::new()).with_rng(make_rng(cli));
    if let Some(path) = &args.log {
        ctx = ctx.with_activity(JsonlWriter::open(path));
    }
    let mut slot = AnalyzerSlot::new();
    let controller = slot.init(doc.resolve(&ids), &config, ctx);

    let step = Duration::from_millis(args.step_ms);
    let limit = Duration::from_secs(args.max_seconds);
    let mut frames: Vec<Frame> = Vec::new();
    let mut snapshot: Option<String> = None;
    let mut stdout = io::stdout().lock();

    while controller.stats().traces_completed < args.traces && controller.clock() < limit {
        controller.advance(step);

        let frame = Frame {
            clock_ms: u64::try_from(controller.clock().as_millis()).unwrap_or(u64::MAX),
            binary: binary.text(),
            ascii: ascii.text(),
        };
        let changed = frames
            .last()
            .is_none_or(|last| last.binary != frame.binary || last.ascii != frame.ascii);
        if changed {
            if mode == OutputMode::Human {
                writeln!(
                    stdout,
                    "[{:>8.3}s] {} {}",
                    frame.clock_ms as f64 / 1000.0,
                    format!("{:<18}", frame.binary).green(),
                    frame.ascii.bold()
                )?;
            }
            frames.push(frame);
        }

        if args.svg.is_some()
            && controller
                .current_trace()
                .is_some_and(|t| t.elapsed() >= config.timing.draw_duration_ms as f64 / 1000.0)
        {
            snapshot = Some(layered_markup(&[&grid_canvas, &trace_canvas]));
        }
    }

    let completed = controller.stats().traces_completed >= args.traces;
    let report = SimulationReport {
        command: "simulate",
        completed,
        clock_ms: u64::try_from(controller.clock().as_millis()).unwrap_or(u64::MAX),
        stats: controller.stats(),
        frames,
    };
    slot.teardown();

    if let Some(path) = &args.svg {
        let markup = snapshot.unwrap_or_else(|| layered_markup(&[&grid_canvas, &trace_canvas]));
        fs::write(path, markup).map_err(|e| SavError::io(path, e))?;
    }

    match mode {
        OutputMode::Human => {
            writeln!(
                stdout,
                "{} {} traces, {} skipped, {} grid rebuilds in {:.1}s of virtual time",
                if completed { "done:".green().bold() } else { "stopped:".yellow().bold() },
                report.stats.traces_completed,
                report.stats.traces_skipped,
                report.stats.grid_rebuilds,
                report.clock_ms as f64 / 1000.0
            )?;
        }
        OutputMode::Json => {
            drop(stdout);
            write_json_line(&serde_json::to_value(&report)?)?;
        }
    }

    if completed {
        Ok(())
    } else {
        Err(CliError::Runtime(format!(
            "only {} of {} traces completed within {}s",
            report.stats.traces_completed, args.traces, args.max_seconds
        )))
    }
}

// ──────────────────── hex ────────────────────

fn run_hex(cli: &Cli, args: &HexArgs) -> Result<(), CliError> {
    let bits = args.bits.trim();
    parse_bits(bits)?;
    let hex = binary_to_hex(bits);
    let text: String = binary_to_string(bits)
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '.' })
        .collect();

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}  {}", hex.cyan(), text.bold());
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "hex",
                "bits": bits,
                "hex": hex,
                "text": text,
            }))?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(AnalyzerConfig::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match load_config(cli) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(e)
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SAV_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "sav",
            "--config",
            "/tmp/sav.toml",
            "--json",
            "--no-color",
            "--seed",
            "7",
            "payloads",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["sav", "payloads", "--json", "--seed", "7"]);
        assert!(after.is_ok());
    }

    #[test]
    fn parses_every_subcommand() {
        let cases = [
            vec!["sav", "payloads", "--count", "3"],
            vec!["sav", "schedule", "--width", "800", "--height", "300"],
            vec!["sav", "schedule", "--no-indicator"],
            vec![
                "sav", "simulate", "--traces", "2", "--step-ms", "16", "--svg", "/tmp/a.svg",
                "--log", "/tmp/a.jsonl",
            ],
            vec!["sav", "hex", "0100100001000101"],
            vec!["sav", "config"],
            vec!["sav", "config", "path"],
            vec!["sav", "config", "show"],
            vec!["sav", "config", "validate"],
        ];
        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn hex_requires_bits() {
        assert!(Cli::try_parse_from(["sav", "hex"]).is_err());
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["sav", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn library_errors_map_to_exit_codes() {
        let user: CliError = SavError::InvalidBits {
            offset: 0,
            found: 'x',
        }
        .into();
        assert_eq!(user.exit_code(), 1);
        let runtime: CliError = SavError::io("/x", io::Error::other("boom")).into();
        assert_eq!(runtime.exit_code(), 2);
    }

    #[test]
    fn clap_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
