use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use tts_bridge::config::BridgeConfig;
use tts_bridge::host::HostEventKind;
use tts_bridge::replay::{self, ReplayReport};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tts_bridge::init_logging(level);

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tts-bridge-diag error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tts-bridge-diag", about = "Replay TTS engine callback traces through the bridge")]
struct Cli {
    /// Log bridge decisions to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Replay(args) => replay_command(args),
            Command::Check(args) => check_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a script and print forwarded host events and rejections.
    Replay(ReplayArgs),
    /// Replay a script and fail if any signal is rejected.
    Check(ScriptArgs),
}

#[derive(Args, Debug, Clone)]
struct ScriptArgs {
    /// JSON array of scripted engine signals.
    #[arg(long)]
    script: PathBuf,
    /// Bridge configuration file (defaults apply when omitted).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ReplayArgs {
    #[command(flatten)]
    script: ScriptArgs,
    /// Output format for the replay report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ReportFormat {
    Json,
    Table,
}

impl ScriptArgs {
    fn run(&self) -> Result<ReplayReport> {
        if !self.script.exists() {
            bail!("script file {} does not exist", self.script.display());
        }
        let contents = fs::read_to_string(&self.script)
            .with_context(|| format!("reading {}", self.script.display()))?;
        let signals = replay::parse_script(&contents)
            .with_context(|| format!("parsing {}", self.script.display()))?;

        let config = match &self.config {
            Some(path) => BridgeConfig::load_from_file(path),
            None => BridgeConfig::default(),
        };

        Ok(replay::replay(&signals, &config))
    }
}

fn replay_command(args: ReplayArgs) -> Result<()> {
    let report = args.script.run()?;
    match args.format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportFormat::Table => print_table(&report),
    }
    Ok(())
}

fn check_command(args: ScriptArgs) -> Result<()> {
    let report = args.run()?;
    if !report.is_clean() {
        for rejected in &report.rejected {
            eprintln!(
                "step {}: code {} - {}",
                rejected.index, rejected.code, rejected.message
            );
        }
        bail!(
            "{} of {} signals rejected",
            report.rejected.len(),
            report.steps
        );
    }
    println!("ok: {} signals, {} forwarded", report.steps, report.forwarded.len());
    Ok(())
}

fn print_table(report: &ReplayReport) {
    println!("Forwarded events ({}):", report.forwarded.len());
    println!("{:<10} {:<8} {:<24} detail", "backend", "kind", "utterance");
    for event in &report.forwarded {
        let detail = match &event.kind {
            HostEventKind::Init { status } => format!("{status:?}"),
            HostEventKind::Stop { interrupted, .. } => format!("interrupted={interrupted}"),
            _ => String::new(),
        };
        println!(
            "{:<10} {:<8} {:<24} {}",
            event.backend_id,
            event.signal().to_string(),
            event.utterance_id().unwrap_or("-"),
            detail
        );
    }

    println!();
    println!("Rejected signals ({}):", report.rejected.len());
    for rejected in &report.rejected {
        println!(
            "  step {:<4} code {:<5} {}",
            rejected.index, rejected.code, rejected.message
        );
    }

    println!();
    println!(
        "Telemetry: total={} forwarded={} violations={} dropped={}",
        report.telemetry.total_events,
        report.telemetry.forwarded_events,
        report.telemetry.violations,
        report.telemetry.dropped_events
    );
}
