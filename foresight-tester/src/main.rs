use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use foresight_engine::{
    Event, Timestamp, canonicalize, export_jsonl, export_log, parse_log, project, roll,
};
use foresight_tester::{ForecastContext, ForecastOptions, HarnessConfig, Player, forecast};

#[derive(Debug, Parser)]
#[command(name = "foresight-tester", version)]
#[command(about = "QA tooling for the Foresight engine: log inspection, dice and tape replay")]
struct Args {
    /// Harness config file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Print a log in canonical order
    Canonicalize {
        log: PathBuf,
        /// Emit JSON-Lines instead of a pretty array
        #[arg(long)]
        jsonl: bool,
    },
    /// Print the forecaster prompt for a log
    Project { log: PathBuf },
    /// Roll the deterministic dice
    Roll {
        /// Number of events in the history
        #[arg(long)]
        count: usize,
        /// ISO-8601 timestamp of the roll
        #[arg(long)]
        at: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Replay a tape and print the commands it yields
    Replay {
        tape: PathBuf,
        /// Check the tape against this log instead of its own history
        #[arg(long)]
        log: Option<PathBuf>,
        /// Skip the recorded inter-chunk delays
        #[arg(long)]
        no_delays: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    match args.command {
        Action::Canonicalize { log, jsonl } => {
            let events = canonicalize(&read_log(&log)?);
            if jsonl {
                print!("{}", export_jsonl(&events));
            } else {
                println!("{}", export_log(&events));
            }
        }
        Action::Project { log } => println!("{}", project(&read_log(&log)?)),
        Action::Roll { count, at, label } => {
            let at = Timestamp::parse(at).context("parsing --at")?;
            println!("{}", roll(count, at.as_str(), label.as_deref()));
        }
        Action::Replay {
            tape,
            log,
            no_delays,
        } => replay(&config, &tape, log.as_deref(), no_delays).await?,
    }
    Ok(())
}

fn read_log(path: &Path) -> Result<Vec<Event>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let source_name = path.display().to_string();
    parse_log(&source_name, &text).with_context(|| format!("parsing {}", path.display()))
}

async fn replay(
    config: &HarnessConfig,
    tape_path: &Path,
    log: Option<&Path>,
    no_delays: bool,
) -> Result<()> {
    announce_banner();
    let player = Player::load(tape_path, config)?;
    let player = if no_delays {
        player.with_delays(false)
    } else {
        player
    };
    let tape = player.tape();
    let history = match log {
        Some(path) => read_log(path)?,
        None => tape.request.history.clone(),
    };
    let options = ForecastOptions {
        model: tape.request.model.clone(),
        source_name: tape_path.display().to_string(),
    };
    let context = ForecastContext {
        history,
        system_prompt: tape.request.system_prompt.clone(),
    };
    eprintln!(
        "{} {} ({} chunks, recorded {})",
        "▶ Replaying".bright_cyan(),
        tape_path.display(),
        tape.stream.len(),
        tape.meta.recorded_at
    );

    let commands = match forecast(&player, context, &options).await {
        Ok(commands) => commands,
        Err(err) => {
            eprintln!("{} {err}", "✗ Replay failed:".red().bold());
            return Err(err.into());
        }
    };
    for command in &commands {
        println!("{}", serde_json::to_string(command)?);
    }
    eprintln!(
        "{} {} commands",
        "✓ Replay matched:".green().bold(),
        commands.len()
    );
    Ok(())
}

fn announce_banner() {
    eprintln!("{}", "🔮 Foresight Tester".bright_cyan().bold());
    eprintln!("{}", "===================".cyan());
}
