//! enginectl - drive a UCI chess engine from the command line.
//!
//! A thin host around `stockfish-adapter`:
//!
//! 1. **`probe`**: start the engine, run the handshake, print its name.
//! 2. **`search`**: initialize the engine for a variant and level, search one
//!    position, print the chosen move.
//! 3. **`options`**: dry run. Print the commands `init` and `set_level` would
//!    send for a configuration without starting any engine.
//!
//! Engine paths, timeouts and the memory budget come from [`config`] and can
//! be overridden with flags.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use stockfish_adapter::{
    ControllerConfig, EngineFlavor, EngineHost, GameController, HostResources, Level, Platform,
    ProcessTransport, ScriptedTransport, Variant,
};
use tokio::sync::mpsc;

mod config;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Parser)]
#[command(name = "enginectl", about = "Drive a UCI chess engine")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args)]
struct EngineArgs {
    /// Engine executable. Defaults to the configured or discovered engine.
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// Game variant key (standard, chess960, threeCheck, antichess, ...).
    #[arg(long, global = true, default_value = "standard", value_parser = parse_variant)]
    variant: Variant,

    /// Host platform family (web, android, ios, desktop).
    #[arg(long, global = true, default_value = "desktop", value_parser = parse_platform)]
    platform: Platform,

    /// CPU cores to report. Defaults to the cores of this machine.
    #[arg(long, global = true)]
    cores: Option<usize>,

    /// Engine memory budget in MB.
    #[arg(long, global = true)]
    memory: Option<u32>,

    /// Seconds to wait for each handshake or ready barrier.
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and print the name it reports.
    Probe,
    /// Search one position and print the engine's move.
    Search {
        /// Starting position.
        #[arg(long, default_value = START_FEN)]
        fen: String,

        /// Moves played from the starting position, in UCI notation.
        #[arg(long, num_args = 0..)]
        moves: Vec<String>,

        /// Difficulty level, 1..=8.
        #[arg(long, default_value = "1", value_parser = parse_level)]
        level: Level,
    },
    /// Print the commands a configuration sends, without starting an engine.
    Options {
        /// Difficulty level, 1..=8.
        #[arg(long, default_value = "1", value_parser = parse_level)]
        level: Level,
    },
}

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// No engine executable was given, configured or found.
    #[error("no {0:?} engine found; pass --engine or set ENGINECTL_ENGINE_PATH")]
    EngineNotFound(EngineFlavor),

    /// The engine did not answer a search in time.
    #[error("engine did not return a move within {0:?}")]
    SearchTimedOut(Duration),

    /// The adapter stopped reporting moves.
    #[error("engine stopped reporting moves")]
    HostClosed,
}

fn parse_variant(s: &str) -> Result<Variant, String> {
    s.parse::<Variant>().map_err(|e| e.to_string())
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>()
}

fn parse_level(s: &str) -> Result<Level, String> {
    let raw: u8 = s.parse().map_err(|e| format!("invalid level: {}", e))?;
    Level::new(raw).map_err(|e| e.to_string())
}

/// What the engine chose.
#[derive(Debug)]
enum EngineReply {
    Move(String),
    Drop(String),
}

/// Forwards engine callbacks into a channel read by `main`.
struct ChannelHost {
    tx: mpsc::UnboundedSender<EngineReply>,
}

impl EngineHost for ChannelHost {
    fn on_engine_move(&self, mv: &str) {
        let _ = self.tx.send(EngineReply::Move(mv.to_string()));
    }

    fn on_engine_drop(&self, drop: &str) {
        let _ = self.tx.send(EngineReply::Drop(drop.to_string()));
    }
}

impl EngineArgs {
    fn controller_config(&self) -> ControllerConfig {
        let resources = HostResources {
            cpu_cores: self.cores.unwrap_or_else(config::get_cpu_cores),
            max_memory_mb: self.memory.unwrap_or_else(config::get_max_memory_mb),
        };
        let timeout = self
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(config::get_handshake_timeout);

        ControllerConfig::new(self.variant, self.platform)
            .with_resources(resources)
            .with_handshake_timeout(timeout)
    }

    /// Resolve the engine executable: `--engine`, then the configured path
    /// for the flavour this platform and variant need, then discovery.
    fn transport(&self) -> Result<ProcessTransport, CliError> {
        let flavor = self.platform.engine_flavor(self.variant);
        let configured = match flavor {
            EngineFlavor::Standard => config::get_engine_path(),
            EngineFlavor::Variants => config::get_variant_engine_path(),
        };

        if let Some(path) = self.engine.clone().or(configured) {
            return Ok(ProcessTransport::new(path));
        }
        ProcessTransport::locate(flavor).map_err(|_| CliError::EngineNotFound(flavor))
    }
}

async fn probe(args: &EngineArgs) -> anyhow::Result<()> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut ctrl = GameController::new(
        args.transport()?,
        args.controller_config(),
        Arc::new(ChannelHost { tx }),
    );

    ctrl.init().await.context("engine initialization failed")?;
    println!("{}", ctrl.engine_name().unwrap_or_default());
    ctrl.exit().await?;
    Ok(())
}

async fn search(args: &EngineArgs, fen: &str, moves: &[String], level: Level) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ctrl = GameController::new(
        args.transport()?,
        args.controller_config(),
        Arc::new(ChannelHost { tx }),
    );

    ctrl.init().await.context("engine initialization failed")?;
    tracing::info!("Engine {} ready", ctrl.engine_name().unwrap_or_default());
    ctrl.set_level(level).await?;
    ctrl.search(fen, moves).await?;

    let budget = Duration::from_millis(u64::from(level.movetime_ms())) + config::get_search_grace();
    let reply = tokio::time::timeout(budget, rx.recv()).await;
    ctrl.exit().await?;

    match reply {
        Ok(Some(EngineReply::Move(mv))) => println!("{}", mv),
        Ok(Some(EngineReply::Drop(drop))) => println!("{}", drop),
        Ok(None) => return Err(CliError::HostClosed.into()),
        Err(_) => return Err(CliError::SearchTimedOut(budget).into()),
    }
    Ok(())
}

async fn dry_run(args: &EngineArgs, level: Level) -> anyhow::Result<()> {
    let transport = ScriptedTransport::with_handshake("dry-run");
    let log = transport.log();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut ctrl = GameController::new(
        transport,
        args.controller_config(),
        Arc::new(ChannelHost { tx }),
    );

    ctrl.init().await?;
    ctrl.set_level(level).await?;
    ctrl.search(START_FEN, Vec::<String>::new()).await?;
    ctrl.exit().await?;

    for command in log.commands() {
        println!("{}", command);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Probe => probe(&cli.engine).await,
        Commands::Search { fen, moves, level } => search(&cli.engine, &fen, &moves, level).await,
        Commands::Options { level } => dry_run(&cli.engine, level).await,
    }
}
