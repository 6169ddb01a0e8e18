use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;

use super::EngineTransport;
use crate::bus::LineBus;
use crate::error::{EngineError, EngineResult};
use crate::platform::EngineFlavor;
use crate::uci;

/// How long an exiting engine gets to quit on its own before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// Runs the engine as a child process speaking UCI over stdin/stdout.
#[derive(Debug)]
pub struct ProcessTransport {
    program: PathBuf,
    args: Vec<OsString>,
    child: Option<Child>,
    stdin_tx: Option<mpsc::Sender<String>>,
}

impl ProcessTransport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            child: None,
            stdin_tx: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Use the first engine of `flavor` found on this machine.
    pub fn locate(flavor: EngineFlavor) -> EngineResult<Self> {
        find_engine_path(flavor)
            .map(Self::new)
            .ok_or_else(|| EngineError::EngineNotFound(candidate_names(flavor).join(", ")))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_running(&self) -> bool {
        self.stdin_tx.is_some()
    }
}

#[async_trait]
impl EngineTransport for ProcessTransport {
    #[tracing::instrument(level = "info", skip(self, bus), fields(program = %self.program.display()))]
    async fn start(&mut self, bus: LineBus) -> EngineResult<()> {
        if self.is_running() {
            tracing::warn!("Engine already running, restarting");
            self.exit().await?;
        }

        tracing::debug!("Spawning engine process");
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::Spawn(e.to_string())
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(EngineError::NoStdout)?;

        tokio::spawn(read_output(stdout, bus));

        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(write_input(stdin, stdin_rx));

        self.child = Some(child);
        self.stdin_tx = Some(stdin_tx);
        tracing::info!("Engine process spawned");
        Ok(())
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        let tx = self.stdin_tx.as_ref().ok_or(EngineError::NotStarted)?;
        tx.send(format!("{}\n", command)).await.map_err(|e| {
            tracing::error!("Failed to queue command for engine: {}", e);
            EngineError::TransportClosed
        })
    }

    async fn exit(&mut self) -> EngineResult<()> {
        if let Some(tx) = self.stdin_tx.take() {
            tracing::info!("Sending quit command to engine");
            // The writer task stops once this sender is dropped.
            let _ = tx.send(format!("{}\n", uci::QUIT)).await;
        }

        if let Some(mut child) = self.child.take() {
            tokio::spawn(async move {
                if tokio::time::timeout(EXIT_GRACE, child.wait()).await.is_err() {
                    tracing::warn!("Engine did not exit within {:?}, killing it", EXIT_GRACE);
                    let _ = child.kill().await;
                }
            });
        }
        Ok(())
    }
}

async fn read_output(stdout: ChildStdout, bus: LineBus) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => bus.publish(line.trim()),
            Ok(None) => {
                tracing::info!("Engine stdout EOF - engine closed");
                break;
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                break;
            }
        }
    }
    bus.close();
}

async fn write_input(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
    while let Some(cmd) = rx.recv().await {
        if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
            tracing::error!("Failed to write to engine stdin: {}", e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            tracing::error!("Failed to flush engine stdin: {}", e);
            break;
        }
    }
    tracing::debug!("Engine stdin writer exiting");
}

fn candidate_names(flavor: EngineFlavor) -> &'static [&'static str] {
    match flavor {
        EngineFlavor::Standard => &["stockfish"],
        EngineFlavor::Variants => &["fairy-stockfish", "stockfish"],
    }
}

/// Find an engine executable in common install locations, then on `PATH`.
pub fn find_engine_path(flavor: EngineFlavor) -> Option<PathBuf> {
    const DIRS: [&str; 4] = ["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin", "/usr/games"];

    for name in candidate_names(flavor) {
        for dir in DIRS {
            let path = Path::new(dir).join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        if let Some(path) = search_path(name) {
            return Some(path);
        }
    }

    None
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
