//! In-memory transport that answers commands from a script.
//!
//! Replies are published on the bus while `send` runs, the same way a fast
//! engine would answer before the caller gets to its next step. Useful in
//! tests and for dry runs that show which commands a configuration sends.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::EngineTransport;
use crate::bus::LineBus;
use crate::error::{EngineError, EngineResult};
use crate::uci;

#[derive(Debug, Clone)]
struct Reply {
    prefix: String,
    lines: Vec<String>,
}

impl Reply {
    fn matches(&self, command: &str) -> bool {
        command
            .strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    }
}

/// Shared record of every command a [`ScriptedTransport`] was sent.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    commands: Arc<Mutex<Vec<String>>>,
}

impl SentLog {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands.lock().iter().filter(|c| *c == command).count()
    }

    /// Position of the first command equal to `command`.
    pub fn position(&self, command: &str) -> Option<usize> {
        self.commands.lock().iter().position(|c| c == command)
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }

    fn push(&self, command: &str) {
        self.commands.lock().push(command.to_string());
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Vec<Reply>,
    log: SentLog,
    bus: Option<LineBus>,
    failed_starts: usize,
}

impl ScriptedTransport {
    /// A transport that answers nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `uci` with `id name <name>` + `uciok` and `isready` with
    /// `readyok`.
    pub fn with_handshake(engine_name: &str) -> Self {
        Self::new()
            .reply(
                uci::UCI,
                [format!("id name {}", engine_name), uci::UCI_OK.to_string()],
            )
            .reply(uci::IS_READY, [uci::READY_OK])
    }

    /// Answer `prefix`, and every command whose leading words are `prefix`,
    /// with `lines`. The first matching reply wins.
    pub fn reply<I, S>(mut self, prefix: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies.push(Reply {
            prefix: prefix.to_string(),
            lines: lines.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Make the next `count` calls to `start` fail.
    pub fn failing_starts(mut self, count: usize) -> Self {
        self.failed_starts = count;
        self
    }

    pub fn log(&self) -> SentLog {
        self.log.clone()
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn start(&mut self, bus: LineBus) -> EngineResult<()> {
        if self.failed_starts > 0 {
            self.failed_starts -= 1;
            return Err(EngineError::Spawn("scripted start failure".to_string()));
        }
        self.bus = Some(bus);
        Ok(())
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        let bus = self.bus.as_ref().ok_or(EngineError::NotStarted)?;
        self.log.push(command);

        if let Some(reply) = self
            .replies
            .iter()
            .find(|reply| reply.matches(command))
        {
            for line in &reply.lines {
                bus.publish(line);
            }
        }
        Ok(())
    }

    async fn exit(&mut self) -> EngineResult<()> {
        self.log.push(uci::QUIT);
        if let Some(bus) = self.bus.take() {
            bus.close();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Flow;

    #[tokio::test]
    async fn test_replies_are_published_during_send() {
        let bus = LineBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |line: &str| {
            sink.lock().push(line.to_string());
            Flow::Continue
        });

        let mut transport = ScriptedTransport::with_handshake("TestEngine");
        let log = transport.log();
        transport.start(bus).await.unwrap();
        transport.send("uci").await.unwrap();
        transport.send("ucinewgame").await.unwrap();

        assert_eq!(*seen.lock(), vec!["id name TestEngine", "uciok"]);
        // `ucinewgame` is not an answer to `uci`.
        assert_eq!(log.commands(), vec!["uci", "ucinewgame"]);
    }

    #[tokio::test]
    async fn test_send_requires_start() {
        let mut transport = ScriptedTransport::new();
        assert!(matches!(
            transport.send("uci").await,
            Err(EngineError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_exit_closes_bus() {
        let bus = LineBus::new();
        let mut transport = ScriptedTransport::new();
        transport.start(bus.clone()).await.unwrap();
        transport.exit().await.unwrap();
        assert!(bus.is_closed());
        assert_eq!(transport.log().commands(), vec!["quit"]);
    }

    #[tokio::test]
    async fn test_failing_starts() {
        let mut transport = ScriptedTransport::new().failing_starts(1);
        assert!(transport.start(LineBus::new()).await.is_err());
        assert!(transport.start(LineBus::new()).await.is_ok());
    }
}
