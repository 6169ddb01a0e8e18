//! Protocol session: command sequencing and handshake waits for one engine.
//!
//! Operations that need an answer from the engine (`uciok`, `readyok`)
//! register a pending wait keyed by [`WaitKind`]. A single dispatcher
//! listener on the session's [`LineBus`] resolves waits as matching lines
//! arrive and records the engine's self-reported name.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::bus::{Flow, LineBus, LineListener, Subscription};
use crate::error::{EngineError, EngineResult};
use crate::options::EngineOption;
use crate::platform::PlatformPolicy;
use crate::transport::EngineTransport;
use crate::uci::{self, EngineLine};
use crate::variant::{variant_option, Variant};

/// Name reported when the engine never sends `id name`.
pub const DEFAULT_ENGINE_NAME: &str = "Stockfish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
    /// Handshake complete.
    UciOk,
    /// Ready barrier satisfied.
    ReadyOk,
}

impl WaitKind {
    const ALL: [WaitKind; 2] = [WaitKind::UciOk, WaitKind::ReadyOk];

    pub fn token(self) -> &'static str {
        match self {
            WaitKind::UciOk => uci::UCI_OK,
            WaitKind::ReadyOk => uci::READY_OK,
        }
    }

    fn matches(self, line: &EngineLine) -> bool {
        matches!(
            (self, line),
            (WaitKind::UciOk, EngineLine::UciOk) | (WaitKind::ReadyOk, EngineLine::ReadyOk)
        )
    }
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Result of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    pub engine_name: String,
}

#[derive(Default)]
struct Waits {
    pending: HashMap<WaitKind, oneshot::Sender<()>>,
    engine_name: Option<String>,
}

impl Waits {
    fn register(&mut self, kind: WaitKind) -> EngineResult<oneshot::Receiver<()>> {
        if self.pending.contains_key(&kind) {
            return Err(EngineError::WaitPending(kind));
        }
        let (tx, rx) = oneshot::channel();
        self.pending.insert(kind, tx);
        Ok(rx)
    }
}

/// Bus listener resolving the session's waits.
struct Dispatcher {
    waits: Arc<Mutex<Waits>>,
}

impl LineListener for Dispatcher {
    fn on_line(&mut self, line: &str) -> Flow {
        tracing::debug!("UCI << {}", line);

        let Some(parsed) = uci::parse_line(line) else {
            return Flow::Continue;
        };

        let mut waits = self.waits.lock();
        if let EngineLine::IdName(name) = &parsed {
            waits.engine_name = Some(name.clone());
        }
        for kind in WaitKind::ALL {
            if kind.matches(&parsed) {
                if let Some(tx) = waits.pending.remove(&kind) {
                    let _ = tx.send(());
                }
            }
        }
        Flow::Continue
    }

    fn on_close(&mut self) {
        let abandoned = std::mem::take(&mut self.waits.lock().pending);
        if !abandoned.is_empty() {
            tracing::warn!("Engine output ended with {} pending wait(s)", abandoned.len());
        }
    }
}

/// Drops a wait if the waiting future goes away (timeout or cancellation).
struct WaitGuard {
    waits: Arc<Mutex<Waits>>,
    kind: WaitKind,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.waits.lock().pending.remove(&self.kind);
    }
}

/// One engine process bound to one variant.
pub struct EngineSession<T: EngineTransport> {
    transport: T,
    bus: LineBus,
    waits: Arc<Mutex<Waits>>,
    dispatcher: Option<Subscription>,
    variant: Variant,
    policy: Arc<dyn PlatformPolicy>,
    options: BTreeMap<String, String>,
    started: bool,
}

impl<T: EngineTransport> fmt::Debug for EngineSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("variant", &self.variant)
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("started", &self.started)
            .finish()
    }
}

impl<T: EngineTransport> EngineSession<T> {
    pub fn new(transport: T, variant: Variant, policy: Arc<dyn PlatformPolicy>) -> Self {
        Self {
            transport,
            bus: LineBus::new(),
            waits: Arc::new(Mutex::new(Waits::default())),
            dispatcher: None,
            variant,
            policy,
            options: BTreeMap::new(),
            started: false,
        }
    }

    /// Handle to the line bus of the current engine process. Replaced on
    /// every [`start`](Self::start).
    pub fn bus(&self) -> LineBus {
        self.bus.clone()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn policy(&self) -> &dyn PlatformPolicy {
        self.policy.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Options sent so far, last write wins.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start the engine and run the `uci` handshake.
    ///
    /// Resolves once `uciok` arrives. The name comes from the last
    /// `id name` line seen before it, or [`DEFAULT_ENGINE_NAME`].
    #[tracing::instrument(level = "info", skip(self), fields(variant = %self.variant))]
    pub async fn start(&mut self, timeout: Option<Duration>) -> EngineResult<EngineIdentity> {
        self.attach_dispatcher();
        let rx = self.register_wait(WaitKind::UciOk)?;
        let guard = self.guard(WaitKind::UciOk);
        self.waits.lock().engine_name = None;

        self.transport.start(self.bus.clone()).await?;
        self.started = true;
        self.send(uci::UCI).await?;
        Self::wait_for(WaitKind::UciOk, rx, timeout).await?;
        drop(guard);

        let engine_name = self
            .waits
            .lock()
            .engine_name
            .clone()
            .unwrap_or_else(|| DEFAULT_ENGINE_NAME.to_string());
        tracing::info!("Handshake complete with {}", engine_name);
        Ok(EngineIdentity { engine_name })
    }

    /// Send `isready` and wait for `readyok`.
    pub async fn await_ready(&mut self, timeout: Option<Duration>) -> EngineResult<()> {
        let rx = self.register_wait(WaitKind::ReadyOk)?;
        let _guard = self.guard(WaitKind::ReadyOk);
        self.send(uci::IS_READY).await?;
        Self::wait_for(WaitKind::ReadyOk, rx, timeout).await
    }

    pub async fn send(&mut self, command: &str) -> EngineResult<()> {
        tracing::debug!("UCI >> {}", command);
        self.transport.send(command).await
    }

    /// `setoption name <name> value <value>`. The engine does not acknowledge.
    pub async fn set_option(
        &mut self,
        name: &str,
        value: impl fmt::Display,
    ) -> EngineResult<()> {
        let value = value.to_string();
        self.send(&uci::setoption_command(name, &value)).await?;
        self.options.insert(name.to_string(), value);
        Ok(())
    }

    pub async fn apply_option(&mut self, option: &EngineOption) -> EngineResult<()> {
        self.set_option(option.name, &option.value).await
    }

    /// Select the session's variant: `UCI_Variant` for true variants,
    /// `UCI_Chess960` otherwise.
    pub async fn set_variant(&mut self) -> EngineResult<()> {
        let option = variant_option(self.variant, self.policy.as_ref());
        tracing::info!("Selecting variant {} ({})", self.variant, option);
        self.apply_option(&option).await
    }

    /// Tell the engine to terminate. Pending waits are abandoned.
    pub async fn exit(&mut self) -> EngineResult<()> {
        if let Some(sub) = self.dispatcher.take() {
            self.bus.unsubscribe(sub);
        }
        self.waits.lock().pending.clear();
        self.started = false;
        self.transport.exit().await
    }

    /// Each engine process gets a fresh bus, so a previous process's reader
    /// can only ever close the bus it was given.
    fn attach_dispatcher(&mut self) {
        if let Some(sub) = self.dispatcher.take() {
            self.bus.unsubscribe(sub);
        }
        self.bus = LineBus::new();
        let dispatcher = Dispatcher {
            waits: Arc::clone(&self.waits),
        };
        self.dispatcher = Some(self.bus.subscribe(dispatcher));
    }

    fn register_wait(&self, kind: WaitKind) -> EngineResult<oneshot::Receiver<()>> {
        if self.bus.is_closed() {
            return Err(EngineError::SessionClosed);
        }
        self.waits.lock().register(kind)
    }

    fn guard(&self, kind: WaitKind) -> WaitGuard {
        WaitGuard {
            waits: Arc::clone(&self.waits),
            kind,
        }
    }

    async fn wait_for(
        kind: WaitKind,
        rx: oneshot::Receiver<()>,
        timeout: Option<Duration>,
    ) -> EngineResult<()> {
        let received = match timeout {
            Some(after) => match tokio::time::timeout(after, rx).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::error!("Timed out after {:?} waiting for {}", after, kind);
                    return Err(EngineError::HandshakeTimedOut { kind, after });
                }
            },
            None => rx.await,
        };
        received.map_err(|_| EngineError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::transport::ScriptedTransport;

    fn session(transport: ScriptedTransport, variant: Variant) -> EngineSession<ScriptedTransport> {
        EngineSession::new(transport, variant, Arc::new(Platform::Desktop))
    }

    #[tokio::test]
    async fn test_start_reports_engine_name() {
        let mut s = session(ScriptedTransport::with_handshake("TestEngine"), Variant::Standard);
        let identity = s.start(None).await.unwrap();
        assert_eq!(identity.engine_name, "TestEngine");
        assert!(s.is_started());
    }

    #[tokio::test]
    async fn test_start_without_id_uses_default_name() {
        let transport = ScriptedTransport::new().reply("uci", ["uciok"]);
        let mut s = session(transport, Variant::Standard);
        let identity = s.start(None).await.unwrap();
        assert_eq!(identity.engine_name, DEFAULT_ENGINE_NAME);
    }

    #[tokio::test]
    async fn test_start_times_out_without_uciok() {
        let transport = ScriptedTransport::new().reply("uci", ["id name Mute"]);
        let mut s = session(transport, Variant::Standard);
        let result = s.start(Some(Duration::from_millis(20))).await;
        assert!(matches!(
            result,
            Err(EngineError::HandshakeTimedOut {
                kind: WaitKind::UciOk,
                ..
            })
        ));
        assert!(s.waits.lock().pending.is_empty());
    }

    #[tokio::test]
    async fn test_await_ready_resolves_only_on_readyok() {
        let mut s = session(ScriptedTransport::new().reply("uci", ["uciok"]), Variant::Standard);
        s.start(None).await.unwrap();
        let bus = s.bus();

        let early = s.await_ready(Some(Duration::from_millis(20))).await;
        assert!(matches!(early, Err(EngineError::HandshakeTimedOut { .. })));

        let publisher = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            bus.publish("info string still thinking");
            bus.publish("readyok");
        };
        let (ready, ()) = tokio::join!(s.await_ready(None), publisher);
        assert!(ready.is_ok());
    }

    #[tokio::test]
    async fn test_wait_fails_when_engine_output_ends() {
        let mut s = session(ScriptedTransport::new().reply("uci", ["uciok"]), Variant::Standard);
        s.start(None).await.unwrap();
        let bus = s.bus();

        let closer = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            bus.close();
        };
        let (ready, ()) = tokio::join!(s.await_ready(None), closer);
        assert!(matches!(ready, Err(EngineError::SessionClosed)));
    }

    #[test]
    fn test_overlapping_wait_of_same_kind_is_rejected() {
        let mut waits = Waits::default();
        let _first = waits.register(WaitKind::ReadyOk).unwrap();
        assert!(matches!(
            waits.register(WaitKind::ReadyOk),
            Err(EngineError::WaitPending(WaitKind::ReadyOk))
        ));
        assert!(waits.register(WaitKind::UciOk).is_ok());
    }

    #[tokio::test]
    async fn test_set_option_records_last_value() {
        let transport = ScriptedTransport::with_handshake("TestEngine");
        let log = transport.log();
        let mut s = session(transport, Variant::Standard);
        s.start(None).await.unwrap();

        s.set_option("Skill Level", 3).await.unwrap();
        s.set_option("Skill Level", 11).await.unwrap();

        assert_eq!(s.options().get("Skill Level").map(String::as_str), Some("11"));
        assert_eq!(log.count("setoption name Skill Level value 3"), 1);
    }

    #[tokio::test]
    async fn test_set_variant_sends_variant_option() {
        let transport = ScriptedTransport::with_handshake("TestEngine");
        let log = transport.log();
        let mut s = session(transport, Variant::ThreeCheck);
        s.start(None).await.unwrap();
        s.set_variant().await.unwrap();
        assert_eq!(
            log.commands().last().map(String::as_str),
            Some("setoption name UCI_Variant value 3check")
        );
    }

    #[tokio::test]
    async fn test_exit_then_restart() {
        let transport = ScriptedTransport::with_handshake("TestEngine");
        let log = transport.log();
        let mut s = session(transport, Variant::Standard);
        s.start(None).await.unwrap();
        s.exit().await.unwrap();
        assert!(!s.is_started());

        let identity = s.start(None).await.unwrap();
        assert_eq!(identity.engine_name, "TestEngine");
        assert_eq!(log.count("uci"), 2);
    }
}
