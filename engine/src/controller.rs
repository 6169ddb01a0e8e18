//! Game controller: drives one engine across a game.
//!
//! ```text
//! Uninitialized --init--> Initializing --> Ready <--search/bestmove--> Searching
//!        ^                     |                \
//!        +------ failure ------+                 +--exit--> Exited
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::bus::{Flow, Subscription};
use crate::config::{ControllerConfig, HostResources};
use crate::error::{EngineError, EngineResult};
use crate::options::{UCI_ANALYSE_MODE, UCI_LIMIT_STRENGTH};
use crate::platform::PlatformPolicy;
use crate::session::EngineSession;
use crate::strength::{strength_option, Level};
use crate::transport::EngineTransport;
use crate::uci::{self, BestMove, EngineLine};

/// Callbacks into the host application.
///
/// Called from whichever task reads the engine's output, so they should hand
/// the move off rather than call back into the controller.
pub trait EngineHost: Send + Sync {
    /// The engine picked a regular move, e.g. `e2e4` or `e7e8q`.
    fn on_engine_move(&self, mv: &str);

    /// The engine picked a piece drop, e.g. `N@f3`.
    fn on_engine_drop(&self, drop: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Initializing,
    Ready,
    Searching,
    Exited,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Uninitialized => "uninitialized",
            ControllerState::Initializing => "initializing",
            ControllerState::Ready => "ready",
            ControllerState::Searching => "searching",
            ControllerState::Exited => "exited",
        };
        f.write_str(name)
    }
}

pub struct GameController<T: EngineTransport> {
    session: EngineSession<T>,
    host: Arc<dyn EngineHost>,
    policy: Arc<dyn PlatformPolicy>,
    resources: HostResources,
    handshake_timeout: Option<Duration>,
    level: Level,
    /// Level was set before `init` and still has to be pushed.
    level_pending: bool,
    state: Arc<Mutex<ControllerState>>,
    move_listener: Option<Subscription>,
    engine_name: Option<String>,
}

impl<T: EngineTransport> GameController<T> {
    pub fn new(transport: T, config: ControllerConfig, host: Arc<dyn EngineHost>) -> Self {
        let session = EngineSession::new(transport, config.variant, Arc::clone(&config.platform));
        Self {
            session,
            host,
            policy: config.platform,
            resources: config.resources,
            handshake_timeout: config.handshake_timeout,
            level: Level::default(),
            level_pending: false,
            state: Arc::new(Mutex::new(ControllerState::Uninitialized)),
            move_listener: None,
            engine_name: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Name reported during the last successful handshake.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    pub fn session(&self) -> &EngineSession<T> {
        &self.session
    }

    /// Start and configure the engine. Does nothing once initialized.
    ///
    /// On failure everything done so far is undone, the error is logged and
    /// returned, and the controller is back to `Uninitialized` so `init` can
    /// be retried from the top.
    #[tracing::instrument(level = "info", skip(self), fields(variant = %self.session.variant()))]
    pub async fn init(&mut self) -> EngineResult<()> {
        match self.state() {
            ControllerState::Uninitialized => {}
            ControllerState::Exited => return Err(EngineError::Exited),
            state => {
                tracing::debug!("Engine already initialized ({})", state);
                return Ok(());
            }
        }

        self.set_state(ControllerState::Initializing);
        match self.run_init().await {
            Ok(()) => {
                self.set_state(ControllerState::Ready);
                tracing::info!("Engine initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Engine initialization failed: {}", e);
                self.detach_move_listener();
                if self.session.is_started() {
                    if let Err(exit_err) = self.session.exit().await {
                        tracing::warn!("Failed to stop engine after failed init: {}", exit_err);
                    }
                }
                self.set_state(ControllerState::Uninitialized);
                Err(e)
            }
        }
    }

    async fn run_init(&mut self) -> EngineResult<()> {
        let identity = self.session.start(self.handshake_timeout).await?;
        self.engine_name = Some(identity.engine_name);
        self.attach_move_listener();

        self.session.set_variant().await?;
        self.session
            .apply_option(&self.resources.threads_option())
            .await?;
        if self.policy.applies_memory_option() {
            self.session.apply_option(&self.resources.hash_option()).await?;
        }

        self.new_game_sequence().await?;

        if self.level_pending {
            self.push_strength().await?;
            self.level_pending = false;
        }
        Ok(())
    }

    /// Reset the engine for a new game.
    pub async fn new_game(&mut self) -> EngineResult<()> {
        match self.state() {
            ControllerState::Ready | ControllerState::Searching => {}
            ControllerState::Exited => return Err(EngineError::Exited),
            state => {
                return Err(EngineError::InvalidState {
                    op: "start a new game",
                    state,
                })
            }
        }
        self.new_game_sequence().await
    }

    async fn new_game_sequence(&mut self) -> EngineResult<()> {
        self.session.send(uci::UCI_NEW_GAME).await?;
        // The engine must acknowledge the reset before any option is trusted.
        self.session.await_ready(self.handshake_timeout).await?;
        self.session.set_option(UCI_ANALYSE_MODE, false).await?;
        self.session.set_option(UCI_LIMIT_STRENGTH, true).await
    }

    /// Ask for a move in the position reached from `fen` by `moves`.
    ///
    /// Returns once the commands are sent; the move arrives through the
    /// [`EngineHost`] callbacks.
    pub async fn search<I, S>(&mut self, fen: &str, moves: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self.state() {
            ControllerState::Ready => {}
            ControllerState::Exited => return Err(EngineError::Exited),
            state => return Err(EngineError::InvalidState { op: "search", state }),
        }

        self.session.send(&uci::position_command(fen, moves)).await?;

        // Searching before `go`: a fast engine can answer while it is sent.
        self.set_state(ControllerState::Searching);
        let go = uci::go_command(self.level.movetime_ms(), self.level.search_depth());
        if let Err(e) = self.session.send(&go).await {
            self.set_state(ControllerState::Ready);
            return Err(e);
        }
        Ok(())
    }

    /// Store `level` for later searches and push its strength option.
    ///
    /// Before `init` the option is held back and pushed at the end of `init`.
    pub async fn set_level(&mut self, level: Level) -> EngineResult<()> {
        let state = self.state();
        if state == ControllerState::Exited {
            return Err(EngineError::Exited);
        }

        self.level = level;
        if state == ControllerState::Uninitialized {
            tracing::debug!("Engine not started, level {} applied at init", level);
            self.level_pending = true;
            return Ok(());
        }
        self.push_strength().await
    }

    async fn push_strength(&mut self) -> EngineResult<()> {
        let option = strength_option(self.level, self.policy.as_ref());
        tracing::info!("Setting level {} ({})", self.level, option);
        self.session.apply_option(&option).await
    }

    /// Stop listening for moves and terminate the engine. Terminal.
    pub async fn exit(&mut self) -> EngineResult<()> {
        if self.state() == ControllerState::Exited {
            return Err(EngineError::Exited);
        }
        self.detach_move_listener();
        self.set_state(ControllerState::Exited);
        tracing::info!("Exiting engine");
        self.session.exit().await
    }

    fn set_state(&self, state: ControllerState) {
        *self.state.lock() = state;
    }

    fn attach_move_listener(&mut self) {
        if self.move_listener.is_some() {
            return;
        }
        let state = Arc::clone(&self.state);
        let host = Arc::clone(&self.host);
        let listener = move |line: &str| {
            if let Some(EngineLine::BestMove(best)) = uci::parse_line(line) {
                {
                    let mut state = state.lock();
                    if *state == ControllerState::Searching {
                        *state = ControllerState::Ready;
                    }
                }
                match best {
                    BestMove::Move(mv) => host.on_engine_move(&mv),
                    BestMove::PieceDrop(drop) => host.on_engine_drop(&drop),
                    BestMove::NoMove => tracing::info!("Engine has no move: {}", line),
                }
            }
            Flow::Continue
        };
        self.move_listener = Some(self.session.bus().subscribe(listener));
    }

    fn detach_move_listener(&mut self) {
        if let Some(sub) = self.move_listener.take() {
            self.session.bus().unsubscribe(sub);
        }
    }
}
