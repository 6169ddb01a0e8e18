//! Async control adapter for UCI chess engines.
//!
//! The adapter does not play chess. It starts an engine process, runs the
//! `uci` handshake and `isready` barriers, maps an abstract difficulty level
//! and a game variant onto engine options, sends searches, and hands the
//! engine's `bestmove` back to the host.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockfish_adapter::{
//!     ControllerConfig, EngineFlavor, EngineHost, GameController, Level, Platform,
//!     ProcessTransport, Variant,
//! };
//!
//! struct PrintHost;
//!
//! impl EngineHost for PrintHost {
//!     fn on_engine_move(&self, mv: &str) {
//!         println!("engine plays {}", mv);
//!     }
//!     fn on_engine_drop(&self, drop: &str) {
//!         println!("engine drops {}", drop);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = ProcessTransport::locate(EngineFlavor::Variants)?;
//!     let config = ControllerConfig::new(Variant::Standard, Platform::Desktop);
//!     let mut controller = GameController::new(transport, config, Arc::new(PrintHost));
//!
//!     controller.init().await?;
//!     controller.set_level(Level::new(4)?).await?;
//!     controller
//!         .search("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", ["e2e4"])
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod options;
pub mod platform;
pub mod session;
pub mod strength;
pub mod transport;
pub mod uci;
pub mod variant;

pub use bus::{Flow, LineBus, LineListener, Subscription};
pub use config::{threads_for_cores, ControllerConfig, HostResources};
pub use controller::{ControllerState, EngineHost, GameController};
pub use error::{EngineError, EngineResult};
pub use options::{EngineOption, OptionValue};
pub use platform::{EngineFlavor, Platform, PlatformPolicy};
pub use session::{EngineIdentity, EngineSession, WaitKind, DEFAULT_ENGINE_NAME};
pub use strength::{strength_option, Level};
pub use transport::{EngineTransport, ProcessTransport, ScriptedTransport, SentLog};
pub use variant::{variant_option, Variant};
