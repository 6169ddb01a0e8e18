//! The engine process boundary.
//!
//! A transport starts the engine, forwards command lines to it, and publishes
//! every line the engine prints on the session's [`LineBus`]. When the
//! engine's output ends the transport closes the bus.

pub mod process;
pub mod scripted;

pub use process::{find_engine_path, ProcessTransport};
pub use scripted::{ScriptedTransport, SentLog};

use async_trait::async_trait;

use crate::bus::LineBus;
use crate::error::EngineResult;

#[async_trait]
pub trait EngineTransport: Send {
    /// Start the engine. Output lines go to `bus` from here on.
    async fn start(&mut self, bus: LineBus) -> EngineResult<()>;

    /// Forward one command line (without trailing newline).
    async fn send(&mut self, command: &str) -> EngineResult<()>;

    /// Tell the engine to terminate. Does not wait for the process to exit.
    async fn exit(&mut self) -> EngineResult<()>;
}
