use std::time::Duration;

use crate::controller::ControllerState;
use crate::session::WaitKind;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine not found (looked for {0})")]
    EngineNotFound(String),

    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine has no stdin")]
    NoStdin,

    #[error("Engine has no stdout")]
    NoStdout,

    #[error("Engine transport is not running")]
    NotStarted,

    #[error("Engine transport closed")]
    TransportClosed,

    #[error("Engine session closed while waiting")]
    SessionClosed,

    #[error("A {0} wait is already pending on this session")]
    WaitPending(WaitKind),

    #[error("Handshake timed out waiting for {kind} after {after:?}")]
    HandshakeTimedOut { kind: WaitKind, after: Duration },

    #[error("Invalid difficulty level: {0} (expected 1..=8)")]
    InvalidLevel(u8),

    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    #[error("Cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: ControllerState,
    },

    #[error("Engine controller has exited")]
    Exited,
}
