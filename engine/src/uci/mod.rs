pub mod commands;
pub mod parser;

pub use commands::{go_command, position_command, setoption_command};
pub use parser::{parse_line, BestMove, EngineLine};

/// Identification command opening the handshake.
pub const UCI: &str = "uci";
/// Readiness-check command.
pub const IS_READY: &str = "isready";
/// Game reset command; must be followed by a readiness check.
pub const UCI_NEW_GAME: &str = "ucinewgame";
/// Asks the engine process to terminate.
pub const QUIT: &str = "quit";

/// Token ending the handshake.
pub const UCI_OK: &str = "uciok";
/// Token answering a readiness check.
pub const READY_OK: &str = "readyok";
