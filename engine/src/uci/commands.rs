//! Outbound command formatting.

use std::fmt::Display;

/// `setoption name <name> value <value>`
pub fn setoption_command(name: &str, value: impl Display) -> String {
    format!("setoption name {} value {}", name, value)
}

/// `position fen <fen> moves <m1> <m2> ...`
///
/// The `moves` keyword is always present; with no moves the command ends
/// right after it.
pub fn position_command<I, S>(fen: &str, moves: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cmd = format!("position fen {} moves", fen);
    for mv in moves {
        cmd.push(' ');
        cmd.push_str(mv.as_ref());
    }
    cmd
}

/// `go movetime <ms> depth <d>`
pub fn go_command(movetime_ms: u32, depth: u8) -> String {
    format!("go movetime {} depth {}", movetime_ms, depth)
}
