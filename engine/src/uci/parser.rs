/// An engine output line the adapter understands.
///
/// Anything else the engine prints (`info`, `option`, `id author`, banners)
/// is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    /// `id name <name>`
    IdName(String),
    UciOk,
    ReadyOk,
    /// `bestmove <token> [ponder <token>]`
    BestMove(BestMove),
}

/// The move token of a `bestmove` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestMove {
    /// Square-pair move, optionally with a promotion piece (`e2e4`, `e7e8q`).
    Move(String),
    /// Piece drop (`N@f3`), used by crazyhouse-style variants.
    PieceDrop(String),
    /// Anything else, e.g. `(none)` when the engine has no legal move.
    NoMove,
}

const ID_NAME_PREFIX: &str = "id name ";

/// Parse one engine output line.
pub fn parse_line(line: &str) -> Option<EngineLine> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();

    match tokens.next()? {
        "uciok" if line == "uciok" => Some(EngineLine::UciOk),
        "readyok" if line == "readyok" => Some(EngineLine::ReadyOk),
        "id" => line
            .strip_prefix(ID_NAME_PREFIX)
            .map(|name| EngineLine::IdName(name.to_string())),
        "bestmove" => {
            let token = tokens.next()?;
            Some(EngineLine::BestMove(classify_best_move(token)))
        }
        _ => None,
    }
}

fn classify_best_move(token: &str) -> BestMove {
    if is_square_pair_move(token) {
        BestMove::Move(token.to_string())
    } else if is_drop_move(token) {
        BestMove::PieceDrop(token.to_string())
    } else {
        BestMove::NoMove
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_square_pair_move(token: &str) -> bool {
    (4..=5).contains(&token.len()) && token.chars().all(is_word_char)
}

fn is_drop_move(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('P' | 'N' | 'B' | 'R' | 'Q'))
        && chars.next() == Some('@')
        && chars.clone().count() == 2
        && chars.all(is_word_char)
}
