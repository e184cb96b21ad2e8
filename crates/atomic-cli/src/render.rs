//! Plain-text rendering for the terminal.

use std::collections::BTreeSet;
use std::fmt::Write;

use atomic_rules::{AtomicPosition, GameStatus};
use atomic_session::MoveReport;
use chess_core::{File, Rank, Square};

/// The board from White's side. Squares emptied by the last explosion show
/// as `*`.
pub fn board(position: &AtomicPosition, exploded: &[Square]) -> String {
    let mut out = String::new();
    for rank in Rank::ALL.iter().rev() {
        let _ = write!(out, "{} |", rank);
        for file in File::ALL {
            let sq = Square::new(file, *rank);
            let c = match position.piece_at(sq) {
                Some((piece, color)) => piece.to_fen_char(color),
                None if exploded.contains(&sq) => '*',
                None => '.',
            };
            let _ = write!(out, " {}", c);
        }
        out.push('\n');
    }
    out.push_str("    a b c d e f g h");
    out
}

/// One line per move: the move, what blew up and how the game stands.
pub fn move_line(report: &MoveReport) -> String {
    let mut line = report.mv.to_string();
    if !report.exploded.is_empty() {
        let squares: Vec<String> = report.exploded.iter().map(|sq| sq.to_string()).collect();
        let _ = write!(line, ", exploded {}", squares.join(" "));
    }
    if report.status.is_over() {
        let _ = write!(line, "; {}", status_line(report.status));
    }
    line
}

pub fn status_line(status: GameStatus) -> String {
    match status {
        GameStatus::Ongoing => "game in progress".to_string(),
        GameStatus::Over {
            winner: Some(winner),
            reason,
        } => format!("{} {} wins by {}", status.result_string(), winner, reason),
        GameStatus::Over {
            winner: None,
            reason,
        } => format!("{} draw by {}", status.result_string(), reason),
    }
}

pub fn destinations(square: &str, targets: &BTreeSet<Square>) -> String {
    if targets.is_empty() {
        return format!("{}: no legal moves", square);
    }
    let targets: Vec<String> = targets.iter().map(|sq| sq.to_string()).collect();
    format!("{}: {}", square, targets.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomic_rules::TerminalReason;
    use chess_core::Color;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn startpos_board() {
        let text = board(&AtomicPosition::new(), &[]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "8 | r n b q k b n r");
        assert_eq!(lines[4], "4 | . . . . . . . .");
        assert_eq!(lines[7], "1 | R N B Q K B N R");
        assert_eq!(lines[8], "    a b c d e f g h");
    }

    #[test]
    fn exploded_squares_are_marked() {
        let position = AtomicPosition::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let text = board(&position, &[sq("d5"), sq("e1")]);
        assert_eq!(text.lines().nth(3), Some("5 | . . . * . . . ."));
        // An occupied square shows its piece.
        assert_eq!(text.lines().nth(7), Some("1 | . . . . K . . ."));
    }

    #[test]
    fn status_lines() {
        assert_eq!(
            status_line(GameStatus::win(Color::White, TerminalReason::KingDestroyed)),
            "1-0 White wins by king_destroyed"
        );
        assert_eq!(
            status_line(GameStatus::draw(TerminalReason::Stalemate)),
            "1/2-1/2 draw by stalemate"
        );
    }

    #[test]
    fn destination_lists() {
        let targets: BTreeSet<Square> = [sq("h3"), sq("f3")].into_iter().collect();
        assert_eq!(destinations("g1", &targets), "g1: f3 h3");
        assert_eq!(destinations("e4", &BTreeSet::new()), "e4: no legal moves");
    }
}
