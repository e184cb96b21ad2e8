//! FEN (Forsyth-Edwards Notation) parsing and serialization.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{Color, File, Piece, Rank, Square};

/// The standard starting position.
pub const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling letters in the order [`Fen::castling`] stores them.
pub const CASTLING_LETTERS: [char; 4] = ['K', 'Q', 'k', 'q'];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 4 or 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastlingRights(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassantSquare(String),

    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
}

/// A position as written in FEN, field by field.
///
/// Only the notation is checked here. Whether the board makes sense as a
/// game (king counts, pawns on the back rank) is left to the engine. Boards
/// without a king parse, since a destroyed king is a reachable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    /// Indexed by [`Square::index`].
    pub board: [Option<(Piece, Color)>; 64],
    pub side_to_move: Color,
    /// One flag per entry of [`CASTLING_LETTERS`].
    pub castling: [bool; 4],
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Fen {
    /// Parses the six-field form or the four-field form without clocks,
    /// which reads as `0 1`.
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let (board, side, castling, en_passant, clocks) = match fields.as_slice() {
            [board, side, castling, ep] => (*board, *side, *castling, *ep, None),
            [board, side, castling, ep, half, full] => {
                (*board, *side, *castling, *ep, Some((*half, *full)))
            }
            other => return Err(FenError::InvalidPartCount(other.len())),
        };

        let (halfmove_clock, fullmove_number) = match clocks {
            Some((half, full)) => (parse_halfmove(half)?, parse_fullmove(full)?),
            None => (0, 1),
        };

        Ok(Fen {
            board: parse_board(board)?,
            side_to_move: parse_side(side)?,
            castling: parse_castling(castling)?,
            en_passant: parse_en_passant(en_passant)?,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// The piece placement field alone.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for rank in Rank::ALL.iter().rev() {
            let mut empty = 0u8;
            for file in File::ALL {
                match self.board[Square::new(file, *rank).index() as usize] {
                    Some((piece, color)) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if *rank != Rank::R1 {
                out.push('/');
            }
        }
        out
    }

    fn castling_field(&self) -> String {
        let field: String = CASTLING_LETTERS
            .iter()
            .zip(self.castling)
            .filter_map(|(&letter, allowed)| allowed.then_some(letter))
            .collect();
        if field.is_empty() {
            "-".to_string()
        } else {
            field
        }
    }
}

fn parse_board(field: &str) -> Result<[Option<(Piece, Color)>; 64], FenError> {
    let rows: Vec<&str> = field.split('/').collect();
    if rows.len() != 8 {
        return Err(FenError::InvalidPiecePlacement(format!(
            "expected 8 ranks, got {}",
            rows.len()
        )));
    }

    let mut board = [None; 64];
    for (rank, row) in Rank::ALL.iter().rev().zip(rows) {
        let mut file = 0u8;
        for c in row.chars() {
            let run = match c {
                '1'..='8' => c as u8 - b'0',
                _ => {
                    let occupant = Piece::from_fen_char(c).ok_or_else(|| {
                        FenError::InvalidPiecePlacement(format!(
                            "invalid character '{}' in rank {}",
                            c, rank
                        ))
                    })?;
                    if let Some(file) = File::from_index(file) {
                        board[Square::new(file, *rank).index() as usize] = Some(occupant);
                    }
                    1
                }
            };
            file += run;
            if file > 8 {
                break;
            }
        }
        if file != 8 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "rank {} does not cover 8 squares",
                rank
            )));
        }
    }
    Ok(board)
}

fn parse_side(field: &str) -> Result<Color, FenError> {
    match field {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        other => Err(FenError::InvalidActiveColor(other.to_string())),
    }
}

fn parse_castling(field: &str) -> Result<[bool; 4], FenError> {
    let mut rights = [false; 4];
    if field == "-" {
        return Ok(rights);
    }
    for c in field.chars() {
        let slot = CASTLING_LETTERS
            .iter()
            .position(|&letter| letter == c)
            .ok_or_else(|| FenError::InvalidCastlingRights(format!("invalid character '{}'", c)))?;
        rights[slot] = true;
    }
    Ok(rights)
}

fn parse_en_passant(field: &str) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }
    match Square::from_algebraic(field) {
        Some(sq) if matches!(sq.rank(), Rank::R3 | Rank::R6) => Ok(Some(sq)),
        _ => Err(FenError::InvalidEnPassantSquare(field.to_string())),
    }
}

fn parse_halfmove(field: &str) -> Result<u32, FenError> {
    field
        .parse()
        .map_err(|_| FenError::InvalidHalfmoveClock(field.to_string()))
}

fn parse_fullmove(field: &str) -> Result<u32, FenError> {
    match field.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FenError::InvalidFullmoveNumber(field.to_string())),
    }
}

impl FromStr for Fen {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fen::parse(s)
    }
}

impl fmt::Display for Fen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let en_passant = self
            .en_passant
            .map_or_else(|| "-".to_string(), Square::to_algebraic);
        write!(
            f,
            "{} {} {} {} {} {}",
            self.placement(),
            self.side_to_move.fen_char(),
            self.castling_field(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn startpos_fields() {
        let fen = Fen::parse(STARTPOS).unwrap();
        assert_eq!(fen.side_to_move, Color::White);
        assert_eq!(fen.castling, [true; 4]);
        assert_eq!(fen.en_passant, None);
        assert_eq!(fen.board[Square::E1.index() as usize], Some((Piece::King, Color::White)));
        assert_eq!(fen.board[Square::D8.index() as usize], Some((Piece::Queen, Color::Black)));
        assert_eq!(fen.board.iter().flatten().count(), 32);
        assert_eq!(fen.to_string(), STARTPOS);
    }

    #[test]
    fn writes_back_what_it_read() {
        for text in [
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 12 40",
            "8/5k2/2b1p3/3n4/4R3/8/8/K2Q4 w - - 0 1",
        ] {
            assert_eq!(text.parse::<Fen>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn castling_letters_are_normalized() {
        let fen = Fen::parse("r3k2r/8/8/8/8/8/8/R3K2R w qK - 0 1").unwrap();
        assert_eq!(fen.castling, [true, false, false, true]);
        assert!(fen.to_string().contains(" Kq "));
    }

    #[test]
    fn clocks_default_in_the_short_form() {
        let fen = Fen::parse("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(fen.side_to_move, Color::Black);
        assert_eq!((fen.halfmove_clock, fen.fullmove_number), (0, 1));
        assert_eq!(fen.to_string(), "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn kingless_board() {
        let fen = Fen::parse("8/8/8/8/8/8/8/4K3 w - - 3 40").unwrap();
        assert_eq!(fen.board.iter().flatten().count(), 1);
        assert_eq!(fen.fullmove_number, 40);
    }

    #[test]
    fn en_passant_square() {
        let fen = Fen::parse("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        assert_eq!(fen.en_passant, Some(sq("d6")));
    }

    #[test]
    fn field_count() {
        assert_eq!(Fen::parse("invalid"), Err(FenError::InvalidPartCount(1)));
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 w - - 0"),
            Err(FenError::InvalidPartCount(5))
        );
    }

    #[test]
    fn bad_placement() {
        for text in [
            "8/8/8/8/8/8/8 w - - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPXPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "7/8/8/8/8/8/8/8 w - - 0 1",
            "80/8/8/8/8/8/8/8 w - - 0 1",
            "44k/8/8/8/8/8/8/8 w - - 0 1",
        ] {
            assert!(
                matches!(Fen::parse(text), Err(FenError::InvalidPiecePlacement(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn bad_side_and_castling() {
        assert!(matches!(
            Fen::parse("8/8/8/8/8/8/8/8 x - - 0 1"),
            Err(FenError::InvalidActiveColor(_))
        ));
        assert!(matches!(
            Fen::parse("8/8/8/8/8/8/8/8 w KX - 0 1"),
            Err(FenError::InvalidCastlingRights(_))
        ));
    }

    #[test]
    fn bad_en_passant() {
        for ep in ["abc", "i3", "e4", "e"] {
            let text = format!("8/8/8/8/8/8/8/8 w - {} 0 1", ep);
            assert!(
                matches!(Fen::parse(&text), Err(FenError::InvalidEnPassantSquare(_))),
                "{}",
                ep
            );
        }
    }

    #[test]
    fn bad_clocks() {
        assert!(matches!(
            Fen::parse("8/8/8/8/8/8/8/8 w - - x 1"),
            Err(FenError::InvalidHalfmoveClock(_))
        ));
        assert!(matches!(
            Fen::parse("8/8/8/8/8/8/8/8 w - - 0 0"),
            Err(FenError::InvalidFullmoveNumber(_))
        ));
        assert!(matches!(
            Fen::parse("8/8/8/8/8/8/8/8 w - - 0 -3"),
            Err(FenError::InvalidFullmoveNumber(_))
        ));
    }
}
