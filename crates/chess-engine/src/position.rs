//! Chess position representation.

use chess_core::{Color, Fen, FenError, File, Move, MoveFlag, Piece, Rank, Square};

use crate::Bitboard;

/// Castling rights flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 0b0001;
    pub const WHITE_QUEENSIDE: u8 = 0b0010;
    pub const BLACK_KINGSIDE: u8 = 0b0100;
    pub const BLACK_QUEENSIDE: u8 = 0b1000;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub const fn new(flags: u8) -> Self {
        CastlingRights(flags & 0b1111)
    }

    const fn kingside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    const fn queenside_flag(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub const fn can_castle_kingside(self, color: Color) -> bool {
        self.0 & Self::kingside_flag(color) != 0
    }

    #[inline]
    pub const fn can_castle_queenside(self, color: Color) -> bool {
        self.0 & Self::queenside_flag(color) != 0
    }

    #[inline]
    pub fn remove_color(&mut self, color: Color) {
        self.0 &= !(Self::kingside_flag(color) | Self::queenside_flag(color));
    }

    #[inline]
    pub fn remove_kingside(&mut self, color: Color) {
        self.0 &= !Self::kingside_flag(color);
    }

    #[inline]
    pub fn remove_queenside(&mut self, color: Color) {
        self.0 &= !Self::queenside_flag(color);
    }

    /// Drops whatever right depends on a king or rook standing on `sq`.
    ///
    /// Called whenever a piece leaves or disappears from one of the six
    /// castling home squares.
    pub fn revoke_for_square(&mut self, sq: Square) {
        match sq {
            Square::E1 => self.remove_color(Color::White),
            Square::E8 => self.remove_color(Color::Black),
            Square::H1 => self.remove_kingside(Color::White),
            Square::A1 => self.remove_queenside(Color::White),
            Square::H8 => self.remove_kingside(Color::Black),
            Square::A8 => self.remove_queenside(Color::Black),
            _ => {}
        }
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Complete chess position state.
///
/// Equality and hashing are bit-for-bit over every field, so a position
/// restored by an undo compares equal to the snapshot taken before the move.
/// Either king may be missing; every query tolerates that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// Bitboards for each piece type, indexed by [`Piece::index`].
    pub pieces: [Bitboard; 6],

    /// Bitboards for each color's pieces.
    pub colors: [Bitboard; 2],

    pub side_to_move: Color,

    pub castling: CastlingRights,

    /// En passant target square (if any).
    pub en_passant: Option<Square>,

    /// Half-moves since the last pawn move or capture.
    pub halfmove_clock: u32,

    /// Starts at 1, increments after Black's move.
    pub fullmove_number: u32,
}

impl Position {
    /// Creates an empty board with White to move.
    pub fn empty() -> Self {
        Position {
            pieces: [Bitboard::EMPTY; 6],
            colors: [Bitboard::EMPTY; 2],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Creates the standard starting position.
    pub fn startpos() -> Self {
        let mut position = Position::empty();
        for (piece, file) in Piece::BACK_RANK.into_iter().zip(File::ALL) {
            position.put_piece(Square::new(file, Rank::R1), piece, Color::White);
            position.put_piece(Square::new(file, Rank::R2), Piece::Pawn, Color::White);
            position.put_piece(Square::new(file, Rank::R7), Piece::Pawn, Color::Black);
            position.put_piece(Square::new(file, Rank::R8), piece, Color::Black);
        }
        position.castling = CastlingRights::ALL;
        position
    }

    /// Creates a position from a FEN string.
    ///
    /// Boards without kings are accepted; boards with two kings of one color
    /// are not.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let position = Position::from(&Fen::parse(fen)?);

        for color in Color::ALL {
            if position.pieces_of(Piece::King, color).count() > 1 {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "more than one {} king",
                    color
                )));
            }
        }

        Ok(position)
    }

    /// Converts the position to a six-field FEN string.
    pub fn to_fen(&self) -> String {
        Fen::from(self).to_string()
    }

    /// Returns the piece and color at the given square, if any.
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        let color = Color::ALL
            .into_iter()
            .find(|color| self.colors[color.index()].contains(sq))?;
        Piece::ALL
            .into_iter()
            .find(|piece| self.pieces[piece.index()].contains(sq))
            .map(|piece| (piece, color))
    }

    /// Places a piece, replacing and returning any previous occupant.
    pub fn put_piece(&mut self, sq: Square, piece: Piece, color: Color) -> Option<(Piece, Color)> {
        let previous = self.remove_piece(sq);
        self.pieces[piece.index()].set(sq);
        self.colors[color.index()].set(sq);
        previous
    }

    /// Removes and returns the occupant of `sq`, if any.
    ///
    /// Only the board changes; castling rights and clocks are the caller's
    /// business.
    pub fn remove_piece(&mut self, sq: Square) -> Option<(Piece, Color)> {
        let occupant = self.piece_at(sq)?;
        self.pieces[occupant.0.index()].clear(sq);
        self.colors[occupant.1.index()].clear(sq);
        Some(occupant)
    }

    /// Returns the square of the given color's king, or `None` if it has
    /// been removed from the board.
    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(Piece::King, color).first()
    }

    /// Returns true if the move takes an enemy piece: the destination holds
    /// a piece of the other color, or the move is an en passant capture.
    pub fn is_capture(&self, m: Move) -> bool {
        if m.flag() == MoveFlag::EnPassant {
            return true;
        }
        let mover = match self.piece_at(m.from()) {
            Some((_, color)) => color,
            None => return false,
        };
        self.colors[mover.opposite().index()].contains(m.to())
    }

    /// Number of pieces on the board, kings included.
    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.occupied().count()
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    #[inline]
    pub fn empty_squares(&self) -> Bitboard {
        !self.occupied()
    }

    /// All pieces of one color.
    #[inline]
    pub fn color_pieces(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, piece: Piece, color: Color) -> Bitboard {
        self.pieces[piece.index()] & self.colors[color.index()]
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl From<&Fen> for Position {
    fn from(fen: &Fen) -> Self {
        let mut position = Position::empty();
        for (sq, occupant) in Square::all().zip(fen.board) {
            if let Some((piece, color)) = occupant {
                position.put_piece(sq, piece, color);
            }
        }
        // CASTLING_LETTERS order matches the flag bits.
        let flags = fen
            .castling
            .iter()
            .enumerate()
            .filter(|(_, allowed)| **allowed)
            .fold(0u8, |acc, (bit, _)| acc | 1 << bit);
        position.castling = CastlingRights::new(flags);
        position.side_to_move = fen.side_to_move;
        position.en_passant = fen.en_passant;
        position.halfmove_clock = fen.halfmove_clock;
        position.fullmove_number = fen.fullmove_number;
        position
    }
}

impl From<&Position> for Fen {
    fn from(position: &Position) -> Self {
        let mut board = [None; 64];
        for sq in Square::all() {
            board[sq.index() as usize] = position.piece_at(sq);
        }
        let castling = std::array::from_fn(|bit| position.castling.raw() & (1 << bit) != 0);
        Fen {
            board,
            side_to_move: position.side_to_move,
            castling,
            en_passant: position.en_passant,
            halfmove_clock: position.halfmove_clock,
            fullmove_number: position.fullmove_number,
        }
    }
}
