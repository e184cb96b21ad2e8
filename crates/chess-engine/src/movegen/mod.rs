//! Move generation, attack detection and move application.
//!
//! Generation produces moves that are legal under standard chess rules.
//! Application comes in two forms: [`make_move`] returns a new position,
//! while [`make_move_in_place`] mutates and hands back an [`UndoInfo`] that
//! [`unmake_move`] uses to restore the exact previous state.

mod attacks;

use crate::{Bitboard, Position};
use chess_core::{Color, Move, MoveFlag, Piece, Square};
use thiserror::Error;

pub use attacks::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks,
};

/// A list of moves with a fixed maximum capacity.
///
/// Chess positions have at most 218 legal moves, so a fixed-size array
/// avoids heap allocations during generation.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; Self::MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub const MAX_MOVES: usize = 256;

    #[inline]
    pub const fn new() -> Self {
        MoveList {
            moves: [Move::NULL; Self::MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, m: Move) {
        debug_assert!(self.len < Self::MAX_MOVES);
        self.moves[self.len] = m;
        self.len += 1;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn contains(&self, m: Move) -> bool {
        self.as_slice().contains(&m)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Retains only moves for which the predicate returns true, keeping
    /// their relative order.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Move) -> bool,
    {
        let mut write = 0;
        for read in 0..self.len {
            if f(&self.moves[read]) {
                self.moves[write] = self.moves[read];
                write += 1;
            }
        }
        self.len = write;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Move> for MoveList {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut list = MoveList::new();
        for m in iter {
            list.push(m);
        }
        list
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Reasons a move cannot be applied to a position.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MakeMoveError {
    #[error("no piece on {0}")]
    EmptySource(Square),

    #[error("the piece on {square} belongs to {owner}, not the side to move")]
    WrongColor { square: Square, owner: Color },

    #[error("{0} is occupied by a piece of the moving side")]
    OwnPieceOnTarget(Square),
}

/// Everything [`unmake_move`] needs to restore a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoInfo {
    pub mv: Move,
    /// Piece type that stood on the source square before the move.
    pub moved: Piece,
    /// Captured piece and the square it stood on (differs from the
    /// destination for en passant).
    pub captured: Option<(Piece, Square)>,
    castling: crate::CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// Generates all moves that are legal under standard chess rules.
///
/// With no king of the side to move on the board, every pseudo-legal move
/// is returned.
pub fn generate_moves(position: &Position) -> MoveList {
    let mut moves = generate_pseudo_moves(position);

    let us = position.side_to_move;
    let mut scratch = position.clone();
    moves.retain(|m| match make_move_in_place(&mut scratch, *m) {
        Ok(undo) => {
            let safe = !is_king_attacked(&scratch, us);
            unmake_move(&mut scratch, undo);
            safe
        }
        Err(_) => false,
    });

    moves
}

/// Generates moves that obey piece movement but may leave the king attacked.
pub fn generate_pseudo_moves(position: &Position) -> MoveList {
    let mut moves = MoveList::new();
    let us = position.side_to_move;
    let own = position.color_pieces(us);
    let occupied = position.occupied();

    generate_pawn_moves(position, &mut moves);

    for from in position.pieces_of(Piece::Knight, us) {
        push_targets(&mut moves, from, knight_attacks(from) & !own);
    }
    for from in position.pieces_of(Piece::Bishop, us) {
        push_targets(&mut moves, from, bishop_attacks(from, occupied) & !own);
    }
    for from in position.pieces_of(Piece::Rook, us) {
        push_targets(&mut moves, from, rook_attacks(from, occupied) & !own);
    }
    for from in position.pieces_of(Piece::Queen, us) {
        push_targets(&mut moves, from, queen_attacks(from, occupied) & !own);
    }
    if let Some(from) = position.king_square(us) {
        push_targets(&mut moves, from, king_attacks(from) & !own);
    }

    generate_castling_moves(position, &mut moves);
    moves
}

fn push_targets(moves: &mut MoveList, from: Square, targets: Bitboard) {
    for to in targets {
        moves.push(Move::normal(from, to));
    }
}

fn push_pawn_move(moves: &mut MoveList, from: Square, to: Square, promotes: bool) {
    if promotes {
        for piece in [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight] {
            if let Some(flag) = MoveFlag::for_promotion(piece) {
                moves.push(Move::new(from, to, flag));
            }
        }
    } else {
        moves.push(Move::normal(from, to));
    }
}

fn generate_pawn_moves(position: &Position, moves: &mut MoveList) {
    let us = position.side_to_move;
    let enemies = position.color_pieces(us.opposite());
    let empty = position.empty_squares();

    let (forward, start_rank, last_rank) = match us {
        Color::White => (1i8, Bitboard::RANK_2, Bitboard::RANK_8),
        Color::Black => (-1i8, Bitboard::RANK_7, Bitboard::RANK_1),
    };

    for from in position.pieces_of(Piece::Pawn, us) {
        if let Some(one) = from.offset(0, forward).filter(|sq| empty.contains(*sq)) {
            push_pawn_move(moves, from, one, last_rank.contains(one));

            if start_rank.contains(from) {
                if let Some(two) = one.offset(0, forward).filter(|sq| empty.contains(*sq)) {
                    moves.push(Move::new(from, two, MoveFlag::DoublePush));
                }
            }
        }

        for to in pawn_attacks(from, us) & enemies {
            push_pawn_move(moves, from, to, last_rank.contains(to));
        }

        if let Some(ep) = position.en_passant {
            if pawn_attacks(from, us).contains(ep) {
                moves.push(Move::new(from, ep, MoveFlag::EnPassant));
            }
        }
    }
}

fn generate_castling_moves(position: &Position, moves: &mut MoveList) {
    let us = position.side_to_move;
    let them = us.opposite();
    let empty = position.empty_squares();

    let back_rank = match us {
        Color::White => [
            Square::A1, Square::B1, Square::C1, Square::D1, Square::E1, Square::F1, Square::G1,
            Square::H1,
        ],
        Color::Black => [
            Square::A8, Square::B8, Square::C8, Square::D8, Square::E8, Square::F8, Square::G8,
            Square::H8,
        ],
    };
    let [a, b, c, d, e, f, g, h] = back_rank;

    // Rights can outlive the pieces they refer to once explosions are in
    // play, so the king and rook are checked on the board as well.
    if position.king_square(us) != Some(e) || is_square_attacked(position, e, them) {
        return;
    }
    let own_rook = |sq: Square| position.piece_at(sq) == Some((Piece::Rook, us));

    if position.castling.can_castle_kingside(us)
        && own_rook(h)
        && empty.contains(f)
        && empty.contains(g)
        && !is_square_attacked(position, f, them)
    {
        moves.push(Move::new(e, g, MoveFlag::CastleKingside));
    }

    if position.castling.can_castle_queenside(us)
        && own_rook(a)
        && empty.contains(b)
        && empty.contains(c)
        && empty.contains(d)
        && !is_square_attacked(position, d, them)
    {
        moves.push(Move::new(e, c, MoveFlag::CastleQueenside));
    }
}

/// Returns true if the given square is attacked by the given color.
pub fn is_square_attacked(position: &Position, sq: Square, by_color: Color) -> bool {
    let occupied = position.occupied();
    let theirs = |piece: Piece| position.pieces_of(piece, by_color);

    let diagonal = theirs(Piece::Bishop) | theirs(Piece::Queen);
    let orthogonal = theirs(Piece::Rook) | theirs(Piece::Queen);

    (pawn_attacks(sq, by_color.opposite()) & theirs(Piece::Pawn)).is_not_empty()
        || (knight_attacks(sq) & theirs(Piece::Knight)).is_not_empty()
        || (king_attacks(sq) & theirs(Piece::King)).is_not_empty()
        || (bishop_attacks(sq, occupied) & diagonal).is_not_empty()
        || (rook_attacks(sq, occupied) & orthogonal).is_not_empty()
}

/// Returns true if the king of the given color is in check.
///
/// A king that is not on the board is never in check.
pub fn is_king_attacked(position: &Position, king_color: Color) -> bool {
    position
        .king_square(king_color)
        .map_or(false, |sq| is_square_attacked(position, sq, king_color.opposite()))
}

/// Makes a move and returns the new position, leaving the input untouched.
pub fn make_move(position: &Position, m: Move) -> Result<Position, MakeMoveError> {
    let mut next = position.clone();
    make_move_in_place(&mut next, m)?;
    Ok(next)
}

/// Applies a move to the position in place.
///
/// The move is trusted to obey piece movement; only the preconditions that
/// would corrupt the board are checked. On error the position is unchanged.
pub fn make_move_in_place(position: &mut Position, m: Move) -> Result<UndoInfo, MakeMoveError> {
    let us = position.side_to_move;
    let (from, to) = (m.from(), m.to());

    let (piece, owner) = position
        .piece_at(from)
        .ok_or(MakeMoveError::EmptySource(from))?;
    if owner != us {
        return Err(MakeMoveError::WrongColor { square: from, owner });
    }
    if position.color_pieces(us).contains(to) {
        return Err(MakeMoveError::OwnPieceOnTarget(to));
    }

    let undo_base = UndoInfo {
        mv: m,
        moved: piece,
        captured: None,
        castling: position.castling,
        en_passant: position.en_passant,
        halfmove_clock: position.halfmove_clock,
        fullmove_number: position.fullmove_number,
    };

    let captured = if m.flag() == MoveFlag::EnPassant {
        let victim = behind(to, us);
        position.remove_piece(victim).map(|(p, _)| (p, victim))
    } else {
        position.remove_piece(to).map(|(p, _)| (p, to))
    };

    position.remove_piece(from);
    position.put_piece(to, m.promotion().unwrap_or(piece), us);

    if let Some((rook_from, rook_to)) = castling_rook_squares(m.flag(), us) {
        if position.remove_piece(rook_from).is_some() {
            position.put_piece(rook_to, Piece::Rook, us);
        }
    }

    position.castling.revoke_for_square(from);
    position.castling.revoke_for_square(to);

    position.en_passant = if m.flag() == MoveFlag::DoublePush {
        Some(behind(to, us))
    } else {
        None
    };

    if piece == Piece::Pawn || captured.is_some() {
        position.halfmove_clock = 0;
    } else {
        position.halfmove_clock += 1;
    }
    if us == Color::Black {
        position.fullmove_number += 1;
    }
    position.side_to_move = us.opposite();

    Ok(UndoInfo { captured, ..undo_base })
}

/// Reverts a move applied by [`make_move_in_place`].
///
/// Must be called on the position the move was applied to, with no other
/// changes in between that have not themselves been reverted.
pub fn unmake_move(position: &mut Position, undo: UndoInfo) {
    let m = undo.mv;
    let us = position.side_to_move.opposite();

    if let Some((rook_from, rook_to)) = castling_rook_squares(m.flag(), us) {
        if position.remove_piece(rook_to).is_some() {
            position.put_piece(rook_from, Piece::Rook, us);
        }
    }

    position.remove_piece(m.to());
    position.put_piece(m.from(), undo.moved, us);
    if let Some((piece, sq)) = undo.captured {
        position.put_piece(sq, piece, us.opposite());
    }

    position.side_to_move = us;
    position.castling = undo.castling;
    position.en_passant = undo.en_passant;
    position.halfmove_clock = undo.halfmove_clock;
    position.fullmove_number = undo.fullmove_number;
}

/// The square directly behind `sq` from `mover`'s point of view.
fn behind(sq: Square, mover: Color) -> Square {
    let back = match mover {
        Color::White => -1,
        Color::Black => 1,
    };
    sq.offset(0, back).unwrap_or(sq)
}

fn castling_rook_squares(flag: MoveFlag, us: Color) -> Option<(Square, Square)> {
    match (flag, us) {
        (MoveFlag::CastleKingside, Color::White) => Some((Square::H1, Square::F1)),
        (MoveFlag::CastleQueenside, Color::White) => Some((Square::A1, Square::D1)),
        (MoveFlag::CastleKingside, Color::Black) => Some((Square::H8, Square::F8)),
        (MoveFlag::CastleQueenside, Color::Black) => Some((Square::A8, Square::D8)),
        _ => None,
    }
}
