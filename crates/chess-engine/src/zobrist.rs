//! Zobrist hashing for repetition detection.
//!
//! A position hashes to the XOR of one key per (piece, color, square)
//! occupant, plus keys for the side to move, each castling right and the
//! en passant file. The clocks are excluded, so positions that repeat on the
//! board hash equal however they were reached.

use chess_core::{Color, Piece, Square};

use crate::Position;

struct ZobristKeys {
    pieces: [[[u64; 64]; 2]; 6],
    black_to_move: u64,
    castling: [u64; 4],
    en_passant: [u64; 8],
}

/// splitmix64 step, usable in const context.
const fn splitmix(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

const fn build_keys(seed: u64) -> ZobristKeys {
    let mut state = seed;
    let mut pieces = [[[0u64; 64]; 2]; 6];
    let mut piece = 0;
    while piece < 6 {
        let mut color = 0;
        while color < 2 {
            let mut square = 0;
            while square < 64 {
                let (next, key) = splitmix(state);
                state = next;
                pieces[piece][color][square] = key;
                square += 1;
            }
            color += 1;
        }
        piece += 1;
    }

    let (next, black_to_move) = splitmix(state);
    state = next;

    let mut castling = [0u64; 4];
    let mut i = 0;
    while i < 4 {
        let (next, key) = splitmix(state);
        state = next;
        castling[i] = key;
        i += 1;
    }

    let mut en_passant = [0u64; 8];
    let mut i = 0;
    while i < 8 {
        let (next, key) = splitmix(state);
        state = next;
        en_passant[i] = key;
        i += 1;
    }

    ZobristKeys {
        pieces,
        black_to_move,
        castling,
        en_passant,
    }
}

static KEYS: ZobristKeys = build_keys(0x6174_6f6d_6963_0001);

impl ZobristKeys {
    #[inline]
    fn piece(&self, piece: Piece, color: Color, square: Square) -> u64 {
        self.pieces[piece.index()][color.index()][square.index() as usize]
    }
}

impl Position {
    /// Returns the Zobrist hash of this position.
    pub fn zobrist_hash(&self) -> u64 {
        let mut hash = 0u64;

        for color in Color::ALL {
            for piece in Piece::ALL {
                for sq in self.pieces_of(piece, color) {
                    hash ^= KEYS.piece(piece, color, sq);
                }
            }
        }

        if self.side_to_move == Color::Black {
            hash ^= KEYS.black_to_move;
        }

        for (bit, key) in KEYS.castling.iter().enumerate() {
            if self.castling.raw() & (1 << bit) != 0 {
                hash ^= key;
            }
        }

        if let Some(ep) = self.en_passant {
            hash ^= KEYS.en_passant[ep.file().index() as usize];
        }

        hash
    }
}
