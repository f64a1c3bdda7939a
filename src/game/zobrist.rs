//! Zobrist position keys.
//!
//! The key tables belong to the engine that created them. A fixed seed gives
//! reproducible keys across runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::board::{Board, Color, Piece, Square};
use super::rules::Move;

#[derive(Clone, Debug)]
pub struct Zobrist {
    pieces: [[u64; 4]; Square::COUNT],
    white_to_move: u64,
    seed: u64,
}

impl Zobrist {
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pieces = [[0u64; 4]; Square::COUNT];
        for square in pieces.iter_mut() {
            for key in square.iter_mut() {
                *key = rng.gen::<u64>();
            }
        }
        Self {
            pieces,
            white_to_move: rng.gen::<u64>(),
            seed,
        }
    }

    /// Tables from a freshly drawn seed.
    pub fn random() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn piece_key(&self, piece: Piece, sq: Square) -> u64 {
        self.pieces[sq.index()][piece.index()]
    }

    pub fn side_key(&self) -> u64 {
        self.white_to_move
    }

    pub fn hash(&self, board: &Board, side: Color) -> u64 {
        let mut key = board
            .pieces()
            .fold(0u64, |key, (sq, piece)| key ^ self.piece_key(piece, sq));
        if side == Color::White {
            key ^= self.white_to_move;
        }
        key
    }

    /// Key of the position after `mv`, derived from the key before it. The
    /// side to move flips.
    pub fn after_move(&self, key: u64, mv: &Move) -> u64 {
        let key = mv
            .captured
            .iter()
            .fold(key, |key, &(sq, piece)| key ^ self.piece_key(piece, sq));
        key ^ self.piece_key(mv.piece_before, mv.from) ^ self.piece_key(mv.piece_after, mv.to) ^ self.white_to_move
    }

    /// Key of the same position with the other side to move.
    pub fn after_pass(&self, key: u64) -> u64 {
        key ^ self.white_to_move
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::PieceKind;
    use crate::game::rules::{Rules, StandardRules};
    use std::collections::HashSet;

    #[test]
    fn test_keys_unique() {
        let zobrist = Zobrist::with_seed(7);
        let mut seen = HashSet::new();
        for sq in Square::playable() {
            for piece in Piece::ALL {
                assert!(seen.insert(zobrist.piece_key(piece, sq)), "Duplicate Zobrist key found");
            }
        }
        assert!(seen.insert(zobrist.side_key()), "Side to move key collision");
    }

    #[test]
    fn test_same_seed_same_keys() {
        let a = Zobrist::with_seed(42);
        let b = Zobrist::with_seed(42);
        let board = Board::initial();
        assert_eq!(a.hash(&board, Color::Black), b.hash(&board, Color::Black));
        assert_eq!(a.seed(), 42);
    }

    #[test]
    fn test_side_to_move_changes_hash() {
        let zobrist = Zobrist::with_seed(1);
        let board = Board::initial();
        assert_eq!(
            zobrist.hash(&board, Color::Black) ^ zobrist.side_key(),
            zobrist.hash(&board, Color::White)
        );
    }

    #[test]
    fn test_hash_tracks_piece_changes() {
        let zobrist = Zobrist::with_seed(3);
        let board = Board::initial();
        let (moves, _) = StandardRules.legal_moves(&board, Color::Black);
        let mv = &moves[0];
        let after = StandardRules.apply(mv, &board);
        let man = Piece::new(Color::Black, PieceKind::Man);
        let incremental = zobrist.hash(&board, Color::Black)
            ^ zobrist.piece_key(man, mv.from)
            ^ zobrist.piece_key(man, mv.to);
        assert_eq!(incremental, zobrist.hash(&after, Color::Black));
    }

    #[test]
    fn test_after_move_matches_full_hash() {
        let zobrist = Zobrist::with_seed(9);
        // The second position opens with a forced double jump.
        for text in ["b...........b.B...w.....wW.w....", ".....b...w........w.b...w......."] {
            let mut board: Board = text.parse().unwrap();
            let mut side = Color::Black;
            let mut key = zobrist.hash(&board, side);
            for ply in 0..40 {
                let (moves, _) = StandardRules.legal_moves(&board, side);
                let Some(mv) = moves.get(ply % moves.len().max(1)) else {
                    break;
                };
                board = StandardRules.apply(mv, &board);
                side = side.opposite();
                key = zobrist.after_move(key, mv);
                assert_eq!(key, zobrist.hash(&board, side), "{text} ply {ply} move {mv}");
            }
            assert_eq!(zobrist.after_pass(key), zobrist.hash(&board, side.opposite()));
        }
    }
}
