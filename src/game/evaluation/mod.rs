//! Evaluation of a checkers position.
//!
//! The search only relies on the [`Evaluator`] contract, so the scoring
//! function is pluggable. [`MaterialEvaluator`] is the default: material plus
//! piece-square tables.

pub mod pst;

use crate::constants::{LOSS_SCORE, WIN_SCORE};
use crate::game::board::{Board, Color, Piece, PieceKind};
use crate::game::search::SearchConfig;

/// Static scoring function.
///
/// Scores are from the perspective of `side`. Implementations must return
/// `LOSS_SCORE` when `side` has no pieces and `WIN_SCORE` when the opponent has
/// none, and must otherwise stay strictly between the two.
pub trait Evaluator: Send {
    fn score(&self, board: &Board, side: Color) -> i32;
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialEvaluator {
    man_value: i32,
    king_value: i32,
    positional_weight: i32,
}

impl MaterialEvaluator {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            man_value: config.man_value,
            king_value: config.king_value,
            positional_weight: config.positional_weight,
        }
    }

    fn piece_value(&self, piece: Piece) -> i32 {
        match piece.kind {
            PieceKind::Man => self.man_value,
            PieceKind::King => self.king_value,
        }
    }
}

impl Default for MaterialEvaluator {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

fn pst_value(piece: Piece, row: usize, col: usize) -> i32 {
    let table = match (piece.color, piece.kind) {
        (Color::Black, PieceKind::Man) => &pst::BLACK_MAN_PST,
        (Color::Black, PieceKind::King) => &pst::BLACK_KING_PST,
        (Color::White, PieceKind::Man) => &pst::WHITE_MAN_PST,
        (Color::White, PieceKind::King) => &pst::WHITE_KING_PST,
    };
    table[row][col]
}

impl Evaluator for MaterialEvaluator {
    fn score(&self, board: &Board, side: Color) -> i32 {
        if board.count_color(side) == 0 {
            return LOSS_SCORE;
        }
        if board.count_color(side.opposite()) == 0 {
            return WIN_SCORE;
        }

        let mut black_score = 0;
        let mut white_score = 0;
        for (sq, piece) in board.pieces() {
            let positional =
                pst_value(piece, sq.row() as usize, sq.col() as usize) * self.positional_weight / 100;
            let score = self.piece_value(piece) + positional;
            match piece.color {
                Color::Black => black_score += score,
                Color::White => white_score += score,
            }
        }

        let total_score = black_score - white_score;

        // Return score from the perspective of the side to move
        if side == Color::Black {
            total_score
        } else {
            -total_score
        }
    }
}
