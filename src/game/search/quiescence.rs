// src/game/search/quiescence.rs

use crate::constants::{LOSS_SCORE, MAX_PLY};
use crate::game::board::{Board, Color};
use crate::game::evaluation::Evaluator;
use crate::game::rules::Rules;
use crate::game::search::Engine;

impl<R: Rules, E: Evaluator> Engine<R, E> {
    /// Capture-only search below the horizon. The static score is a lower
    /// bound; quiet positions return as soon as no capture is pending.
    pub(super) fn quiescence(&mut self, board: &Board, side: Color, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        if self.poll_stop() {
            return 0;
        }
        self.nodes += 1;

        let (captures, has_capture) = self.rules.legal_moves(board, side);
        if captures.is_empty() {
            return LOSS_SCORE;
        }

        let standing_pat = self.evaluator.score(board, side);
        if standing_pat >= beta {
            return beta;
        }
        if alpha < standing_pat {
            alpha = standing_pat;
        }
        if !has_capture || ply >= MAX_PLY {
            return alpha;
        }

        for m in &captures {
            let child = self.rules.apply(m, board);
            let score = -self.quiescence(&child, side.opposite(), -beta, -alpha, ply + 1);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        alpha
    }
}
