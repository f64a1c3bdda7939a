// src/game/search/null_move.rs

//! Null Move Pruning
//!
//! The side to move passes and the opponent gets a reduced-depth search. If
//! the position still fails high, the node is cut without a full search.
//! There is no zugzwang check: the pass is tried whenever the depth and
//! material thresholds hold and no capture is pending.

use crate::game::board::{Board, Color};
use crate::game::evaluation::Evaluator;
use crate::game::rules::Rules;
use crate::game::search::{Engine, SearchConfig};

pub fn null_move_allowed(config: &SearchConfig, depth: u8, pieces: usize, has_capture: bool) -> bool {
    config.use_null_move_pruning
        && !has_capture
        && depth > config.null_move_min_depth
        && pieces >= config.null_move_min_pieces
}

impl<R: Rules, E: Evaluator> Engine<R, E> {
    /// `Some(beta)` when passing still fails high.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn null_move_cutoff(
        &mut self,
        board: &Board,
        side: Color,
        hash: u64,
        depth: u8,
        beta: i32,
        ply: usize,
        has_capture: bool,
    ) -> Option<i32> {
        if !null_move_allowed(&self.config, depth, board.piece_count(), has_capture) {
            return None;
        }
        let reduced = depth.saturating_sub(1 + self.config.null_move_reduction);
        let passed = self.zobrist.after_pass(hash);
        let score = -self.negamax(board, side.opposite(), passed, reduced, -beta, -beta + 1, ply + 1, false);
        if self.stopped {
            return None;
        }
        (score >= beta).then_some(beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        let config = SearchConfig::default();
        assert!(null_move_allowed(&config, 3, 8, false));
        assert!(!null_move_allowed(&config, 2, 8, false));
        assert!(!null_move_allowed(&config, 5, 7, false));
        assert!(!null_move_allowed(&config, 5, 20, true));

        let disabled = SearchConfig {
            use_null_move_pruning: false,
            ..SearchConfig::default()
        };
        assert!(!null_move_allowed(&disabled, 10, 24, false));
    }
}
