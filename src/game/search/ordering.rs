// src/game/search/ordering.rs

use std::cmp::Reverse;

use crate::constants::{CAPTURE_SCORE, KILLER_SCORES, TT_MOVE_SCORE};
use crate::game::rules::Move;

pub struct OrderingContext<'a> {
    pub tt_move: Option<&'a Move>,
    pub killers: &'a [Option<Move>; 2],
    pub history: &'a [[i32; 64]; 64],
    pub use_killers: bool,
    pub use_history: bool,
}

/// Captures first, longer jump sequences ahead of shorter ones. Stable, so
/// generation order breaks ties.
pub fn order_root_moves(moves: &mut [Move]) {
    moves.sort_by_key(|m| Reverse((m.is_capture, m.capture_count())));
}

pub fn score_move(m: &Move, ctx: &OrderingContext) -> i32 {
    if ctx.tt_move == Some(m) {
        return TT_MOVE_SCORE;
    }
    if m.is_capture {
        return CAPTURE_SCORE + m.capture_count() as i32;
    }
    if ctx.use_killers {
        for (killer, score) in ctx.killers.iter().zip(KILLER_SCORES) {
            if killer.as_ref() == Some(m) {
                return score;
            }
        }
    }
    if ctx.use_history {
        // History never outranks a killer.
        return ctx.history[m.from.index()][m.to.index()].min(KILLER_SCORES[1] - 1);
    }
    0
}

pub fn order_moves(moves: &mut [Move], ctx: &OrderingContext) {
    moves.sort_by_cached_key(|m| Reverse(score_move(m, ctx)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, Color, Piece, PieceKind, Square};
    use crate::game::rules::{Rules, StandardRules};

    fn quiet(from: usize, to: usize) -> Move {
        let man = Piece::new(Color::Black, PieceKind::Man);
        Move::simple(Square::from_playable(from - 1), Square::from_playable(to - 1), man, man)
    }

    #[test]
    fn test_root_order_puts_longest_capture_first() {
        // The black man on 6 can take 10 then 19, the one on 21 only takes 25.
        let board: Board = ".....b...w........w.b...w.......".parse().unwrap();
        let (mut moves, any_capture) = StandardRules.legal_moves(&board, Color::Black);
        assert!(any_capture);
        assert!(moves.iter().all(|m| m.is_capture));
        order_root_moves(&mut moves);
        assert_eq!(moves[0].capture_count(), 2);
        assert!(moves.windows(2).all(|w| w[0].capture_count() >= w[1].capture_count()));
    }

    #[test]
    fn test_tt_move_then_killers_then_history() {
        let history = {
            let mut table = [[0; 64]; 64];
            let m = quiet(9, 13);
            table[m.from.index()][m.to.index()] = 40;
            let m = quiet(10, 14);
            table[m.from.index()][m.to.index()] = 90;
            table
        };
        let killers = [Some(quiet(11, 15)), Some(quiet(12, 16))];
        let tt_move = quiet(9, 14);
        let mut moves = vec![quiet(9, 13), quiet(10, 14), quiet(12, 16), quiet(11, 15), quiet(9, 14)];
        order_moves(
            &mut moves,
            &OrderingContext {
                tt_move: Some(&tt_move),
                killers: &killers,
                history: &history,
                use_killers: true,
                use_history: true,
            },
        );
        assert_eq!(
            moves,
            vec![quiet(9, 14), quiet(11, 15), quiet(12, 16), quiet(10, 14), quiet(9, 13)]
        );
    }

    #[test]
    fn test_disabled_heuristics_score_zero() {
        let history = [[1_000; 64]; 64];
        let killers = [Some(quiet(9, 13)), None];
        let ctx = OrderingContext {
            tt_move: None,
            killers: &killers,
            history: &history,
            use_killers: false,
            use_history: false,
        };
        assert_eq!(score_move(&quiet(9, 13), &ctx), 0);
    }
}
