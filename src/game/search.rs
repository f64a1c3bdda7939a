// src/game/search.rs

pub mod null_move;
pub mod ordering;
pub mod quiescence;
pub mod tt;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{
    DRAW_SCORE, INFINITY, KING_VALUE, LOSS_SCORE, MAN_VALUE, MAX_DEPTH, MAX_PLY,
    NULL_MOVE_MIN_DEPTH, NULL_MOVE_MIN_PIECES, NULL_MOVE_REDUCTION, TB_WIN_SCORE,
    TIME_CHECK_INTERVAL,
};
use crate::egdb::{Egdb, EgdbConfig, Verdict};
use crate::game::board::{Board, Color};
use crate::game::evaluation::{Evaluator, MaterialEvaluator};
use crate::game::rules::{Move, Rules, StandardRules};
use crate::game::zobrist::Zobrist;
use ordering::{order_moves, order_root_moves, OrderingContext};
use tt::{score_to_tt, Bound, TTEntry, TranspositionTable};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub max_depth: u8,
    pub use_transposition_table: bool,
    pub use_killer_moves: bool,
    pub use_history_heuristic: bool,
    pub use_null_move_pruning: bool,
    pub use_quiescence_search: bool,
    pub null_move_reduction: u8,
    pub null_move_min_depth: u8,
    pub null_move_min_pieces: usize,
    /// Fixed seed for the position hash keys. `None` draws a fresh seed.
    pub zobrist_seed: Option<u64>,
    pub man_value: i32,
    pub king_value: i32,
    /// Percentage applied to the piece-square tables.
    pub positional_weight: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            use_transposition_table: true,
            use_killer_moves: true,
            use_history_heuristic: true,
            use_null_move_pruning: true,
            use_quiescence_search: true,
            null_move_reduction: NULL_MOVE_REDUCTION,
            null_move_min_depth: NULL_MOVE_MIN_DEPTH,
            null_move_min_pieces: NULL_MOVE_MIN_PIECES,
            zobrist_seed: None,
            man_value: MAN_VALUE,
            king_value: KING_VALUE,
            positional_weight: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u8,
    /// Set when the search stopped because cancellation was requested.
    pub aborted: bool,
    pub nodes: u64,
    pub elapsed: Duration,
}

/// Reported after every iteration that produced a move.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchProgress {
    pub depth: u8,
    pub score: i32,
    pub best_move: Option<Move>,
    pub nodes: u64,
    pub elapsed: Duration,
}

type HistoryTable = [[i32; 64]; 64];

pub struct Engine<R: Rules = StandardRules, E: Evaluator = MaterialEvaluator> {
    rules: R,
    evaluator: E,
    zobrist: Zobrist,
    tt: TranspositionTable,
    killer_moves: Vec<[Option<Move>; 2]>,
    history_table: Box<HistoryTable>,
    egdb: Egdb,
    config: SearchConfig,
    stop: Arc<AtomicBool>,
    nodes: u64,
    deadline: Option<Instant>,
    stopped: bool,
    aborted: bool,
}

impl Engine {
    pub fn new(config: SearchConfig) -> Self {
        let evaluator = MaterialEvaluator::from_config(&config);
        Self::with_parts(StandardRules, evaluator, config)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl<R: Rules, E: Evaluator> Engine<R, E> {
    pub fn with_parts(rules: R, evaluator: E, config: SearchConfig) -> Self {
        let zobrist = match config.zobrist_seed {
            Some(seed) => Zobrist::with_seed(seed),
            None => Zobrist::random(),
        };
        Self {
            rules,
            evaluator,
            zobrist,
            tt: TranspositionTable::new(),
            killer_moves: vec![[None, None]; MAX_PLY],
            history_table: Box::new([[0; 64]; 64]),
            egdb: Egdb::disabled(),
            config,
            stop: Arc::new(AtomicBool::new(false)),
            nodes: 0,
            deadline: None,
            stopped: false,
            aborted: false,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn zobrist(&self) -> &Zobrist {
        &self.zobrist
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Shared cancellation flag. Storing `true` stops the running search at
    /// its next poll. The engine never clears it.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn egdb(&self) -> &Egdb {
        &self.egdb
    }

    pub fn egdb_mut(&mut self) -> &mut Egdb {
        &mut self.egdb
    }

    /// Replaces the loaded databases with the ones in `dir` and returns the
    /// largest piece count now covered.
    pub fn initialize_egdb(&mut self, dir: &Path, config: &EgdbConfig) -> usize {
        // Release the old files and cache before loading the new set.
        self.egdb = Egdb::disabled();
        self.egdb = Egdb::initialize(dir, config);
        self.egdb.max_pieces()
    }

    pub fn set_egdb(&mut self, egdb: Egdb) {
        self.egdb = egdb;
    }

    pub fn disable_egdb(&mut self) {
        self.egdb = Egdb::disabled();
    }

    pub fn search(&mut self, board: &Board, side: Color, budget: Duration) -> SearchResult {
        self.search_with_progress(board, side, budget, |_| {})
    }

    pub fn search_with_progress<F>(
        &mut self,
        board: &Board,
        side: Color,
        budget: Duration,
        mut on_progress: F,
    ) -> SearchResult
    where
        F: FnMut(&SearchProgress),
    {
        let start = Instant::now();
        self.reset(start, budget);

        let (mut moves, _) = self.rules.legal_moves(board, side);
        if moves.is_empty() {
            return self.result(None, LOSS_SCORE, 0, start);
        }
        if moves.len() == 1 {
            let score = self.evaluator.score(board, side);
            return self.result(moves.pop(), score, 0, start);
        }

        order_root_moves(&mut moves);
        let mut best_move = moves[0].clone();
        let mut best_score = self.evaluator.score(board, side);
        let mut reached = 0;

        for depth in 1..=self.config.max_depth.max(1) {
            if self.poll_stop() {
                break;
            }
            let (iteration_best, score) = self.search_root(board, side, &moves, depth);
            if let Some(m) = iteration_best {
                best_move = m;
                best_score = score;
                reached = depth;
                if let Some(index) = moves.iter().position(|candidate| *candidate == best_move) {
                    let first = moves.remove(index);
                    moves.insert(0, first);
                }
                // A partial iteration still supplies the move, but is not reported.
                if !self.stopped {
                    on_progress(&SearchProgress {
                        depth,
                        score,
                        best_move: Some(best_move.clone()),
                        nodes: self.nodes,
                        elapsed: start.elapsed(),
                    });
                    debug!("depth {} score {} move {} nodes {}", depth, score, best_move, self.nodes);
                }
            }
            if self.stopped {
                break;
            }
        }

        let result = self.result(Some(best_move), best_score, reached, start);
        info!(
            "Search finished: depth {} score {} nodes {} in {:?}{}",
            result.depth,
            result.score,
            result.nodes,
            result.elapsed,
            if result.aborted { " (aborted)" } else { "" }
        );
        result
    }

    fn reset(&mut self, start: Instant, budget: Duration) {
        self.tt.clear();
        for killers in self.killer_moves.iter_mut() {
            *killers = [None, None];
        }
        *self.history_table = [[0; 64]; 64];
        self.nodes = 0;
        self.deadline = start.checked_add(budget);
        self.stopped = false;
        self.aborted = false;
    }

    fn result(&self, best_move: Option<Move>, score: i32, depth: u8, start: Instant) -> SearchResult {
        SearchResult {
            best_move,
            score,
            depth,
            aborted: self.aborted,
            nodes: self.nodes,
            elapsed: start.elapsed(),
        }
    }

    /// Checks the cancel flag on every call and the clock every
    /// `TIME_CHECK_INTERVAL` nodes. Once tripped it stays tripped until the
    /// next search.
    fn poll_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.stop.load(Ordering::Acquire) {
            self.stopped = true;
            self.aborted = true;
        } else if self.nodes % TIME_CHECK_INTERVAL == 0
            && self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
        {
            self.stopped = true;
        }
        self.stopped
    }

    /// One full-window pass over the root moves. Returns the best move among
    /// those searched completely, or `None` if the pass stopped before any.
    fn search_root(&mut self, board: &Board, side: Color, moves: &[Move], depth: u8) -> (Option<Move>, i32) {
        let mut alpha = -INFINITY;
        let mut best_move: Option<Move> = None;
        let hash = self.zobrist.hash(board, side);

        for m in moves {
            if self.poll_stop() {
                break;
            }
            let child = self.rules.apply(m, board);
            let child_hash = self.zobrist.after_move(hash, m);
            let score = -self.negamax(&child, side.opposite(), child_hash, depth - 1, -INFINITY, -alpha, 1, true);
            if self.stopped {
                break;
            }
            if best_move.is_none() || score > alpha {
                alpha = score;
                best_move = Some(m.clone());
                if self.config.use_history_heuristic && !m.is_capture {
                    self.history_table[m.from.index()][m.to.index()] += depth as i32;
                }
            }
        }

        if !self.stopped && self.config.use_transposition_table {
            if let Some(m) = &best_move {
                self.tt.store(TTEntry {
                    hash,
                    depth,
                    score: score_to_tt(alpha, depth),
                    bound: Bound::Exact,
                    best_move: Some(m.clone()),
                });
            }
        }
        (best_move, alpha)
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        board: &Board,
        side: Color,
        hash: u64,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        allow_null: bool,
    ) -> i32 {
        if self.poll_stop() {
            return 0;
        }
        self.nodes += 1;

        let alpha_orig = alpha;
        let mut tt_move = None;
        if self.config.use_transposition_table {
            if let Some(entry) = self.tt.probe(hash) {
                if let Some(score) = entry.cutoff(depth, alpha, beta) {
                    return score;
                }
                tt_move = entry.best_move.clone();
            }
        }

        let (mut moves, has_capture) = self.rules.legal_moves(board, side);
        if moves.is_empty() {
            return LOSS_SCORE - depth as i32;
        }

        if !has_capture && self.egdb.is_enabled() && board.piece_count() <= self.egdb.max_pieces() {
            match self.egdb.lookup(board, side) {
                Verdict::Win => return TB_WIN_SCORE + depth as i32,
                Verdict::Loss => return -TB_WIN_SCORE - depth as i32,
                Verdict::Draw => return DRAW_SCORE,
                Verdict::Unknown | Verdict::NotAvailable => {}
            }
        }

        if depth == 0 {
            return if self.config.use_quiescence_search {
                self.quiescence(board, side, alpha, beta, ply)
            } else {
                self.evaluator.score(board, side)
            };
        }

        if allow_null {
            if let Some(score) = self.null_move_cutoff(board, side, hash, depth, beta, ply, has_capture) {
                return score;
            }
            if self.stopped {
                return 0;
            }
        }

        let killers = self.killer_moves.get(ply).cloned().unwrap_or([None, None]);
        order_moves(
            &mut moves,
            &OrderingContext {
                tt_move: tt_move.as_ref(),
                killers: &killers,
                history: &self.history_table,
                use_killers: self.config.use_killer_moves,
                use_history: self.config.use_history_heuristic,
            },
        );

        let mut best_score = -INFINITY;
        let mut best_move = None;
        for m in moves {
            let child = self.rules.apply(&m, board);
            let child_hash = self.zobrist.after_move(hash, &m);
            let score = -self.negamax(&child, side.opposite(), child_hash, depth - 1, -beta, -alpha, ply + 1, true);
            if self.stopped {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(m.clone());
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                if !m.is_capture {
                    self.record_cutoff(&m, depth, ply);
                }
                break;
            }
        }

        if self.config.use_transposition_table {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_score > alpha_orig {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.store(TTEntry {
                hash,
                depth,
                score: score_to_tt(best_score, depth),
                bound,
                best_move,
            });
        }
        best_score
    }

    fn record_cutoff(&mut self, m: &Move, depth: u8, ply: usize) {
        if self.config.use_killer_moves {
            if let Some(killers) = self.killer_moves.get_mut(ply) {
                if killers[0].as_ref() != Some(m) {
                    killers[1] = killers[0].take();
                    killers[0] = Some(m.clone());
                }
            }
        }
        if self.config.use_history_heuristic {
            self.history_table[m.from.index()][m.to.index()] += (depth as i32).pow(2);
        }
    }
}
