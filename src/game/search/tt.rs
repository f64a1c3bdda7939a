// src/game/search/tt.rs

use std::collections::HashMap;

use crate::constants::{MAX_PLY, TB_WIN_SCORE};
use crate::game::rules::Move;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TTEntry {
    pub hash: u64,
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

/// Win and loss scores, over the board or from the tablebase, carry the
/// remaining depth at which they were found.
const DECISIVE: i32 = TB_WIN_SCORE - MAX_PLY as i32;

/// Strips the remaining-depth bias from a decisive score so the entry holds
/// the distance from its own node.
pub fn score_to_tt(score: i32, depth: u8) -> i32 {
    if score >= DECISIVE {
        score - depth as i32
    } else if score <= -DECISIVE {
        score + depth as i32
    } else {
        score
    }
}

/// Re-applies the bias for the remaining depth of the probing node.
pub fn score_from_tt(score: i32, depth: u8) -> i32 {
    if score >= DECISIVE {
        score + depth as i32
    } else if score <= -DECISIVE {
        score - depth as i32
    } else {
        score
    }
}

impl TTEntry {
    /// The score to return without searching, if this entry is deep enough
    /// and its bound settles the `(alpha, beta)` window.
    pub fn cutoff(&self, depth: u8, alpha: i32, beta: i32) -> Option<i32> {
        if self.depth < depth {
            return None;
        }
        let score = score_from_tt(self.score, depth);
        match self.bound {
            Bound::Exact => Some(score),
            Bound::Lower if score >= beta => Some(score),
            Bound::Upper if score <= alpha => Some(score),
            _ => None,
        }
    }
}

/// Last write wins; nothing survives [`TranspositionTable::clear`].
pub struct TranspositionTable {
    table: HashMap<u64, TTEntry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn probe(&self, hash: u64) -> Option<&TTEntry> {
        self.table.get(&hash)
    }

    pub fn store(&mut self, entry: TTEntry) {
        self.table.insert(entry.hash, entry);
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}
