// game/mod.rs

pub mod board;
pub mod evaluation;
pub mod rules;
pub mod search;
pub mod zobrist;

pub use board::{Board, Color, Piece, PieceKind, Square};
pub use rules::{Move, Rules, StandardRules};
pub use search::{Engine, SearchConfig, SearchProgress, SearchResult};
