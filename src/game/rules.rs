//! Moves and the rules oracle.
//!
//! The search treats move generation as an external collaborator behind the
//! [`Rules`] trait. [`StandardRules`] implements English draughts: compulsory
//! captures, multi-jumps continued to the end, and crowning that ends the move.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::board::{Board, Color, Piece, PieceKind, Square};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    /// Landing squares of a jump sequence, ending with `to`. Empty for simple moves.
    pub path: Vec<Square>,
    pub captured: Vec<(Square, Piece)>,
    pub piece_before: Piece,
    pub piece_after: Piece,
    pub is_capture: bool,
}

impl Move {
    pub fn simple(from: Square, to: Square, piece_before: Piece, piece_after: Piece) -> Self {
        Self {
            from,
            to,
            path: Vec::new(),
            captured: Vec::new(),
            piece_before,
            piece_after,
            is_capture: false,
        }
    }

    pub fn capture_count(&self) -> usize {
        self.captured.len()
    }

    pub fn is_promotion(&self) -> bool {
        self.piece_before.kind == PieceKind::Man && self.piece_after.kind == PieceKind::King
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_capture {
            write!(f, "{}", self.from)?;
            for sq in &self.path {
                write!(f, "x{sq}")?;
            }
            Ok(())
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Legal-move generation and move application.
pub trait Rules: Send {
    /// All legal moves for `side`, and whether they are captures. When any
    /// capture exists only captures are returned.
    fn legal_moves(&self, board: &Board, side: Color) -> (Vec<Move>, bool);

    fn apply(&self, mv: &Move, board: &Board) -> Board;

    fn undo(&self, mv: &Move, board: &Board) -> Board;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardRules;

const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

fn directions(piece: Piece) -> impl Iterator<Item = (i8, i8)> {
    DIAGONALS
        .into_iter()
        .filter(move |(d_row, _)| piece.kind == PieceKind::King || *d_row == piece.color.forward())
}

fn promote_on(piece: Piece, sq: Square) -> Piece {
    if piece.kind == PieceKind::Man && sq.row() == piece.color.king_row() {
        piece.crowned()
    } else {
        piece
    }
}

#[derive(Clone)]
struct JumpState {
    origin: Square,
    piece_before: Piece,
    path: Vec<Square>,
    captured: Vec<(Square, Piece)>,
}

/// Extends a jump sequence from `at`. Each call owns its board copy, on which
/// the moving piece has already been lifted from the origin. Captured pieces
/// stay on the board until the move ends, so they block landings and cannot be
/// jumped twice.
fn jumps_from(board: Board, at: Square, piece: Piece, state: JumpState) -> Vec<Move> {
    let mut moves = Vec::new();
    for (d_row, d_col) in directions(piece) {
        let Some(over) = at.offset(d_row, d_col) else { continue };
        let Some(land) = over.offset(d_row, d_col) else { continue };
        let Some(victim) = board.get(over) else { continue };
        if victim.color == piece.color
            || !board.is_empty(land)
            || state.captured.iter().any(|(sq, _)| *sq == over)
        {
            continue;
        }

        let mut path = state.path.clone();
        path.push(land);
        let mut captured = state.captured.clone();
        captured.push((over, victim));
        let after = promote_on(piece, land);

        let next = JumpState {
            origin: state.origin,
            piece_before: state.piece_before,
            path,
            captured,
        };
        if after != piece {
            // Crowning ends the move.
            moves.push(finish_jump(land, after, next));
            continue;
        }
        let continuations = jumps_from(board, land, piece, next.clone());
        if continuations.is_empty() {
            moves.push(finish_jump(land, after, next));
        } else {
            moves.extend(continuations);
        }
    }
    moves
}

fn finish_jump(to: Square, piece_after: Piece, state: JumpState) -> Move {
    Move {
        from: state.origin,
        to,
        path: state.path,
        captured: state.captured,
        piece_before: state.piece_before,
        piece_after,
        is_capture: true,
    }
}

impl StandardRules {
    fn captures(&self, board: &Board, side: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for (sq, piece) in board.pieces().filter(|(_, p)| p.color == side) {
            let mut lifted = *board;
            lifted.clear(sq);
            let state = JumpState {
                origin: sq,
                piece_before: piece,
                path: Vec::new(),
                captured: Vec::new(),
            };
            moves.extend(jumps_from(lifted, sq, piece, state));
        }
        moves
    }

    fn quiet_moves(&self, board: &Board, side: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for (sq, piece) in board.pieces().filter(|(_, p)| p.color == side) {
            for (d_row, d_col) in directions(piece) {
                if let Some(to) = sq.offset(d_row, d_col) {
                    if board.is_empty(to) {
                        moves.push(Move::simple(sq, to, piece, promote_on(piece, to)));
                    }
                }
            }
        }
        moves
    }
}

impl Rules for StandardRules {
    fn legal_moves(&self, board: &Board, side: Color) -> (Vec<Move>, bool) {
        let captures = self.captures(board, side);
        if !captures.is_empty() {
            return (captures, true);
        }
        (self.quiet_moves(board, side), false)
    }

    fn apply(&self, mv: &Move, board: &Board) -> Board {
        let mut next = *board;
        next.clear(mv.from);
        for (sq, _) in &mv.captured {
            next.clear(*sq);
        }
        next.set(mv.to, mv.piece_after);
        next
    }

    fn undo(&self, mv: &Move, board: &Board) -> Board {
        let mut prev = *board;
        prev.clear(mv.to);
        for (sq, piece) in &mv.captured {
            prev.set(*sq, *piece);
        }
        prev.set(mv.from, mv.piece_before);
        prev
    }
}
