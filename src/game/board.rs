//! Board representation.
//!
//! The board is an 8x8 grid with row 0 at the top. Black starts on rows 0-2
//! and moves down the board, white starts on rows 5-7 and moves up. Only the
//! dark squares (`row + col` odd) are ever occupied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Row direction in which men of this colour advance.
    pub fn forward(self) -> i8 {
        match self {
            Color::Black => 1,
            Color::White => -1,
        }
    }

    /// The row on which men of this colour are crowned.
    pub fn king_row(self) -> u8 {
        match self {
            Color::Black => 7,
            Color::White => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "black"),
            Color::White => write!(f, "white"),
        }
    }
}

impl FromStr for Color {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Color::Black),
            "w" | "white" => Ok(Color::White),
            _ => Err(ParseBoardError::InvalidColor(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Man,
    King,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const ALL: [Piece; 4] = [
        Piece::new(Color::Black, PieceKind::Man),
        Piece::new(Color::Black, PieceKind::King),
        Piece::new(Color::White, PieceKind::Man),
        Piece::new(Color::White, PieceKind::King),
    ];

    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// Dense index in `0..4`, in the order of [`Piece::ALL`].
    pub fn index(self) -> usize {
        self.color.index() * 2 + self.kind as usize
    }

    pub fn crowned(self) -> Self {
        Self { kind: PieceKind::King, ..self }
    }

    fn to_char(self) -> char {
        match (self.color, self.kind) {
            (Color::Black, PieceKind::Man) => 'b',
            (Color::Black, PieceKind::King) => 'B',
            (Color::White, PieceKind::Man) => 'w',
            (Color::White, PieceKind::King) => 'W',
        }
    }

    fn from_char(c: char) -> Option<Option<Self>> {
        match c {
            'b' => Some(Some(Piece::new(Color::Black, PieceKind::Man))),
            'B' => Some(Some(Piece::new(Color::Black, PieceKind::King))),
            'w' => Some(Some(Piece::new(Color::White, PieceKind::Man))),
            'W' => Some(Some(Piece::new(Color::White, PieceKind::King))),
            '.' | '-' => Some(None),
            _ => None,
        }
    }
}

/// A grid coordinate packed as `row * 8 + col`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 64;
    pub const PLAYABLE: usize = 32;

    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!(row < 8 && col < 8);
        Self(row * 8 + col)
    }

    pub fn from_index(index: usize) -> Self {
        debug_assert!(index < Self::COUNT);
        Self(index as u8)
    }

    /// Maps a playable index `0..32` back onto the grid.
    pub fn from_playable(index: usize) -> Self {
        debug_assert!(index < Self::PLAYABLE);
        let row = (index / 4) as u8;
        let col = (index % 4) as u8 * 2 + if row % 2 == 0 { 1 } else { 0 };
        Self::new(row, col)
    }

    pub fn row(self) -> u8 {
        self.0 / 8
    }

    pub fn col(self) -> u8 {
        self.0 % 8
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_playable(self) -> bool {
        (self.row() + self.col()) % 2 == 1
    }

    pub fn playable_index(self) -> usize {
        self.row() as usize * 4 + self.col() as usize / 2
    }

    /// Steps diagonally, returning `None` when leaving the board.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Square> {
        let row = self.row() as i8 + d_row;
        let col = self.col() as i8 + d_col;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Iterates the 32 playable squares in playable-index order.
    pub fn playable() -> impl Iterator<Item = Square> {
        (0..Self::PLAYABLE).map(Square::from_playable)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.playable_index() + 1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseBoardError {
    #[error("expected 32 squares, found {0}")]
    WrongLength(usize),
    #[error("invalid square character {0:?}")]
    InvalidChar(char),
    #[error("invalid colour {0:?}")]
    InvalidColor(String),
}

pub type Cell = Option<Piece>;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Cell; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self { cells: [[None; 8]; 8] }
    }

    /// The standard starting position: twelve men per side.
    pub fn initial() -> Self {
        let mut board = Self::empty();
        for sq in Square::playable() {
            if sq.row() < 3 {
                board.set(sq, Piece::new(Color::Black, PieceKind::Man));
            } else if sq.row() > 4 {
                board.set(sq, Piece::new(Color::White, PieceKind::Man));
            }
        }
        board
    }

    pub fn get(&self, sq: Square) -> Cell {
        self.cells[sq.row() as usize][sq.col() as usize]
    }

    pub fn set(&mut self, sq: Square, piece: Piece) {
        debug_assert!(sq.is_playable());
        self.cells[sq.row() as usize][sq.col() as usize] = Some(piece);
    }

    pub fn clear(&mut self, sq: Square) {
        self.cells[sq.row() as usize][sq.col() as usize] = None;
    }

    pub fn is_empty(&self, sq: Square) -> bool {
        self.get(sq).is_none()
    }

    /// Occupied squares with their pieces, in playable-index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::playable().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    pub fn count(&self, color: Color, kind: PieceKind) -> usize {
        self.pieces()
            .filter(|(_, p)| p.color == color && p.kind == kind)
            .count()
    }

    pub fn count_color(&self, color: Color) -> usize {
        self.pieces().filter(|(_, p)| p.color == color).count()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces().count()
    }

    /// Occupancy of one piece type as a mask over playable indices.
    pub fn bitmask(&self, color: Color, kind: PieceKind) -> u32 {
        self.pieces()
            .filter(|(_, p)| p.color == color && p.kind == kind)
            .fold(0, |mask, (sq, _)| mask | (1 << sq.playable_index()))
    }

    /// Builds a board from per-type playable-index masks. Later masks win on overlap.
    pub fn from_bitmasks(black_men: u32, black_kings: u32, white_men: u32, white_kings: u32) -> Self {
        let mut board = Self::empty();
        let layers = [black_men, black_kings, white_men, white_kings];
        for (piece, mask) in Piece::ALL.iter().zip(layers) {
            for sq in Square::playable() {
                if mask & (1 << sq.playable_index()) != 0 {
                    board.set(sq, *piece);
                }
            }
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// Compact form: one character per playable square in playable-index order.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sq in Square::playable() {
            let c = self.get(sq).map_or('.', Piece::to_char);
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for row in 0..8u8 {
            for col in 0..8u8 {
                let sq = Square::new(row, col);
                let c = if !sq.is_playable() {
                    ' '
                } else {
                    self.get(sq).map_or('.', Piece::to_char)
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.len() != Square::PLAYABLE {
            return Err(ParseBoardError::WrongLength(chars.len()));
        }
        let mut board = Board::empty();
        for (index, c) in chars.into_iter().enumerate() {
            match Piece::from_char(c) {
                Some(Some(piece)) => board.set(Square::from_playable(index), piece),
                Some(None) => {}
                None => return Err(ParseBoardError::InvalidChar(c)),
            }
        }
        Ok(board)
    }
}
