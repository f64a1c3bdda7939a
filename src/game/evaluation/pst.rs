//! Piece-Square Tables (PSTs) for checkers evaluation.
//!
//! Tables are written from black's point of view (black's back rank is row 0).
//! White uses the same tables rotated by 180 degrees, which keeps the
//! evaluation colour-symmetric.

use crate::constants::{BACK_RANK_GUARD_BONUS, KING_CENTER_BONUS};

pub type Pst = [[i32; 8]; 8];

const fn rotate(pst: &Pst) -> Pst {
    let mut rotated = [[0; 8]; 8];
    let mut i = 0;
    while i < 8 {
        let mut j = 0;
        while j < 8 {
            rotated[i][j] = pst[7 - i][7 - j];
            j += 1;
        }
        i += 1;
    }
    rotated
}

const G: i32 = BACK_RANK_GUARD_BONUS;
const C: i32 = KING_CENTER_BONUS;

// Men gain value as they advance; guarding the back rank is worth keeping.
#[rustfmt::skip]
pub const BLACK_MAN_PST: Pst = [
    [  0,   G,   0,   G,   0,   G,   0,   G],
    [  0,   0,   0,   0,   0,   0,   0,   0],
    [  0,   1,   0,   2,   0,   2,   0,   1],
    [  2,   0,   4,   0,   4,   0,   2,   0],
    [  0,   4,   0,   6,   0,   6,   0,   3],
    [  5,   0,   8,   0,   8,   0,   6,   0],
    [  0,  10,   0,  12,   0,  12,   0,  10],
    [  0,   0,   0,   0,   0,   0,   0,   0],
];

#[rustfmt::skip]
pub const BLACK_KING_PST: Pst = [
    [  0,  -4,   0,  -2,   0,  -2,   0,  -4],
    [ -4,   0,   0,   0,   0,   0,   0,   0],
    [  0,   0,   0,   C,   0,   C,   0,   0],
    [  0,   0,   C,   0,   C,   0,   0,   0],
    [  0,   0,   0,   C,   0,   C,   0,   0],
    [  0,   0,   C,   0,   C,   0,   0,   0],
    [  0,   0,   0,   0,   0,   0,   0,  -4],
    [ -4,   0,  -2,   0,  -2,   0,  -4,   0],
];

pub const WHITE_MAN_PST: Pst = rotate(&BLACK_MAN_PST);
pub const WHITE_KING_PST: Pst = rotate(&BLACK_KING_PST);
