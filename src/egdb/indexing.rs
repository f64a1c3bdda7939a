//! Combinatorial position indexing inside a tablebase partition.
//!
//! A partition is fixed by its [`Composition`]: piece counts per type, the
//! rank of each colour's most advanced man and the side to move. Inside it a
//! position maps to one index by ranking each piece group as a colex subset
//! and combining the four ranks in mixed radix:
//!
//! ```text
//! ((black_men * wm_range + white_men) * bk_range + black_kings) * wk_range + white_kings
//! ```
//!
//! Men are ranked over all squares up to their rank row, so some indices
//! describe overlapping men and have no position. Kings are ranked over the
//! squares still free once the men (and, for white, the black kings) are placed.

use crate::constants::{MAX_DB_PIECES_PER_SIDE, PLAYABLE_SQUARES};
use crate::game::board::{Board, Color, PieceKind};

pub const RANKS: usize = 7;

const fn choose_table() -> [[u64; 33]; 33] {
    let mut table = [[0u64; 33]; 33];
    let mut n = 0;
    while n <= 32 {
        table[n][0] = 1;
        let mut k = 1;
        while k <= n {
            table[n][k] = table[n - 1][k - 1] + if k < n { table[n - 1][k] } else { 0 };
            k += 1;
        }
        n += 1;
    }
    table
}

/// `CHOOSE[n][k]` is the binomial coefficient, zero when `k > n`.
pub const CHOOSE: [[u64; 33]; 33] = choose_table();

fn choose(n: u32, k: u32) -> u64 {
    if n > 32 || k > 32 {
        return 0;
    }
    CHOOSE[n as usize][k as usize]
}

/// Identifies one tablebase partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Composition {
    pub black_men: u8,
    pub black_kings: u8,
    pub white_men: u8,
    pub white_kings: u8,
    pub black_rank: u8,
    pub white_rank: u8,
    pub side: Color,
}

impl Composition {
    pub const TABLE_SIZE: usize = 5 * 5 * 5 * 5 * RANKS * RANKS * 2;

    pub fn pieces(&self) -> usize {
        (self.black_men + self.black_kings + self.white_men + self.white_kings) as usize
    }

    pub fn black_total(&self) -> u8 {
        self.black_men + self.black_kings
    }

    pub fn white_total(&self) -> u8 {
        self.white_men + self.white_kings
    }

    /// Slot of this composition in a dense descriptor table.
    pub fn table_index(&self) -> Option<usize> {
        let per_side = MAX_DB_PIECES_PER_SIDE as u8;
        let counts = [self.black_men, self.black_kings, self.white_men, self.white_kings];
        if counts.iter().any(|&c| c > per_side)
            || self.black_rank as usize >= RANKS
            || self.white_rank as usize >= RANKS
        {
            return None;
        }
        let mut index = 0usize;
        for c in counts {
            index = index * 5 + c as usize;
        }
        index = index * RANKS + self.black_rank as usize;
        index = index * RANKS + self.white_rank as usize;
        Some(index * 2 + self.side.index())
    }

    fn men_range(men: u8, rank: u8) -> u64 {
        if men == 0 {
            return 1;
        }
        let r = rank as u32 * 4;
        choose(r + 4, men as u32) - choose(r, men as u32)
    }

    fn ranges(&self) -> [u64; 4] {
        let men = (self.black_men + self.white_men) as u32;
        [
            Self::men_range(self.black_men, self.black_rank),
            Self::men_range(self.white_men, self.white_rank),
            choose(PLAYABLE_SQUARES - men, self.black_kings as u32),
            choose(
                PLAYABLE_SQUARES - men - self.black_kings as u32,
                self.white_kings as u32,
            ),
        ]
    }

    /// Number of indices in the partition, including ones with overlapping men.
    pub fn size(&self) -> u64 {
        self.ranges().iter().product()
    }
}

/// Piece occupancy as playable-index masks, one per piece type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Placement {
    pub black_men: u32,
    pub black_kings: u32,
    pub white_men: u32,
    pub white_kings: u32,
}

impl Placement {
    pub fn from_board(board: &Board) -> Self {
        Self {
            black_men: board.bitmask(Color::Black, PieceKind::Man),
            black_kings: board.bitmask(Color::Black, PieceKind::King),
            white_men: board.bitmask(Color::White, PieceKind::Man),
            white_kings: board.bitmask(Color::White, PieceKind::King),
        }
    }

    pub fn to_board(&self) -> Board {
        Board::from_bitmasks(self.black_men, self.black_kings, self.white_men, self.white_kings)
    }

    /// Swaps colours and rotates the board half a turn.
    pub fn mirrored(&self) -> Self {
        Self {
            black_men: self.white_men.reverse_bits(),
            black_kings: self.white_kings.reverse_bits(),
            white_men: self.black_men.reverse_bits(),
            white_kings: self.black_kings.reverse_bits(),
        }
    }

    pub fn occupied(&self) -> u32 {
        self.black_men | self.black_kings | self.white_men | self.white_kings
    }

    pub fn composition(&self, side: Color) -> Composition {
        Composition {
            black_men: self.black_men.count_ones() as u8,
            black_kings: self.black_kings.count_ones() as u8,
            white_men: self.white_men.count_ones() as u8,
            white_kings: self.white_kings.count_ones() as u8,
            black_rank: man_rank(self.black_men),
            white_rank: man_rank(self.white_men.reverse_bits()),
            side,
        }
    }
}

/// Row of the most advanced man, counted from the owner's back rank.
fn man_rank(men: u32) -> u8 {
    if men == 0 {
        0
    } else {
        ((31 - men.leading_zeros()) / 4) as u8
    }
}

/// Whether a position must be colour-reversed to reach its stored orientation.
///
/// The stored side has at least as many pieces, then at least as many kings,
/// then the more advanced men. Fully balanced positions are stored with black
/// to move.
pub fn should_reverse(composition: &Composition) -> bool {
    let ordering = composition
        .white_total()
        .cmp(&composition.black_total())
        .then(composition.white_kings.cmp(&composition.black_kings))
        .then(composition.white_rank.cmp(&composition.black_rank));
    match ordering {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => composition.side == Color::White,
    }
}

/// The stored orientation of a position and the side to move in it.
pub fn canonical(placement: Placement, side: Color) -> (Placement, Color) {
    if should_reverse(&placement.composition(side)) {
        (placement.mirrored(), side.opposite())
    } else {
        (placement, side)
    }
}

fn colex_rank(mask: u32) -> u64 {
    let mut rank = 0;
    let mut rest = mask;
    let mut i = 1;
    while rest != 0 {
        let sq = rest.trailing_zeros();
        rank += choose(sq, i);
        rest &= rest - 1;
        i += 1;
    }
    rank
}

fn colex_unrank(mut rank: u64, count: u32, universe: u32) -> Option<u32> {
    let mut mask = 0;
    let mut limit = universe;
    for i in (1..=count).rev() {
        // Largest p below limit with C(p, i) <= rank.
        let mut p = limit.checked_sub(1)?;
        while choose(p, i) > rank {
            p = p.checked_sub(1)?;
        }
        rank -= choose(p, i);
        mask |= 1 << p;
        limit = p;
    }
    (rank == 0).then_some(mask)
}

/// Rewrites `mask` onto the squares left free by `occupied`, closing the gaps.
fn compress(mask: u32, occupied: u32) -> u32 {
    let mut out = 0;
    let mut slot = 0;
    for sq in 0..PLAYABLE_SQUARES {
        let bit = 1 << sq;
        if occupied & bit != 0 {
            continue;
        }
        if mask & bit != 0 {
            out |= 1 << slot;
        }
        slot += 1;
    }
    out
}

fn expand(compressed: u32, occupied: u32) -> u32 {
    let mut out = 0;
    let mut slot = 0;
    for sq in 0..PLAYABLE_SQUARES {
        let bit = 1 << sq;
        if occupied & bit != 0 {
            continue;
        }
        if compressed & (1 << slot) != 0 {
            out |= bit;
        }
        slot += 1;
    }
    out
}

fn men_index(men: u32, rank: u8) -> u64 {
    if men == 0 {
        return 0;
    }
    colex_rank(men) - choose(rank as u32 * 4, men.count_ones())
}

fn men_from_index(index: u64, count: u8, rank: u8) -> Option<u32> {
    if count == 0 {
        return (index == 0).then_some(0);
    }
    let base = choose(rank as u32 * 4, count as u32);
    let mask = colex_unrank(index + base, count as u32, rank as u32 * 4 + 4)?;
    (man_rank(mask) == rank).then_some(mask)
}

/// Index of `placement` inside the partition, or `None` when the placement
/// does not belong to it.
pub fn position_index(composition: &Composition, placement: &Placement) -> Option<u64> {
    if placement.composition(composition.side) != *composition {
        return None;
    }
    let [_, wm_range, bk_range, wk_range] = composition.ranges();
    let men = placement.black_men | placement.white_men;

    let bmi = men_index(placement.black_men, composition.black_rank);
    let wmi = men_index(placement.white_men.reverse_bits(), composition.white_rank);
    let bki = colex_rank(compress(placement.black_kings, men));
    let wki = colex_rank(compress(placement.white_kings, men | placement.black_kings));

    Some(((bmi * wm_range + wmi) * bk_range + bki) * wk_range + wki)
}

/// Inverse of [`position_index`]. Returns `None` for indices whose men overlap
/// and for indices outside the partition.
pub fn placement_from_index(composition: &Composition, index: u64) -> Option<Placement> {
    if index >= composition.size() {
        return None;
    }
    let [_, wm_range, bk_range, wk_range] = composition.ranges();
    let wki = index % wk_range;
    let rest = index / wk_range;
    let bki = rest % bk_range;
    let rest = rest / bk_range;
    let wmi = rest % wm_range;
    let bmi = rest / wm_range;

    let black_men = men_from_index(bmi, composition.black_men, composition.black_rank)?;
    let white_men =
        men_from_index(wmi, composition.white_men, composition.white_rank)?.reverse_bits();
    if black_men & white_men != 0 {
        return None;
    }
    let men = black_men | white_men;
    let free_for_black = PLAYABLE_SQUARES - men.count_ones();
    let black_kings = expand(
        colex_unrank(bki, composition.black_kings as u32, free_for_black)?,
        men,
    );
    let free_for_white = free_for_black - composition.black_kings as u32;
    let white_kings = expand(
        colex_unrank(wki, composition.white_kings as u32, free_for_white)?,
        men | black_kings,
    );

    Some(Placement {
        black_men,
        black_kings,
        white_men,
        white_kings,
    })
}
