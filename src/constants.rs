// --- Scores ---
pub const WIN_SCORE: i32 = 1_000_000;
pub const LOSS_SCORE: i32 = -WIN_SCORE;
// Tablebase verdicts rank below over-the-board wins so the two stay distinguishable.
pub const TB_WIN_SCORE: i32 = 900_000;
pub const INFINITY: i32 = 2_000_000;
pub const DRAW_SCORE: i32 = 0;

// --- Piece values ---
pub const MAN_VALUE: i32 = 100;
pub const KING_VALUE: i32 = 130;

// Positional terms
pub const BACK_RANK_GUARD_BONUS: i32 = 6;
pub const KING_CENTER_BONUS: i32 = 4;

// --- Search ---
pub const MAX_DEPTH: u8 = 63;
pub const MAX_PLY: usize = 128;
pub const TIME_CHECK_INTERVAL: u64 = 1024;

// Null move pruning
pub const NULL_MOVE_REDUCTION: u8 = 2;
pub const NULL_MOVE_MIN_DEPTH: u8 = 2;
pub const NULL_MOVE_MIN_PIECES: usize = 8;

// Move ordering
pub const TT_MOVE_SCORE: i32 = 3_000_000;
pub const CAPTURE_SCORE: i32 = 2_000_000;
pub const KILLER_SCORES: [i32; 2] = [1_900_000, 1_800_000];

// --- Endgame database ---
pub const BLOCK_SIZE: usize = 1024;
pub const MAX_DB_PIECES: usize = 8;
pub const MAX_DB_PIECES_PER_SIDE: usize = 4;
pub const DEFAULT_EGDB_CACHE_MB: usize = 64;
pub const MIN_DB_PIECES: usize = 2;
pub const PLAYABLE_SQUARES: u32 = 32;

// Minimum resident blocks by largest database size
pub const CACHE_FLOOR_SMALL: usize = 1024;
pub const CACHE_FLOOR_SEVEN: usize = 8192;
pub const CACHE_FLOOR_EIGHT: usize = 32768;
