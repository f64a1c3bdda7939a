//! Endgame database lookup.
//!
//! A database directory holds `db{n}.cpr` files of run-length coded 1024-byte
//! blocks plus a companion `.idx` text index per file. Larger piece counts may
//! be split per material as `db{n}-{bm}{bk}{wm}{wk}.cpr`. Lookups never fail:
//! I/O problems degrade to [`Verdict::Unknown`].

pub mod cache;
pub mod decode;
pub mod index;
pub mod indexing;
#[cfg(test)]
pub mod testing;

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    BLOCK_SIZE, CACHE_FLOOR_EIGHT, CACHE_FLOOR_SEVEN, CACHE_FLOOR_SMALL, DEFAULT_EGDB_CACHE_MB,
    MAX_DB_PIECES, MAX_DB_PIECES_PER_SIDE, MIN_DB_PIECES,
};
use crate::game::board::{Board, Color};
use cache::{Block, BlockCache};
use index::{parse_index, DescriptorTable, IndexError, Partition, PartitionData};
use indexing::{canonical, position_index, Placement};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Win,
    Loss,
    Draw,
    /// The position is in range but its partition or block could not be read.
    Unknown,
    /// The position has too many pieces for the loaded databases.
    NotAvailable,
}

impl Verdict {
    fn from_digit(digit: u8) -> Verdict {
        match digit {
            0 => Verdict::Loss,
            1 => Verdict::Draw,
            2 => Verdict::Win,
            _ => Verdict::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Verdict::Win | Verdict::Loss | Verdict::Draw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EgdbConfig {
    /// Block cache budget in megabytes. Raised to a floor that grows with the
    /// largest database loaded.
    pub cache_mb: usize,
    /// Fill the cache from the start of each file during initialisation.
    pub preload: bool,
}

impl Default for EgdbConfig {
    fn default() -> Self {
        Self {
            cache_mb: DEFAULT_EGDB_CACHE_MB,
            preload: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EgdbStats {
    pub lookups: u64,
    pub constant_hits: u64,
    pub cache_hits: u64,
    pub disk_reads: u64,
}

struct DbFile {
    path: PathBuf,
    file: File,
    blocks: u64,
    block_id_base: u64,
}

pub struct Egdb {
    table: DescriptorTable,
    files: Vec<DbFile>,
    cache: BlockCache,
    max_pieces: usize,
    stats: EgdbStats,
}

/// Minimum resident blocks for databases of up to `pieces` pieces.
pub fn cache_floor(pieces: usize) -> usize {
    match pieces {
        0..=6 => CACHE_FLOOR_SMALL,
        7 => CACHE_FLOOR_SEVEN,
        _ => CACHE_FLOOR_EIGHT,
    }
}

/// Piece count encoded in a database file name, or `None` for foreign files.
fn database_pieces(file_name: &str) -> Option<usize> {
    let stem = file_name.strip_prefix("db")?.strip_suffix(".cpr")?;
    let (count, split) = match stem.split_once('-') {
        Some((count, split)) => (count, Some(split)),
        None => (stem, None),
    };
    if let Some(split) = split {
        if split.len() != 4 || !split.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    let pieces: usize = count.parse().ok()?;
    (MIN_DB_PIECES..=MAX_DB_PIECES)
        .contains(&pieces)
        .then_some(pieces)
}

fn discover(dir: &Path) -> io::Result<Vec<(PathBuf, usize)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(pieces) = path.file_name().and_then(|n| n.to_str()).and_then(database_pieces) else {
            continue;
        };
        if path.with_extension("idx").is_file() {
            found.push((path, pieces));
        } else {
            debug!("Skipping {}: no index file", path.display());
        }
    }
    found.sort();
    Ok(found)
}

fn read_block(file: &File, block: u64, buf: &mut Block) -> io::Result<()> {
    let mut reader = file;
    reader.seek(SeekFrom::Start(block * BLOCK_SIZE as u64))?;
    reader.read_exact(buf)
}

impl Egdb {
    /// An engine with no databases; every lookup is `NotAvailable`.
    pub fn disabled() -> Self {
        Self {
            table: DescriptorTable::new(),
            files: Vec::new(),
            cache: BlockCache::new(0),
            max_pieces: 0,
            stats: EgdbStats::default(),
        }
    }

    /// Loads every database found in `dir`. Falls back to a disabled engine
    /// when the directory is unreadable or holds no usable database.
    pub fn initialize(dir: &Path, config: &EgdbConfig) -> Self {
        let found = match discover(dir) {
            Ok(found) => found,
            Err(e) => {
                warn!("Endgame database directory {} is unreadable: {}", dir.display(), e);
                return Self::disabled();
            }
        };

        let mut egdb = Self::disabled();
        let mut next_block_id = 0u64;
        for (path, pieces) in found {
            match egdb.load_file(&path, pieces, next_block_id) {
                Ok(Some(blocks)) => next_block_id += blocks,
                Ok(None) => {}
                Err(e) => warn!("Skipping endgame database {}: {}", path.display(), e),
            }
        }

        if egdb.table.is_empty() {
            warn!("No endgame databases found in {}", dir.display());
            return Self::disabled();
        }

        let capacity = config.cache_mb.saturating_mul(1024).max(cache_floor(egdb.max_pieces));
        egdb.cache = BlockCache::new(capacity);
        if config.preload {
            egdb.preload();
        }
        info!(
            "Endgame databases ready: {} files, {} partitions, up to {} pieces, {} cache blocks",
            egdb.files.len(),
            egdb.table.len(),
            egdb.max_pieces,
            egdb.cache.capacity()
        );
        egdb
    }

    /// Registers the partitions of one database file. Returns the number of
    /// blocks the file occupies, or `None` when nothing in it was usable.
    fn load_file(&mut self, path: &Path, pieces: usize, block_id_base: u64) -> io::Result<Option<u64>> {
        let file = File::open(path)?;
        let blocks = file.metadata()?.len().div_ceil(BLOCK_SIZE as u64);
        let text = fs::read_to_string(path.with_extension("idx"))?;

        let file_id = self.files.len();
        let mut registered = 0;
        for record in parse_index(&text) {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("{}: skipping index record: {}", path.display(), e);
                    continue;
                }
            };
            if record.composition.pieces() != pieces {
                warn!(
                    "{}: skipping {:?}, expected {} pieces",
                    path.display(),
                    record.composition,
                    pieces
                );
                continue;
            }
            if let PartitionData::Blocks { first_block, starts, .. } = &record.data {
                let end = first_block.saturating_add(starts.len() as u64);
                if end > blocks {
                    let e = IndexError::PastEndOfFile { end, blocks };
                    warn!("{}: skipping {:?}: {}", path.display(), record.composition, e);
                    continue;
                }
            }
            let partition = Partition {
                file: file_id,
                block_id_base,
                data: record.data,
            };
            if self.table.insert(&record.composition, partition) {
                registered += 1;
            }
        }

        if registered == 0 {
            return Ok(None);
        }
        debug!("{}: {} partitions, {} blocks", path.display(), registered, blocks);
        self.files.push(DbFile {
            path: path.to_path_buf(),
            file,
            blocks,
            block_id_base,
        });
        self.max_pieces = self.max_pieces.max(pieces);
        Ok(Some(blocks))
    }

    fn preload(&mut self) {
        let Self { files, cache, .. } = self;
        'files: for db in files.iter() {
            for block in 0..db.blocks {
                if cache.is_full() {
                    break 'files;
                }
                if let Err(e) = cache.preload(db.block_id_base + block, |buf| read_block(&db.file, block, buf)) {
                    warn!("Preload of {} stopped at block {}: {}", db.path.display(), block, e);
                    continue 'files;
                }
            }
        }
        debug!("Preloaded {} blocks", cache.len());
    }

    /// Largest piece count covered, zero when disabled.
    pub fn max_pieces(&self) -> usize {
        self.max_pieces
    }

    pub fn is_enabled(&self) -> bool {
        self.max_pieces > 0
    }

    pub fn stats(&self) -> EgdbStats {
        self.stats
    }

    pub fn cache_capacity(&self) -> usize {
        if self.is_enabled() {
            self.cache.capacity()
        } else {
            0
        }
    }

    pub fn lookup(&mut self, board: &Board, side: Color) -> Verdict {
        self.stats.lookups += 1;
        let placement = Placement::from_board(board);
        let query = placement.composition(side);
        if !self.is_enabled()
            || query.pieces() > self.max_pieces
            || query.black_total() as usize > MAX_DB_PIECES_PER_SIDE
            || query.white_total() as usize > MAX_DB_PIECES_PER_SIDE
        {
            return Verdict::NotAvailable;
        }

        let (placement, side) = canonical(placement, side);
        let composition = placement.composition(side);

        let Self {
            table,
            files,
            cache,
            stats,
            ..
        } = self;
        let Some(partition) = table.get(&composition) else {
            return Verdict::Unknown;
        };
        let Some(db) = files.get(partition.file) else {
            return Verdict::Unknown;
        };

        let (first_block, start_byte, starts) = match &partition.data {
            PartitionData::Constant(verdict) => {
                stats.constant_hits += 1;
                return *verdict;
            }
            PartitionData::Blocks {
                first_block,
                start_byte,
                starts,
            } => (*first_block, *start_byte, starts),
        };

        let Some(target) = position_index(&composition, &placement) else {
            return Verdict::Unknown;
        };
        let Some(k) = starts.partition_point(|&s| s <= target).checked_sub(1) else {
            return Verdict::Unknown;
        };
        let block_number = first_block + k as u64;
        if block_number >= db.blocks {
            return Verdict::Unknown;
        }
        let block_id = partition.block_id_base + block_number;

        let mut loaded = false;
        let block = match cache.resolve(block_id, |buf| {
            loaded = true;
            read_block(&db.file, block_number, buf)
        }) {
            Ok(block) => block,
            Err(e) => {
                debug!("Block {} of {} unreadable: {}", block_number, db.path.display(), e);
                return Verdict::Unknown;
            }
        };
        if loaded {
            stats.disk_reads += 1;
        } else {
            stats.cache_hits += 1;
        }

        let lower = if k == 0 { start_byte } else { 0 };
        let digit = match starts.get(k + 1) {
            // Only blocks followed by another of the same partition are known
            // to end exactly at the block boundary.
            Some(&end) if end - target < target - starts[k] => {
                decode::find_backward(block, lower, BLOCK_SIZE, end, target)
            }
            _ => decode::find_forward(block, lower, starts[k], target),
        };
        digit.map_or(Verdict::Unknown, Verdict::from_digit)
    }
}

impl Default for Egdb {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests;
