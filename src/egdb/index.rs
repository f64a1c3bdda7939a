//! Parsing of `.idx` files and the partition descriptor table.
//!
//! An index file is a sequence of records:
//!
//! ```text
//! BASE0,1,0,1,0,0,b:=
//! BASE1,0,0,1,3,0,w:0/17 5520 11210
//! ```
//!
//! The header names the composition, then the body is either a constant
//! verdict (`+`, `=`, `-`) or `first_block/start_byte` followed by the index at
//! which each further block of the partition begins.

use thiserror::Error;

use super::indexing::Composition;
use super::Verdict;
use crate::constants::BLOCK_SIZE;
use crate::game::board::Color;

const RECORD_TAG: &str = "BASE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("unexpected text before the first record: {0:?}")]
    Stray(String),
    #[error("record header has no ':' terminator: {0:?}")]
    Unterminated(String),
    #[error("expected 7 header fields, found {0}")]
    FieldCount(usize),
    #[error("invalid header field {0:?}")]
    InvalidField(String),
    #[error("composition {0:?} is outside the database limits")]
    OutOfRange(Composition),
    #[error("record body is empty")]
    EmptyBody,
    #[error("invalid block reference {0:?}")]
    InvalidBlock(String),
    #[error("start byte {0} lies outside a block")]
    StartOutOfBlock(usize),
    #[error("block boundaries must be strictly ascending")]
    NotAscending,
    #[error("partition ends at block {end} but the file holds {blocks}")]
    PastEndOfFile { end: u64, blocks: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartitionData {
    Constant(Verdict),
    Blocks {
        first_block: u64,
        start_byte: usize,
        /// `starts[k]` is the first index stored in the partition's `k`th block; `starts[0] == 0`.
        starts: Vec<u64>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    pub composition: Composition,
    pub data: PartitionData,
}

/// A registered partition together with where its blocks live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub file: usize,
    pub block_id_base: u64,
    pub data: PartitionData,
}

/// Parses every record of an index file. One malformed record does not
/// affect the others.
pub fn parse_index(text: &str) -> Vec<Result<IndexRecord, IndexError>> {
    let mut records = Vec::new();
    let mut chunks = text.split(RECORD_TAG);
    if let Some(preamble) = chunks.next() {
        let preamble = preamble.trim();
        if !preamble.is_empty() {
            records.push(Err(IndexError::Stray(preamble.to_string())));
        }
    }
    records.extend(chunks.map(parse_record));
    records
}

fn parse_record(chunk: &str) -> Result<IndexRecord, IndexError> {
    let chunk = chunk.trim();
    let (header, body) = chunk
        .split_once(':')
        .ok_or_else(|| IndexError::Unterminated(chunk.to_string()))?;
    let composition = parse_header(header)?;
    let data = parse_body(body)?;
    Ok(IndexRecord { composition, data })
}

fn parse_header(header: &str) -> Result<Composition, IndexError> {
    let fields: Vec<&str> = header.split(',').map(str::trim).collect();
    if fields.len() != 7 {
        return Err(IndexError::FieldCount(fields.len()));
    }
    let mut numbers = [0u8; 6];
    for (slot, field) in numbers.iter_mut().zip(&fields) {
        *slot = field
            .parse()
            .map_err(|_| IndexError::InvalidField(field.to_string()))?;
    }
    let side = match fields[6] {
        "b" | "B" => Color::Black,
        "w" | "W" => Color::White,
        other => return Err(IndexError::InvalidField(other.to_string())),
    };
    let [black_men, black_kings, white_men, white_kings, black_rank, white_rank] = numbers;
    let composition = Composition {
        black_men,
        black_kings,
        white_men,
        white_kings,
        black_rank,
        white_rank,
        side,
    };
    if composition.table_index().is_none() {
        return Err(IndexError::OutOfRange(composition));
    }
    Ok(composition)
}

fn parse_body(body: &str) -> Result<PartitionData, IndexError> {
    let mut tokens = body.split_whitespace();
    let head = tokens.next().ok_or(IndexError::EmptyBody)?;
    let verdict = match head {
        "+" => Some(Verdict::Win),
        "=" => Some(Verdict::Draw),
        "-" => Some(Verdict::Loss),
        _ => None,
    };
    if let Some(verdict) = verdict {
        return match tokens.next() {
            None => Ok(PartitionData::Constant(verdict)),
            Some(extra) => Err(IndexError::InvalidBlock(extra.to_string())),
        };
    }

    let (first, start) = head
        .split_once('/')
        .ok_or_else(|| IndexError::InvalidBlock(head.to_string()))?;
    let first_block: u64 = first
        .parse()
        .map_err(|_| IndexError::InvalidBlock(head.to_string()))?;
    let start_byte: usize = start
        .parse()
        .map_err(|_| IndexError::InvalidBlock(head.to_string()))?;
    if start_byte >= BLOCK_SIZE {
        return Err(IndexError::StartOutOfBlock(start_byte));
    }

    let mut starts = vec![0u64];
    for token in tokens {
        let boundary: u64 = token
            .parse()
            .map_err(|_| IndexError::InvalidBlock(token.to_string()))?;
        // An explicit boundary for the first block is redundant.
        if boundary == 0 && starts.len() == 1 {
            continue;
        }
        if starts.last().is_some_and(|&last| boundary <= last) {
            return Err(IndexError::NotAscending);
        }
        starts.push(boundary);
    }

    Ok(PartitionData::Blocks {
        first_block,
        start_byte,
        starts,
    })
}

/// Dense table of partitions keyed by [`Composition::table_index`]. Storage
/// is allocated on the first insert.
pub struct DescriptorTable {
    entries: Vec<Option<Partition>>,
    len: usize,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
        }
    }

    /// Registers a partition, replacing any earlier one for the same composition.
    pub fn insert(&mut self, composition: &Composition, partition: Partition) -> bool {
        let Some(slot) = composition.table_index() else {
            return false;
        };
        if self.entries.is_empty() {
            self.entries = vec![None; Composition::TABLE_SIZE];
        }
        if self.entries[slot].replace(partition).is_none() {
            self.len += 1;
        }
        true
    }

    pub fn get(&self, composition: &Composition) -> Option<&Partition> {
        self.entries.get(composition.table_index()?)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_constant_and_block_records() {
        let text = "BASE0,1,0,1,0,0,b:=\n BASE1,0,0,1,3,0,w:2/17 5520 11210\n";
        let records: Vec<IndexRecord> = parse_index(text).into_iter().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].composition.black_kings, 1);
        assert_eq!(records[0].data, PartitionData::Constant(Verdict::Draw));
        assert_eq!(records[1].composition.black_rank, 3);
        assert_eq!(records[1].composition.side, Color::White);
        assert_eq!(
            records[1].data,
            PartitionData::Blocks {
                first_block: 2,
                start_byte: 17,
                starts: vec![0, 5520, 11210],
            }
        );
    }

    #[test]
    fn test_single_block_partition_and_leading_zero() {
        let records = parse_index("BASE0,2,0,1,0,0,b:4/0\nBASE0,2,0,1,0,0,w:4/900 0 77");
        assert_eq!(
            records[0],
            Ok(IndexRecord {
                composition: records[0].as_ref().unwrap().composition,
                data: PartitionData::Blocks {
                    first_block: 4,
                    start_byte: 0,
                    starts: vec![0],
                },
            })
        );
        match &records[1].as_ref().unwrap().data {
            PartitionData::Blocks { starts, .. } => assert_eq!(starts, &vec![0, 77]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_records_do_not_poison_neighbours() {
        let text = "BASE0,1,0,1,0,0,b:+ BASE0,1,0:- BASE0,1,0,1,0,0,x:- \
                    BASE0,1,0,1,0,0,w 1/2 BASE9,0,0,1,0,0,b:= BASE0,1,0,1,0,0,b:0/2000 \
                    BASE0,1,0,1,0,0,b:0/2 50 40 BASE0,1,0,1,0,0,w:-";
        let records = parse_index(text);
        assert_eq!(records.len(), 8);
        assert!(records[0].is_ok());
        assert_eq!(records[1], Err(IndexError::FieldCount(3)));
        assert_eq!(records[2], Err(IndexError::InvalidField("x".into())));
        assert!(matches!(records[3], Err(IndexError::Unterminated(_))));
        assert!(matches!(records[4], Err(IndexError::OutOfRange(_))));
        assert_eq!(records[5], Err(IndexError::StartOutOfBlock(2000)));
        assert_eq!(records[6], Err(IndexError::NotAscending));
        assert_eq!(
            records[7].as_ref().unwrap().data,
            PartitionData::Constant(Verdict::Loss)
        );
    }

    #[test]
    fn test_stray_text_is_reported() {
        let records = parse_index("junk BASE0,1,0,1,0,0,b:=");
        assert_eq!(records[0], Err(IndexError::Stray("junk".into())));
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_descriptor_table_insert_and_get() {
        let record = parse_index("BASE0,1,0,1,0,0,b:=").remove(0).unwrap();
        let mut table = DescriptorTable::new();
        assert!(table.is_empty());
        let partition = Partition {
            file: 0,
            block_id_base: 0,
            data: record.data.clone(),
        };
        assert!(table.insert(&record.composition, partition.clone()));
        assert!(table.insert(&record.composition, partition.clone()));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&record.composition), Some(&partition));

        let other = Composition {
            side: Color::White,
            ..record.composition
        };
        assert_eq!(table.get(&other), None);
    }
}
