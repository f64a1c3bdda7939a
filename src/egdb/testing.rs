//! Fixture helpers: a run-length encoder matching the decoder and a writer
//! for small synthetic `.cpr`/`.idx` databases.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use super::decode::{PACKED_CODES, PACKED_LENGTH, RUN_CLASSES, RUN_LENGTHS};
use super::indexing::{placement_from_index, Composition, Placement};
use crate::constants::BLOCK_SIZE;
use crate::game::board::Color;

/// Greedy encoding: the longest run code that fits, else one packed byte.
pub fn encode(values: &[u8]) -> Vec<u8> {
    let mut codes = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let run = values[i..].iter().take_while(|&&v| v == value).count() as u64;
        if let Some(class) = RUN_LENGTHS.iter().rposition(|&len| len <= run) {
            codes.push(PACKED_CODES + value * RUN_CLASSES as u8 + class as u8);
            i += RUN_LENGTHS[class] as usize;
            continue;
        }
        let mut byte = 0u8;
        for (power, v) in values[i..].iter().take(PACKED_LENGTH as usize).enumerate() {
            byte += v * 3u8.pow(power as u32);
        }
        codes.push(byte);
        i += PACKED_LENGTH as usize;
    }
    codes
}

pub enum FixtureContent {
    /// `+`, `=` or `-`.
    Constant(char),
    /// One digit per partition index: 0 loss, 1 draw, 2 win.
    Values(Vec<u8>),
}

pub struct FixturePartition {
    pub composition: Composition,
    pub content: FixtureContent,
}

/// Digits for every index of `composition`; indices without a position get a draw.
pub fn values_for(composition: &Composition, verdict: impl Fn(&Placement) -> u8) -> Vec<u8> {
    (0..composition.size())
        .map(|index| placement_from_index(composition, index).map_or(1, |p| verdict(&p)))
        .collect()
}

/// Writes `{stem}.cpr` and `{stem}.idx` into `dir`. Block partitions are laid
/// out back to back in one code stream, so a partition may begin mid-block.
pub fn write_database(dir: &Path, stem: &str, partitions: &[FixturePartition]) -> io::Result<()> {
    let mut stream: Vec<u8> = Vec::new();
    let mut index_text = String::new();

    for partition in partitions {
        let c = &partition.composition;
        let side = match c.side {
            Color::Black => 'b',
            Color::White => 'w',
        };
        let _ = write!(
            index_text,
            "BASE{},{},{},{},{},{},{}:",
            c.black_men, c.black_kings, c.white_men, c.white_kings, c.black_rank, c.white_rank, side
        );
        match &partition.content {
            FixtureContent::Constant(verdict) => {
                let _ = writeln!(index_text, "{verdict}");
            }
            FixtureContent::Values(values) => {
                let begin = stream.len();
                let _ = write!(index_text, "{}/{}", begin / BLOCK_SIZE, begin % BLOCK_SIZE);
                let mut covered = 0u64;
                for byte in encode(values) {
                    if stream.len() % BLOCK_SIZE == 0 && stream.len() != begin {
                        let _ = write!(index_text, " {covered}");
                    }
                    covered += super::decode::Code::decode(byte).len();
                    stream.push(byte);
                }
                index_text.push('\n');
            }
        }
    }

    let padded = stream.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    stream.resize(padded, 0);
    fs::write(dir.join(format!("{stem}.cpr")), &stream)?;
    fs::write(dir.join(format!("{stem}.idx")), index_text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_prefers_runs() {
        let mut values = vec![2u8; 23];
        values.extend([0, 1, 2]);
        let codes = encode(&values);
        // 20 + 3 twos, then one packed byte holding 2,2,2,0 and one holding 1,2.
        assert_eq!(codes[0], PACKED_CODES + 2 * RUN_CLASSES as u8 + 3);
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[1], 2 + 2 * 3 + 2 * 9);
        assert_eq!(codes[2], 1 + 2 * 3);
    }
}
