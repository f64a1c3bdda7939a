//! Run-length decoding of tablebase blocks.
//!
//! Every byte of a block is one code:
//! - `0..81` packs four positions as base-3 digits, least significant first;
//! - `81..255` is a run of a single value, `value = (b - 81) / 58` and
//!   `length = RUN_LENGTHS[(b - 81) % 58]`;
//! - `255` is never written.
//!
//! Digits are `0` loss, `1` draw, `2` win for the side to move.

pub const PACKED_CODES: u8 = 81;
pub const PACKED_LENGTH: u64 = 4;
pub const RUN_CLASSES: usize = 58;

#[rustfmt::skip]
pub const RUN_LENGTHS: [u64; RUN_CLASSES] = [
       5,   10,   15,   20,   25,   30,   35,   40,   45,   50,
      55,   60,   65,   70,   75,   80,   85,   90,   95,  100,
     110,  120,  130,  140,  150,  160,  170,  180,  190,  200,
     210,  220,  230,  240,  250,  260,  270,  280,  290,  300,
     400,  500,  600,  700,  800,  900, 1000, 1100, 1200, 1300,
    1400, 1500, 1600, 1700, 1800, 1900, 2000, 2100,
];

const POW3: [u8; 4] = [1, 3, 9, 27];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Packed(u8),
    Run { value: u8, length: u64 },
    Invalid,
}

impl Code {
    pub fn decode(byte: u8) -> Code {
        if byte < PACKED_CODES {
            return Code::Packed(byte);
        }
        let class = (byte - PACKED_CODES) as usize;
        if class >= 3 * RUN_CLASSES {
            return Code::Invalid;
        }
        Code::Run {
            value: (class / RUN_CLASSES) as u8,
            length: RUN_LENGTHS[class % RUN_CLASSES],
        }
    }

    /// Number of positions covered by this code.
    pub fn len(self) -> u64 {
        match self {
            Code::Packed(_) => PACKED_LENGTH,
            Code::Run { length, .. } => length,
            Code::Invalid => 0,
        }
    }

    /// The digit at `offset` positions into this code.
    pub fn value_at(self, offset: u64) -> Option<u8> {
        match self {
            Code::Packed(byte) if offset < PACKED_LENGTH => Some(byte / POW3[offset as usize] % 3),
            Code::Run { value, length } if offset < length => Some(value),
            _ => None,
        }
    }
}

/// Scans forward from `start_byte`, where position `start_index` begins.
pub fn find_forward(block: &[u8], start_byte: usize, start_index: u64, target: u64) -> Option<u8> {
    if target < start_index {
        return None;
    }
    let mut index = start_index;
    for &byte in block.get(start_byte..)? {
        let code = Code::decode(byte);
        if code == Code::Invalid {
            return None;
        }
        if target < index + code.len() {
            return code.value_at(target - index);
        }
        index += code.len();
    }
    None
}

/// Scans backward from `end_byte`, where position `end_index` begins, never
/// reading below `start_byte`.
pub fn find_backward(
    block: &[u8],
    start_byte: usize,
    end_byte: usize,
    end_index: u64,
    target: u64,
) -> Option<u8> {
    let mut index = end_index;
    for &byte in block.get(start_byte..end_byte)?.iter().rev() {
        let code = Code::decode(byte);
        if code == Code::Invalid {
            return None;
        }
        index = index.checked_sub(code.len())?;
        if target >= index {
            return code.value_at(target - index);
        }
    }
    None
}
