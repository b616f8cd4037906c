use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{Result, WireError};

/// CCF segment header: 4 x 16-bit words = 8 bytes.
pub const CCF_HEADER_SIZE: usize = 8;

const PFI_BIT: u16 = 0x8000;
const RESERVED_BIT: u16 = 0x4000;
const OFFMAC_MASK: u16 = 0x3FFF;
const SC_MASK: u16 = 0x07;

/// Largest value the 14-bit offmac field can carry.
pub const OFFMAC_MAX: u16 = OFFMAC_MASK;
/// Largest value the 13-bit sequence field can carry.
pub const SEQUENCE_MAX: u16 = 0x1FFF;
/// Largest value the 3-bit SID cluster field can carry.
pub const SC_MAX: u8 = SC_MASK as u8;

/// The CCF segment header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CcfHeader {
    /// Packet Fragmentation Indicator: a MAC header starts inside this segment.
    pub pfi: bool,
    /// Reserved bit, carried verbatim.
    pub reserved: bool,
    /// Offset of the first MAC header within the segment content (14 bits).
    pub offmac: u16,
    /// Segment sequence number (13 bits, wraps at 8192).
    pub sequence: u16,
    /// SID cluster ID (3 bits).
    pub sc: u8,
    /// Piggyback bandwidth request, in multiplier units.
    pub request: u16,
    /// Header check sequence. Carried, never validated here.
    pub hcs: u16,
}

impl CcfHeader {
    /// Check that every field fits its bit width.
    pub fn validate(&self) -> Result<()> {
        if self.offmac > OFFMAC_MAX {
            return Err(WireError::FieldOverflow {
                field: "offmac",
                value: self.offmac as usize,
                max: OFFMAC_MAX as usize,
            });
        }
        if self.sequence > SEQUENCE_MAX {
            return Err(WireError::FieldOverflow {
                field: "sequence",
                value: self.sequence as usize,
                max: SEQUENCE_MAX as usize,
            });
        }
        if self.sc > SC_MAX {
            return Err(WireError::FieldOverflow {
                field: "sc",
                value: self.sc as usize,
                max: SC_MAX as usize,
            });
        }
        Ok(())
    }

    fn words(&self) -> [u16; 4] {
        let mut first = self.offmac & OFFMAC_MASK;
        if self.pfi {
            first |= PFI_BIT;
        }
        if self.reserved {
            first |= RESERVED_BIT;
        }
        let second = ((self.sequence & SEQUENCE_MAX) << 3) | (u16::from(self.sc) & SC_MASK);
        [first, second, self.request, self.hcs]
    }
}

/// Encode a CCF header into `dst`.
///
/// An empty `dst` writes nothing and returns the fixed header size, which is
/// how callers query [`CCF_HEADER_SIZE`] without a header at hand.
///
/// Wire format (big-endian):
/// ```text
/// ┌───┬───┬─────────────┬──────────────┬─────┬─────────┬─────────┐
/// │PFI│ R │ offmac (14) │ sequence (13)│sc(3)│ request │   HCS   │
/// │   bytes 0-1         │   bytes 2-3        │ (2B)    │  (2B)   │
/// └───┴───┴─────────────┴──────────────┴─────┴─────────┴─────────┘
/// ```
pub fn encode_ccf_header(header: &CcfHeader, dst: &mut [u8]) -> Result<usize> {
    if dst.is_empty() {
        return Ok(CCF_HEADER_SIZE);
    }
    if dst.len() < CCF_HEADER_SIZE {
        return Err(WireError::Truncated {
            needed: CCF_HEADER_SIZE,
            available: dst.len(),
        });
    }
    header.validate()?;

    for (chunk, word) in dst[..CCF_HEADER_SIZE]
        .chunks_exact_mut(2)
        .zip(header.words())
    {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    Ok(CCF_HEADER_SIZE)
}

/// Append an encoded CCF header to `dst`.
pub fn put_ccf_header(header: &CcfHeader, dst: &mut BytesMut) -> Result<()> {
    header.validate()?;
    dst.reserve(CCF_HEADER_SIZE);
    for word in header.words() {
        dst.put_u16(word);
    }
    Ok(())
}

/// Decode a CCF header from the first 8 bytes of `src`.
///
/// This is the exact inverse of [`encode_ccf_header`]. Bytes beyond the header
/// are ignored.
pub fn decode_ccf_header(src: &[u8]) -> Result<CcfHeader> {
    if src.len() < CCF_HEADER_SIZE {
        return Err(WireError::Truncated {
            needed: CCF_HEADER_SIZE,
            available: src.len(),
        });
    }

    let word = |i: usize| u16::from_be_bytes([src[i], src[i + 1]]);
    let first = word(0);
    let second = word(2);

    Ok(CcfHeader {
        pfi: first & PFI_BIT != 0,
        reserved: first & RESERVED_BIT != 0,
        offmac: first & OFFMAC_MASK,
        sequence: second >> 3,
        sc: (second & SC_MASK) as u8,
        request: word(4),
        hcs: word(6),
    })
}
