use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Result, WireError};

/// Generic MAC header: sequence (2) + length (2) = 4 bytes.
pub const MAC_HEADER_SIZE: usize = 4;

/// Largest content a MAC packet can describe.
pub const MAX_MAC_CONTENT: usize = u16::MAX as usize;

/// The generic MAC header placed in front of every upstream packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MacHeader {
    /// Packet sequence number.
    pub sequence: u16,
    /// Content length in bytes, excluding this header.
    pub length: u16,
}

impl MacHeader {
    /// Header plus content, as seen by the fragment layer.
    pub fn packet_size(&self) -> usize {
        MAC_HEADER_SIZE + self.length as usize
    }
}

/// A decoded MAC packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacPacket {
    pub header: MacHeader,
    pub content: Bytes,
}

impl MacPacket {
    /// The total wire size of this packet (header + content).
    pub fn wire_size(&self) -> usize {
        MAC_HEADER_SIZE + self.content.len()
    }
}

fn content_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| WireError::FieldOverflow {
        field: "length",
        value: len,
        max: MAX_MAC_CONTENT,
    })
}

/// Encode a MAC header into `dst`.
///
/// An empty `dst` writes nothing and returns [`MAC_HEADER_SIZE`].
///
/// Wire format (big-endian):
/// ```text
/// ┌───────────────┬───────────────┐
/// │ Sequence (2B) │ Length (2B)   │
/// └───────────────┴───────────────┘
/// ```
pub fn encode_mac_header(header: &MacHeader, dst: &mut [u8]) -> Result<usize> {
    if dst.is_empty() {
        return Ok(MAC_HEADER_SIZE);
    }
    if dst.len() < MAC_HEADER_SIZE {
        return Err(WireError::Truncated {
            needed: MAC_HEADER_SIZE,
            available: dst.len(),
        });
    }
    dst[0..2].copy_from_slice(&header.sequence.to_be_bytes());
    dst[2..4].copy_from_slice(&header.length.to_be_bytes());
    Ok(MAC_HEADER_SIZE)
}

/// Decode a MAC header from the first 4 bytes of `src`.
pub fn decode_mac_header(src: &[u8]) -> Result<MacHeader> {
    if src.len() < MAC_HEADER_SIZE {
        return Err(WireError::Truncated {
            needed: MAC_HEADER_SIZE,
            available: src.len(),
        });
    }
    Ok(MacHeader {
        sequence: u16::from_be_bytes([src[0], src[1]]),
        length: u16::from_be_bytes([src[2], src[3]]),
    })
}

/// Append a MAC header and `content` to `dst`.
pub fn encode_mac_packet(sequence: u16, content: &[u8], dst: &mut BytesMut) -> Result<()> {
    let length = content_length(content.len())?;
    dst.reserve(MAC_HEADER_SIZE + content.len());
    dst.put_u16(sequence);
    dst.put_u16(length);
    dst.put_slice(content);
    Ok(())
}

/// Decode one MAC packet from the front of `src`.
///
/// Returns `Ok(None)` if `src` doesn't hold a complete packet yet. On success,
/// the packet bytes are consumed from `src`; the content shares its storage.
pub fn decode_mac_packet(src: &mut Bytes) -> Result<Option<MacPacket>> {
    if src.len() < MAC_HEADER_SIZE {
        return Ok(None);
    }
    let header = decode_mac_header(src)?;
    if src.len() < header.packet_size() {
        return Ok(None);
    }

    src.advance(MAC_HEADER_SIZE);
    let content = src.split_to(header.length as usize);
    Ok(Some(MacPacket { header, content }))
}
