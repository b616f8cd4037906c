//! Wire codecs for DOCSIS Concatenation and Fragmentation (CCF).
//!
//! Two fixed-size, bit-packed headers travel on the wire, both big-endian:
//! - The 8-byte CCF segment header (PFI, offmac, 13-bit sequence, SID cluster,
//!   piggyback request, HCS)
//! - The 4-byte generic MAC header (sequence, content length)
//!
//! The HCS field is carried as opaque cargo; nothing here validates it.

pub mod ccf;
pub mod error;
pub mod mac;
pub mod seq;

pub use ccf::{decode_ccf_header, encode_ccf_header, put_ccf_header, CcfHeader, CCF_HEADER_SIZE};
pub use error::{Result, WireError};
pub use mac::{
    decode_mac_header, decode_mac_packet, encode_mac_header, encode_mac_packet, MacHeader,
    MacPacket, MAC_HEADER_SIZE,
};
pub use seq::{SegmentSeq, SEQUENCE_SPACE};
