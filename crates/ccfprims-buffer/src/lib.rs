//! Zero-copy byte ranges for CCF segmentation and reassembly.
//!
//! A [`FragmentBuffer`] describes a logical byte range as an ordered list of
//! `(packet, offset, length)` runs. It never owns or copies the referenced
//! bytes; every run holds a reference-counted [`PacketRef`], so a packet stays
//! alive for as long as any buffer points into it.

pub mod error;
pub mod fragment;
pub mod packet;

pub use error::{BufferError, Result};
pub use fragment::{BlockFormat, Fragment, FragmentBuffer};
pub use packet::{PacketBuffer, PacketKind, PacketRef};
