use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use ccfprims_wire::{decode_mac_header, encode_mac_packet, CcfHeader, MacHeader};

use crate::error::{BufferError, Result};
use crate::fragment::FragmentBuffer;

static NEXT_PACKET_ID: AtomicU64 = AtomicU64::new(1);

/// Byte containers that can take part in segmentation.
///
/// Both the immutable [`PacketRef`] and the [`FragmentBuffer`] piece table
/// implement this, so the packer and unpacker can move ranges between them
/// without caring which kind sits behind a position.
pub trait PacketBuffer {
    /// Number of bytes held.
    fn size(&self) -> usize;

    /// Interpret the bytes starting at `pos` as a MAC header followed by its
    /// content and return the total size of that block.
    ///
    /// Returns `None` if fewer than a full header's worth of bytes are
    /// available at `pos`.
    fn block_size_at(&self, pos: usize) -> Option<usize>;

    /// Append bytes `[begin, end)` to `dst`, returning the number copied.
    fn copy_to(&self, begin: usize, end: usize, dst: &mut BytesMut) -> Result<usize>;

    /// Make `peer` reference bytes `[begin, end)` of `self` at `pos_peer`
    /// without copying. Returns the number of bytes inserted.
    fn insert_to(
        &self,
        pos_peer: usize,
        peer: &mut FragmentBuffer,
        begin: usize,
        end: usize,
    ) -> Result<usize>;

    /// Shrink to `size` bytes.
    fn resize(&mut self, size: usize) -> Result<()>;
}

/// What the bytes behind a [`PacketRef`] are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// An outbound MAC packet; the bytes are the encoded header plus content.
    Mac(MacHeader),
    /// The content of a received CCF segment; the header is kept decoded.
    Segment(CcfHeader),
    /// Opaque bytes.
    Raw,
}

#[derive(Debug)]
struct Packet {
    id: u64,
    kind: PacketKind,
    bytes: Bytes,
}

/// A cheap, cloneable handle to an immutable packet.
///
/// Handles compare equal only when they point at the same packet; two packets
/// with identical bytes are still different owners.
#[derive(Clone)]
pub struct PacketRef(Arc<Packet>);

impl PacketRef {
    fn new(kind: PacketKind, bytes: Bytes) -> Self {
        Self(Arc::new(Packet {
            id: NEXT_PACKET_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            bytes,
        }))
    }

    /// Build an outbound MAC packet, encoding the header in front of
    /// `content` once.
    pub fn mac(sequence: u16, content: impl AsRef<[u8]>) -> Result<Self> {
        let content = content.as_ref();
        let mut bytes = BytesMut::new();
        encode_mac_packet(sequence, content, &mut bytes)?;
        let header = decode_mac_header(&bytes)?;
        Ok(Self::new(PacketKind::Mac(header), bytes.freeze()))
    }

    /// Wrap the content of a received CCF segment.
    pub fn segment(header: CcfHeader, content: Bytes) -> Self {
        Self::new(PacketKind::Segment(header), content)
    }

    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self::new(PacketKind::Raw, bytes.into())
    }

    /// Process-unique identifier, handy for logs.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> PacketKind {
        self.0.kind
    }

    /// The MAC header, for packets built with [`PacketRef::mac`].
    pub fn mac_header(&self) -> Option<MacHeader> {
        match self.0.kind {
            PacketKind::Mac(header) => Some(header),
            _ => None,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.0.bytes
    }

    pub fn len(&self) -> usize {
        self.0.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bytes.is_empty()
    }

    /// Whether both handles point at the same packet.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn check_range(&self, begin: usize, end: usize) -> Result<()> {
        if begin > end {
            return Err(BufferError::InvalidRange { begin, end });
        }
        if end > self.len() {
            return Err(BufferError::OutOfRange {
                pos: end,
                size: self.len(),
            });
        }
        Ok(())
    }
}

impl PartialEq for PacketRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for PacketRef {}

impl fmt::Debug for PacketRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketRef")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("len", &self.0.bytes.len())
            .finish()
    }
}

impl PacketBuffer for PacketRef {
    fn size(&self) -> usize {
        self.len()
    }

    fn block_size_at(&self, pos: usize) -> Option<usize> {
        let tail = self.0.bytes.get(pos..)?;
        decode_mac_header(tail).ok().map(|h| h.packet_size())
    }

    fn copy_to(&self, begin: usize, end: usize, dst: &mut BytesMut) -> Result<usize> {
        self.check_range(begin, end)?;
        dst.extend_from_slice(&self.0.bytes[begin..end]);
        Ok(end - begin)
    }

    fn insert_to(
        &self,
        pos_peer: usize,
        peer: &mut FragmentBuffer,
        begin: usize,
        end: usize,
    ) -> Result<usize> {
        if peer.insert(pos_peer, self.clone(), begin, end)? {
            Ok(end - begin)
        } else {
            Ok(0)
        }
    }

    fn resize(&mut self, size: usize) -> Result<()> {
        if size == self.len() {
            Ok(())
        } else {
            Err(BufferError::Immutable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccfprims_wire::MAC_HEADER_SIZE;

    #[test]
    fn test_mac_packet_layout() {
        let packet = PacketRef::mac(9, b"abcdef").unwrap();

        assert_eq!(packet.len(), MAC_HEADER_SIZE + 6);
        assert_eq!(&packet.bytes()[..4], &[0x00, 0x09, 0x00, 0x06]);
        assert_eq!(
            packet.mac_header(),
            Some(MacHeader {
                sequence: 9,
                length: 6
            })
        );
        assert_eq!(packet.block_size_at(0), Some(10));
    }

    #[test]
    fn test_block_size_needs_full_header() {
        let packet = PacketRef::raw(vec![0x00, 0x01, 0x00, 0x02, 0xAA, 0xBB]);
        assert_eq!(packet.block_size_at(0), Some(6));
        assert_eq!(packet.block_size_at(3), None);
        assert_eq!(packet.block_size_at(6), None);
        assert_eq!(packet.block_size_at(60), None);
    }

    #[test]
    fn test_identity_not_content() {
        let a = PacketRef::raw(&b"same"[..]);
        let b = PacketRef::raw(&b"same"[..]);
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_copy_to_range_checks() {
        let packet = PacketRef::raw(&b"0123456789"[..]);
        let mut dst = BytesMut::new();

        assert_eq!(packet.copy_to(2, 5, &mut dst).unwrap(), 3);
        assert_eq!(&dst[..], b"234");
        assert!(matches!(
            packet.copy_to(5, 2, &mut dst),
            Err(BufferError::InvalidRange { begin: 5, end: 2 })
        ));
        assert!(matches!(
            packet.copy_to(0, 11, &mut dst),
            Err(BufferError::OutOfRange { pos: 11, size: 10 })
        ));
    }

    #[test]
    fn test_resize_immutable() {
        let mut packet = PacketRef::raw(&b"xyz"[..]);
        assert!(packet.resize(3).is_ok());
        assert_eq!(packet.resize(2), Err(BufferError::Immutable));
    }

    #[test]
    fn test_insert_to_peer() {
        let packet = PacketRef::raw(&b"0123456789"[..]);
        let mut peer = FragmentBuffer::new();

        assert_eq!(packet.insert_to(0, &mut peer, 2, 6).unwrap(), 4);
        assert_eq!(packet.insert_to(4, &mut peer, 6, 6).unwrap(), 0);
        assert_eq!(peer.size(), 4);
        assert_eq!(peer.to_bytes().as_ref(), b"2345");
    }
}
