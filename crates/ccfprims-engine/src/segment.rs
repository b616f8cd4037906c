use bytes::{Buf, Bytes, BytesMut};
use ccfprims_buffer::{FragmentBuffer, PacketRef};
use ccfprims_wire::{decode_ccf_header, put_ccf_header, CcfHeader, SegmentSeq, CCF_HEADER_SIZE};

use crate::error::Result;

/// A CCF segment: header plus a zero-copy view of its content.
#[derive(Debug, Clone)]
pub struct CcfSegment {
    pub header: CcfHeader,
    pub payload: FragmentBuffer,
}

impl CcfSegment {
    pub fn new(header: CcfHeader, payload: FragmentBuffer) -> Self {
        Self { header, payload }
    }

    pub fn sequence(&self) -> SegmentSeq {
        SegmentSeq::new(self.header.sequence)
    }

    /// Content length, excluding the CCF header.
    pub fn len(&self) -> usize {
        self.payload.size()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn wire_size(&self) -> usize {
        CCF_HEADER_SIZE + self.payload.size()
    }

    /// Serialize as header followed by content.
    pub fn to_wire(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        put_ccf_header(&self.header, &mut dst)?;
        self.payload.copy_to(0, self.payload.size(), &mut dst)?;
        Ok(dst.freeze())
    }

    /// Parse a received segment. The content is referenced, not copied.
    pub fn from_wire(mut bytes: Bytes) -> Result<Self> {
        let header = decode_ccf_header(&bytes)?;
        bytes.advance(CCF_HEADER_SIZE);
        let payload = FragmentBuffer::from_packet(PacketRef::segment(header, bytes));
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use ccfprims_buffer::PacketKind;
    use ccfprims_wire::WireError;

    #[test]
    fn test_wire_roundtrip() {
        let mac = PacketRef::mac(3, b"hello").unwrap();
        let mut payload = FragmentBuffer::new();
        payload.insert(0, mac.clone(), 0, mac.len()).unwrap();
        let header = CcfHeader {
            pfi: true,
            sequence: 8191,
            request: 4,
            ..CcfHeader::default()
        };
        let segment = CcfSegment::new(header, payload);

        let wire = segment.to_wire().unwrap();
        assert_eq!(wire.len(), CCF_HEADER_SIZE + 9);
        assert_eq!(&wire[CCF_HEADER_SIZE..], mac.bytes().as_ref());

        let parsed = CcfSegment::from_wire(wire).unwrap();
        assert_eq!(parsed.header, header);
        assert_eq!(parsed.sequence(), SegmentSeq::new(8191));
        assert_eq!(parsed.payload.to_bytes(), mac.bytes().clone());
        let owner = parsed.payload.fragments()[0].owner();
        assert_eq!(owner.kind(), PacketKind::Segment(header));
    }

    #[test]
    fn test_from_wire_header_only() {
        let mut dst = BytesMut::new();
        put_ccf_header(&CcfHeader::default(), &mut dst).unwrap();

        let parsed = CcfSegment::from_wire(dst.freeze()).unwrap();
        assert!(parsed.is_empty());
        assert!(parsed.payload.fragments().is_empty());
    }

    #[test]
    fn test_from_wire_truncated() {
        let err = CcfSegment::from_wire(Bytes::from_static(&[0x80, 0x00])).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Wire(WireError::Truncated { available: 2, .. })
        ));
    }
}
