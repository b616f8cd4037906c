use bytes::{Bytes, BytesMut};
use ccfprims_wire::{decode_mac_header, MAC_HEADER_SIZE};
use tracing::trace;

use crate::error::{BufferError, Result};
use crate::packet::{PacketBuffer, PacketRef};

/// One run of a [`FragmentBuffer`]: `len` bytes of `owner` starting at
/// `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    owner: PacketRef,
    offset: usize,
    len: usize,
}

impl Fragment {
    pub fn owner(&self) -> &PacketRef {
        &self.owner
    }

    /// Start of the run within the owner.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// End of the run within the owner (exclusive).
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    fn as_slice(&self) -> &[u8] {
        &self.owner.bytes()[self.offset..self.end()]
    }

    fn same_owner(&self, owner: &PacketRef) -> bool {
        self.owner.ptr_eq(owner)
    }

    /// Whether `next` continues this run without a gap.
    fn joins(&self, next: &Fragment) -> bool {
        self.same_owner(&next.owner) && self.end() == next.offset
    }

    /// Whether `[begin, end)` of `owner` shares bytes with this run.
    fn intersects(&self, owner: &PacketRef, begin: usize, end: usize) -> bool {
        self.same_owner(owner) && begin < self.end() && self.offset < end
    }
}

/// How a [`FragmentBuffer`] answers [`FragmentBuffer::block_size_at`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockFormat {
    /// Ask the packet that owns the byte at the queried position.
    #[default]
    Delegate,
    /// Read a MAC header from the buffer itself, gathering its bytes across
    /// fragment boundaries. Reassembly accumulators use this, since a header
    /// may be split between two segments.
    MacHeader,
}

/// A piece table: an ordered list of [`Fragment`]s describing a logical byte
/// range without copying it.
///
/// The fragments always partition `[0, size())`, no fragment is empty, and no
/// two neighbours reference contiguous ranges of the same packet (those are
/// merged on every insert and erase).
#[derive(Debug, Clone, Default)]
pub struct FragmentBuffer {
    fragments: Vec<Fragment>,
    total: usize,
    format: BlockFormat,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: BlockFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// A buffer referencing the whole of `packet`.
    pub fn from_packet(packet: PacketRef) -> Self {
        let mut buf = Self::new();
        let len = packet.len();
        if len > 0 {
            buf.fragments.push(Fragment {
                owner: packet,
                offset: 0,
                len,
            });
            buf.total = len;
        }
        buf
    }

    pub fn format(&self) -> BlockFormat {
        self.format
    }

    pub fn size(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.total = 0;
    }

    /// Reference `owner[begin, end)` at logical position `pos`.
    ///
    /// Returns `Ok(false)` and changes nothing when the range is empty.
    pub fn insert(
        &mut self,
        pos: usize,
        owner: PacketRef,
        begin: usize,
        end: usize,
    ) -> Result<bool> {
        owner.check_range(begin, end)?;
        if begin == end {
            return Ok(false);
        }
        if pos > self.total {
            return Err(BufferError::OutOfRange {
                pos,
                size: self.total,
            });
        }

        let len = end - begin;
        let (i, szcur) = self.locate(pos);

        if szcur == pos {
            self.insert_at_boundary(i, owner, begin, end)?;
        } else {
            // Inside fragment i - 1.
            let split = pos - (szcur - self.fragments[i - 1].len);
            self.insert_inside(i - 1, split, owner, begin, end);
        }

        self.total += len;
        Ok(true)
    }

    /// Index of the first fragment boundary at or past `pos`, and the logical
    /// offset of that boundary.
    fn locate(&self, pos: usize) -> (usize, usize) {
        let mut szcur = 0;
        let mut i = 0;
        while i < self.fragments.len() && szcur < pos {
            szcur += self.fragments[i].len;
            i += 1;
        }
        (i, szcur)
    }

    fn insert_at_boundary(
        &mut self,
        i: usize,
        owner: PacketRef,
        begin: usize,
        end: usize,
    ) -> Result<()> {
        let left = i.checked_sub(1).map(|l| &self.fragments[l]);
        let right = self.fragments.get(i);

        if left.is_some_and(|f| f.intersects(&owner, begin, end))
            || right.is_some_and(|f| f.intersects(&owner, begin, end))
        {
            return Err(BufferError::Overlap { begin, end });
        }

        let merge_left = left.is_some_and(|f| f.same_owner(&owner) && f.end() == begin);
        let merge_right = right.is_some_and(|f| f.same_owner(&owner) && f.offset == end);
        let len = end - begin;

        match (merge_left, merge_right) {
            (true, true) => {
                let right = self.fragments.remove(i);
                self.fragments[i - 1].len += len + right.len;
            }
            (true, false) => self.fragments[i - 1].len += len,
            (false, true) => {
                let f = &mut self.fragments[i];
                f.offset = begin;
                f.len += len;
            }
            (false, false) => self.fragments.insert(
                i,
                Fragment {
                    owner,
                    offset: begin,
                    len,
                },
            ),
        }
        Ok(())
    }

    fn insert_inside(
        &mut self,
        idx: usize,
        split: usize,
        owner: PacketRef,
        begin: usize,
        end: usize,
    ) {
        let host = &mut self.fragments[idx];
        let mut right = Fragment {
            owner: host.owner.clone(),
            offset: host.offset + split,
            len: host.len - split,
        };
        host.len = split;
        trace!(packet = host.owner.id(), split, "splitting fragment for insert");

        let len = end - begin;
        if host.same_owner(&owner) && host.end() == begin {
            host.len += len;
            self.fragments.insert(idx + 1, right);
        } else if right.same_owner(&owner) && right.offset == end {
            right.offset = begin;
            right.len += len;
            self.fragments.insert(idx + 1, right);
        } else {
            self.fragments.insert(
                idx + 1,
                Fragment {
                    owner,
                    offset: begin,
                    len,
                },
            );
            self.fragments.insert(idx + 2, right);
        }
    }

    /// Remove logical bytes `[begin, end)`. `end` is clamped to `size()`.
    pub fn erase(&mut self, begin: usize, end: usize) -> Result<()> {
        let end = end.min(self.total);
        if begin == end {
            return Ok(());
        }
        if begin >= self.total {
            return Err(BufferError::OutOfRange {
                pos: begin,
                size: self.total,
            });
        }
        if begin > end {
            return Err(BufferError::InvalidRange { begin, end });
        }

        let mut pos = 0;
        let mut i = 0;
        while i < self.fragments.len() && pos < end {
            let f_start = pos;
            let f_end = pos + self.fragments[i].len;
            pos = f_end;
            if f_end <= begin {
                i += 1;
                continue;
            }

            let cut_lo = begin.max(f_start);
            let cut_hi = end.min(f_end);
            let cut = cut_hi - cut_lo;
            let f = &mut self.fragments[i];

            if cut_lo == f_start && cut_hi == f_end {
                self.fragments.remove(i);
            } else if cut_lo == f_start {
                f.offset += cut;
                f.len -= cut;
                i += 1;
            } else if cut_hi == f_end {
                f.len -= cut;
                i += 1;
            } else {
                let residual = Fragment {
                    owner: f.owner.clone(),
                    offset: f.offset + (cut_hi - f_start),
                    len: f_end - cut_hi,
                };
                f.len = cut_lo - f_start;
                self.fragments.insert(i + 1, residual);
                i += 2;
            }
        }

        self.total -= end - begin;
        self.coalesce_at(begin);
        Ok(())
    }

    /// Merge the two fragments meeting at logical position `pos`, if they
    /// continue each other.
    fn coalesce_at(&mut self, pos: usize) {
        let (i, szcur) = self.locate(pos);
        if szcur != pos || i == 0 || i >= self.fragments.len() {
            return;
        }
        if self.fragments[i - 1].joins(&self.fragments[i]) {
            let right = self.fragments.remove(i);
            self.fragments[i - 1].len += right.len;
        }
    }

    /// Shrink to `size` bytes.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        if size > self.total {
            return Err(BufferError::GrowUnsupported {
                size: self.total,
                requested: size,
            });
        }
        if size == self.total {
            return Ok(());
        }
        self.erase(size, self.total)
    }

    /// The packet whose fragment starts exactly at `pos` and covers that
    /// packet from its first byte.
    pub fn extract(&self, pos: usize) -> Option<PacketRef> {
        let (i, szcur) = self.locate(pos);
        let f = self.fragments.get(i)?;
        (szcur == pos && f.offset == 0).then(|| f.owner.clone())
    }

    /// Fragment index holding logical byte `pos`, with the fragment's logical
    /// start.
    fn find(&self, pos: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (i, f) in self.fragments.iter().enumerate() {
            if pos < start + f.len {
                return Some((i, start));
            }
            start += f.len;
        }
        None
    }

    /// The packet holding logical byte `pos`, the matching position inside
    /// that packet, and the end of the run it belongs to (also in packet
    /// coordinates).
    pub fn fragment_info(&self, pos: usize) -> Option<(PacketRef, usize, usize)> {
        let (i, start) = self.find(pos)?;
        let f = &self.fragments[i];
        Some((f.owner.clone(), f.offset + (pos - start), f.end()))
    }

    /// Byte at logical position `i`.
    pub fn at(&self, i: usize) -> Option<u8> {
        let (idx, start) = self.find(i)?;
        self.fragments[idx].as_slice().get(i - start).copied()
    }

    /// Size of the header-plus-content block starting at `pos`.
    pub fn block_size_at(&self, pos: usize) -> Option<usize> {
        match self.format {
            BlockFormat::Delegate => {
                let (owner, owner_pos, _) = self.fragment_info(pos)?;
                owner.block_size_at(owner_pos)
            }
            BlockFormat::MacHeader => {
                if self.total.saturating_sub(pos) < MAC_HEADER_SIZE {
                    return None;
                }
                let mut header = [0u8; MAC_HEADER_SIZE];
                for (k, byte) in header.iter_mut().enumerate() {
                    *byte = self.at(pos + k)?;
                }
                decode_mac_header(&header).ok().map(|h| h.packet_size())
            }
        }
    }

    fn check_range(&self, begin: usize, end: usize) -> Result<()> {
        if begin > end {
            return Err(BufferError::InvalidRange { begin, end });
        }
        if end > self.total {
            return Err(BufferError::OutOfRange {
                pos: end,
                size: self.total,
            });
        }
        Ok(())
    }

    /// Fragments overlapping `[begin, end)`, clipped to that range, as
    /// `(owner, owner_begin, owner_end)`.
    fn pieces(
        &self,
        begin: usize,
        end: usize,
    ) -> impl Iterator<Item = (&PacketRef, usize, usize)> + '_ {
        let mut start = 0;
        self.fragments.iter().filter_map(move |f| {
            let f_start = start;
            let f_end = start + f.len;
            start = f_end;
            if f_end <= begin || f_start >= end {
                return None;
            }
            let lo = begin.max(f_start) - f_start;
            let hi = end.min(f_end) - f_start;
            Some((&f.owner, f.offset + lo, f.offset + hi))
        })
    }

    /// Append logical bytes `[begin, end)` to `dst`.
    pub fn copy_to(&self, begin: usize, end: usize, dst: &mut BytesMut) -> Result<usize> {
        self.check_range(begin, end)?;
        dst.reserve(end - begin);
        for (owner, lo, hi) in self.pieces(begin, end) {
            dst.extend_from_slice(&owner.bytes()[lo..hi]);
        }
        Ok(end - begin)
    }

    /// Contiguous copy of the whole buffer. A buffer made of a single run is
    /// returned without copying.
    pub fn to_bytes(&self) -> Bytes {
        match self.fragments.as_slice() {
            [] => Bytes::new(),
            [f] => f.owner.bytes().slice(f.offset..f.end()),
            _ => {
                let mut dst = BytesMut::with_capacity(self.total);
                for f in &self.fragments {
                    dst.extend_from_slice(f.as_slice());
                }
                dst.freeze()
            }
        }
    }
}

impl PacketBuffer for FragmentBuffer {
    fn size(&self) -> usize {
        self.total
    }

    fn block_size_at(&self, pos: usize) -> Option<usize> {
        FragmentBuffer::block_size_at(self, pos)
    }

    fn copy_to(&self, begin: usize, end: usize, dst: &mut BytesMut) -> Result<usize> {
        FragmentBuffer::copy_to(self, begin, end, dst)
    }

    /// Inserts the underlying packet runs, so `peer` never references `self`.
    fn insert_to(
        &self,
        pos_peer: usize,
        peer: &mut FragmentBuffer,
        begin: usize,
        end: usize,
    ) -> Result<usize> {
        self.check_range(begin, end)?;
        let mut written = 0;
        for (owner, lo, hi) in self.pieces(begin, end) {
            if peer.insert(pos_peer + written, owner.clone(), lo, hi)? {
                written += hi - lo;
            }
        }
        Ok(written)
    }

    fn resize(&mut self, size: usize) -> Result<()> {
        FragmentBuffer::resize(self, size)
    }
}
