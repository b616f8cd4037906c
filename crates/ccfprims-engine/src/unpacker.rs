use ccfprims_buffer::{BlockFormat, FragmentBuffer, PacketBuffer};
use ccfprims_wire::SegmentSeq;
use tracing::{debug, trace, warn};

use crate::config::{validate_multiplier, UnpackerConfig};
use crate::error::Result;
use crate::hooks::UnpackHooks;
use crate::segment::CcfSegment;

/// A received segment waiting in the reassembly window.
#[derive(Debug)]
struct Entry {
    /// Arrival order.
    id: u64,
    segment: CcfSegment,
    /// Bytes `[0, lead)` still owed to the packet before this segment's first
    /// MAC header.
    lead: usize,
    /// First byte not yet folded into a packet.
    next: usize,
    arrived_at: f64,
}

impl Entry {
    fn seq(&self) -> SegmentSeq {
        self.segment.sequence()
    }

    fn len(&self) -> usize {
        self.segment.len()
    }

    fn pfi(&self) -> bool {
        self.segment.header.pfi
    }

    fn offmac(&self) -> usize {
        self.segment.header.offmac as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum Retire {
    Recycle,
    Drop,
}

enum Step {
    Advance,
    Complete(usize),
    Corrupt,
}

fn accumulator() -> FragmentBuffer {
    FragmentBuffer::with_format(BlockFormat::MacHeader)
}

/// Size of the packet in `acc` once all of it is present.
fn complete_size(acc: &FragmentBuffer) -> Option<usize> {
    acc.block_size_at(0).filter(|&block| acc.size() >= block)
}

/// Reassembles MAC packets from CCF segments arriving in any order.
///
/// Segments are kept in a window sorted by sequence number. Each
/// [`process`](Self::process) call walks the run of consecutive sequence
/// numbers (modulo 8192) around the new segment, gathers MAC packets into a
/// [`FragmentBuffer`] accumulator, and reports them through
/// [`UnpackHooks::signify_packet`]. Segments leave the window once every byte
/// they carry has been delivered, or when they turn out to be corrupted.
#[derive(Debug)]
pub struct Unpacker<H> {
    config: UnpackerConfig,
    hooks: H,
    window: Vec<Entry>,
    arrivals: u64,
    hook_failures: u64,
}

impl<H: UnpackHooks> Unpacker<H> {
    /// Create an unpacker with the default configuration.
    pub fn new(hooks: H) -> Self {
        Self {
            config: UnpackerConfig::default(),
            hooks,
            window: Vec::new(),
            arrivals: 0,
            hook_failures: 0,
        }
    }

    pub fn with_config(config: UnpackerConfig, hooks: H) -> Result<Self> {
        config.validate()?;
        let mut unpacker = Self::new(hooks);
        unpacker.config = config;
        Ok(unpacker)
    }

    pub fn config(&self) -> &UnpackerConfig {
        &self.config
    }

    pub fn piggyback_multiplier(&self) -> usize {
        self.config.piggyback_multiplier
    }

    pub fn set_piggyback_multiplier(&mut self, multiplier: usize) -> Result<()> {
        validate_multiplier(multiplier)?;
        self.config.piggyback_multiplier = multiplier;
        Ok(())
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Segments currently buffered.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Packets or piggyback reports the collaborator refused.
    pub fn hook_failures(&self) -> u64 {
        self.hook_failures
    }

    /// Sequence numbers in the window, in window order.
    pub fn window_sequences(&self) -> Vec<SegmentSeq> {
        self.window.iter().map(Entry::seq).collect()
    }

    /// Accept `segment` (if any) and deliver every packet that can now be
    /// completed.
    ///
    /// With a segment, only the run it joins is walked. Without one, every
    /// run in the window is retried. Returns the number of packets delivered.
    pub fn process(&mut self, segment: Option<CcfSegment>) -> Result<usize> {
        let now = self.hooks.current_time();
        let completed = match segment {
            Some(segment) => {
                let anchor = self.admit(segment, now);
                self.walk_run(anchor)?
            }
            None => self.walk_all()?,
        };

        self.evict(now);
        Ok(completed)
    }

    /// Drop segments that have waited longer than the configured stall
    /// timeout. Returns how many were dropped.
    pub fn evict_stale(&mut self) -> usize {
        let now = self.hooks.current_time();
        self.evict(now)
    }

    /// Drop every buffered segment.
    pub fn clear(&mut self) {
        for entry in std::mem::take(&mut self.window) {
            self.hooks.drop_segment(entry.segment);
        }
    }

    /// Report the piggyback request and put `segment` into the window.
    /// Returns its window index.
    fn admit(&mut self, segment: CcfSegment, now: f64) -> usize {
        let header = segment.header;
        if header.request > 0 {
            let request = header.request as usize * self.config.piggyback_multiplier;
            if let Err(e) = self.hooks.signify_piggyback(header.sc, request) {
                self.hook_failures += 1;
                warn!(error = %e, sc = header.sc, request, "failed reporting piggyback");
            }
        }

        let start = if header.pfi { header.offmac as usize } else { 0 };
        trace!(
            sequence = header.sequence,
            pfi = header.pfi,
            offmac = header.offmac,
            len = segment.len(),
            "segment received"
        );
        self.arrivals += 1;
        self.insert_sorted(Entry {
            id: self.arrivals,
            segment,
            lead: start,
            next: start,
            arrived_at: now,
        })
    }

    /// Insert after any entries with the same sequence number.
    fn insert_sorted(&mut self, entry: Entry) -> usize {
        let seq = entry.seq().get();
        let idx = self.window.partition_point(|e| e.seq().get() <= seq);
        self.window.insert(idx, entry);
        idx
    }

    /// Window indices of the run of consecutive sequence numbers through
    /// `anchor`, in walk order. The window is treated as a ring so that 8191
    /// runs into 0.
    fn run_order(&self, anchor: usize) -> Vec<usize> {
        let n = self.window.len();
        let prev = |i: usize| (i + n - 1) % n;
        let follows = |a: usize, b: usize| self.window[b].seq().follows(self.window[a].seq());

        let mut start = anchor;
        let mut span = 1;
        while span < n && follows(prev(start), start) {
            start = prev(start);
            span += 1;
        }

        let mut order = vec![start];
        let mut i = start;
        while order.len() < n && follows(i, (i + 1) % n) {
            i = (i + 1) % n;
            order.push(i);
        }
        order
    }

    /// First sequence number of every run, in window order.
    fn run_heads(&self) -> Vec<SegmentSeq> {
        let n = self.window.len();
        let heads: Vec<SegmentSeq> = (0..n)
            .filter(|&i| {
                let prev = self.window[(i + n - 1) % n].seq();
                !self.window[i].seq().follows(prev)
            })
            .map(|i| self.window[i].seq())
            .collect();
        match self.window.first() {
            // One run closing the whole ring has no head; start anywhere.
            Some(first) if heads.is_empty() => vec![first.seq()],
            _ => heads,
        }
    }

    fn walk_all(&mut self) -> Result<usize> {
        let mut completed = 0;
        for head in self.run_heads() {
            let idx = self.window.partition_point(|e| e.seq().get() < head.get());
            if self.window.get(idx).is_some_and(|e| e.seq() == head) {
                completed += self.walk_run(idx)?;
            }
        }
        Ok(completed)
    }

    /// Walk the run through `anchor` and put back whatever it leaves.
    fn walk_run(&mut self, anchor: usize) -> Result<usize> {
        let mut run = self.take_run(anchor);
        let walked = self.walk(&mut run);
        for entry in run.into_iter().flatten() {
            self.insert_sorted(entry);
        }
        walked
    }

    /// Move the run through `anchor` out of the window.
    fn take_run(&mut self, anchor: usize) -> Vec<Option<Entry>> {
        let order = self.run_order(anchor);
        let mut slots: Vec<Option<Entry>> = std::mem::take(&mut self.window)
            .into_iter()
            .map(Some)
            .collect();
        let run = order.iter().map(|&i| slots[i].take()).collect();
        self.window = slots.into_iter().flatten().collect();
        run
    }

    fn walk(&mut self, run: &mut [Option<Entry>]) -> Result<usize> {
        let mut acc = accumulator();
        let mut start = 0;
        let mut completed = 0;
        let mut i = 0;

        while i < run.len() {
            let Some(cur) = run[i].as_mut() else {
                i += 1;
                continue;
            };
            let len = cur.len();

            if cur.pfi() && cur.offmac() >= len {
                warn!(
                    sequence = %cur.seq(),
                    offmac = cur.offmac(),
                    len,
                    "MAC header offset beyond segment content"
                );
                if !acc.is_empty() {
                    self.retire(run, start, i, Retire::Drop);
                    acc.clear();
                }
                self.discard(run, i, Retire::Drop);
                i += 1;
                continue;
            }
            if cur.pfi() {
                cur.next = cur.next.max(cur.offmac());
            }

            let step = if acc.is_empty() {
                if cur.next >= len {
                    if cur.lead == 0 {
                        self.discard(run, i, Retire::Recycle);
                    }
                    i += 1;
                    continue;
                }
                if !cur.pfi() {
                    trace!(sequence = %cur.seq(), "no packet start before segment yet");
                    i += 1;
                    continue;
                }
                start = i;
                cur.segment
                    .payload
                    .insert_to(acc.size(), &mut acc, cur.next, len)?;
                match complete_size(&acc) {
                    Some(block) => {
                        cur.next = len - (acc.size() - block);
                        Step::Complete(block)
                    }
                    None => Step::Advance,
                }
            } else if cur.pfi() {
                cur.segment
                    .payload
                    .insert_to(acc.size(), &mut acc, 0, cur.lead)?;
                cur.lead = 0;
                match complete_size(&acc) {
                    Some(block) => Step::Complete(block),
                    None => Step::Corrupt,
                }
            } else {
                cur.segment
                    .payload
                    .insert_to(acc.size(), &mut acc, cur.next, len)?;
                match complete_size(&acc) {
                    Some(block) => {
                        cur.next = len - (acc.size() - block);
                        Step::Complete(block)
                    }
                    None => Step::Advance,
                }
            };

            match step {
                Step::Advance => i += 1,
                Step::Complete(block) => {
                    acc.resize(block)?;
                    let packet = std::mem::replace(&mut acc, accumulator());
                    debug!(size = block, segments = i - start + 1, "reassembled packet");
                    if let Err(e) = self.hooks.signify_packet(packet) {
                        self.hook_failures += 1;
                        warn!(error = %e, "failed delivering packet");
                    }
                    completed += 1;
                    self.retire(run, start, i, Retire::Recycle);
                    start = i;
                    self.reject_stray_tail(run, i);
                }
                Step::Corrupt => {
                    warn!(
                        first = start,
                        last = i,
                        "packet contradicted by a MAC header start"
                    );
                    self.retire(run, start, i, Retire::Drop);
                    acc.clear();
                    start = i;
                }
            }
        }

        Ok(completed)
    }

    /// A packet that ended inside a segment without a PFI leaves bytes no
    /// header accounts for; the segment cannot be parsed any further.
    fn reject_stray_tail(&mut self, run: &mut [Option<Entry>], i: usize) {
        let stray = run[i]
            .as_ref()
            .is_some_and(|e| !e.pfi() && e.next < e.len());
        if stray {
            warn!("packet ended inside a segment without a MAC header start");
            self.discard(run, i, Retire::Drop);
        }
    }

    /// Release `run[from..to]`. A first entry still owing its lead bytes to
    /// an earlier packet stays, marked as fully parsed.
    fn retire(&mut self, run: &mut [Option<Entry>], from: usize, to: usize, how: Retire) {
        for k in from..to {
            if k == from {
                if let Some(entry) = run[k].as_mut().filter(|e| e.lead > 0) {
                    entry.next = entry.len();
                    continue;
                }
            }
            self.discard(run, k, how);
        }
    }

    fn discard(&mut self, run: &mut [Option<Entry>], k: usize, how: Retire) {
        let Some(entry) = run[k].take() else {
            return;
        };
        match how {
            Retire::Recycle => {
                trace!(sequence = %entry.seq(), "segment consumed");
                self.hooks.recycle_segment(entry.segment);
            }
            Retire::Drop => {
                warn!(sequence = %entry.seq(), len = entry.len(), "dropping segment");
                self.hooks.drop_segment(entry.segment);
            }
        }
    }

    fn evict(&mut self, now: f64) -> usize {
        let mut evicted = 0;

        if let Some(timeout) = self.config.stall_timeout {
            let (stale, fresh): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.window)
                .into_iter()
                .partition(|e| e.arrived_at + timeout < now);
            self.window = fresh;
            for entry in stale {
                warn!(
                    sequence = %entry.seq(),
                    waited = now - entry.arrived_at,
                    "evicting stalled segment"
                );
                self.hooks.drop_segment(entry.segment);
                evicted += 1;
            }
        }

        while self.window.len() > self.config.max_window_segments {
            let Some(oldest) = self
                .window
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.id)
                .map(|(k, _)| k)
            else {
                break;
            };
            let entry = self.window.remove(oldest);
            warn!(sequence = %entry.seq(), "window full, evicting oldest segment");
            self.hooks.drop_segment(entry.segment);
            evicted += 1;
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::hooks::HookResult;
    use bytes::Bytes;
    use ccfprims_buffer::PacketRef;
    use ccfprims_wire::CcfHeader;

    #[derive(Default)]
    struct Collector {
        now: f64,
        packets: Vec<Bytes>,
        piggyback: Vec<(u8, usize)>,
        recycled: Vec<u16>,
        dropped: Vec<u16>,
        refuse: bool,
    }

    impl UnpackHooks for Collector {
        fn signify_packet(&mut self, packet: FragmentBuffer) -> HookResult {
            if self.refuse {
                return Err(HookError::Rejected("full".into()));
            }
            self.packets.push(packet.to_bytes());
            Ok(())
        }

        fn signify_piggyback(&mut self, sc: u8, request: usize) -> HookResult {
            self.piggyback.push((sc, request));
            Ok(())
        }

        fn recycle_segment(&mut self, segment: CcfSegment) {
            self.recycled.push(segment.header.sequence);
        }

        fn drop_segment(&mut self, segment: CcfSegment) {
            self.dropped.push(segment.header.sequence);
        }

        fn current_time(&self) -> f64 {
            self.now
        }
    }

    fn mac(sequence: u16, content: &[u8]) -> Bytes {
        PacketRef::mac(sequence, content).unwrap().bytes().clone()
    }

    fn segment(sequence: u16, pfi: Option<u16>, content: &[u8]) -> CcfSegment {
        let header = CcfHeader {
            pfi: pfi.is_some(),
            offmac: pfi.unwrap_or(0),
            sequence,
            ..CcfHeader::default()
        };
        let owner = PacketRef::segment(header, Bytes::copy_from_slice(content));
        CcfSegment::new(header, FragmentBuffer::from_packet(owner))
    }

    fn concat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn test_single_segment_packet() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"abcdef");

        let n = unpacker.process(Some(segment(0, Some(0), &packet))).unwrap();

        assert_eq!(n, 1);
        assert_eq!(unpacker.hooks().packets, vec![packet]);
        assert_eq!(unpacker.hooks().recycled, vec![0]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_packet_across_two_segments() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"abcdef");

        assert_eq!(
            unpacker
                .process(Some(segment(5, Some(0), &packet[..6])))
                .unwrap(),
            0
        );
        assert_eq!(unpacker.window_len(), 1);

        assert_eq!(
            unpacker
                .process(Some(segment(6, None, &packet[6..])))
                .unwrap(),
            1
        );
        assert_eq!(unpacker.hooks().packets, vec![packet]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_header_split_between_segments() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"abcdef");

        // Only two header bytes in the first segment.
        unpacker
            .process(Some(segment(0, Some(0), &packet[..2])))
            .unwrap();
        unpacker
            .process(Some(segment(1, None, &packet[2..])))
            .unwrap();

        assert_eq!(unpacker.hooks().packets, vec![packet]);
    }

    #[test]
    fn test_out_of_order_with_lead_bytes() {
        let mut unpacker = Unpacker::new(Collector::default());
        let first = mac(1, b"0123456789");
        let second = mac(2, b"abc");

        // seg0: first[0..6]; seg1: first[6..14] then second (offmac 8).
        let seg0 = segment(0, Some(0), &first[..6]);
        let seg1 = segment(1, Some(8), &concat(&[&first[6..], &second]));

        assert_eq!(unpacker.process(Some(seg1)).unwrap(), 1);
        assert_eq!(unpacker.hooks().packets, vec![second.clone()]);
        // seg1 still owes its lead bytes.
        assert_eq!(unpacker.window_len(), 1);

        assert_eq!(unpacker.process(Some(seg0)).unwrap(), 1);
        assert_eq!(unpacker.hooks().packets, vec![second, first]);
        assert_eq!(unpacker.window_len(), 0);
        assert!(unpacker.hooks().dropped.is_empty());
    }

    #[test]
    fn test_kept_start_does_not_repeat_packet() {
        let mut unpacker = Unpacker::new(Collector::default());
        let before = mac(1, b"zz");
        let packet = mac(2, b"0123456789");

        // seg4 owes 3 bytes to a packet from seg3, then starts `packet`.
        let seg3 = segment(3, Some(0), &before[..3]);
        let seg4 = segment(4, Some(3), &concat(&[&before[3..], &packet[..5]]));
        let seg5 = segment(5, None, &packet[5..]);

        unpacker.process(Some(seg4)).unwrap();
        assert_eq!(unpacker.process(Some(seg5)).unwrap(), 1);
        assert_eq!(unpacker.hooks().packets, vec![packet.clone()]);
        assert_eq!(unpacker.window_len(), 1);

        assert_eq!(unpacker.process(Some(seg3)).unwrap(), 1);
        assert_eq!(unpacker.hooks().packets, vec![packet, before]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_several_packets_in_one_segment() {
        let mut unpacker = Unpacker::new(Collector::default());
        let a = mac(1, b"a");
        let b = mac(2, b"bb");
        let c = mac(3, b"ccc");

        let n = unpacker
            .process(Some(segment(0, Some(0), &concat(&[&a, &b, &c]))))
            .unwrap();

        assert_eq!(n, 3);
        assert_eq!(unpacker.hooks().packets, vec![a, b, c]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_sequence_wraparound_is_contiguous() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"wraparound");

        unpacker
            .process(Some(segment(0, None, &packet[7..])))
            .unwrap();
        unpacker
            .process(Some(segment(8191, Some(0), &packet[..7])))
            .unwrap();

        assert_eq!(unpacker.hooks().packets, vec![packet]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_gap_keeps_segments_waiting() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"0123456789");

        unpacker
            .process(Some(segment(10, Some(0), &packet[..5])))
            .unwrap();
        unpacker
            .process(Some(segment(12, None, &packet[10..])))
            .unwrap();
        assert!(unpacker.hooks().packets.is_empty());
        assert_eq!(unpacker.window_len(), 2);

        unpacker
            .process(Some(segment(11, None, &packet[5..10])))
            .unwrap();
        assert_eq!(unpacker.hooks().packets, vec![packet]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_offmac_beyond_content_is_dropped() {
        let mut unpacker = Unpacker::new(Collector::default());
        let good = mac(2, b"fine");

        assert_eq!(
            unpacker
                .process(Some(segment(7, Some(40), b"short")))
                .unwrap(),
            0
        );
        assert_eq!(unpacker.hooks().dropped, vec![7]);

        assert_eq!(
            unpacker.process(Some(segment(8, Some(0), &good))).unwrap(),
            1
        );
        assert_eq!(unpacker.hooks().packets, vec![good]);
    }

    #[test]
    fn test_offmac_beyond_content_drops_partial_packet_too() {
        let mut unpacker = Unpacker::new(Collector::default());
        let long = mac(1, b"0123456789");

        unpacker
            .process(Some(segment(0, Some(0), &long[..6])))
            .unwrap();
        let n = unpacker
            .process(Some(segment(1, Some(40), b"short")))
            .unwrap();

        assert_eq!(n, 0);
        assert_eq!(unpacker.hooks().dropped, vec![0, 1]);
        assert!(unpacker.hooks().recycled.is_empty());
        assert!(unpacker.hooks().packets.is_empty());
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_trailing_bytes_without_header_start_dropped() {
        let mut unpacker = Unpacker::new(Collector::default());
        let packet = mac(1, b"abcdef");

        unpacker
            .process(Some(segment(0, Some(0), &packet[..6])))
            .unwrap();
        let n = unpacker
            .process(Some(segment(1, None, &concat(&[&packet[6..], &b"junk"[..]]))))
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(unpacker.hooks().packets, vec![packet]);
        assert_eq!(unpacker.hooks().recycled, vec![0]);
        assert_eq!(unpacker.hooks().dropped, vec![1]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_retry_walks_every_run() {
        let mut unpacker = Unpacker::new(Collector::default());
        let a = mac(1, b"first");
        let b = mac(2, b"second");

        // Buffered without being walked.
        unpacker.admit(segment(3, Some(0), &a), 0.0);
        unpacker.admit(segment(10, Some(0), &b), 0.0);
        assert_eq!(unpacker.window_len(), 2);

        assert_eq!(unpacker.process(None).unwrap(), 2);
        assert_eq!(unpacker.hooks().packets, vec![a, b]);
        assert_eq!(unpacker.hooks().recycled, vec![3, 10]);
        assert_eq!(unpacker.window_len(), 0);

        assert_eq!(unpacker.process(None).unwrap(), 0);
    }

    #[test]
    fn test_refused_packet_is_counted() {
        let collector = Collector {
            refuse: true,
            ..Collector::default()
        };
        let mut unpacker = Unpacker::new(collector);

        let n = unpacker
            .process(Some(segment(0, Some(0), &mac(1, b"lost"))))
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(unpacker.hook_failures(), 1);
        assert_eq!(unpacker.hooks().recycled, vec![0]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_contradicting_header_start_drops_partial_packet() {
        let mut unpacker = Unpacker::new(Collector::default());
        let long = mac(1, b"0123456789");
        let next = mac(2, b"ok");

        // seg1 claims a header at 0, but the packet from seg0 still needs
        // more bytes.
        unpacker
            .process(Some(segment(0, Some(0), &long[..6])))
            .unwrap();
        let n = unpacker
            .process(Some(segment(1, Some(0), &next)))
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(unpacker.hooks().dropped, vec![0]);
        assert_eq!(unpacker.hooks().packets, vec![next]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_piggyback_reported_on_arrival() {
        let mut unpacker = Unpacker::new(Collector::default());
        unpacker.set_piggyback_multiplier(5).unwrap();

        let mut seg = segment(0, Some(0), &mac(0, b"x"));
        seg.header.request = 71;
        seg.header.sc = 3;
        unpacker.process(Some(seg)).unwrap();

        assert_eq!(unpacker.hooks().piggyback, vec![(3, 355)]);
    }

    #[test]
    fn test_stall_timeout_evicts() {
        let config = UnpackerConfig {
            stall_timeout: Some(1.0),
            ..UnpackerConfig::default()
        };
        let mut unpacker = Unpacker::with_config(config, Collector::default()).unwrap();
        let packet = mac(1, b"0123456789");

        unpacker
            .process(Some(segment(0, Some(0), &packet[..5])))
            .unwrap();
        unpacker.hooks_mut().now = 0.5;
        assert_eq!(unpacker.evict_stale(), 0);

        unpacker.hooks_mut().now = 2.0;
        assert_eq!(unpacker.evict_stale(), 1);
        assert_eq!(unpacker.hooks().dropped, vec![0]);
        assert_eq!(unpacker.window_len(), 0);
    }

    #[test]
    fn test_window_cap_evicts_oldest() {
        let config = UnpackerConfig {
            max_window_segments: 2,
            ..UnpackerConfig::default()
        };
        let mut unpacker = Unpacker::with_config(config, Collector::default()).unwrap();

        for seq in [30u16, 10, 20] {
            unpacker
                .process(Some(segment(seq, None, b"orphan")))
                .unwrap();
        }

        assert_eq!(unpacker.hooks().dropped, vec![30]);
        assert_eq!(
            unpacker.window_sequences(),
            vec![SegmentSeq::new(10), SegmentSeq::new(20)]
        );
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut unpacker = Unpacker::new(Collector::default());
        unpacker
            .process(Some(segment(1, None, b"orphan")))
            .unwrap();
        unpacker.clear();

        assert_eq!(unpacker.hooks().dropped, vec![1]);
        assert_eq!(unpacker.window_len(), 0);
    }
}
