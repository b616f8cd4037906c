use std::collections::VecDeque;

use ccfprims_buffer::{FragmentBuffer, PacketBuffer, PacketRef};
use ccfprims_wire::ccf::OFFMAC_MAX;
use ccfprims_wire::{CcfHeader, SegmentSeq};
use tracing::{debug, trace, warn};

use crate::config::{validate_multiplier, PackerConfig};
use crate::error::Result;
use crate::grant::{merge_grants, Grant};
use crate::hooks::{Event, PackHooks};
use crate::segment::CcfSegment;

/// An outbound packet and how much of it has been sent.
#[derive(Debug)]
struct Pending {
    packet: PacketRef,
    cursor: usize,
}

impl Pending {
    fn remaining(&self) -> usize {
        self.packet.len() - self.cursor
    }
}

/// Slices queued MAC packets into CCF segments, one per usable grant.
///
/// The packer holds only two queues (packets and grants), the piggyback
/// accumulator and the sequence counter. All work happens inside
/// [`process`](Self::process), which hands finished segments to
/// [`PackHooks::start_send_timer`].
#[derive(Debug)]
pub struct Packer<H> {
    config: PackerConfig,
    hooks: H,
    pending: VecDeque<Pending>,
    grants: Vec<Grant>,
    piggyback: usize,
    sequence: SegmentSeq,
    hook_failures: u64,
}

impl<H: PackHooks> Packer<H> {
    /// Create a packer with the default configuration.
    pub fn new(hooks: H) -> Self {
        Self {
            config: PackerConfig::default(),
            hooks,
            pending: VecDeque::new(),
            grants: Vec::new(),
            piggyback: 0,
            sequence: SegmentSeq::default(),
            hook_failures: 0,
        }
    }

    pub fn with_config(config: PackerConfig, hooks: H) -> Result<Self> {
        config.validate()?;
        let mut packer = Self::new(hooks);
        packer.config = config;
        Ok(packer)
    }

    pub fn config(&self) -> &PackerConfig {
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

    /// Packets not yet completely sent.
    pub fn pending_packets(&self) -> usize {
        self.pending.len()
    }

    /// Grants not yet used or expired.
    pub fn pending_grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Piggyback bytes not yet reported in a segment header.
    pub fn piggyback_pending(&self) -> usize {
        self.piggyback
    }

    /// Segments the collaborator refused to schedule.
    pub fn hook_failures(&self) -> u64 {
        self.hook_failures
    }

    /// Sequence number the next emitted segment will carry.
    pub fn next_sequence(&self) -> SegmentSeq {
        self.sequence
    }

    /// Queue `packet` (if any) and spend as many grants as possible.
    ///
    /// Returns the number of segments handed to the collaborator.
    pub fn process(&mut self, packet: Option<PacketRef>) -> Result<usize> {
        if let Some(packet) = packet {
            self.enqueue(packet);
        }

        let now = self.hooks.current_time();
        let mut consumed = 0;
        let spent = self.spend(now, &mut consumed);
        // Grants that already produced segments must not be spent twice.
        self.grants.drain(..consumed);
        spent
    }

    fn spend(&mut self, now: f64, consumed: &mut usize) -> Result<usize> {
        let mut emitted = 0;

        for k in 0..self.grants.len() {
            let grant = self.grants[k];
            if now > grant.time {
                trace!(time = grant.time, now, "grant expired");
                *consumed = k + 1;
                continue;
            }
            if self.pending.is_empty() {
                break;
            }
            *consumed = k + 1;

            let Some(segment) = self.fill(&grant)? else {
                trace!(size = grant.size, "grant too small for any content");
                continue;
            };
            debug!(
                sequence = segment.header.sequence,
                pfi = segment.header.pfi,
                offmac = segment.header.offmac,
                request = segment.header.request,
                len = segment.len(),
                channel = grant.channel_id,
                "emitting segment"
            );
            match self
                .hooks
                .start_send_timer(grant.time, Event::SendTimer, segment, grant.channel_id)
            {
                Ok(()) => emitted += 1,
                Err(e) => {
                    self.hook_failures += 1;
                    warn!(error = %e, channel = grant.channel_id, "failed scheduling segment");
                }
            }
        }

        Ok(emitted)
    }

    /// Merge `grants` into the schedule, add `piggyback` bytes to the pending
    /// request, and spend what can be spent.
    pub fn add_grants(
        &mut self,
        grants: impl IntoIterator<Item = Grant>,
        piggyback: usize,
    ) -> Result<usize> {
        self.piggyback = self.piggyback.saturating_add(piggyback);
        merge_grants(&mut self.grants, grants);
        self.process(None)
    }

    /// Add bytes to the piggyback request carried by the next segment.
    pub fn add_piggyback(&mut self, bytes: usize) {
        self.piggyback = self.piggyback.saturating_add(bytes);
    }

    /// Drop every queued packet and forget all grants.
    pub fn clear(&mut self) {
        for pending in self.pending.drain(..) {
            self.hooks.drop_packet(pending.packet);
        }
        self.grants.clear();
    }

    fn enqueue(&mut self, packet: PacketRef) {
        if packet.is_empty() {
            warn!(packet = packet.id(), "dropping empty packet");
            self.hooks.drop_packet(packet);
            return;
        }
        trace!(packet = packet.id(), len = packet.len(), "queued packet");
        self.pending.push_back(Pending { packet, cursor: 0 });
    }

    /// Build one segment within `grant.size` bytes, or `None` if no content
    /// fits.
    fn fill(&mut self, grant: &Grant) -> Result<Option<CcfSegment>> {
        let capacity = grant.payload_capacity();
        if capacity == 0 {
            return Ok(None);
        }

        let mut header = CcfHeader {
            sc: self.config.sid_cluster,
            ..CcfHeader::default()
        };
        let mut payload = FragmentBuffer::new();

        while payload.size() < capacity {
            let Some(front) = self.pending.front_mut() else {
                break;
            };
            let offset = payload.size();
            if front.cursor == 0 && !header.pfi {
                // A header start offmac cannot express moves to the next segment.
                let Ok(offmac) = u16::try_from(offset) else {
                    break;
                };
                if offmac > OFFMAC_MAX {
                    break;
                }
                header.pfi = true;
                header.offmac = offmac;
            }

            let take = (capacity - offset).min(front.remaining());
            let begin = front.cursor;
            front
                .packet
                .insert_to(offset, &mut payload, begin, begin + take)?;
            front.cursor += take;

            if front.remaining() == 0 {
                if let Some(done) = self.pending.pop_front() {
                    trace!(packet = done.packet.id(), "packet fully packed");
                    self.hooks.recycle_packet(done.packet);
                }
            }
        }

        if payload.is_empty() {
            return Ok(None);
        }
        header.request = self.take_request();
        header.sequence = self.sequence.take().get();
        Ok(Some(CcfSegment::new(header, payload)))
    }

    /// Convert the accumulated piggyback into request units, keeping the
    /// remainder for a later segment.
    fn take_request(&mut self) -> u16 {
        let multiplier = self.config.piggyback_multiplier;
        let units = (self.piggyback / multiplier).min(u16::MAX as usize);
        self.piggyback -= units * multiplier;
        units as u16
    }
}
