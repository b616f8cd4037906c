//! Collaborator interfaces.
//!
//! The engines never schedule, transmit, or deliver anything themselves. They
//! call back into these traits, synchronously, from inside `process`.

use ccfprims_buffer::{FragmentBuffer, PacketRef};
use serde::Serialize;

use crate::error::HookError;
use crate::segment::CcfSegment;

pub type HookResult = std::result::Result<(), HookError>;

/// Timer event kinds understood by the scheduling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A MAP (grant list) arrived.
    Map = 1,
    /// A packet arrived.
    Packet = 2,
    /// Transmit a finished segment.
    SendTimer = 3,
    /// Issue a bandwidth request.
    RequestTimer = 4,
}

impl Event {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Collaborator consumed by [`Packer`](crate::Packer).
pub trait PackHooks {
    /// Schedule `segment` for transmission on `channel_id` at `at`.
    fn start_send_timer(
        &mut self,
        at: f64,
        event: Event,
        segment: CcfSegment,
        channel_id: i32,
    ) -> HookResult;

    /// Current absolute time. Grants older than this are discarded.
    fn current_time(&self) -> f64;

    /// Every byte of `packet` has been placed into a segment.
    fn recycle_packet(&mut self, packet: PacketRef) {
        let _ = packet;
    }

    /// `packet` was discarded without being sent.
    fn drop_packet(&mut self, packet: PacketRef) {
        let _ = packet;
    }
}

/// Collaborator consumed by [`Unpacker`](crate::Unpacker).
pub trait UnpackHooks {
    /// A MAC packet (header plus content) was reassembled.
    fn signify_packet(&mut self, packet: FragmentBuffer) -> HookResult;

    /// A segment carried a piggyback request of `request` bytes.
    fn signify_piggyback(&mut self, sc: u8, request: usize) -> HookResult;

    /// `segment` was fully consumed.
    fn recycle_segment(&mut self, segment: CcfSegment) {
        let _ = segment;
    }

    /// `segment` was discarded as corrupted or stale.
    fn drop_segment(&mut self, segment: CcfSegment) {
        let _ = segment;
    }

    /// Current absolute time, used for stall eviction.
    fn current_time(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes() {
        assert_eq!(Event::Map.code(), 1);
        assert_eq!(Event::Packet.code(), 2);
        assert_eq!(Event::SendTimer.code(), 3);
        assert_eq!(Event::RequestTimer.code(), 4);
    }
}
