use ccfprims_wire::CCF_HEADER_SIZE;
use serde::{Deserialize, Serialize};

/// A bandwidth allocation: `size` bytes (CCF header included) on
/// `channel_id`, usable at absolute time `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub channel_id: i32,
    pub time: f64,
    pub size: usize,
}

impl Grant {
    pub fn new(channel_id: i32, time: f64, size: usize) -> Self {
        Self {
            channel_id,
            time,
            size,
        }
    }

    /// Content bytes a segment built for this grant can carry.
    pub fn payload_capacity(&self) -> usize {
        self.size.saturating_sub(CCF_HEADER_SIZE)
    }
}

/// Merge `incoming` into `grants`, keeping them ordered by time. Grants with
/// equal times keep their arrival order.
pub(crate) fn merge_grants(grants: &mut Vec<Grant>, incoming: impl IntoIterator<Item = Grant>) {
    grants.extend(incoming);
    grants.sort_by(|a, b| a.time.total_cmp(&b.time));
}
