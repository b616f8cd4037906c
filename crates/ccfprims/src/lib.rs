//! DOCSIS Continuous Concatenation and Fragmentation (CCF) primitives.
//!
//! Upstream MAC packets are sliced into CCF segments sized to bandwidth
//! grants, and segments arriving in any order are stitched back into the
//! original packets. Bytes are never copied along the way: segments and
//! reassembled packets are piece tables over the original buffers.
//!
//! # Crate Structure
//!
//! - [`wire`]: CCF and MAC header codecs and 13-bit sequence arithmetic
//! - [`buffer`]: Zero-copy packet handles and the fragment piece table
//! - [`engine`]: The packer, the unpacker and their hooks

/// Re-export wire codecs.
pub mod wire {
    pub use ccfprims_wire::*;
}

/// Re-export buffer types.
pub mod buffer {
    pub use ccfprims_buffer::*;
}

/// Re-export the segmentation engine.
pub mod engine {
    pub use ccfprims_engine::*;
}
