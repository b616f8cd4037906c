//! CCF segmentation and reassembly.
//!
//! - [`Packer`] slices queued MAC packets into CCF segments, one per
//!   bandwidth [`Grant`], and stamps each with a 13-bit sequence number and
//!   the pending piggyback request.
//! - [`Unpacker`] puts segments arriving in any order back together into MAC
//!   packets and reports piggyback requests.
//!
//! Both are synchronous and single-threaded. Scheduling, transmission and
//! delivery are left to the caller through [`PackHooks`] and [`UnpackHooks`].
//! Neither engine copies packet bytes: segments reference the packets they
//! carry through [`ccfprims_buffer::FragmentBuffer`].

pub mod config;
pub mod error;
pub mod grant;
pub mod hooks;
pub mod packer;
pub mod segment;
pub mod unpacker;

pub use config::{PackerConfig, UnpackerConfig, DEFAULT_PIGGYBACK_MULTIPLIER};
pub use error::{EngineError, HookError, Result};
pub use grant::Grant;
pub use hooks::{Event, HookResult, PackHooks, UnpackHooks};
pub use packer::Packer;
pub use segment::CcfSegment;
pub use unpacker::Unpacker;
