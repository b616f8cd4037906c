use ccfprims_wire::WireError;

/// Errors returned by fragment buffer and packet handle operations.
///
/// These indicate caller bugs (bad positions or ranges), not wire corruption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// A position lies beyond the end of the buffer.
    #[error("position {pos} out of range (size {size})")]
    OutOfRange { pos: usize, size: usize },

    /// A range whose start lies after its end.
    #[error("invalid range [{begin}, {end})")]
    InvalidRange { begin: usize, end: usize },

    /// The inserted range overlaps an adjacent fragment of the same packet.
    #[error("range [{begin}, {end}) overlaps an adjacent fragment of the same packet")]
    Overlap { begin: usize, end: usize },

    /// Fragment buffers only shrink.
    #[error("cannot grow buffer from {size} to {requested} bytes")]
    GrowUnsupported { size: usize, requested: usize },

    /// Packet handles are immutable once created.
    #[error("packet handles cannot be resized")]
    Immutable,

    #[error(transparent)]
    Wire(#[from] WireError),
}

pub type Result<T> = std::result::Result<T, BufferError>;
