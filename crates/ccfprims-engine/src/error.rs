use ccfprims_buffer::BufferError;
use ccfprims_wire::WireError;

/// Errors that can occur in packer and unpacker operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Fragment buffer contract violation.
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Header encoding or decoding failed.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Configuration rejected by `validate()`.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error type returned by collaborator callbacks.
///
/// The engines never propagate these: a failed callback is logged and
/// counted in `hook_failures()`, and the walk carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The collaborator refused the item.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The collaborator is gone.
    #[error("collaborator closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
