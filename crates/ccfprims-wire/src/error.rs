/// Errors that can occur while encoding or decoding CCF and MAC headers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The buffer is shorter than the fixed header size.
    #[error("buffer too short ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// A header field does not fit its bit width.
    #[error("{field} out of range ({value}, max {max})")]
    FieldOverflow {
        field: &'static str,
        value: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, WireError>;
