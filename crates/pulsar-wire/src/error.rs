/// Errors that can occur during wire line encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A numeric header field did not parse as a base-10 integer.
    #[error("invalid {field} field: {value:?} is not a base-10 integer")]
    Format { field: &'static str, value: String },

    /// A header field is wider than its fixed slot.
    #[error("{field} field overflows its slot ({len} chars, width {width})")]
    FieldOverflow {
        field: &'static str,
        len: usize,
        width: usize,
    },

    /// Timestamps are seconds since the Unix epoch; a sign cannot be
    /// zero-padded back into a parseable field.
    #[error("negative timestamp {0}")]
    NegativeTimestamp(i64),
}

pub type Result<T> = std::result::Result<T, WireError>;
