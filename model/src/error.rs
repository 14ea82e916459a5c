use thiserror::Error;

/// Fatal conversion failures. Anything recoverable (a malformed row, a
/// coordinate that won't parse) is skipped and counted instead of raised.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("cannot read input: {0}")]
    Unreadable(std::io::Error),

    /// The header defines no usable coordinate columns, so no geometry can
    /// be built. Raised before any output is written.
    #[error("header has no \"{0}\" column")]
    MissingColumn(&'static str),
}
