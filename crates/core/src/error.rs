/// Result alias that carries the custom [`CartError`] type.
pub type Result<T> = std::result::Result<T, CartError>;

/// Common error type for the core crate.
///
/// Only caller-contract violations end up here. Ordinary "nothing to do"
/// situations (a stale drag target, a zero-length cut) are reported through
/// `Option` or outcome values instead.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The named stack is not registered.
    #[error("unknown stack `{0}`")]
    UnknownStack(String),
    /// A cross-component payload could not be parsed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Region bounds are not a finite, non-empty, non-negative span.
    #[error("invalid region {start}..{end}")]
    InvalidRegion { start: f64, end: f64 },
    /// Sample data handed to the buffer constructor is inconsistent.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(&'static str),
    /// The editor has no decoded buffer loaded.
    #[error("load an audio file into the editor first")]
    NoBuffer,
    /// The editor has no active selection. The message is shown to users.
    #[error("select a region on the waveform first")]
    NoSelection,
    /// The decode service could not turn the bytes into samples.
    #[error("undecodable audio: {0}")]
    Undecodable(String),
    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Free-form message for the application layer.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CartError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for CartError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CartError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
