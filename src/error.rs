use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeterError>;

#[derive(Error, Debug)]
pub enum MeterError {
    /// The target address is not exactly one host:port pair.
    #[error("bad address {0}")]
    InvalidAddress(String),

    /// The direction token is neither DL nor UL.
    #[error("bad direction {0}")]
    InvalidDirection(String),

    /// The byte count does not parse as an unsigned 64-bit integer.
    #[error("bad length {0}")]
    InvalidLength(String),

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Mid-transfer short I/O or a truncated completion exchange.
    #[error("{0}")]
    Transport(String),

    /// Malformed wire message: wrong magic, marker, or direction tag.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
