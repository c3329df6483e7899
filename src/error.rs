//! Error types for nestbox operations

use thiserror::Error;

/// Boxed source error carried by codec failures
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum NestboxError {
    /// Non-creating path resolution could not find a namespace on the path
    #[error("Namespace does not exist: {0}")]
    NamespaceNotFound(String),

    /// An encoded/decoded operation was invoked on a box without a codec
    #[error("No codec defined")]
    NoCodec,

    #[error("Codec error: {0}")]
    Codec(#[source] BoxedError),

    #[error("Namespace name required")]
    NameRequired,

    #[error("Key required")]
    KeyRequired,

    #[error("Key too large: {actual} bytes (max {max})")]
    KeyTooLarge { max: usize, actual: usize },

    #[error("Value too large: {actual} bytes (max {max})")]
    ValueTooLarge { max: usize, actual: usize },

    #[error("Sequence overflow")]
    SequenceOverflow,

    #[error("Store is opened read-only")]
    ReadOnly,

    #[error("Invalid magic number in store header")]
    InvalidMagic,

    #[error("Unsupported format version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Store checksum verification failed")]
    ChecksumMismatch,

    #[error("Corrupted store file: {0}")]
    Corrupted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl NestboxError {
    /// Wrap an encode/decode failure from a codec implementation
    pub fn codec<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NestboxError::Codec(Box::new(err))
    }

    /// True for the condition plain reads convert into absence
    pub fn is_namespace_not_found(&self) -> bool {
        matches!(self, NestboxError::NamespaceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, NestboxError>;
