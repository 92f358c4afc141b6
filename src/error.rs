use std::ops::Range;

use zarrs::{
    array::{ArrayCreateError, ArrayError},
    group::GroupCreateError,
    storage::StorageError,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The container does not look like a BigDataViewer hierarchy.
    #[error("unexpected container structure: {0}")]
    Structure(String),
    /// Scale or chunk-size metadata for a channel is missing or malformed.
    #[error("invalid metadata for channel {channel}: {message}")]
    Metadata { channel: String, message: String },
    /// Two (time, channel) datasets disagree at the same resolution level.
    #[error("shape mismatch at level {level} for time {time}, channel {channel}: {message}")]
    ShapeMismatch {
        level: usize,
        time: String,
        channel: String,
        message: String,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("destination already exists at {path}; set overwrite to replace it")]
    DestinationExists { path: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Array(#[from] ArrayError),
    #[error(transparent)]
    ArrayCreate(#[from] ArrayCreateError),
    #[error(transparent)]
    GroupCreate(#[from] GroupCreateError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[cfg(feature = "hdf5")]
    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),
    #[error("{0}")]
    General(String),
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn wrap(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }

    pub(crate) fn metadata(channel: &str, message: impl Into<String>) -> Self {
        Self::Metadata {
            channel: channel.to_owned(),
            message: message.into(),
        }
    }
}

/// A positional lookup into the virtual array fell outside the discovered layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("resolution level {index} out of range for channel {channel} with {len} levels")]
    Level {
        index: usize,
        channel: String,
        len: usize,
    },
    #[error("time index {index} out of range for {len} time points")]
    Time { index: usize, len: usize },
    #[error("channel index {index} out of range for {len} channels")]
    Channel { index: usize, len: usize },
    #[error("region {region:?} is not within dataset shape {shape:?}")]
    Region {
        region: Vec<Range<u64>>,
        shape: Vec<u64>,
    },
}
