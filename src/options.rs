use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zarrs::array::codec::{Bz2Codec, Bz2CompressionLevel, GzipCodec};
use zarrs_codec::BytesToBytesCodecTraits;

/// Chunk compression for the destination arrays.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Copy)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Compression {
    /// Uncompressed.
    #[default]
    Raw,
    Bzip2 {
        /// Default 9. Must be in the range 1..=9.
        #[serde(default = "default_bzip2_block_size")]
        block_size: u8,
    },
    Gzip {
        /// Default 6. Must be in the range 0..=9.
        #[serde(default = "default_gzip_level")]
        level: u8,
    },
}

fn default_bzip2_block_size() -> u8 {
    9
}

fn default_gzip_level() -> u8 {
    6
}

impl Compression {
    /// Convert to a bytes-to-bytes codec, if any.
    pub fn to_bytes_to_bytes_codec(
        &self,
    ) -> crate::Result<Option<Arc<dyn BytesToBytesCodecTraits>>> {
        match self {
            Compression::Raw => Ok(None),
            Compression::Bzip2 { block_size } => Ok(Some(Arc::new(Bz2Codec::new(
                Bz2CompressionLevel::new(*block_size as u32)
                    .map_err(|n| crate::Error::general(format!("invalid bz2 block size {n}")))?,
            )))),
            Compression::Gzip { level } => Ok(Some(Arc::new(
                GzipCodec::new(*level as u32).map_err(crate::Error::wrap)?,
            ))),
        }
    }
}

/// How each (time, channel) slice is moved into the destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CopyStrategy {
    /// Read the whole spatial volume, then write it in one call.
    #[default]
    Volume,
    /// Copy one source chunk at a time; peak memory is a single chunk.
    Chunked,
}

/// Options for materializing a source pyramid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Replace an existing destination rather than failing.
    pub overwrite: bool,
    /// Group under which the level arrays `0`, `1`, ... are created.
    pub group_path: String,
    pub compression: Compression,
    pub strategy: CopyStrategy,
    /// Copy the (time, channel) slices of a level concurrently.
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            group_path: "/".into(),
            compression: Compression::default(),
            strategy: CopyStrategy::default(),
            parallel: false,
        }
    }
}

impl ConvertOptions {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_group_path(mut self, group_path: impl Into<String>) -> Self {
        self.group_path = group_path.into();
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_strategy(mut self, strategy: CopyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_with_defaults() {
        let opts: ConvertOptions =
            serde_json::from_str(r#"{"overwrite": true, "compression": {"type": "gzip"}}"#)
                .unwrap();
        assert!(opts.overwrite);
        assert_eq!(opts.group_path, "/");
        assert_eq!(opts.compression, Compression::Gzip { level: 6 });
        assert_eq!(opts.strategy, CopyStrategy::Volume);
    }

    #[test]
    fn invalid_bzip2_block_size() {
        assert!(
            Compression::Bzip2 { block_size: 0 }
                .to_bytes_to_bytes_codec()
                .is_err()
        );
        assert!(
            Compression::Raw
                .to_bytes_to_bytes_codec()
                .unwrap()
                .is_none()
        );
    }
}
