//! Discovery and random access over a BigDataViewer source.
use std::{ops::Range, sync::OnceLock};

use log::debug;

use crate::{
    Error, IndexError, Result,
    container::{Container, DataNode},
    layout::SourceLayout,
    metadata::{ChunkSizeTable, LevelGeometry, Multiscales, SPATIAL_NDIM, ScaleTable},
    sample::Block,
};

/// Handles indexed as `[time][channel][level]`.
type Datasets<N> = Vec<Vec<Vec<N>>>;

/// A validated description of a source container's pyramid layout.
///
/// Time points and channels are addressed by position in their
/// lexicographically sorted key sequences, e.g. time `0` is the
/// smallest `t*` key.
pub struct SourceIndex<C: Container> {
    container: C,
    layout: SourceLayout,
    channel_keys: Vec<String>,
    time_keys: Vec<String>,
    scales: Vec<ScaleTable>,
    chunk_sizes: Vec<ChunkSizeTable>,
    datasets: OnceLock<Datasets<C::Node>>,
}

impl<C: Container> std::fmt::Debug for SourceIndex<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIndex")
            .field("time_keys", &self.time_keys)
            .field("channel_keys", &self.channel_keys)
            .field("multiscales", &self.multiscales())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "hdf5")]
impl SourceIndex<crate::container::Hdf5Container> {
    /// Open a BigDataViewer HDF5 file with the default layout.
    pub fn open_hdf5(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let container = crate::container::Hdf5Container::open(path)?;
        Self::open(container, SourceLayout::default())
    }
}

impl<C: Container> SourceIndex<C> {
    /// Discover the channels, time points, and per-channel metadata of a container.
    pub fn open(container: C, layout: SourceLayout) -> Result<Self> {
        let members = container.member_names()?;
        let mut channel_keys: Vec<String> = members
            .iter()
            .filter(|m| layout.is_channel(m))
            .cloned()
            .collect();
        let mut time_keys: Vec<String> = members
            .iter()
            .filter(|m| layout.is_time_point(m))
            .cloned()
            .collect();
        channel_keys.sort();
        time_keys.sort();

        if channel_keys.is_empty() || time_keys.is_empty() {
            return Err(Error::Structure(format!(
                "found {} channel entries (prefix {:?}) and {} time-point entries (prefix {:?}) among {:?}",
                channel_keys.len(),
                layout.channel_prefix,
                time_keys.len(),
                layout.time_prefix,
                members,
            )));
        }

        let mut scales = Vec::with_capacity(channel_keys.len());
        let mut chunk_sizes = Vec::with_capacity(channel_keys.len());
        for ch in &channel_keys {
            let res_table = container
                .table(&layout.resolutions_path(ch))?
                .ok_or_else(|| Error::metadata(ch, format!("missing {}", layout.resolutions_name)))?;
            let sub_table = container
                .table(&layout.subdivisions_path(ch))?
                .ok_or_else(|| {
                    Error::metadata(ch, format!("missing {}", layout.subdivisions_name))
                })?;
            let scale = ScaleTable::from_table(ch, &layout.resolutions_name, &res_table)?;
            let chunks = ChunkSizeTable::from_table(ch, &layout.subdivisions_name, &sub_table)?;
            if scale.num_levels() != chunks.num_levels() {
                return Err(Error::metadata(
                    ch,
                    format!(
                        "{} has {} levels but {} has {}",
                        layout.resolutions_name,
                        scale.num_levels(),
                        layout.subdivisions_name,
                        chunks.num_levels()
                    ),
                ));
            }
            scales.push(scale);
            chunk_sizes.push(chunks);
        }

        debug!(
            "Discovered time points {time_keys:?} and channels {channel_keys:?} with levels {:?}",
            scales.iter().map(ScaleTable::num_levels).collect::<Vec<_>>()
        );

        Ok(Self {
            container,
            layout,
            channel_keys,
            time_keys,
            scales,
            chunk_sizes,
            datasets: OnceLock::new(),
        })
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn channel_keys(&self) -> &[String] {
        &self.channel_keys
    }

    pub fn time_keys(&self) -> &[String] {
        &self.time_keys
    }

    pub fn num_channels(&self) -> usize {
        self.channel_keys.len()
    }

    pub fn num_time_points(&self) -> usize {
        self.time_keys.len()
    }

    /// Scale tables, aligned with [SourceIndex::channel_keys].
    pub fn scales(&self) -> &[ScaleTable] {
        &self.scales
    }

    /// Chunk-size tables, aligned with [SourceIndex::channel_keys].
    pub fn chunk_sizes(&self) -> &[ChunkSizeTable] {
        &self.chunk_sizes
    }

    pub fn multiscales(&self) -> Multiscales {
        Multiscales::from_counts(self.scales.iter().map(ScaleTable::num_levels).collect())
    }

    pub fn level_count(&self, channel: usize) -> Result<usize> {
        self.check_channel(channel)?;
        Ok(self.scales[channel].num_levels())
    }

    fn check_time(&self, time: usize) -> Result<(), IndexError> {
        if time >= self.time_keys.len() {
            return Err(IndexError::Time {
                index: time,
                len: self.time_keys.len(),
            });
        }
        Ok(())
    }

    fn check_channel(&self, channel: usize) -> Result<(), IndexError> {
        if channel >= self.channel_keys.len() {
            return Err(IndexError::Channel {
                index: channel,
                len: self.channel_keys.len(),
            });
        }
        Ok(())
    }

    fn resolve_node(&self, time: &str, channel: &str, level: usize) -> Result<C::Node> {
        let path = self.layout.data_path(time, channel, level);
        let node = self
            .container
            .data_node(&path)?
            .ok_or_else(|| Error::Structure(format!("missing dataset {path}")))?;
        if node.shape().len() != SPATIAL_NDIM {
            return Err(Error::Structure(format!(
                "dataset {path} has shape {:?}, expected {SPATIAL_NDIM} dimensions",
                node.shape()
            )));
        }
        Ok(node)
    }

    fn resolve(&self) -> Result<Datasets<C::Node>> {
        let mut out = Vec::with_capacity(self.time_keys.len());
        for t in &self.time_keys {
            let mut per_channel = Vec::with_capacity(self.channel_keys.len());
            for (ch, scale) in self.channel_keys.iter().zip(&self.scales) {
                let levels = (0..scale.num_levels())
                    .map(|level| self.resolve_node(t, ch, level))
                    .collect::<Result<Vec<_>>>()?;
                per_channel.push(levels);
            }
            out.push(per_channel);
        }
        Ok(out)
    }

    /// All dataset handles, indexed as `[time][channel][level]`.
    ///
    /// Resolved on first use and cached thereafter.
    pub fn datasets(&self) -> Result<&[Vec<Vec<C::Node>>]> {
        if let Some(ds) = self.datasets.get() {
            return Ok(ds.as_slice());
        }
        let resolved = self.resolve()?;
        Ok(self.datasets.get_or_init(|| resolved).as_slice())
    }

    /// The dataset handle for a (level, time, channel) position.
    pub fn dataset(&self, level: usize, time: usize, channel: usize) -> Result<&C::Node> {
        self.check_time(time)?;
        self.check_channel(channel)?;
        let levels = &self.datasets()?[time][channel];
        levels.get(level).ok_or_else(|| {
            IndexError::Level {
                index: level,
                channel: self.channel_keys[channel].clone(),
                len: levels.len(),
            }
            .into()
        })
    }

    /// Shape, chunking, and sample type of the dataset at a position.
    ///
    /// Falls back to the channel's chunk-size table for contiguous datasets.
    pub fn geometry(&self, level: usize, time: usize, channel: usize) -> Result<LevelGeometry> {
        let node = self.dataset(level, time, channel)?;
        let shape = node.shape().to_vec();
        let chunk_shape = match node.chunk_shape() {
            Some(cs) => cs.to_vec(),
            None => self.chunk_sizes[channel]
                .level_zyx(level)
                .ok_or_else(|| {
                    Error::metadata(
                        &self.channel_keys[channel],
                        format!("no {} for level {level}", self.layout.subdivisions_name),
                    )
                })?
                .into_iter()
                .zip(&shape)
                .map(|(c, &n)| c.min(n).max(1))
                .collect(),
        };
        Ok(LevelGeometry {
            shape,
            chunk_shape,
            sample_type: node.sample_type(),
        })
    }

    /// Read a (z, y, x) region of the dataset at a position.
    pub fn read(
        &self,
        level: usize,
        time: usize,
        channel: usize,
        region: &[Range<u64>],
    ) -> Result<Block> {
        let node = self.dataset(level, time, channel)?;
        let shape = node.shape();
        if region.len() != shape.len()
            || region
                .iter()
                .zip(shape)
                .any(|(r, &n)| r.start > r.end || r.end > n)
        {
            return Err(IndexError::Region {
                region: region.to_vec(),
                shape: shape.to_vec(),
            }
            .into());
        }
        node.read(region)
    }

    /// Read the whole dataset at a position.
    pub fn read_all(&self, level: usize, time: usize, channel: usize) -> Result<Block> {
        let node = self.dataset(level, time, channel)?;
        let region: Vec<_> = node.shape().iter().map(|&n| 0..n).collect();
        node.read(&region)
    }
}
