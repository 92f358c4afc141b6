use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, sample::SampleType};

/// Number of spatial axes in a BigDataViewer dataset.
pub const SPATIAL_NDIM: usize = 3;

/// A dense, row-major 2D numeric dataset as read from the container.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Dataset shape; a well-formed table has exactly two dimensions.
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl Table {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    /// Check the table is a (levels, 3) matrix and split it into rows.
    fn rows(&self, channel: &str, name: &str) -> Result<Vec<[f64; SPATIAL_NDIM]>> {
        let &[nrows, ncols] = self.shape.as_slice() else {
            return Err(Error::metadata(
                channel,
                format!("{name} has rank {}, expected 2", self.shape.len()),
            ));
        };
        if ncols != SPATIAL_NDIM {
            return Err(Error::metadata(
                channel,
                format!("{name} has {ncols} columns, expected {SPATIAL_NDIM}"),
            ));
        }
        if self.values.len() != nrows * ncols {
            return Err(Error::metadata(
                channel,
                format!(
                    "{name} has {} values, expected {}",
                    self.values.len(),
                    nrows * ncols
                ),
            ));
        }
        if nrows == 0 {
            return Err(Error::metadata(channel, format!("{name} has no levels")));
        }
        Ok(self
            .values
            .chunks_exact(SPATIAL_NDIM)
            .map(|r| [r[0], r[1], r[2]])
            .collect())
    }
}

/// Per-level downsampling factors of one channel, in (x, y, z) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTable(Vec<[f64; SPATIAL_NDIM]>);

impl ScaleTable {
    pub fn from_table(channel: &str, name: &str, table: &Table) -> Result<Self> {
        let rows = table.rows(channel, name)?;
        if let Some(r) = rows.iter().find(|r| r.iter().any(|v| !v.is_finite() || *v <= 0.0)) {
            return Err(Error::metadata(
                channel,
                format!("{name} contains non-positive scale factor {r:?}"),
            ));
        }
        Ok(Self(rows))
    }

    pub fn num_levels(&self) -> usize {
        self.0.len()
    }

    pub fn level(&self, level: usize) -> Option<&[f64; SPATIAL_NDIM]> {
        self.0.get(level)
    }

    pub fn levels(&self) -> &[[f64; SPATIAL_NDIM]] {
        &self.0
    }
}

/// Per-level source chunk shapes of one channel, in (x, y, z) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSizeTable(Vec<[NonZeroU64; SPATIAL_NDIM]>);

impl ChunkSizeTable {
    pub fn from_table(channel: &str, name: &str, table: &Table) -> Result<Self> {
        let rows = table
            .rows(channel, name)?
            .into_iter()
            .map(|r| {
                let mut out = [NonZeroU64::MIN; SPATIAL_NDIM];
                for (o, v) in out.iter_mut().zip(r) {
                    if v.fract() != 0.0 || v < 1.0 || v > u64::MAX as f64 {
                        return Err(Error::metadata(
                            channel,
                            format!("{name} contains invalid chunk size {v}"),
                        ));
                    }
                    *o = NonZeroU64::new(v as u64).unwrap_or(NonZeroU64::MIN);
                }
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(rows))
    }

    pub fn num_levels(&self) -> usize {
        self.0.len()
    }

    pub fn level(&self, level: usize) -> Option<&[NonZeroU64; SPATIAL_NDIM]> {
        self.0.get(level)
    }

    /// Chunk shape of a level in (z, y, x) order, matching the dataset axes.
    pub fn level_zyx(&self, level: usize) -> Option<[u64; SPATIAL_NDIM]> {
        self.level(level).map(|r| [r[2].get(), r[1].get(), r[0].get()])
    }
}

/// Pyramid depth across all channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiscales {
    /// Every channel has this many levels.
    Uniform(usize),
    /// Channels disagree; level count per channel, in discovery order.
    PerChannel(Vec<usize>),
}

impl Multiscales {
    pub fn from_counts(counts: Vec<usize>) -> Self {
        match counts.split_first() {
            Some((first, rest)) if rest.iter().all(|c| c == first) => Self::Uniform(*first),
            Some(_) => Self::PerChannel(counts),
            None => Self::Uniform(0),
        }
    }

    /// The common depth, if there is one.
    pub fn depth(&self) -> Option<usize> {
        match self {
            Multiscales::Uniform(n) => Some(*n),
            Multiscales::PerChannel(_) => None,
        }
    }

    /// The deepest level count of any channel.
    pub fn max_depth(&self) -> usize {
        match self {
            Multiscales::Uniform(n) => *n,
            Multiscales::PerChannel(counts) => counts.iter().copied().max().unwrap_or(0),
        }
    }
}

/// Spatial layout of a single dataset at one resolution level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelGeometry {
    /// (z, y, x)
    pub shape: Vec<u64>,
    /// (z, y, x), each in `1..=shape` unless that axis is empty.
    pub chunk_shape: Vec<u64>,
    pub sample_type: SampleType,
}

impl LevelGeometry {
    /// Describe the first difference from `other`, if any.
    pub fn difference(&self, other: &LevelGeometry) -> Option<String> {
        if self.shape != other.shape {
            Some(format!("shape {:?} != {:?}", other.shape, self.shape))
        } else if self.chunk_shape != other.chunk_shape {
            Some(format!(
                "chunk shape {:?} != {:?}",
                other.chunk_shape, self.chunk_shape
            ))
        } else if self.sample_type != other.sample_type {
            Some(format!(
                "sample type {:?} != {:?}",
                other.sample_type, self.sample_type
            ))
        } else {
            None
        }
    }
}
