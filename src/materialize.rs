//! Copying a source pyramid into a Zarr hierarchy.
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use zarrs::{
    array::{Array, ArrayBuilder, ArraySubset, FillValueMetadata},
    group::GroupBuilder,
    node::{NodePath, node_exists},
    storage::{ReadableWritableListableStorageTraits, ReadableWritableStorageTraits, StorePrefix},
};

use crate::{
    Error, Result,
    chunk::ChunkRegions,
    container::Container,
    index::SourceIndex,
    metadata::{LevelGeometry, SPATIAL_NDIM},
    options::{ConvertOptions, CopyStrategy},
};

/// Names of the destination array dimensions.
pub const DIMENSION_NAMES: [&str; 5] = ["t", "c", "z", "y", "x"];

/// Destination layout of a single resolution level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelPlan {
    level: usize,
    num_time_points: u64,
    num_channels: u64,
    geometry: LevelGeometry,
    scale: [f64; SPATIAL_NDIM],
}

impl LevelPlan {
    pub fn level(&self) -> usize {
        self.level
    }

    /// Spatial geometry shared by every (time, channel) dataset at this level.
    pub fn geometry(&self) -> &LevelGeometry {
        &self.geometry
    }

    /// Downsampling factors in (x, y, z) order.
    pub fn scale(&self) -> &[f64; SPATIAL_NDIM] {
        &self.scale
    }

    /// `(T, C, z, y, x)`
    pub fn array_shape(&self) -> Vec<u64> {
        let mut shape = vec![self.num_time_points, self.num_channels];
        shape.extend_from_slice(&self.geometry.shape);
        shape
    }

    /// `(1, 1, cz, cy, cx)`; a chunk never spans two (time, channel) slices.
    pub fn array_chunk_shape(&self) -> Vec<u64> {
        let mut shape = vec![1, 1];
        shape.extend_from_slice(&self.geometry.chunk_shape);
        shape
    }

    /// Name of the level's array within the destination group.
    pub fn array_name(&self) -> String {
        self.level.to_string()
    }
}

/// Validated destination layout for every level of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidPlan {
    time_keys: Vec<String>,
    channel_keys: Vec<String>,
    levels: Vec<LevelPlan>,
}

impl PyramidPlan {
    /// Compute the destination layout, checking that every (time, channel)
    /// dataset agrees with the first one at each level.
    pub fn new<C: Container>(index: &SourceIndex<C>) -> Result<Self> {
        let depth = index.multiscales().max_depth();
        let mut levels = Vec::with_capacity(depth);
        for level in 0..depth {
            let mut expected: Option<LevelGeometry> = None;
            for t in 0..index.num_time_points() {
                for c in 0..index.num_channels() {
                    let mismatch = |message: String| Error::ShapeMismatch {
                        level,
                        time: index.time_keys()[t].clone(),
                        channel: index.channel_keys()[c].clone(),
                        message,
                    };
                    let count = index.level_count(c)?;
                    if level >= count {
                        return Err(mismatch(format!(
                            "channel has {count} levels, other channels have {depth}"
                        )));
                    }
                    let geometry = index.geometry(level, t, c)?;
                    if let Some(e) = &expected {
                        if let Some(diff) = e.difference(&geometry) {
                            return Err(mismatch(diff));
                        }
                    } else {
                        expected = Some(geometry);
                    }
                }
            }
            // Discovery guarantees at least one time point and channel.
            let geometry = expected.ok_or_else(|| Error::Structure("no datasets".into()))?;
            let scale = *index.scales()[0].level(level).ok_or_else(|| {
                Error::metadata(&index.channel_keys()[0], format!("no scale for level {level}"))
            })?;
            levels.push(LevelPlan {
                level,
                num_time_points: index.num_time_points() as u64,
                num_channels: index.num_channels() as u64,
                geometry,
                scale,
            });
        }
        Ok(Self {
            time_keys: index.time_keys().to_vec(),
            channel_keys: index.channel_keys().to_vec(),
            levels,
        })
    }

    pub fn levels(&self) -> &[LevelPlan] {
        &self.levels
    }

    pub fn time_keys(&self) -> &[String] {
        &self.time_keys
    }

    pub fn channel_keys(&self) -> &[String] {
        &self.channel_keys
    }

    /// Every (time, channel) position, in copy order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        (0..self.time_keys.len())
            .flat_map(|t| (0..self.channel_keys.len()).map(move |c| (t, c)))
            .collect()
    }
}

fn child_path(group_path: &str, name: &str) -> String {
    let parent = group_path.trim_end_matches('/');
    format!("{parent}/{name}")
}

fn store_prefix(group_path: &str) -> Result<StorePrefix> {
    let trimmed = group_path.trim_matches('/');
    if trimmed.is_empty() {
        Ok(StorePrefix::root())
    } else {
        StorePrefix::new(format!("{trimmed}/")).map_err(Error::wrap)
    }
}

/// Writes a [SourceIndex] into a Zarr store, one array per resolution level.
pub struct Materializer<'a, C: Container> {
    index: &'a SourceIndex<C>,
    options: ConvertOptions,
}

impl<'a, C: Container> Materializer<'a, C> {
    pub fn new(index: &'a SourceIndex<C>, options: ConvertOptions) -> Self {
        Self { index, options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn destination_exists<S>(&self, storage: &Arc<S>, plan: &PyramidPlan) -> Result<bool>
    where
        S: ?Sized + ReadableWritableListableStorageTraits,
    {
        let group = NodePath::new(&self.options.group_path).map_err(Error::wrap)?;
        if node_exists(storage, &group)? {
            return Ok(true);
        }
        for level in plan.levels() {
            let path = child_path(&self.options.group_path, &level.array_name());
            let path = NodePath::new(&path).map_err(Error::wrap)?;
            if node_exists(storage, &path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Convert the whole pyramid.
    ///
    /// Validation happens before anything is written.
    /// If a copy fails, arrays written so far are left in place.
    pub fn materialize<S>(&self, storage: Arc<S>) -> Result<PyramidPlan>
    where
        S: ?Sized + ReadableWritableListableStorageTraits + 'static,
    {
        let plan = PyramidPlan::new(self.index)?;
        let group_path = &self.options.group_path;

        if self.destination_exists(&storage, &plan)? {
            if !self.options.overwrite {
                return Err(Error::DestinationExists {
                    path: group_path.clone(),
                });
            }
            warn!("Erasing existing destination at {group_path}");
            storage.erase_prefix(&store_prefix(group_path)?)?;
        }

        let mut group = GroupBuilder::new().build(storage.clone(), group_path)?;
        group.attributes_mut().insert(
            "channels".into(),
            serde_json::to_value(plan.channel_keys())?,
        );
        group.attributes_mut().insert(
            "time_points".into(),
            serde_json::to_value(plan.time_keys())?,
        );
        group.store_metadata()?;

        let codec = self.options.compression.to_bytes_to_bytes_codec()?;
        for level in plan.levels() {
            let path = child_path(group_path, &level.array_name());
            info!(
                "Materializing level {} at {path} with shape {:?} and chunks {:?}",
                level.level(),
                level.array_shape(),
                level.array_chunk_shape()
            );

            let mut attributes = serde_json::Map::new();
            attributes.insert(
                "scale".into(),
                serde_json::to_value(level.scale())?,
            );
            let mut builder = ArrayBuilder::new(
                level.array_shape(),
                level.array_chunk_shape(),
                level.geometry().sample_type.data_type(),
                FillValueMetadata::Number(serde_json::Number::from(0)),
            );
            builder
                .dimension_names(DIMENSION_NAMES.into())
                .attributes(attributes);
            if let Some(c) = &codec {
                builder.bytes_to_bytes_codecs(vec![c.clone()]);
            }
            let array = builder.build(storage.clone(), &path)?;
            array.store_metadata()?;

            let pairs = plan.pairs();
            if self.options.parallel {
                pairs
                    .par_iter()
                    .try_for_each(|&(t, c)| self.copy_pair(&array, level, t, c))?;
            } else {
                for (t, c) in pairs {
                    self.copy_pair(&array, level, t, c)?;
                }
            }
        }
        Ok(plan)
    }

    /// Copy the source dataset at (level, t, c) into `array[t, c, ...]`.
    fn copy_pair<S>(&self, array: &Array<S>, level: &LevelPlan, t: usize, c: usize) -> Result<()>
    where
        S: ?Sized + ReadableWritableStorageTraits + 'static,
    {
        debug!(
            "Copying level {} time {} channel {}",
            level.level(),
            self.index.time_keys()[t],
            self.index.channel_keys()[c]
        );
        let geometry = level.geometry();
        match self.options.strategy {
            CopyStrategy::Volume => {
                let region: Vec<_> = geometry.shape.iter().map(|&n| 0..n).collect();
                self.copy_region(array, level.level(), t, c, &region)
            }
            CopyStrategy::Chunked => {
                let mut regions = ChunkRegions::new(&geometry.shape, &geometry.chunk_shape);
                debug!("Streaming {} chunks", regions.num_chunks());
                regions.try_for_each(|region| self.copy_region(array, level.level(), t, c, &region))
            }
        }
    }

    fn copy_region<S>(
        &self,
        array: &Array<S>,
        level: usize,
        t: usize,
        c: usize,
        region: &[std::ops::Range<u64>],
    ) -> Result<()>
    where
        S: ?Sized + ReadableWritableStorageTraits + 'static,
    {
        let block = self.index.read(level, t, c, region)?;
        if block.num_elements() == 0 {
            return Ok(());
        }
        let (t, c) = (t as u64, c as u64);
        let mut ranges = vec![t..t + 1, c..c + 1];
        ranges.extend_from_slice(region);
        let subset = ArraySubset::new_with_ranges(&ranges);
        array.store_array_subset(&subset, block.into_array_bytes())?;
        Ok(())
    }
}

/// Materialize every level of `index` into `storage`.
///
/// Shorthand for [Materializer::materialize].
pub fn convert<C, S>(
    index: &SourceIndex<C>,
    storage: Arc<S>,
    options: ConvertOptions,
) -> Result<PyramidPlan>
where
    C: Container,
    S: ?Sized + ReadableWritableListableStorageTraits + 'static,
{
    Materializer::new(index, options).materialize(storage)
}
