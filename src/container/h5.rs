use std::{ops::Range, path::Path};

use hdf5::{
    Dataset, File, H5Type,
    types::{FloatSize, IntSize, TypeDescriptor},
};
use ndarray::{Ix3, s};

use super::{Container, DataNode};
use crate::{
    Error, Result,
    metadata::Table,
    sample::{Block, Sample, SampleType, samples_to_bytes},
};

/// A read-only HDF5 file.
pub struct Hdf5Container {
    file: File,
}

impl Hdf5Container {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    pub fn from_file(file: File) -> Self {
        Self { file }
    }

    fn dataset(&self, path: &str) -> Result<Option<Dataset>> {
        // link_exists only checks the final component, so walk the path.
        let mut prefix = String::new();
        for part in path.trim_matches('/').split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if !self.file.link_exists(&prefix) {
                return Ok(None);
            }
        }
        Ok(Some(self.file.dataset(&prefix)?))
    }
}

impl Container for Hdf5Container {
    type Node = Hdf5DataNode;

    fn member_names(&self) -> Result<Vec<String>> {
        Ok(self.file.member_names()?)
    }

    fn table(&self, path: &str) -> Result<Option<Table>> {
        let Some(ds) = self.dataset(path)? else {
            return Ok(None);
        };
        let values: Vec<f64> = ds.read_raw()?;
        Ok(Some(Table::new(ds.shape(), values)))
    }

    fn data_node(&self, path: &str) -> Result<Option<Self::Node>> {
        self.dataset(path)?.map(Hdf5DataNode::new).transpose()
    }
}

fn sample_type(descriptor: &TypeDescriptor) -> Option<SampleType> {
    let st = match descriptor {
        TypeDescriptor::Integer(IntSize::U1) => SampleType::Int8,
        TypeDescriptor::Integer(IntSize::U2) => SampleType::Int16,
        TypeDescriptor::Integer(IntSize::U4) => SampleType::Int32,
        TypeDescriptor::Integer(IntSize::U8) => SampleType::Int64,
        TypeDescriptor::Unsigned(IntSize::U1) => SampleType::Uint8,
        TypeDescriptor::Unsigned(IntSize::U2) => SampleType::Uint16,
        TypeDescriptor::Unsigned(IntSize::U4) => SampleType::Uint32,
        TypeDescriptor::Unsigned(IntSize::U8) => SampleType::Uint64,
        TypeDescriptor::Float(FloatSize::U4) => SampleType::Float32,
        TypeDescriptor::Float(FloatSize::U8) => SampleType::Float64,
        _ => return None,
    };
    Some(st)
}

/// A sample dataset within an HDF5 file.
pub struct Hdf5DataNode {
    dataset: Dataset,
    shape: Vec<u64>,
    chunk_shape: Option<Vec<u64>>,
    sample_type: SampleType,
}

impl Hdf5DataNode {
    pub fn new(dataset: Dataset) -> Result<Self> {
        let descriptor = dataset.dtype()?.to_descriptor()?;
        let sample_type = sample_type(&descriptor).ok_or_else(|| {
            Error::general(format!(
                "unsupported sample type {descriptor:?} in {}",
                dataset.name()
            ))
        })?;
        let shape = dataset.shape().into_iter().map(|n| n as u64).collect();
        let chunk_shape = dataset
            .chunk()
            .map(|c| c.into_iter().map(|n| n as u64).collect());
        Ok(Self {
            dataset,
            shape,
            chunk_shape,
            sample_type,
        })
    }

    fn read_typed<T: H5Type + Sample>(&self, region: &[Range<u64>]) -> Result<Vec<u8>> {
        let [z, y, x] = region else {
            return Err(Error::general(format!(
                "expected a 3D region, got {region:?}"
            )));
        };
        let arr = self.dataset.read_slice::<T, _, Ix3>(s![
            z.start as usize..z.end as usize,
            y.start as usize..y.end as usize,
            x.start as usize..x.end as usize
        ])?;
        // Iteration is in logical (C) order regardless of memory layout.
        let samples: Vec<T> = arr.iter().copied().collect();
        Ok(samples_to_bytes(&samples))
    }
}

impl DataNode for Hdf5DataNode {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    fn chunk_shape(&self) -> Option<&[u64]> {
        self.chunk_shape.as_deref()
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn read(&self, region: &[Range<u64>]) -> Result<Block> {
        let bytes = match self.sample_type {
            SampleType::Int8 => self.read_typed::<i8>(region)?,
            SampleType::Int16 => self.read_typed::<i16>(region)?,
            SampleType::Int32 => self.read_typed::<i32>(region)?,
            SampleType::Int64 => self.read_typed::<i64>(region)?,
            SampleType::Uint8 => self.read_typed::<u8>(region)?,
            SampleType::Uint16 => self.read_typed::<u16>(region)?,
            SampleType::Uint32 => self.read_typed::<u32>(region)?,
            SampleType::Uint64 => self.read_typed::<u64>(region)?,
            SampleType::Float32 => self.read_typed::<f32>(region)?,
            SampleType::Float64 => self.read_typed::<f64>(region)?,
        };
        let shape = region.iter().map(|r| r.end - r.start).collect();
        Block::new(shape, self.sample_type, bytes)
    }
}
