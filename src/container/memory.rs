use std::{collections::HashMap, ops::Range, sync::Arc};

use super::{Container, DataNode};
use crate::{
    Error, Result,
    metadata::Table,
    sample::{Block, Sample, SampleType},
};

#[derive(Debug, Clone)]
enum Entry {
    Table(Table),
    Data(MemoryDataNode),
}

/// A container held entirely in memory.
///
/// Useful for building synthetic sources.
/// Top-level entries are enumerated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    members: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, path: &str, entry: Entry) {
        let path = path.trim_matches('/');
        let top = path.split('/').next().unwrap_or(path);
        if !self.members.iter().any(|m| m == top) {
            self.members.push(top.to_owned());
        }
        self.entries.insert(path.to_owned(), entry);
    }

    /// Add a numeric table, creating any parent groups.
    pub fn insert_table(&mut self, path: &str, table: Table) -> &mut Self {
        self.insert(path, Entry::Table(table));
        self
    }

    /// Add a sample dataset, creating any parent groups.
    pub fn insert_data(&mut self, path: &str, node: MemoryDataNode) -> &mut Self {
        self.insert(path, Entry::Data(node));
        self
    }

    /// Add an empty top-level group.
    pub fn insert_group(&mut self, name: &str) -> &mut Self {
        let name = name.trim_matches('/');
        if !self.members.iter().any(|m| m == name) {
            self.members.push(name.to_owned());
        }
        self
    }
}

impl Container for MemoryContainer {
    type Node = MemoryDataNode;

    fn member_names(&self) -> Result<Vec<String>> {
        Ok(self.members.clone())
    }

    fn table(&self, path: &str) -> Result<Option<Table>> {
        match self.entries.get(path.trim_matches('/')) {
            None => Ok(None),
            Some(Entry::Table(t)) => Ok(Some(t.clone())),
            Some(Entry::Data(d)) => {
                // Sample datasets are numeric too, so they can be read as tables.
                let values = d
                    .block
                    .as_bytes()
                    .chunks_exact(d.block.sample_type().size())
                    .map(|b| as_f64(d.block.sample_type(), b))
                    .collect();
                let shape = d.block.shape().iter().map(|&n| n as usize).collect();
                Ok(Some(Table::new(shape, values)))
            }
        }
    }

    fn data_node(&self, path: &str) -> Result<Option<Self::Node>> {
        match self.entries.get(path.trim_matches('/')) {
            None => Ok(None),
            Some(Entry::Data(d)) => Ok(Some(d.clone())),
            Some(Entry::Table(_)) => Err(Error::Structure(format!(
                "{path} is a metadata table, not a sample dataset"
            ))),
        }
    }
}

fn as_f64(sample_type: SampleType, bytes: &[u8]) -> f64 {
    match sample_type {
        SampleType::Int8 => i8::from_ne_slice(bytes) as f64,
        SampleType::Int16 => i16::from_ne_slice(bytes) as f64,
        SampleType::Int32 => i32::from_ne_slice(bytes) as f64,
        SampleType::Int64 => i64::from_ne_slice(bytes) as f64,
        SampleType::Uint8 => u8::from_ne_slice(bytes) as f64,
        SampleType::Uint16 => u16::from_ne_slice(bytes) as f64,
        SampleType::Uint32 => u32::from_ne_slice(bytes) as f64,
        SampleType::Uint64 => u64::from_ne_slice(bytes) as f64,
        SampleType::Float32 => f32::from_ne_slice(bytes) as f64,
        SampleType::Float64 => f64::from_ne_slice(bytes),
    }
}

/// An in-memory sample dataset.
///
/// Cloning is cheap; the samples are shared.
#[derive(Debug, Clone)]
pub struct MemoryDataNode {
    block: Arc<Block>,
    chunk_shape: Option<Vec<u64>>,
}

impl MemoryDataNode {
    pub fn new(block: Block, chunk_shape: Option<Vec<u64>>) -> Result<Self> {
        if let Some(cs) = &chunk_shape {
            if cs.len() != block.shape().len() || cs.contains(&0) {
                return Err(Error::general(format!(
                    "invalid chunk shape {cs:?} for dataset of shape {:?}",
                    block.shape()
                )));
            }
        }
        Ok(Self {
            block: Arc::new(block),
            chunk_shape,
        })
    }

    pub fn from_samples<T: Sample>(
        shape: Vec<u64>,
        chunk_shape: Option<Vec<u64>>,
        samples: &[T],
    ) -> Result<Self> {
        Self::new(Block::from_samples(shape, samples)?, chunk_shape)
    }
}

impl DataNode for MemoryDataNode {
    fn shape(&self) -> &[u64] {
        self.block.shape()
    }

    fn chunk_shape(&self) -> Option<&[u64]> {
        self.chunk_shape.as_deref()
    }

    fn sample_type(&self) -> SampleType {
        self.block.sample_type()
    }

    fn read(&self, region: &[Range<u64>]) -> Result<Block> {
        self.block.extract(region)
    }
}
