//! Read access to the hierarchical source container.
//!
//! The index only needs a handful of primitives from the container:
//! listing the top-level entries, reading small numeric metadata tables,
//! and opening the leaf sample datasets.
use std::ops::Range;

use crate::{Result, metadata::Table, sample::Block, sample::SampleType};

#[cfg(feature = "hdf5")]
mod h5;
mod memory;

#[cfg(feature = "hdf5")]
pub use h5::{Hdf5Container, Hdf5DataNode};
pub use memory::{MemoryContainer, MemoryDataNode};

/// A hierarchical container such as an HDF5 file.
///
/// Paths are `/`-separated and relative to the container root.
pub trait Container: Send + Sync {
    type Node: DataNode;

    /// Names of the top-level entries, in the container's native order.
    fn member_names(&self) -> Result<Vec<String>>;

    /// Read a numeric dataset as `f64`, or `None` if nothing exists at `path`.
    fn table(&self, path: &str) -> Result<Option<Table>>;

    /// Open a sample dataset, or `None` if nothing exists at `path`.
    fn data_node(&self, path: &str) -> Result<Option<Self::Node>>;
}

/// A leaf dataset holding samples for one (time, channel, level).
pub trait DataNode: Send + Sync {
    fn shape(&self) -> &[u64];

    /// The on-disk chunk shape, or `None` for contiguous storage.
    fn chunk_shape(&self) -> Option<&[u64]>;

    fn sample_type(&self) -> SampleType;

    /// Read a C-ordered region.
    ///
    /// Callers are responsible for checking `region` is within [DataNode::shape].
    fn read(&self, region: &[Range<u64>]) -> Result<Block>;
}

impl<C: Container + ?Sized> Container for &C {
    type Node = C::Node;

    fn member_names(&self) -> Result<Vec<String>> {
        (**self).member_names()
    }

    fn table(&self, path: &str) -> Result<Option<Table>> {
        (**self).table(path)
    }

    fn data_node(&self, path: &str) -> Result<Option<Self::Node>> {
        (**self).data_node(path)
    }
}
