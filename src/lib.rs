//! Convert BigDataViewer HDF5 image pyramids into Zarr hierarchies.
//!
//! A [SourceIndex] discovers the time points, channels, and resolution
//! levels of a source [Container](container::Container).
//! [convert] then writes one `(t, c, z, y, x)` array per level using `zarrs`.
mod chunk;
pub mod container;
mod error;
pub mod index;
pub mod layout;
pub mod materialize;
pub mod metadata;
pub mod options;
pub mod sample;

pub use zarrs;

pub use error::{Error, IndexError, Result};
pub use index::SourceIndex;
pub use layout::SourceLayout;
pub use materialize::{LevelPlan, Materializer, PyramidPlan, convert};
pub use options::{Compression, ConvertOptions, CopyStrategy};
