use serde::{Deserialize, Serialize};

/// Naming conventions of a BigDataViewer HDF5 hierarchy.
///
/// ```text
/// /
/// ├── s00
/// │   ├── resolutions (L, 3) float64
/// │   └── subdivisions (L, 3) int32
/// └── t00000
///     └── s00
///         ├── 0
///         │   └── cells (Z, Y, X)
///         └── ...
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLayout {
    /// Top-level entries starting with this are channel (setup) groups.
    pub channel_prefix: String,
    /// Top-level entries starting with this are time-point groups.
    pub time_prefix: String,
    /// Per-channel scale factors, one (x, y, z) row per level.
    pub resolutions_name: String,
    /// Per-channel chunk shapes, one (x, y, z) row per level.
    pub subdivisions_name: String,
    /// Leaf dataset within each level group.
    pub data_node_name: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            channel_prefix: "s".into(),
            time_prefix: "t".into(),
            resolutions_name: "resolutions".into(),
            subdivisions_name: "subdivisions".into(),
            data_node_name: "cells".into(),
        }
    }
}

impl SourceLayout {
    pub fn is_channel(&self, name: &str) -> bool {
        name.starts_with(&self.channel_prefix)
    }

    pub fn is_time_point(&self, name: &str) -> bool {
        name.starts_with(&self.time_prefix)
    }

    pub fn resolutions_path(&self, channel: &str) -> String {
        format!("{channel}/{}", self.resolutions_name)
    }

    pub fn subdivisions_path(&self, channel: &str) -> String {
        format!("{channel}/{}", self.subdivisions_name)
    }

    pub fn data_path(&self, time: &str, channel: &str, level: usize) -> String {
        format!("{time}/{channel}/{level}/{}", self.data_node_name)
    }
}
