#![allow(dead_code)]

use bdv_zarrs::{
    container::{MemoryContainer, MemoryDataNode},
    metadata::Table,
};

pub fn init_logging() {
    env_logger::try_init().ok();
}

/// Geometry of one level of a synthetic source.
#[derive(Debug, Clone, Copy)]
pub struct Level {
    /// (z, y, x)
    pub shape: [u64; 3],
    /// (z, y, x); `None` for contiguous storage.
    pub chunks: Option<[u64; 3]>,
}

pub fn level(shape: [u64; 3], chunks: [u64; 3]) -> Level {
    Level {
        shape,
        chunks: Some(chunks),
    }
}

/// Deterministic sample value, distinct across time points, channels, and levels.
pub fn sample(t: usize, c: usize, lvl: usize, z: u64, y: u64, x: u64) -> u16 {
    let v = (t as u64) * 10_007 + (c as u64) * 1_009 + (lvl as u64) * 101 + z * 31 + y * 7 + x;
    (v % 65_521) as u16
}

pub fn volume(t: usize, c: usize, lvl: usize, shape: [u64; 3]) -> Vec<u16> {
    let [nz, ny, nx] = shape;
    let mut out = Vec::with_capacity((nz * ny * nx) as usize);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                out.push(sample(t, c, lvl, z, y, x));
            }
        }
    }
    out
}

/// Add a channel's `resolutions` and `subdivisions` tables.
pub fn add_channel_metadata(container: &mut MemoryContainer, channel: &str, levels: &[Level]) {
    let mut resolutions = Vec::new();
    let mut subdivisions = Vec::new();
    for (i, l) in levels.iter().enumerate() {
        let f = (1u64 << i) as f64;
        resolutions.extend([f, f, f]);
        let [cz, cy, cx] = l.chunks.unwrap_or([16, 16, 16]);
        subdivisions.extend([cx as f64, cy as f64, cz as f64]);
    }
    container.insert_table(
        &format!("{channel}/resolutions"),
        Table::new(vec![levels.len(), 3], resolutions),
    );
    container.insert_table(
        &format!("{channel}/subdivisions"),
        Table::new(vec![levels.len(), 3], subdivisions),
    );
}

pub fn add_data(
    container: &mut MemoryContainer,
    (t, time): (usize, &str),
    (c, channel): (usize, &str),
    lvl: usize,
    level: Level,
) {
    let node = MemoryDataNode::from_samples(
        level.shape.to_vec(),
        level.chunks.map(|c| c.to_vec()),
        &volume(t, c, lvl, level.shape),
    )
    .expect("valid data node");
    container.insert_data(&format!("{time}/{channel}/{lvl}/cells"), node);
}

/// Build a BigDataViewer-like container.
///
/// Keys are inserted in the given order; values are generated from the
/// keys' positions once sorted.
pub fn bdv_source(times: &[&str], channels: &[(&str, &[Level])]) -> MemoryContainer {
    let mut container = MemoryContainer::new();
    container.insert_group("__DATA_TYPES__");

    let mut sorted_times = times.to_vec();
    sorted_times.sort();
    let mut sorted_channels: Vec<&str> = channels.iter().map(|(c, _)| *c).collect();
    sorted_channels.sort();

    for (channel, levels) in channels {
        add_channel_metadata(&mut container, channel, levels);
    }
    for time in times {
        let t = sorted_times.iter().position(|s| s == time).unwrap();
        for (channel, levels) in channels {
            let c = sorted_channels.iter().position(|s| s == channel).unwrap();
            for (lvl, l) in levels.iter().enumerate() {
                add_data(&mut container, (t, *time), (c, *channel), lvl, *l);
            }
        }
    }
    container
}
