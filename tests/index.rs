mod common;

use bdv_zarrs::{
    Error, IndexError, SourceIndex, SourceLayout,
    container::{Container, DataNode, MemoryContainer, MemoryDataNode},
    metadata::{Multiscales, Table},
};
use common::{Level, bdv_source, init_logging, level, volume};

fn two_levels() -> Vec<Level> {
    vec![level([8, 12, 16], [4, 4, 8]), level([4, 6, 8], [4, 6, 8])]
}

#[test]
fn discovers_sorted_keys() {
    init_logging();
    let levels = two_levels();
    let container = bdv_source(
        &["t00001", "t00000"],
        &[("s01", &levels[..]), ("s00", &levels[..])],
    );
    assert_eq!(
        container.member_names().unwrap()[..3],
        ["__DATA_TYPES__", "s01", "s00"]
    );

    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();
    assert_eq!(index.time_keys(), ["t00000", "t00001"]);
    assert_eq!(index.channel_keys(), ["s00", "s01"]);
    assert_eq!(index.num_time_points(), 2);
    assert_eq!(index.num_channels(), 2);
    assert_eq!(index.multiscales(), Multiscales::Uniform(2));
    assert_eq!(index.scales()[1].level(1), Some(&[2.0, 2.0, 2.0]));
    assert_eq!(index.chunk_sizes()[0].level_zyx(0), Some([4, 4, 8]));
}

#[test]
fn empty_container_is_a_structure_error() {
    let result = SourceIndex::open(MemoryContainer::new(), SourceLayout::default());
    assert!(matches!(result, Err(Error::Structure(_))));

    let mut container = MemoryContainer::new();
    container.insert_group("__DATA_TYPES__").insert_group("extra");
    let result = SourceIndex::open(container, SourceLayout::default());
    assert!(matches!(result, Err(Error::Structure(_))));
}

#[test]
fn missing_time_points_is_a_structure_error() {
    let mut container = MemoryContainer::new();
    common::add_channel_metadata(&mut container, "s00", &two_levels());
    let result = SourceIndex::open(container, SourceLayout::default());
    assert!(matches!(result, Err(Error::Structure(_))));
}

#[test]
fn missing_subdivisions_is_a_metadata_error() {
    let mut container = MemoryContainer::new();
    container
        .insert_table("s00/resolutions", Table::new(vec![1, 3], vec![1.0; 3]))
        .insert_group("t00000");
    match SourceIndex::open(container, SourceLayout::default()) {
        Err(Error::Metadata { channel, message }) => {
            assert_eq!(channel, "s00");
            assert!(message.contains("subdivisions"), "{message}");
        }
        other => panic!("expected metadata error, got {other:?}"),
    }
}

#[test]
fn inconsistent_table_lengths_is_a_metadata_error() {
    let mut container = MemoryContainer::new();
    container
        .insert_table("s00/resolutions", Table::new(vec![2, 3], vec![1.0; 6]))
        .insert_table("s00/subdivisions", Table::new(vec![1, 3], vec![8.0; 3]))
        .insert_group("t00000");
    let result = SourceIndex::open(container, SourceLayout::default());
    assert!(matches!(result, Err(Error::Metadata { .. })));
}

#[test]
fn custom_layout() {
    let layout = SourceLayout {
        channel_prefix: "setup".into(),
        time_prefix: "timepoint".into(),
        data_node_name: "data".into(),
        ..Default::default()
    };
    let l = level([2, 2, 2], [2, 2, 2]);
    let mut container = MemoryContainer::new();
    common::add_channel_metadata(&mut container, "setup0", &[l]);
    let node = MemoryDataNode::from_samples(vec![2, 2, 2], None, &[1u8; 8]).unwrap();
    container.insert_data("timepoint0/setup0/0/data", node);

    let index = SourceIndex::open(container, layout).unwrap();
    assert_eq!(index.channel_keys(), ["setup0"]);
    let block = index.read_all(0, 0, 0).unwrap();
    assert_eq!(block.to_vec::<u8>().unwrap(), vec![1; 8]);
}

#[test]
fn virtual_read_matches_source() {
    let levels = two_levels();
    let container = bdv_source(
        &["t00000", "t00001"],
        &[("s00", &levels[..]), ("s01", &levels[..])],
    );
    let index = SourceIndex::open(&container, SourceLayout::default()).unwrap();

    for t in 0..2 {
        for c in 0..2 {
            for (lvl, l) in levels.iter().enumerate() {
                let path = format!(
                    "{}/{}/{lvl}/cells",
                    index.time_keys()[t],
                    index.channel_keys()[c]
                );
                let node = container.data_node(&path).unwrap().unwrap();
                let region: Vec<_> = node.shape().iter().map(|&n| 0..n).collect();
                let direct = node.read(&region).unwrap();

                let block = index.read_all(lvl, t, c).unwrap();
                assert_eq!(block.as_bytes(), direct.as_bytes());
                assert_eq!(block.to_vec::<u16>().unwrap(), volume(t, c, lvl, l.shape));
            }
        }
    }
}

#[test]
fn virtual_read_region() {
    let levels = two_levels();
    let container = bdv_source(&["t00000"], &[("s00", &levels[..]), ("s01", &levels[..])]);
    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();

    let block = index.read(0, 0, 1, &[2..4, 5..6, 10..13]).unwrap();
    assert_eq!(block.shape(), &[2, 1, 3]);
    let expected: Vec<u16> = [(2, 5), (3, 5)]
        .into_iter()
        .flat_map(|(z, y)| (10..13).map(move |x| common::sample(0, 1, 0, z, y, x)))
        .collect();
    assert_eq!(block.to_vec::<u16>().unwrap(), expected);
}

#[test]
fn out_of_range_positions() {
    let levels = two_levels();
    let container = bdv_source(&["t00000"], &[("s00", &levels[..])]);
    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();

    assert!(matches!(
        index.read_all(2, 0, 0),
        Err(Error::Index(IndexError::Level { index: 2, len: 2, .. }))
    ));
    assert!(matches!(
        index.read_all(0, 1, 0),
        Err(Error::Index(IndexError::Time { index: 1, len: 1 }))
    ));
    assert!(matches!(
        index.read_all(0, 0, 3),
        Err(Error::Index(IndexError::Channel { index: 3, len: 1 }))
    ));
    assert!(matches!(
        index.read(1, 0, 0, &[0..4, 0..6, 0..9]),
        Err(Error::Index(IndexError::Region { .. }))
    ));
    assert!(matches!(
        index.read(1, 0, 0, &[0..4, 0..6]),
        Err(Error::Index(IndexError::Region { .. }))
    ));
}

#[test]
fn divergent_level_counts_are_exposed() {
    let six: Vec<Level> = (0..6)
        .map(|i| level([64 >> i, 64 >> i, 64 >> i], [2, 2, 2]))
        .collect();
    let container = bdv_source(&["t00000"], &[("s00", &six[..]), ("s01", &six[..5])]);
    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();

    assert_eq!(index.multiscales(), Multiscales::PerChannel(vec![6, 5]));
    assert_eq!(index.level_count(0).unwrap(), 6);
    assert_eq!(index.level_count(1).unwrap(), 5);
    assert!(index.read_all(5, 0, 0).is_ok());
    assert!(matches!(
        index.read_all(5, 0, 1),
        Err(Error::Index(IndexError::Level { index: 5, len: 5, .. }))
    ));
}

#[test]
fn missing_dataset_is_a_structure_error() {
    let levels = two_levels();
    let mut container = MemoryContainer::new();
    common::add_channel_metadata(&mut container, "s00", &levels);
    common::add_data(&mut container, (0, "t00000"), (0, "s00"), 0, levels[0]);
    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();
    match index.datasets() {
        Err(Error::Structure(msg)) => assert!(msg.contains("t00000/s00/1/cells"), "{msg}"),
        other => panic!("expected structure error, got {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn contiguous_datasets_use_subdivisions() {
    let contiguous = Level {
        shape: [10, 20, 30],
        chunks: None,
    };
    let container = bdv_source(&["t00000"], &[("s00", &[contiguous][..])]);
    let index = SourceIndex::open(container, SourceLayout::default()).unwrap();
    let geometry = index.geometry(0, 0, 0).unwrap();
    assert_eq!(geometry.shape, vec![10, 20, 30]);
    // subdivisions default to 16 per axis, clamped to the shape
    assert_eq!(geometry.chunk_shape, vec![10, 16, 16]);
}
