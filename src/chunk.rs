use std::ops::Range;

/// Iterate over the regions of a regular chunk grid, in C order.
///
/// Edge chunks are truncated to the array bounds.
#[derive(Debug, Clone)]
pub(crate) struct ChunkRegions {
    shape: Vec<u64>,
    chunk_shape: Vec<u64>,
    grid: Vec<u64>,
    /// `None` once exhausted.
    next: Option<Vec<u64>>,
}

impl ChunkRegions {
    /// `shape` and `chunk_shape` must have the same length and `chunk_shape` must be non-zero.
    pub(crate) fn new(shape: &[u64], chunk_shape: &[u64]) -> Self {
        debug_assert_eq!(shape.len(), chunk_shape.len());
        let grid: Vec<u64> = shape
            .iter()
            .zip(chunk_shape)
            .map(|(&n, &c)| n.div_ceil(c.max(1)))
            .collect();
        let next = if grid.contains(&0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
            grid,
            next,
        }
    }

    pub(crate) fn num_chunks(&self) -> u64 {
        self.grid.iter().product()
    }
}

impl Iterator for ChunkRegions {
    type Item = Vec<Range<u64>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let region = current
            .iter()
            .zip(&self.chunk_shape)
            .zip(&self.shape)
            .map(|((&i, &c), &n)| {
                let start = i * c;
                start..(start + c).min(n)
            })
            .collect();

        let mut following = current;
        for d in (0..following.len()).rev() {
            following[d] += 1;
            if following[d] < self.grid[d] {
                self.next = Some(following);
                return Some(region);
            }
            following[d] = 0;
        }
        Some(region)
    }
}
