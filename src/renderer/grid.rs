//! The chunk grid: owner of every [`ChunkRecord`] for the loaded world.
//!
//! Records live in one flat arena in world-scan order (z outer, y middle,
//! x inner). Lookup by chunk coordinate always goes through this arena and
//! never depends on the render sort order; the sorter maintains a separate
//! permutation over arena indices.

use log::info;

use crate::graphics::GraphicsApi;

use super::chunk::{ChunkRecord, CHUNK_DIMENSION, CHUNK_MASK};

/// Rounds a world dimension up to the next multiple of the chunk size.
fn next_multiple_of_chunk(value: i32) -> i32 {
    (value + CHUNK_MASK) & !CHUNK_MASK
}

/// Owns the 3D array of chunk records for the currently loaded world.
pub struct ChunkGrid {
    chunks_x: i32,
    chunks_y: i32,
    chunks_z: i32,
    records: Vec<ChunkRecord>,
}

impl ChunkGrid {
    /// Creates a grid with no world loaded.
    pub fn new() -> Self {
        ChunkGrid {
            chunks_x: 0,
            chunks_y: 0,
            chunks_z: 0,
            records: Vec::new(),
        }
    }

    /// Allocates records for a world of the given block dimensions.
    ///
    /// Dimensions are rounded up to the chunk size. Any previously loaded
    /// grid is released first, GPU buffers included.
    pub fn load<G: GraphicsApi>(&mut self, gfx: &mut G, width: i32, height: i32, length: i32) {
        self.unload(gfx);

        let width = next_multiple_of_chunk(width);
        let height = next_multiple_of_chunk(height);
        let length = next_multiple_of_chunk(length);
        self.chunks_x = width / CHUNK_DIMENSION;
        self.chunks_y = height / CHUNK_DIMENSION;
        self.chunks_z = length / CHUNK_DIMENSION;

        let count = (self.chunks_x * self.chunks_y * self.chunks_z) as usize;
        self.records = Vec::with_capacity(count);
        for z in (0..length).step_by(CHUNK_DIMENSION as usize) {
            for y in (0..height).step_by(CHUNK_DIMENSION as usize) {
                for x in (0..width).step_by(CHUNK_DIMENSION as usize) {
                    self.records.push(ChunkRecord::new(x, y, z));
                }
            }
        }
        info!(
            "chunk grid loaded: {}x{}x{} chunks ({} records)",
            self.chunks_x, self.chunks_y, self.chunks_z, count
        );
    }

    /// Releases every record and its GPU buffers. Safe to call when
    /// nothing is loaded.
    pub fn unload<G: GraphicsApi>(&mut self, gfx: &mut G) {
        for record in self.records.iter_mut() {
            record.reset(gfx);
        }
        self.records.clear();
        self.chunks_x = 0;
        self.chunks_y = 0;
        self.chunks_z = 0;
    }

    /// Resets every record in place, keeping the grid dimensions.
    ///
    /// Used when baked data went stale wholesale (atlas layout change,
    /// lighting colour change).
    pub fn refresh<G: GraphicsApi>(&mut self, gfx: &mut G) {
        for record in self.records.iter_mut() {
            record.reset(gfx);
        }
    }

    /// Whether a world is currently loaded.
    pub fn is_loaded(&self) -> bool {
        !self.records.is_empty()
    }

    /// Number of records in the grid.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the grid holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Grid dimension in chunks along X.
    pub fn chunks_x(&self) -> i32 {
        self.chunks_x
    }

    /// Grid dimension in chunks along Y.
    pub fn chunks_y(&self) -> i32 {
        self.chunks_y
    }

    /// Grid dimension in chunks along Z.
    pub fn chunks_z(&self) -> i32 {
        self.chunks_z
    }

    /// Arena index of the record at chunk coordinate `(cx, cy, cz)`, or
    /// `None` when out of range.
    pub fn index_of(&self, cx: i32, cy: i32, cz: i32) -> Option<usize> {
        if cx < 0
            || cy < 0
            || cz < 0
            || cx >= self.chunks_x
            || cy >= self.chunks_y
            || cz >= self.chunks_z
        {
            return None;
        }
        Some((cx + self.chunks_x * (cy + cz * self.chunks_y)) as usize)
    }

    /// The record at an arena index.
    pub fn record(&self, index: usize) -> &ChunkRecord {
        &self.records[index]
    }

    /// Mutable access to the record at an arena index.
    pub fn record_mut(&mut self, index: usize) -> &mut ChunkRecord {
        &mut self.records[index]
    }

    /// The record at a chunk coordinate, or `None` when out of range.
    pub fn record_at(&self, cx: i32, cy: i32, cz: i32) -> Option<&ChunkRecord> {
        self.index_of(cx, cy, cz).map(|i| &self.records[i])
    }

    /// Mutable access to the record at a chunk coordinate.
    pub fn record_at_mut(&mut self, cx: i32, cy: i32, cz: i32) -> Option<&mut ChunkRecord> {
        self.index_of(cx, cy, cz).map(move |i| &mut self.records[i])
    }

    /// Discards the cached geometry of one chunk.
    ///
    /// Out-of-range coordinates are silently ignored; the invalidation
    /// math at world edges produces them routinely.
    pub fn invalidate<G: GraphicsApi>(&mut self, gfx: &mut G, cx: i32, cy: i32, cz: i32) {
        if let Some(index) = self.index_of(cx, cy, cz) {
            self.records[index].reset(gfx);
        }
    }
}

impl Default for ChunkGrid {
    fn default() -> Self {
        ChunkGrid::new()
    }
}
