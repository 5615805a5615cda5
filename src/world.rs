//! # World Module
//!
//! A self-contained block store backing the demo binary and the
//! integration tests. The renderer core never touches it directly — it
//! sees the world only through [`BlockEdit`] notifications, the block
//! metadata trait, and the mesh provider built on top of this store.
//!
//! The store keeps three views of the map: the raw block ids, a bit mask
//! of fully opaque cells (the mesh builder's occlusion test is a single
//! bit read), and one light height per column (the topmost Y whose block
//! stops sunlight), which is what edits feed into shadow invalidation.

use bitvec::prelude::BitVec;
use cgmath::Point3;
use log::info;
use noise::{NoiseFn, Perlin};

use crate::blocks::{BlockId, BlockInfo, BlockType, StandardBlocks};
use crate::renderer::BlockEdit;

/// Sea level used by the generator; columns lower than this fill with
/// water.
const SEA_LEVEL: i32 = 12;

/// Horizontal noise scale for terrain generation.
const TERRAIN_SCALE: f64 = 0.05;

/// A bounded voxel world stored as flat arrays.
pub struct VoxelMap {
    width: i32,
    height: i32,
    length: i32,
    blocks: Vec<BlockId>,
    opaque: BitVec,
    light_heights: Vec<i32>,
}

impl VoxelMap {
    /// Creates a world of the given block dimensions filled with air.
    pub fn new(width: i32, height: i32, length: i32) -> Self {
        let volume = (width * height * length) as usize;
        let columns = (width * length) as usize;
        VoxelMap {
            width,
            height,
            length,
            blocks: vec![0; volume],
            opaque: BitVec::repeat(false, volume),
            light_heights: vec![-1; columns],
        }
    }

    /// Generates rolling terrain from Perlin noise: stone under dirt under
    /// grass, water filling the low columns, the odd sapling on top.
    pub fn generate(width: i32, height: i32, length: i32, seed: u32) -> Self {
        let mut map = VoxelMap::new(width, height, length);
        let perlin = Perlin::new(seed);
        fastrand::seed(seed as u64);

        for z in 0..length {
            for x in 0..width {
                let sample = perlin.get([x as f64 * TERRAIN_SCALE, z as f64 * TERRAIN_SCALE]);
                let surface =
                    (height as f64 * 0.4 + sample * height as f64 * 0.25) as i32;
                let surface = surface.clamp(1, height - 2);
                for y in 0..=surface {
                    let block = if y == surface {
                        if surface < SEA_LEVEL {
                            BlockType::DIRT
                        } else {
                            BlockType::GRASS
                        }
                    } else if y >= surface - 2 {
                        BlockType::DIRT
                    } else {
                        BlockType::STONE
                    };
                    map.put(x, y, z, block.id());
                }
                for y in surface + 1..SEA_LEVEL {
                    map.put(x, y, z, BlockType::WATER.id());
                }
                if surface >= SEA_LEVEL && fastrand::u8(0..40) == 0 {
                    map.put(x, surface + 1, z, BlockType::SAPLING.id());
                }
            }
        }
        map.rebuild_light_heights();
        info!("generated {}x{}x{} world", width, height, length);
        map
    }

    /// World width in blocks.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// World height in blocks.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// World length in blocks.
    pub fn length(&self) -> i32 {
        self.length
    }

    fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && x < self.width && y < self.height && z < self.length
    }

    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        ((y * self.length + z) * self.width + x) as usize
    }

    fn column(&self, x: i32, z: i32) -> usize {
        (z * self.width + x) as usize
    }

    /// The block id at a position; air outside the world bounds.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockId {
        if self.in_bounds(x, y, z) {
            self.blocks[self.index(x, y, z)]
        } else {
            0
        }
    }

    /// Whether the cell at a position is fully opaque.
    ///
    /// Out-of-bounds cells count as open so world-boundary faces render.
    pub fn is_opaque(&self, x: i32, y: i32, z: i32) -> bool {
        self.in_bounds(x, y, z) && self.opaque[self.index(x, y, z)]
    }

    /// The topmost Y at which this column blocks sunlight, or `None` for a
    /// fully open column (or out-of-bounds coordinates).
    pub fn light_height(&self, x: i32, z: i32) -> Option<i32> {
        if x < 0 || z < 0 || x >= self.width || z >= self.length {
            return None;
        }
        match self.light_heights[self.column(x, z)] {
            -1 => None,
            h => Some(h),
        }
    }

    /// The block the camera's head is inside of.
    pub fn block_at_head(&self, position: Point3<f32>) -> BlockId {
        self.get_block(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// Writes a block without maintaining light heights; generation-time
    /// only.
    fn put(&mut self, x: i32, y: i32, z: i32, id: BlockId) {
        let index = self.index(x, y, z);
        self.blocks[index] = id;
        let opaque = StandardBlocks.is_opaque(id);
        self.opaque.set(index, opaque);
    }

    fn rebuild_light_heights(&mut self) {
        for z in 0..self.length {
            for x in 0..self.width {
                let column = self.column(x, z);
                self.light_heights[column] = self.scan_light_height(x, z);
            }
        }
    }

    fn scan_light_height(&self, x: i32, z: i32) -> i32 {
        for y in (0..self.height).rev() {
            if StandardBlocks.blocks_light(self.get_block(x, y, z)) {
                return y;
            }
        }
        -1
    }

    /// Replaces the block at a position, returning the edit notification
    /// the renderer needs.
    ///
    /// Returns `None` for out-of-bounds positions and for writes that
    /// change nothing.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> Option<BlockEdit> {
        if !self.in_bounds(x, y, z) {
            return None;
        }
        let old_block = self.get_block(x, y, z);
        if old_block == id {
            return None;
        }
        let old_light_height = self.light_height(x, z);
        self.put(x, y, z, id);
        let column = self.column(x, z);
        self.light_heights[column] = self.scan_light_height(x, z);
        let new_light_height = self.light_height(x, z);
        Some(BlockEdit {
            x,
            y,
            z,
            old_block,
            new_block: id,
            old_light_height,
            new_light_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_columns_have_no_light_height() {
        let map = VoxelMap::new(16, 16, 16);
        assert_eq!(map.light_height(3, 3), None);
        assert_eq!(map.light_height(-1, 0), None);
    }

    #[test]
    fn placing_a_block_raises_the_light_column() {
        let mut map = VoxelMap::new(16, 32, 16);
        let edit = map.set_block(4, 10, 4, BlockType::STONE.id()).unwrap();
        assert_eq!(edit.old_light_height, None);
        assert_eq!(edit.new_light_height, Some(10));

        // A higher blocker takes over the column.
        let edit = map.set_block(4, 20, 4, BlockType::STONE.id()).unwrap();
        assert_eq!(edit.old_light_height, Some(10));
        assert_eq!(edit.new_light_height, Some(20));

        // Removing it falls back to the lower one.
        let edit = map.set_block(4, 20, 4, 0).unwrap();
        assert_eq!(edit.old_light_height, Some(20));
        assert_eq!(edit.new_light_height, Some(10));
    }

    #[test]
    fn saplings_do_not_block_light() {
        let mut map = VoxelMap::new(16, 32, 16);
        map.set_block(2, 5, 2, BlockType::SAPLING.id());
        assert_eq!(map.light_height(2, 2), None);
    }

    #[test]
    fn redundant_and_out_of_bounds_writes_produce_no_edit() {
        let mut map = VoxelMap::new(16, 16, 16);
        assert!(map.set_block(0, 0, 0, 0).is_none());
        assert!(map.set_block(99, 0, 0, BlockType::STONE.id()).is_none());
    }

    #[test]
    fn generated_terrain_has_a_surface_in_every_column() {
        let map = VoxelMap::generate(32, 32, 32, 7);
        for z in 0..32 {
            for x in 0..32 {
                assert!(map.light_height(x, z).is_some(), "open column at {x},{z}");
            }
        }
    }

    #[test]
    fn opacity_mask_matches_block_metadata() {
        let mut map = VoxelMap::new(16, 16, 16);
        map.set_block(1, 1, 1, BlockType::STONE.id());
        map.set_block(2, 1, 1, BlockType::WATER.id());
        assert!(map.is_opaque(1, 1, 1));
        assert!(!map.is_opaque(2, 1, 1));
        assert!(!map.is_opaque(0, -5, 0));
    }
}
