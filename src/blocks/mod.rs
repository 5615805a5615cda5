//! # Block Module
//!
//! Block metadata for the voxel world: per-block render and lighting
//! properties, plus the [`BlockInfo`] trait through which the renderer core
//! consumes them. The core only ever asks "is this id opaque?" and "is this
//! id translucent?"; everything else here serves the demo world and mesh
//! builder.

use phf::phf_map;

pub mod block_side;
pub mod block_type;

pub use block_side::BlockSide;
pub use block_type::BlockType;

/// The underlying integer type used to represent block types in storage.
pub type BlockId = u8;

/// Static render/lighting properties of one block type.
pub struct BlockDef {
    /// Fully opaque: occludes neighboring faces and fills the depth buffer
    /// in the opaque pass.
    pub opaque: bool,
    /// Drawn as double-sided crossed quads in the sprite pass.
    pub sprite: bool,
    /// Alpha-blended in the translucent passes.
    pub translucent: bool,
    /// Whether the block stops sunlight for the column below it.
    pub blocks_light: bool,
    /// Index of the block's texture within the terrain atlas.
    pub texture_index: usize,
}

/// Maps each block id to its properties.
///
/// Air is deliberately absent: an id missing from this map renders nothing
/// and affects nothing, which also covers corrupt ids from bad world data.
static BLOCK_DEFS: phf::Map<u8, BlockDef> = phf_map! {
    1u8 => BlockDef { opaque: true, sprite: false, translucent: false, blocks_light: true, texture_index: 0 },   // STONE
    2u8 => BlockDef { opaque: true, sprite: false, translucent: false, blocks_light: true, texture_index: 1 },   // DIRT
    3u8 => BlockDef { opaque: true, sprite: false, translucent: false, blocks_light: true, texture_index: 2 },   // GRASS
    4u8 => BlockDef { opaque: false, sprite: false, translucent: false, blocks_light: true, texture_index: 3 },  // LEAVES
    5u8 => BlockDef { opaque: false, sprite: true, translucent: false, blocks_light: false, texture_index: 4 },  // SAPLING
    6u8 => BlockDef { opaque: false, sprite: false, translucent: true, blocks_light: true, texture_index: 5 },   // WATER
    7u8 => BlockDef { opaque: false, sprite: false, translucent: true, blocks_light: false, texture_index: 6 },  // GLASS
};

/// Looks up the properties of a block id, if it has any.
pub fn block_def(id: BlockId) -> Option<&'static BlockDef> {
    BLOCK_DEFS.get(&id)
}

/// Block metadata as consumed by the renderer core.
///
/// The chunk cache uses this at two points: deciding whether a boundary
/// edit changed opacity (and so whether neighbor chunks need rebuilding),
/// and deciding whether the camera sits inside a translucent volume (which
/// disables face culling for the translucent passes).
pub trait BlockInfo {
    /// Whether the block fully occludes the faces behind it.
    fn is_opaque(&self, id: BlockId) -> bool;

    /// Whether the block is alpha-blended.
    fn is_translucent(&self, id: BlockId) -> bool;

    /// Whether the block stops sunlight.
    fn blocks_light(&self, id: BlockId) -> bool;
}

/// [`BlockInfo`] over the static block table.
pub struct StandardBlocks;

impl BlockInfo for StandardBlocks {
    fn is_opaque(&self, id: BlockId) -> bool {
        block_def(id).map(|def| def.opaque).unwrap_or(false)
    }

    fn is_translucent(&self, id: BlockId) -> bool {
        block_def(id).map(|def| def.translucent).unwrap_or(false)
    }

    fn blocks_light(&self, id: BlockId) -> bool {
        block_def(id).map(|def| def.blocks_light).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_have_no_properties() {
        let blocks = StandardBlocks;
        assert!(!blocks.is_opaque(0));
        assert!(!blocks.is_opaque(200));
        assert!(!blocks.is_translucent(200));
    }

    #[test]
    fn block_type_round_trips_through_id() {
        assert_eq!(BlockType::from_id(BlockType::WATER.id()), Some(BlockType::WATER));
        assert_eq!(BlockType::from_id(99), None);
    }

    #[test]
    fn water_is_translucent_and_stone_is_opaque() {
        let blocks = StandardBlocks;
        assert!(blocks.is_translucent(BlockType::WATER.id()));
        assert!(!blocks.is_opaque(BlockType::WATER.id()));
        assert!(blocks.is_opaque(BlockType::STONE.id()));
    }
}
