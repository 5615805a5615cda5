//! # Block Type Module
//!
//! Defines the block types known to the demo world and their conversion
//! from the compact `u8` storage format.

use num_derive::FromPrimitive;

use super::BlockId;

/// Enumerates the block types used by the demo world.
///
/// The `FromPrimitive` derive allows conversion from the raw block ids the
/// world stores, which is how edits and the mesh builder recover the rich
/// enum from storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// An air block, non-solid and invisible.
    AIR,

    /// Solid stone, the deep filler block.
    STONE,

    /// Dirt, found under the surface layer.
    DIRT,

    /// A grass block forming the terrain surface.
    GRASS,

    /// Leaves, rendered as cutout geometry via the alpha test.
    LEAVES,

    /// A sapling, rendered as double-sided crossed sprites.
    SAPLING,

    /// Water, translucent and blended.
    WATER,

    /// Glass, translucent and blended.
    GLASS,
}

impl BlockType {
    /// Converts a raw block id to a `BlockType`.
    ///
    /// Returns `None` for ids outside the known range; callers treat those
    /// as air rather than panicking on corrupt world data.
    pub fn from_id(id: BlockId) -> Option<Self> {
        num::FromPrimitive::from_u8(id)
    }

    /// The raw id this block type is stored as.
    pub fn id(self) -> BlockId {
        self as BlockId
    }
}
