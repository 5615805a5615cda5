//! Per-chunk cached state.
//!
//! One [`ChunkRecord`] exists for every chunk-sized cell of the loaded
//! world, eagerly allocated at map load. A record moves between three
//! states: unbuilt (needs geometry), empty (a build proved there is
//! nothing to draw), and built (GPU buffers uploaded, grouped per draw
//! category and atlas page). Invalidation returns a record to unbuilt and
//! releases its buffers.

use cgmath::Point3;

use crate::graphics::{GraphicsApi, IndexBufferId, VertexBufferId};
use crate::provider::DrawCategory;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;

/// Shift converting a block coordinate to a chunk coordinate.
pub const CHUNK_SHIFT: i32 = 4;

/// Mask extracting a block's coordinate within its chunk.
pub const CHUNK_MASK: i32 = 0xF;

/// Half the chunk dimension; offsets a chunk origin to its centre.
pub const HALF_CHUNK_DIMENSION: i32 = 8;

/// Radius of a sphere covering a whole chunk. 14 ~ sqrt(3 * 8^2)
pub const CHUNK_SPHERE_RADIUS: f32 = 14.0;

/// One uploaded part: the geometry of one draw category on one atlas page.
#[derive(Clone, Debug)]
pub struct ChunkPart {
    /// Vertex buffer handle.
    pub vb: VertexBufferId,
    /// Index buffer handle.
    pub ib: IndexBufferId,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// All uploaded parts of one chunk, indexed by category and page.
#[derive(Debug, Default)]
pub struct ChunkGeometry {
    parts: [Vec<Option<ChunkPart>>; 3],
}

impl ChunkGeometry {
    /// Creates geometry with `pages` empty slots per category.
    pub fn new(pages: usize) -> Self {
        ChunkGeometry {
            parts: [vec![None; pages], vec![None; pages], vec![None; pages]],
        }
    }

    /// The part for one category and page, if that slot holds geometry.
    ///
    /// Pages beyond what was built simply return `None`, which keeps the
    /// draw loop safe when the atlas page count and a stale build disagree.
    pub fn part(&self, category: DrawCategory, page: usize) -> Option<&ChunkPart> {
        self.parts[category as usize].get(page).and_then(Option::as_ref)
    }

    /// Stores a part in the given slot.
    pub fn set_part(&mut self, category: DrawCategory, page: usize, part: ChunkPart) {
        self.parts[category as usize][page] = Some(part);
    }

    /// Releases every buffer this geometry owns.
    pub fn delete<G: GraphicsApi>(&mut self, gfx: &mut G) {
        for pages in self.parts.iter_mut() {
            for slot in pages.iter_mut() {
                if let Some(part) = slot.take() {
                    gfx.delete_vertex_buffer(part.vb);
                    gfx.delete_index_buffer(part.ib);
                }
            }
        }
    }
}

/// Build state of one chunk.
///
/// The tagged state replaces the nullable-buffer convention: "no parts and
/// not empty" is spelled [`ChunkState::Unbuilt`], never a null check.
#[derive(Debug, Default)]
pub enum ChunkState {
    /// Stale: needs a build or a re-check.
    #[default]
    Unbuilt,

    /// A build proved the chunk has no geometry; terminal until the chunk
    /// is invalidated.
    Empty,

    /// Geometry is uploaded and drawable.
    Built(ChunkGeometry),
}

/// Cached render state for one chunk of the world grid.
#[derive(Debug)]
pub struct ChunkRecord {
    /// The chunk's centre in world coordinates (origin + 8 on each axis),
    /// cached for distance and frustum tests.
    pub centre: Point3<i32>,

    /// Whether the chunk is in range and intersects the view frustum.
    pub visible: bool,

    /// Current build state.
    pub state: ChunkState,
}

impl ChunkRecord {
    /// Creates an unbuilt record for the chunk whose minimum corner is
    /// `(x, y, z)`.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkRecord {
            centre: Point3::new(
                x + HALF_CHUNK_DIMENSION,
                y + HALF_CHUNK_DIMENSION,
                z + HALF_CHUNK_DIMENSION,
            ),
            visible: true,
            state: ChunkState::Unbuilt,
        }
    }

    /// The chunk's minimum corner in world coordinates.
    pub fn origin(&self) -> Point3<i32> {
        Point3::new(
            self.centre.x - HALF_CHUNK_DIMENSION,
            self.centre.y - HALF_CHUNK_DIMENSION,
            self.centre.z - HALF_CHUNK_DIMENSION,
        )
    }

    /// Returns the chunk to the unbuilt state, releasing any buffers.
    ///
    /// Clears the empty flag too: after an edit, "known empty" is no
    /// longer known.
    pub fn reset<G: GraphicsApi>(&mut self, gfx: &mut G) {
        if let ChunkState::Built(geometry) = &mut self.state {
            geometry.delete(gfx);
        }
        self.state = ChunkState::Unbuilt;
    }
}
