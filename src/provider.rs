//! The mesh building contract consumed by the chunk cache.
//!
//! The renderer never generates geometry itself. Each frame, the build step
//! asks a [`MeshProvider`] for the geometry of one chunk at a time and
//! caches whatever comes back. The provider may be synchronous (build on
//! the spot) or asynchronous behind the scenes; either way it must return
//! promptly — [`BuildOutcome::NotReady`] tells the cache to ask again on a
//! later frame rather than wait.

use cgmath::Point3;

use crate::graphics::TerrainVertex;

/// Classifies geometry by the render pass and device state it needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DrawCategory {
    /// Fully opaque or alpha-tested cutout geometry; drawn first with face
    /// culling, fills the depth buffer.
    Opaque = 0,

    /// Double-sided billboard geometry; drawn with face culling disabled.
    Sprite = 1,

    /// Alpha-blended geometry; drawn last via a depth pre-pass followed by
    /// a blended colour pass.
    Translucent = 2,
}

impl DrawCategory {
    /// All categories, in draw order.
    pub fn all() -> [DrawCategory; 3] {
        [
            DrawCategory::Opaque,
            DrawCategory::Sprite,
            DrawCategory::Translucent,
        ]
    }
}

/// Geometry for one draw category on one texture-atlas page, before upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPart {
    /// Vertices, in the device's terrain vertex format.
    pub vertices: Vec<TerrainVertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
}

impl RawPart {
    /// Whether this part carries no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Everything a provider built for one chunk: one optional part per draw
/// category per atlas page.
#[derive(Clone, Debug, Default)]
pub struct RawChunkGeometry {
    parts: [Vec<Option<RawPart>>; 3],
}

impl RawChunkGeometry {
    /// Creates geometry with `pages` empty part slots per category.
    pub fn new(pages: usize) -> Self {
        RawChunkGeometry {
            parts: [vec![None; pages], vec![None; pages], vec![None; pages]],
        }
    }

    /// The number of atlas pages this geometry spans.
    pub fn pages(&self) -> usize {
        self.parts[0].len()
    }

    /// The part slots for one category, indexed by page.
    pub fn category(&self, category: DrawCategory) -> &[Option<RawPart>] {
        &self.parts[category as usize]
    }

    /// Stores a part, replacing whatever was in that slot.
    ///
    /// Empty parts are normalized to an absent slot so that emptiness
    /// checks stay trivial.
    pub fn set_part(&mut self, category: DrawCategory, page: usize, part: RawPart) {
        self.parts[category as usize][page] = if part.is_empty() { None } else { Some(part) };
    }

    /// Mutable access to a part slot, creating an empty part on first use.
    pub fn part_mut(&mut self, category: DrawCategory, page: usize) -> &mut RawPart {
        self.parts[category as usize][page].get_or_insert_with(RawPart::default)
    }

    /// Whether no category on no page carries any geometry.
    pub fn is_empty(&self) -> bool {
        self.parts
            .iter()
            .all(|pages| pages.iter().all(|part| part.is_none()))
    }
}

/// Result of asking the provider for one chunk's geometry.
#[derive(Clone, Debug)]
pub enum BuildOutcome {
    /// The provider cannot answer yet; ask again on a later frame.
    NotReady,

    /// The chunk legitimately contains no geometry (all air). Cached as a
    /// terminal state until the chunk is invalidated.
    Empty,

    /// Built geometry, ready for upload.
    Built(RawChunkGeometry),
}

/// Builds (or fetches) the mesh for one chunk at a time.
pub trait MeshProvider {
    /// Builds or fetches the geometry for the chunk whose minimum corner is
    /// `origin` (a multiple of the chunk size on each axis).
    ///
    /// Must not block; a provider working asynchronously returns
    /// [`BuildOutcome::NotReady`] until its result is available. A request
    /// for a chunk that was invalidated in the meantime is simply discarded
    /// by the caller, so stale results are harmless.
    fn try_build_chunk(&mut self, origin: Point3<i32>) -> BuildOutcome;
}
