//! Abstract graphics device interface for terrain rendering.
//!
//! The renderer never talks to a concrete graphics backend. Everything it
//! needs from the device — buffer upload, per-page texture binding, draw
//! calls, and the handful of fixed-function state toggles the pass protocol
//! flips — is expressed through the [`GraphicsApi`] trait. A real backend
//! implements this trait over its command encoder; [`TraceGraphics`] is a
//! headless implementation used by the demo binary and the test suite.
//!
//! # Ownership
//!
//! Buffer handles returned by `create_vertex_buffer`/`create_index_buffer`
//! are plain ids. The chunk cache owns them and is the only component that
//! deletes them; backends must treat deletion of an unknown id as a bug.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

mod trace;

pub use trace::{GraphicsCall, TraceGraphics};

/// Handle to a vertex buffer owned by the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexBufferId(pub u32);

/// Handle to an index buffer owned by the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexBufferId(pub u32);

/// Depth comparison functions the terrain passes switch between.
///
/// The translucent colour pass redraws geometry whose depth values were
/// already written by the depth pre-pass, so it needs `LessEqual` to keep
/// equal-depth fragments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DepthFunc {
    /// Fragments pass when strictly nearer than the stored depth.
    Less,
    /// Fragments pass when nearer than or equal to the stored depth.
    LessEqual,
}

/// Errors surfaced by the graphics device.
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// The device could not allocate a buffer of the requested size.
    ///
    /// The build step treats this as a per-chunk failure: the chunk stays
    /// unbuilt and is retried on a later frame.
    #[error("out of device memory allocating a {bytes} byte buffer")]
    OutOfMemory {
        /// Size of the allocation that failed, in bytes.
        bytes: usize,
    },
}

/// A terrain vertex as uploaded to the device.
///
/// Position, atlas texture coordinates, and a baked light colour. The
/// `#[repr(C)]` layout plus the `Pod`/`Zeroable` derives let backends copy
/// vertex slices straight into GPU memory.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Position in world space.
    pub position: [f32; 3],
    /// Texture coordinates within the bound atlas page (normalized).
    pub tex_coords: [f32; 2],
    /// Baked RGBA light colour.
    pub colour: [u8; 4],
}

impl TerrainVertex {
    /// Creates a vertex at the given position with the given atlas
    /// coordinates and light colour.
    pub fn new(position: [f32; 3], tex_coords: [f32; 2], colour: [u8; 4]) -> Self {
        TerrainVertex {
            position,
            tex_coords,
            colour,
        }
    }
}

/// The device contract consumed by the terrain renderer.
///
/// Backends are stateful in the fixed-function style: toggles stay set until
/// changed, and the renderer is responsible for restoring every toggle it
/// flips before a frame ends. All methods are expected to return quickly;
/// nothing here may block.
pub trait GraphicsApi {
    /// Uploads vertices into a new device buffer.
    ///
    /// # Errors
    /// Returns [`GraphicsError::OutOfMemory`] when the device cannot satisfy
    /// the allocation. The caller owns cleanup of any sibling buffers it
    /// already created for the same chunk.
    fn create_vertex_buffer(
        &mut self,
        vertices: &[TerrainVertex],
    ) -> Result<VertexBufferId, GraphicsError>;

    /// Uploads indices into a new device buffer.
    ///
    /// # Errors
    /// Returns [`GraphicsError::OutOfMemory`] when the device cannot satisfy
    /// the allocation.
    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<IndexBufferId, GraphicsError>;

    /// Releases a vertex buffer.
    fn delete_vertex_buffer(&mut self, id: VertexBufferId);

    /// Releases an index buffer.
    fn delete_index_buffer(&mut self, id: IndexBufferId);

    /// Binds one texture-atlas page for subsequent draws.
    fn bind_texture_page(&mut self, page: usize);

    /// Enables or disables texturing.
    fn set_texturing(&mut self, enabled: bool);

    /// Enables or disables the alpha test used for cutout geometry.
    fn set_alpha_test(&mut self, enabled: bool);

    /// Enables or disables alpha blending.
    fn set_alpha_blending(&mut self, enabled: bool);

    /// Enables or disables back-face culling.
    fn set_face_culling(&mut self, enabled: bool);

    /// Enables or disables depth writes.
    fn set_depth_write(&mut self, enabled: bool);

    /// Enables or disables colour writes (all four channels at once).
    fn set_colour_write(&mut self, enabled: bool);

    /// Sets the depth comparison function.
    fn set_depth_func(&mut self, func: DepthFunc);

    /// Marks the start of a run of indexed terrain draws.
    ///
    /// Backends use this to set up vertex format state once per run instead
    /// of once per draw.
    fn begin_terrain_batch(&mut self);

    /// Marks the end of a run of indexed terrain draws.
    fn end_terrain_batch(&mut self);

    /// Issues one indexed draw from the given buffers.
    ///
    /// `index_count` must not exceed [`GraphicsApi::max_indices_per_draw`];
    /// the renderer splits larger parts into multiple calls.
    fn draw_indexed(
        &mut self,
        vb: VertexBufferId,
        ib: IndexBufferId,
        index_count: u32,
        start_vertex: u32,
        start_index: u32,
    );

    /// The largest index count a single draw call may carry.
    fn max_indices_per_draw(&self) -> u32;
}
