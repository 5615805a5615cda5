//! A headless device that records every call made to it.
//!
//! `TraceGraphics` backs the demo binary and the tests. It allocates real
//! handle values, tracks which buffers are live, and appends one
//! [`GraphicsCall`] per trait method invoked so tests can assert on the
//! exact draw/state sequence a frame produced.

use std::collections::HashMap;
use std::mem;

use log::trace;

use super::{
    DepthFunc, GraphicsApi, GraphicsError, IndexBufferId, TerrainVertex, VertexBufferId,
};

/// Default draw-call split threshold, matching a 16-bit vertex id limit
/// (65536 vertices, 6 indices per 4-vertex quad).
const DEFAULT_MAX_INDICES: u32 = 65536 / 4 * 6;

/// One recorded device call.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum GraphicsCall {
    CreateVertexBuffer { id: VertexBufferId, vertices: usize },
    CreateIndexBuffer { id: IndexBufferId, indices: usize },
    DeleteVertexBuffer(VertexBufferId),
    DeleteIndexBuffer(IndexBufferId),
    BindTexturePage(usize),
    Texturing(bool),
    AlphaTest(bool),
    AlphaBlending(bool),
    FaceCulling(bool),
    DepthWrite(bool),
    ColourWrite(bool),
    SetDepthFunc(DepthFunc),
    BeginTerrainBatch,
    EndTerrainBatch,
    DrawIndexed {
        vb: VertexBufferId,
        ib: IndexBufferId,
        index_count: u32,
        start_vertex: u32,
        start_index: u32,
    },
}

/// Headless [`GraphicsApi`] implementation that records its call stream.
pub struct TraceGraphics {
    next_vertex_buffer: u32,
    next_index_buffer: u32,
    live_vertex_buffers: HashMap<VertexBufferId, usize>,
    live_index_buffers: HashMap<IndexBufferId, usize>,
    calls: Vec<GraphicsCall>,
    /// When set, each buffer creation consumes one unit; at zero, creation
    /// fails with `OutOfMemory`. Used to exercise the exhaustion path.
    allocation_quota: Option<u32>,
    max_indices: u32,
}

impl TraceGraphics {
    /// Creates a device with the default draw split threshold and no
    /// allocation limit.
    pub fn new() -> Self {
        TraceGraphics {
            next_vertex_buffer: 1,
            next_index_buffer: 1,
            live_vertex_buffers: HashMap::new(),
            live_index_buffers: HashMap::new(),
            calls: Vec::new(),
            allocation_quota: None,
            max_indices: DEFAULT_MAX_INDICES,
        }
    }

    /// Creates a device whose draws must be split at `max_indices`.
    pub fn with_max_indices(max_indices: u32) -> Self {
        TraceGraphics {
            max_indices,
            ..TraceGraphics::new()
        }
    }

    /// Limits how many further buffer creations succeed.
    ///
    /// `Some(0)` makes every subsequent creation fail; `None` removes the
    /// limit.
    pub fn set_allocation_quota(&mut self, quota: Option<u32>) {
        self.allocation_quota = quota;
    }

    /// Number of vertex buffers currently live on the device.
    pub fn live_vertex_buffers(&self) -> usize {
        self.live_vertex_buffers.len()
    }

    /// Number of index buffers currently live on the device.
    pub fn live_index_buffers(&self) -> usize {
        self.live_index_buffers.len()
    }

    /// The recorded call stream since creation or the last
    /// [`TraceGraphics::take_calls`].
    pub fn calls(&self) -> &[GraphicsCall] {
        &self.calls
    }

    /// Takes the recorded call stream, leaving the record empty.
    pub fn take_calls(&mut self) -> Vec<GraphicsCall> {
        mem::take(&mut self.calls)
    }

    fn charge_allocation(&mut self, bytes: usize) -> Result<(), GraphicsError> {
        match self.allocation_quota {
            Some(0) => Err(GraphicsError::OutOfMemory { bytes }),
            Some(ref mut remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for TraceGraphics {
    fn default() -> Self {
        TraceGraphics::new()
    }
}

impl GraphicsApi for TraceGraphics {
    fn create_vertex_buffer(
        &mut self,
        vertices: &[TerrainVertex],
    ) -> Result<VertexBufferId, GraphicsError> {
        self.charge_allocation(mem::size_of_val(vertices))?;
        let id = VertexBufferId(self.next_vertex_buffer);
        self.next_vertex_buffer += 1;
        self.live_vertex_buffers.insert(id, vertices.len());
        self.calls.push(GraphicsCall::CreateVertexBuffer {
            id,
            vertices: vertices.len(),
        });
        Ok(id)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<IndexBufferId, GraphicsError> {
        self.charge_allocation(mem::size_of_val(indices))?;
        let id = IndexBufferId(self.next_index_buffer);
        self.next_index_buffer += 1;
        self.live_index_buffers.insert(id, indices.len());
        self.calls.push(GraphicsCall::CreateIndexBuffer {
            id,
            indices: indices.len(),
        });
        Ok(id)
    }

    fn delete_vertex_buffer(&mut self, id: VertexBufferId) {
        self.live_vertex_buffers.remove(&id);
        self.calls.push(GraphicsCall::DeleteVertexBuffer(id));
    }

    fn delete_index_buffer(&mut self, id: IndexBufferId) {
        self.live_index_buffers.remove(&id);
        self.calls.push(GraphicsCall::DeleteIndexBuffer(id));
    }

    fn bind_texture_page(&mut self, page: usize) {
        self.calls.push(GraphicsCall::BindTexturePage(page));
    }

    fn set_texturing(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::Texturing(enabled));
    }

    fn set_alpha_test(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::AlphaTest(enabled));
    }

    fn set_alpha_blending(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::AlphaBlending(enabled));
    }

    fn set_face_culling(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::FaceCulling(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::DepthWrite(enabled));
    }

    fn set_colour_write(&mut self, enabled: bool) {
        self.calls.push(GraphicsCall::ColourWrite(enabled));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.calls.push(GraphicsCall::SetDepthFunc(func));
    }

    fn begin_terrain_batch(&mut self) {
        self.calls.push(GraphicsCall::BeginTerrainBatch);
    }

    fn end_terrain_batch(&mut self) {
        self.calls.push(GraphicsCall::EndTerrainBatch);
    }

    fn draw_indexed(
        &mut self,
        vb: VertexBufferId,
        ib: IndexBufferId,
        index_count: u32,
        start_vertex: u32,
        start_index: u32,
    ) {
        debug_assert!(index_count <= self.max_indices);
        trace!(
            "draw vb={:?} ib={:?} indices={} start_vertex={} start_index={}",
            vb,
            ib,
            index_count,
            start_vertex,
            start_index
        );
        self.calls.push(GraphicsCall::DrawIndexed {
            vb,
            ib,
            index_count,
            start_vertex,
            start_index,
        });
    }

    fn max_indices_per_draw(&self) -> u32 {
        self.max_indices
    }
}
