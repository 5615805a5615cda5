//! The map renderer: chunk cache, build scheduling, and the terrain pass
//! protocol.
//!
//! [`MapRenderer`] owns the chunk grid for the loaded world and drives the
//! whole per-frame sequence: adapt the build budget, re-sort chunks if the
//! camera crossed a chunk boundary, build a bounded number of stale chunks
//! through the [`MeshProvider`](crate::provider::MeshProvider), then draw
//! in fixed pass order — opaque, sprite, environment hand-off, translucent
//! depth pre-pass, translucent colour pass — batched per texture-atlas
//! page.
//!
//! ## Collaborators
//!
//! Everything external arrives through explicit references at construction
//! or per frame: the graphics device (shared [`StSystem`] handle), the
//! mesh provider, block metadata, and the per-frame camera pose and
//! culling predicate. The world and settings collaborators call the
//! `on_*` notification methods when their state changes; the renderer
//! holds no subscriptions of its own.

use std::rc::Rc;

use cgmath::{Point3, Rad};
use log::info;

use crate::blocks::{BlockId, BlockInfo};
use crate::config::RendererConfig;
use crate::core::StSystem;
use crate::culling::Culling;
use crate::graphics::{DepthFunc, GraphicsApi};
use crate::provider::{DrawCategory, MeshProvider};

pub mod chunk;
pub mod grid;
pub mod invalidate;
pub mod scheduler;
pub mod sorter;

pub use chunk::{ChunkGeometry, ChunkPart, ChunkRecord, ChunkState};
pub use grid::ChunkGrid;
pub use invalidate::BlockEdit;
pub use scheduler::BuildScheduler;
pub use sorter::VisibilitySorter;

/// The camera pose the renderer needs each frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraPose {
    /// Eye position in world space.
    pub position: Point3<f32>,
    /// Horizontal rotation around Y.
    pub yaw: Rad<f32>,
    /// Vertical rotation around X.
    pub pitch: Rad<f32>,
}

/// Everything the world and camera collaborators supply for one frame.
#[derive(Copy, Clone, Debug)]
pub struct FrameInput {
    /// Current camera pose.
    pub camera: CameraPose,
    /// The block id at the camera's head position; standing inside a
    /// translucent volume disables face culling for the translucent
    /// passes.
    pub camera_block: BlockId,
    /// Duration of the previous frame in seconds; feeds budget
    /// adaptation.
    pub delta_time: f32,
}

/// Counters exposed for overlays and tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct RenderStats {
    /// Indices drawn by the colour-producing passes this frame.
    pub indices_drawn: u64,
    /// Cumulative chunk builds (including empty results) since map load.
    pub chunk_builds: u64,
}

/// External renderer for world-edge and sky geometry, invoked between the
/// opaque and translucent phases.
pub trait EnvRenderer<G: GraphicsApi> {
    /// Draws the world's side planes.
    fn render_sides(&mut self, gfx: &mut G, delta_time: f32);

    /// Draws the world's edge/horizon geometry.
    fn render_edges(&mut self, gfx: &mut G, delta_time: f32);
}

/// Owns and renders the chunked terrain of the loaded world.
pub struct MapRenderer<G: GraphicsApi> {
    gfx: StSystem<G>,
    provider: Box<dyn MeshProvider>,
    blocks: Rc<dyn BlockInfo>,
    env: Option<Box<dyn EnvRenderer<G>>>,
    grid: ChunkGrid,
    sorter: VisibilitySorter,
    scheduler: BuildScheduler,
    view_distance: i32,
    view_distance_margin: i32,
    atlas_pages: usize,
    elements_per_page: usize,
    last_pose: Option<CameraPose>,
    stats: RenderStats,
}

impl<G: GraphicsApi> MapRenderer<G> {
    /// Creates a renderer with no world loaded.
    ///
    /// # Arguments
    /// * `gfx` - Shared handle to the graphics device
    /// * `provider` - The mesh building collaborator
    /// * `blocks` - Block metadata lookup
    /// * `config` - Tunables; see [`RendererConfig`]
    pub fn new(
        gfx: StSystem<G>,
        provider: Box<dyn MeshProvider>,
        blocks: Rc<dyn BlockInfo>,
        config: RendererConfig,
    ) -> Self {
        let scheduler = BuildScheduler::new(&config);
        MapRenderer {
            gfx,
            provider,
            blocks,
            env: None,
            grid: ChunkGrid::new(),
            sorter: VisibilitySorter::new(),
            scheduler,
            view_distance: config.view_distance,
            view_distance_margin: config.view_distance_margin,
            atlas_pages: config.atlas_pages,
            elements_per_page: config.elements_per_page,
            last_pose: None,
            stats: RenderStats::default(),
        }
    }

    /// Installs the environment renderer invoked between the opaque and
    /// translucent phases.
    pub fn set_env_renderer(&mut self, env: Box<dyn EnvRenderer<G>>) {
        self.env = Some(env);
    }

    /// Called by the world collaborator once a map's blocks are in place.
    ///
    /// Allocates one record per chunk of the rounded-up world volume.
    pub fn on_map_loaded(&mut self, width: i32, height: i32, length: i32) {
        self.grid
            .load(&mut *self.gfx.get_mut(), width, height, length);
        self.sorter.reset(self.grid.len());
        self.last_pose = None;
        self.stats.chunk_builds = 0;
    }

    /// Called by the world collaborator when the current map goes away.
    pub fn on_new_map(&mut self) {
        self.grid.unload(&mut *self.gfx.get_mut());
        self.sorter.reset(0);
        self.last_pose = None;
        self.stats = RenderStats::default();
        info!("map unloaded, chunk cache dropped");
    }

    /// Called by the atlas collaborator when the terrain atlas changed.
    ///
    /// A different page count only affects batching; a different element
    /// count per page invalidates every baked texture coordinate and
    /// forces a full refresh.
    pub fn on_atlas_changed(&mut self, pages: usize, elements_per_page: usize) {
        self.atlas_pages = pages;
        if self.elements_per_page != elements_per_page {
            self.refresh();
        }
        self.elements_per_page = elements_per_page;
    }

    /// Called by the settings collaborator when the view distance changed.
    pub fn on_view_distance_changed(&mut self, view_distance: i32) {
        self.view_distance = view_distance;
        // Range membership changed for every chunk; re-test visibility
        // even if the camera holds still.
        self.last_pose = None;
    }

    /// Called when the sun/shadow colours changed; every baked vertex
    /// colour is stale.
    pub fn on_env_colours_changed(&mut self) {
        self.refresh();
    }

    /// Discards all cached geometry in place, keeping the grid.
    pub fn refresh(&mut self) {
        if self.grid.is_loaded() {
            self.grid.refresh(&mut *self.gfx.get_mut());
        }
    }

    /// Applies one block edit, discarding every chunk it made stale.
    ///
    /// Callable at any time between frames.
    pub fn redraw_block(&mut self, edit: &BlockEdit) {
        invalidate::redraw_block(
            &mut self.grid,
            &mut *self.gfx.get_mut(),
            self.blocks.as_ref(),
            edit,
        );
    }

    /// Releases everything the renderer holds on the device.
    pub fn dispose(&mut self) {
        self.grid.unload(&mut *self.gfx.get_mut());
    }

    /// Counters for the last rendered frame.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The chunk grid, exposed read-only for overlays and tests.
    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    /// The current per-frame build budget.
    pub fn build_budget(&self) -> u32 {
        self.scheduler.budget()
    }

    /// Renders one frame of terrain.
    ///
    /// No-op until a map is loaded. The pass sequence is fixed; passes
    /// with no geometry degrade to per-chunk no-ops rather than being
    /// skipped.
    pub fn render(&mut self, frame: &FrameInput, culling: &dyn Culling) {
        if !self.grid.is_loaded() {
            return;
        }
        self.stats.indices_drawn = 0;
        self.scheduler.adapt(frame.delta_time);

        let pose_changed = self.last_pose != Some(frame.camera);
        self.last_pose = Some(frame.camera);
        let resorted = self.sorter.update_sort_order(frame.camera.position, &self.grid);

        let adjusted = self.view_distance + self.view_distance_margin;
        let adjusted_sqr = adjusted * adjusted;
        {
            let mut gfx = self.gfx.get_mut();
            self.scheduler.update_chunks(
                &mut self.grid,
                &self.sorter,
                self.provider.as_mut(),
                &mut *gfx,
                culling,
                pose_changed || resorted,
                adjusted_sqr,
                &mut self.stats,
            );
        }

        self.render_opaque_phase();

        if let Some(env) = self.env.as_mut() {
            let mut gfx = self.gfx.get_mut();
            env.render_sides(&mut *gfx, frame.delta_time);
            env.render_edges(&mut *gfx, frame.delta_time);
        }

        self.render_translucent_phase(frame.camera_block);
    }

    /// Opaque depth-fill followed by the double-sided sprite pass.
    ///
    /// Solid and fully transparent cutout blocks are treated as having an
    /// alpha value of either none or full, so the alpha test suffices and
    /// the depth buffer fills correctly.
    fn render_opaque_phase(&mut self) {
        let mut gfx = self.gfx.get_mut();
        let gfx = &mut *gfx;
        gfx.begin_terrain_batch();
        gfx.set_texturing(true);
        gfx.set_alpha_test(true);
        gfx.set_face_culling(true);
        for page in 0..self.atlas_pages {
            gfx.bind_texture_page(page);
            draw_category(
                gfx,
                &self.grid,
                &self.sorter,
                DrawCategory::Opaque,
                page,
                Some(&mut self.stats),
            );
        }
        // Sprites are crossed quads seen from both sides.
        gfx.set_face_culling(false);
        for page in 0..self.atlas_pages {
            gfx.bind_texture_page(page);
            draw_category(
                gfx,
                &self.grid,
                &self.sorter,
                DrawCategory::Sprite,
                page,
                Some(&mut self.stats),
            );
        }
        gfx.set_alpha_test(false);
        gfx.set_texturing(false);
        gfx.end_terrain_batch();
    }

    /// Translucent blocks blend into whatever is behind them: a depth
    /// pre-pass resolves occlusion among the translucent faces, then the
    /// colour pass blends in that settled order.
    fn render_translucent_phase(&mut self, camera_block: BlockId) {
        // Inside a translucent volume the back faces must stay visible.
        let can_cull = !self.blocks.is_translucent(camera_block);

        let mut gfx = self.gfx.get_mut();
        let gfx = &mut *gfx;
        gfx.begin_terrain_batch();
        if can_cull {
            gfx.set_face_culling(true);
        }

        // First fill the depth buffer.
        gfx.set_texturing(false);
        gfx.set_alpha_blending(false);
        gfx.set_colour_write(false);
        gfx.set_depth_write(true);
        gfx.set_depth_func(DepthFunc::LessEqual);
        for page in 0..self.atlas_pages {
            draw_category(
                gfx,
                &self.grid,
                &self.sorter,
                DrawCategory::Translucent,
                page,
                None,
            );
        }

        // Then actually draw the translucent blocks; depth values are
        // already settled, so depth writes stay off.
        gfx.set_alpha_blending(true);
        gfx.set_texturing(true);
        gfx.set_colour_write(true);
        gfx.set_depth_write(false);
        for page in 0..self.atlas_pages {
            gfx.bind_texture_page(page);
            draw_category(
                gfx,
                &self.grid,
                &self.sorter,
                DrawCategory::Translucent,
                page,
                Some(&mut self.stats),
            );
        }

        gfx.set_depth_write(true);
        gfx.set_depth_func(DepthFunc::Less);
        gfx.set_alpha_blending(false);
        gfx.set_texturing(false);
        if can_cull {
            gfx.set_face_culling(false);
        }
        gfx.end_terrain_batch();
    }
}

/// Draws one category's parts for one atlas page across all visible
/// chunks, splitting any part that exceeds the device's draw limit.
fn draw_category<G: GraphicsApi>(
    gfx: &mut G,
    grid: &ChunkGrid,
    sorter: &VisibilitySorter,
    category: DrawCategory,
    page: usize,
    mut stats: Option<&mut RenderStats>,
) {
    let max_indices = gfx.max_indices_per_draw();
    // Indices come 6 per quad of 4 vertices, so the second draw of a
    // split resumes at this vertex.
    let split_start_vertex = max_indices / 6 * 4;
    for &record_index in sorter.order() {
        let record = grid.record(record_index as usize);
        if !record.visible {
            continue;
        }
        let geometry = match &record.state {
            ChunkState::Built(geometry) => geometry,
            _ => continue,
        };
        let part = match geometry.part(category, page) {
            Some(part) => part,
            None => continue,
        };
        if part.index_count > max_indices {
            gfx.draw_indexed(part.vb, part.ib, max_indices, 0, 0);
            gfx.draw_indexed(
                part.vb,
                part.ib,
                part.index_count - max_indices,
                split_start_vertex,
                max_indices,
            );
        } else {
            gfx.draw_indexed(part.vb, part.ib, part.index_count, 0, 0);
        }
        if let Some(stats) = stats.as_deref_mut() {
            stats.indices_drawn += part.index_count as u64;
        }
    }
}
