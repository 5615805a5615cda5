//! The per-frame chunk build step.
//!
//! Each frame a bounded number of stale chunks get (re)built, nearest
//! first so gaps close where the player is looking. The bound adapts to
//! recent frame times: fast frames grow it, slow frames shrink it, always
//! inside a configured clamp. Build results are uploaded immediately and
//! the same pass refreshes per-chunk frustum visibility.

use log::warn;

use crate::config::RendererConfig;
use crate::culling::Culling;
use crate::graphics::{GraphicsApi, GraphicsError};
use crate::provider::{BuildOutcome, DrawCategory, MeshProvider, RawChunkGeometry};

use super::chunk::{ChunkGeometry, ChunkPart, ChunkState};
use super::grid::ChunkGrid;
use super::sorter::{chunk_visible, VisibilitySorter};
use super::RenderStats;

/// Decides how many chunks to build each frame and runs the build pass.
pub struct BuildScheduler {
    budget: u32,
    min_budget: u32,
    max_budget: u32,
    target_frame_time: f32,
}

impl BuildScheduler {
    /// Creates a scheduler starting at the minimum build budget.
    pub fn new(config: &RendererConfig) -> Self {
        BuildScheduler {
            budget: config.min_build_budget,
            min_budget: config.min_build_budget,
            max_budget: config.max_build_budget,
            target_frame_time: config.target_frame_time,
        }
    }

    /// Adapts the build budget to the duration of the last frame.
    pub fn adapt(&mut self, last_frame_seconds: f32) {
        if last_frame_seconds < self.target_frame_time {
            self.budget += 1;
        } else {
            self.budget = self.budget.saturating_sub(1);
        }
        self.budget = self.budget.clamp(self.min_budget, self.max_budget);
    }

    /// The number of provider requests the next pass may spend.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Runs one build-and-visibility pass over the grid in near-to-far
    /// order.
    ///
    /// Every provider request counts against the budget, including ones
    /// answered `NotReady` — the request itself is the work being
    /// throttled. `recompute_visibility` is set when the camera pose
    /// changed; otherwise only freshly built chunks get a frustum test.
    #[allow(clippy::too_many_arguments)]
    pub fn update_chunks<G: GraphicsApi>(
        &self,
        grid: &mut ChunkGrid,
        sorter: &VisibilitySorter,
        provider: &mut dyn MeshProvider,
        gfx: &mut G,
        culling: &dyn Culling,
        recompute_visibility: bool,
        adjusted_view_dist_sqr: i32,
        stats: &mut RenderStats,
    ) {
        let mut built_this_frame = 0u32;
        for slot in 0..sorter.order().len() {
            let record_index = sorter.order()[slot] as usize;
            let record = grid.record_mut(record_index);
            if matches!(record.state, ChunkState::Empty) {
                continue;
            }
            let in_range = sorter.distance_at(slot) <= adjusted_view_dist_sqr;

            let mut just_built = false;
            if matches!(record.state, ChunkState::Unbuilt)
                && in_range
                && built_this_frame < self.budget
            {
                built_this_frame += 1;
                match provider.try_build_chunk(record.origin()) {
                    BuildOutcome::NotReady => {}
                    BuildOutcome::Empty => {
                        record.state = ChunkState::Empty;
                        stats.chunk_builds += 1;
                    }
                    BuildOutcome::Built(raw) => match upload_chunk(gfx, &raw) {
                        Ok(geometry) => {
                            record.state = ChunkState::Built(geometry);
                            just_built = true;
                            stats.chunk_builds += 1;
                        }
                        Err(err) => {
                            // The chunk stays unbuilt and is retried on a
                            // later frame; the rest of this pass continues.
                            warn!("upload for chunk at {:?} failed: {err}", record.origin());
                        }
                    },
                }
            }

            if recompute_visibility || just_built {
                record.visible = chunk_visible(culling, record, in_range);
            }
        }
    }
}

/// Uploads built geometry, category by category and page by page.
///
/// On any allocation failure every buffer already created for this chunk
/// is released before the error is returned, so a failed chunk never
/// leaks.
fn upload_chunk<G: GraphicsApi>(
    gfx: &mut G,
    raw: &RawChunkGeometry,
) -> Result<ChunkGeometry, GraphicsError> {
    let mut geometry = ChunkGeometry::new(raw.pages());
    for category in DrawCategory::all() {
        for (page, slot) in raw.category(category).iter().enumerate() {
            let part = match slot {
                Some(part) => part,
                None => continue,
            };
            let vb = match gfx.create_vertex_buffer(&part.vertices) {
                Ok(vb) => vb,
                Err(err) => {
                    geometry.delete(gfx);
                    return Err(err);
                }
            };
            let ib = match gfx.create_index_buffer(&part.indices) {
                Ok(ib) => ib,
                Err(err) => {
                    gfx.delete_vertex_buffer(vb);
                    geometry.delete(gfx);
                    return Err(err);
                }
            };
            geometry.set_part(
                category,
                page,
                ChunkPart {
                    vb,
                    ib,
                    index_count: part.indices.len() as u32,
                },
            );
        }
    }
    Ok(geometry)
}
