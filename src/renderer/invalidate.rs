//! Maps a block edit to the set of chunks whose cached geometry is stale.
//!
//! A single edit can touch more than its own chunk: a changed light column
//! re-shades every chunk in the vertical span between the old and new
//! column heights, and an edit on a chunk boundary face can reveal or hide
//! faces belonging to the neighboring chunk's mesh. The neighbor step is
//! skipped when the edit does not change the block's opacity class, since
//! only an opacity change can affect which neighbor faces are emitted.

use crate::blocks::{BlockId, BlockInfo};
use crate::graphics::GraphicsApi;

use super::chunk::{CHUNK_MASK, CHUNK_SHIFT};
use super::grid::ChunkGrid;

/// Notification of one block edit, as delivered by the world collaborator.
#[derive(Copy, Clone, Debug)]
pub struct BlockEdit {
    /// World X of the edited block.
    pub x: i32,
    /// World Y of the edited block.
    pub y: i32,
    /// World Z of the edited block.
    pub z: i32,
    /// Block id before the edit.
    pub old_block: BlockId,
    /// Block id after the edit.
    pub new_block: BlockId,
    /// Topmost Y at which the column blocked light before the edit, or
    /// `None` if the column was fully open.
    pub old_light_height: Option<i32>,
    /// Topmost Y at which the column blocks light after the edit.
    pub new_light_height: Option<i32>,
}

/// Chunk-Y of a light-column height; a fully open column maps to 0.
fn light_chunk_y(height: Option<i32>) -> i32 {
    height.map(|h| h >> CHUNK_SHIFT).unwrap_or(0)
}

/// Discards every chunk affected by the given edit.
///
/// Safe to call with edits at the world edge; the grid ignores the
/// out-of-range coordinates the adjacency math produces there.
pub fn redraw_block<G: GraphicsApi>(
    grid: &mut ChunkGrid,
    gfx: &mut G,
    blocks: &dyn BlockInfo,
    edit: &BlockEdit,
) {
    let cx = edit.x >> CHUNK_SHIFT;
    let cy = edit.y >> CHUNK_SHIFT;
    let cz = edit.z >> CHUNK_SHIFT;
    // NOTE: It's a lot faster to only update the chunks that are affected
    // by the change in shadows, rather than the entire column.
    let new_light_cy = light_chunk_y(edit.new_light_height);
    let old_light_cy = light_chunk_y(edit.old_light_height);

    reset_chunk_and_below(grid, gfx, cx, cy, cz, new_light_cy, old_light_cy);

    // An edit that keeps the block's opacity class cannot change which
    // faces the neighboring chunk's mesh emits.
    if blocks.is_opaque(edit.old_block) == blocks.is_opaque(edit.new_block) {
        return;
    }

    let bx = edit.x & CHUNK_MASK;
    let by = edit.y & CHUNK_MASK;
    let bz = edit.z & CHUNK_MASK;

    if bx == 0 && cx > 0 {
        reset_chunk_and_below(grid, gfx, cx - 1, cy, cz, new_light_cy, old_light_cy);
    }
    if by == 0 && cy > 0 {
        reset_chunk_and_below(grid, gfx, cx, cy - 1, cz, new_light_cy, old_light_cy);
    }
    if bz == 0 && cz > 0 {
        reset_chunk_and_below(grid, gfx, cx, cy, cz - 1, new_light_cy, old_light_cy);
    }
    if bx == CHUNK_MASK && cx < grid.chunks_x() - 1 {
        reset_chunk_and_below(grid, gfx, cx + 1, cy, cz, new_light_cy, old_light_cy);
    }
    if by == CHUNK_MASK && cy < grid.chunks_y() - 1 {
        reset_chunk_and_below(grid, gfx, cx, cy + 1, cz, new_light_cy, old_light_cy);
    }
    if bz == CHUNK_MASK && cz < grid.chunks_z() - 1 {
        reset_chunk_and_below(grid, gfx, cx, cy, cz + 1, new_light_cy, old_light_cy);
    }
}

/// Discards one chunk, plus the vertical span between the old and new
/// light-column chunk heights when they differ.
fn reset_chunk_and_below<G: GraphicsApi>(
    grid: &mut ChunkGrid,
    gfx: &mut G,
    cx: i32,
    cy: i32,
    cz: i32,
    new_light_cy: i32,
    old_light_cy: i32,
) {
    grid.invalidate(gfx, cx, cy, cz);
    if new_light_cy != old_light_cy {
        let cy_min = new_light_cy.min(old_light_cy);
        let cy_max = new_light_cy.max(old_light_cy);
        for shadow_cy in (cy_min..=cy_max).rev() {
            grid.invalidate(gfx, cx, shadow_cy, cz);
        }
    }
}
