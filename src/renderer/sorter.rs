//! Camera-relative chunk ordering and the frustum visibility test.
//!
//! Chunks are drawn and built in near-to-far order. The order is a
//! permutation over the grid arena, re-derived only when the camera moves
//! into a different chunk — a full distance recompute plus sort is the
//! dominant cost at scale, and within one chunk the order cannot change.

use cgmath::Point3;

use crate::culling::Culling;

use super::chunk::{ChunkRecord, CHUNK_MASK, CHUNK_SPHERE_RADIUS, HALF_CHUNK_DIMENSION};
use super::grid::ChunkGrid;

/// Squared integer distance between two points.
fn distance_squared(a: Point3<i32>, b: Point3<i32>) -> i32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    dx * dx + dy * dy + dz * dz
}

/// Maintains the near-to-far chunk permutation and its distance table.
pub struct VisibilitySorter {
    /// The camera position snapped to its containing chunk's centre; the
    /// sentinel value forces a recompute on the first update.
    chunk_pos: Point3<i32>,
    /// Arena indices, sorted ascending by distance.
    order: Vec<u32>,
    /// Squared distances, parallel to `order`.
    distances: Vec<i32>,
}

impl VisibilitySorter {
    /// Creates a sorter with no chunks.
    pub fn new() -> Self {
        VisibilitySorter {
            chunk_pos: Point3::new(i32::MAX, i32::MAX, i32::MAX),
            order: Vec::new(),
            distances: Vec::new(),
        }
    }

    /// Resets the permutation to scan order for a grid of `len` records
    /// and forces a re-sort on the next update.
    pub fn reset(&mut self, len: usize) {
        self.chunk_pos = Point3::new(i32::MAX, i32::MAX, i32::MAX);
        self.order = (0..len as u32).collect();
        self.distances = vec![0; len];
    }

    /// Re-derives distances and re-sorts if the camera's containing chunk
    /// changed. Returns whether a re-sort happened.
    pub fn update_sort_order(&mut self, camera: Point3<f32>, grid: &ChunkGrid) -> bool {
        let snapped = Point3::new(
            ((camera.x.floor() as i32) & !CHUNK_MASK) + HALF_CHUNK_DIMENSION,
            ((camera.y.floor() as i32) & !CHUNK_MASK) + HALF_CHUNK_DIMENSION,
            ((camera.z.floor() as i32) & !CHUNK_MASK) + HALF_CHUNK_DIMENSION,
        );
        if snapped == self.chunk_pos {
            return false;
        }
        self.chunk_pos = snapped;

        let per_record: Vec<i32> = (0..grid.len())
            .map(|i| distance_squared(grid.record(i).centre, snapped))
            .collect();
        self.order.sort_unstable_by_key(|&i| per_record[i as usize]);
        for (slot, &record_index) in self.order.iter().enumerate() {
            self.distances[slot] = per_record[record_index as usize];
        }
        true
    }

    /// The current near-to-far permutation of arena indices.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// The squared distance of the chunk at a permutation slot.
    pub fn distance_at(&self, slot: usize) -> i32 {
        self.distances[slot]
    }

    /// The snapped camera chunk centre the current order was derived for.
    pub fn snapped_position(&self) -> Point3<i32> {
        self.chunk_pos
    }
}

impl Default for VisibilitySorter {
    fn default() -> Self {
        VisibilitySorter::new()
    }
}

/// Whether one chunk is in range and intersects the view frustum.
///
/// The chunk is treated as a bounding sphere around its centre.
pub fn chunk_visible(
    culling: &dyn Culling,
    record: &ChunkRecord,
    in_range: bool,
) -> bool {
    in_range
        && culling.sphere_in_frustum(
            record.centre.x as f32,
            record.centre.y as f32,
            record.centre.z as f32,
            CHUNK_SPHERE_RADIUS,
        )
}

#[cfg(test)]
mod tests {
    use crate::graphics::TraceGraphics;

    use super::*;

    fn grid_4x1x1() -> (TraceGraphics, ChunkGrid) {
        let mut gfx = TraceGraphics::new();
        let mut grid = ChunkGrid::new();
        grid.load(&mut gfx, 64, 16, 16);
        (gfx, grid)
    }

    #[test]
    fn camera_position_snaps_to_its_chunk_centre() {
        let (_gfx, grid) = grid_4x1x1();
        let mut sorter = VisibilitySorter::new();
        sorter.reset(grid.len());
        sorter.update_sort_order(Point3::new(20.7, 3.2, 15.9), &grid);
        assert_eq!(sorter.snapped_position(), Point3::new(24, 8, 8));
    }

    #[test]
    fn chunks_sort_near_to_far() {
        let (_gfx, grid) = grid_4x1x1();
        let mut sorter = VisibilitySorter::new();
        sorter.reset(grid.len());

        // Camera in the third chunk: order radiates outward from it. The
        // two chunks at distance 16 tie; their relative order is free.
        assert!(sorter.update_sort_order(Point3::new(40.0, 8.0, 8.0), &grid));
        assert_eq!(sorter.order()[0], 2);
        assert_eq!(sorter.order()[3], 0);
        assert_eq!(sorter.distance_at(0), 0);
        for slot in 1..grid.len() {
            assert!(sorter.distance_at(slot) >= sorter.distance_at(slot - 1));
        }
    }

    #[test]
    fn update_is_idempotent_within_one_chunk() {
        let (_gfx, grid) = grid_4x1x1();
        let mut sorter = VisibilitySorter::new();
        sorter.reset(grid.len());

        assert!(sorter.update_sort_order(Point3::new(40.0, 8.0, 8.0), &grid));
        let order = sorter.order().to_vec();
        let distances: Vec<i32> = (0..grid.len()).map(|s| sorter.distance_at(s)).collect();

        // Moving within the same chunk neither re-sorts nor changes tables.
        assert!(!sorter.update_sort_order(Point3::new(47.9, 8.5, 1.0), &grid));
        assert_eq!(sorter.order(), &order[..]);
        let distances_after: Vec<i32> =
            (0..grid.len()).map(|s| sorter.distance_at(s)).collect();
        assert_eq!(distances, distances_after);
    }

    #[test]
    fn crossing_a_chunk_boundary_re_sorts() {
        let (_gfx, grid) = grid_4x1x1();
        let mut sorter = VisibilitySorter::new();
        sorter.reset(grid.len());

        sorter.update_sort_order(Point3::new(8.0, 8.0, 8.0), &grid);
        assert_eq!(sorter.order()[0], 0);

        assert!(sorter.update_sort_order(Point3::new(56.0, 8.0, 8.0), &grid));
        assert_eq!(sorter.order()[0], 3);
    }

    #[test]
    fn negative_camera_coordinates_snap_toward_negative_infinity() {
        let (_gfx, grid) = grid_4x1x1();
        let mut sorter = VisibilitySorter::new();
        sorter.reset(grid.len());
        sorter.update_sort_order(Point3::new(-0.5, 0.0, 0.0), &grid);
        // floor(-0.5) = -1, which masks to chunk -16..-1, centred at -8.
        assert_eq!(sorter.snapped_position().x, -8);
    }
}
