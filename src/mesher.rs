//! # Mesher Module
//!
//! A naive face-culling mesh builder implementing the
//! [`MeshProvider`](crate::provider::MeshProvider) contract over a
//! [`VoxelMap`]. One face per exposed block side, no greedy merging —
//! enough geometry to exercise the chunk cache and the pass protocol end
//! to end.
//!
//! Texture coordinates follow a 1D atlas layout: each page is a vertical
//! strip of `elements_per_page` square block textures, so a texture index
//! picks a page and a V range within it.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Point3;

use crate::blocks::{block_def, BlockDef, BlockSide};
use crate::graphics::TerrainVertex;
use crate::provider::{BuildOutcome, DrawCategory, MeshProvider, RawChunkGeometry, RawPart};
use crate::renderer::chunk::CHUNK_DIMENSION;
use crate::world::VoxelMap;

/// Baked light colour for sunlit faces.
const SUNLIGHT: [u8; 4] = [255, 255, 255, 255];

/// Baked light colour for faces below the light column.
const SHADOW: [u8; 4] = [160, 160, 160, 255];

/// Builds chunk geometry straight from a shared [`VoxelMap`].
pub struct NaiveMesher {
    world: Rc<RefCell<VoxelMap>>,
    atlas_pages: usize,
    elements_per_page: usize,
}

impl NaiveMesher {
    /// Creates a mesher reading from the given world.
    pub fn new(world: Rc<RefCell<VoxelMap>>, atlas_pages: usize, elements_per_page: usize) -> Self {
        NaiveMesher {
            world,
            atlas_pages,
            elements_per_page,
        }
    }

    /// Page index and V range for a texture index in the 1D atlas.
    fn atlas_slot(&self, texture_index: usize) -> (usize, f32, f32) {
        let page = (texture_index / self.elements_per_page).min(self.atlas_pages - 1);
        let row = texture_index % self.elements_per_page;
        let v0 = row as f32 / self.elements_per_page as f32;
        let v1 = v0 + 1.0 / self.elements_per_page as f32;
        (page, v0, v1)
    }

    fn emit_quad(part: &mut RawPart, corners: [[f32; 3]; 4], v0: f32, v1: f32, colour: [u8; 4]) {
        let base = part.vertices.len() as u32;
        let uvs = [[0.0, v1], [1.0, v1], [1.0, v0], [0.0, v0]];
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            part.vertices.push(TerrainVertex::new(*corner, *uv, colour));
        }
        part.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    fn emit_block_faces(
        &self,
        raw: &mut RawChunkGeometry,
        world: &VoxelMap,
        x: i32,
        y: i32,
        z: i32,
        id: u8,
        def: &BlockDef,
        colour: [u8; 4],
    ) {
        let category = if def.translucent {
            DrawCategory::Translucent
        } else {
            DrawCategory::Opaque
        };
        let (page, v0, v1) = self.atlas_slot(def.texture_index);
        let (fx, fy, fz) = (x as f32, y as f32, z as f32);

        for side in BlockSide::all() {
            let offset = side.offset();
            let (nx, ny, nz) = (x + offset.x, y + offset.y, z + offset.z);
            // A face is hidden behind an opaque neighbor, and between two
            // blocks of the same type (no water-water walls).
            if world.is_opaque(nx, ny, nz) || world.get_block(nx, ny, nz) == id {
                continue;
            }
            let corners = match side {
                BlockSide::FRONT => [
                    [fx, fy, fz + 1.0],
                    [fx + 1.0, fy, fz + 1.0],
                    [fx + 1.0, fy + 1.0, fz + 1.0],
                    [fx, fy + 1.0, fz + 1.0],
                ],
                BlockSide::BACK => [
                    [fx + 1.0, fy, fz],
                    [fx, fy, fz],
                    [fx, fy + 1.0, fz],
                    [fx + 1.0, fy + 1.0, fz],
                ],
                BlockSide::BOTTOM => [
                    [fx, fy, fz],
                    [fx + 1.0, fy, fz],
                    [fx + 1.0, fy, fz + 1.0],
                    [fx, fy, fz + 1.0],
                ],
                BlockSide::TOP => [
                    [fx, fy + 1.0, fz + 1.0],
                    [fx + 1.0, fy + 1.0, fz + 1.0],
                    [fx + 1.0, fy + 1.0, fz],
                    [fx, fy + 1.0, fz],
                ],
                BlockSide::LEFT => [
                    [fx, fy, fz],
                    [fx, fy, fz + 1.0],
                    [fx, fy + 1.0, fz + 1.0],
                    [fx, fy + 1.0, fz],
                ],
                BlockSide::RIGHT => [
                    [fx + 1.0, fy, fz + 1.0],
                    [fx + 1.0, fy, fz],
                    [fx + 1.0, fy + 1.0, fz],
                    [fx + 1.0, fy + 1.0, fz + 1.0],
                ],
            };
            Self::emit_quad(raw.part_mut(category, page), corners, v0, v1, colour);
        }
    }

    fn emit_sprite(
        &self,
        raw: &mut RawChunkGeometry,
        x: i32,
        y: i32,
        z: i32,
        def: &BlockDef,
        colour: [u8; 4],
    ) {
        let (page, v0, v1) = self.atlas_slot(def.texture_index);
        let (fx, fy, fz) = (x as f32, y as f32, z as f32);
        // Two crossed quads; the sprite pass draws them double-sided.
        let diagonals = [
            [
                [fx, fy, fz],
                [fx + 1.0, fy, fz + 1.0],
                [fx + 1.0, fy + 1.0, fz + 1.0],
                [fx, fy + 1.0, fz],
            ],
            [
                [fx + 1.0, fy, fz],
                [fx, fy, fz + 1.0],
                [fx, fy + 1.0, fz + 1.0],
                [fx + 1.0, fy + 1.0, fz],
            ],
        ];
        for corners in diagonals {
            Self::emit_quad(raw.part_mut(DrawCategory::Sprite, page), corners, v0, v1, colour);
        }
    }
}

impl MeshProvider for NaiveMesher {
    fn try_build_chunk(&mut self, origin: Point3<i32>) -> BuildOutcome {
        let world = self.world.borrow();
        let mut raw = RawChunkGeometry::new(self.atlas_pages);

        for y in origin.y..origin.y + CHUNK_DIMENSION {
            for z in origin.z..origin.z + CHUNK_DIMENSION {
                for x in origin.x..origin.x + CHUNK_DIMENSION {
                    let id = world.get_block(x, y, z);
                    let def = match block_def(id) {
                        Some(def) => def,
                        None => continue,
                    };
                    let lit = match world.light_height(x, z) {
                        None => true,
                        Some(h) => y >= h,
                    };
                    let colour = if lit { SUNLIGHT } else { SHADOW };
                    if def.sprite {
                        self.emit_sprite(&mut raw, x, y, z, def, colour);
                    } else {
                        self.emit_block_faces(&mut raw, &world, x, y, z, id, def, colour);
                    }
                }
            }
        }

        if raw.is_empty() {
            BuildOutcome::Empty
        } else {
            BuildOutcome::Built(raw)
        }
    }
}
