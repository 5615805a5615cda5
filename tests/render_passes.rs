//! Integration tests for the terrain pass protocol and the renderer's
//! notification surface, driven through the recording device.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

use voxel_map_renderer::blocks::{BlockInfo, BlockType, StandardBlocks};
use voxel_map_renderer::config::RendererConfig;
use voxel_map_renderer::core::StSystem;
use voxel_map_renderer::culling::{Culling, Frustum};
use voxel_map_renderer::graphics::{
    DepthFunc, GraphicsCall, IndexBufferId, TerrainVertex, TraceGraphics, VertexBufferId,
};
use voxel_map_renderer::mesher::NaiveMesher;
use voxel_map_renderer::provider::{
    BuildOutcome, DrawCategory, MeshProvider, RawChunkGeometry, RawPart,
};
use voxel_map_renderer::renderer::{CameraPose, FrameInput, MapRenderer};
use voxel_map_renderer::world::VoxelMap;

struct Everything;

impl Culling for Everything {
    fn sphere_in_frustum(&self, _x: f32, _y: f32, _z: f32, _radius: f32) -> bool {
        true
    }
}

/// Provider that hands out a clone of fixed geometry for every chunk.
struct ScriptedProvider {
    raw: RawChunkGeometry,
    calls: usize,
}

impl MeshProvider for ScriptedProvider {
    fn try_build_chunk(&mut self, _origin: Point3<i32>) -> BuildOutcome {
        self.calls += 1;
        BuildOutcome::Built(self.raw.clone())
    }
}

struct EmptyProvider;

impl MeshProvider for EmptyProvider {
    fn try_build_chunk(&mut self, _origin: Point3<i32>) -> BuildOutcome {
        BuildOutcome::Empty
    }
}

fn quad(indices: usize) -> RawPart {
    let quads = indices / 6;
    RawPart {
        vertices: vec![TerrainVertex::new([0.0; 3], [0.0; 2], [255; 4]); quads * 4],
        indices: (0..quads as u32)
            .flat_map(|q| {
                let base = q * 4;
                [base, base + 1, base + 2, base + 2, base + 3, base]
            })
            .collect(),
    }
}

/// Fixed geometry spanning two pages: opaque on both, a sprite and a
/// translucent part on the first.
fn two_page_geometry() -> RawChunkGeometry {
    let mut raw = RawChunkGeometry::new(2);
    raw.set_part(DrawCategory::Opaque, 0, quad(6));
    raw.set_part(DrawCategory::Opaque, 1, quad(6));
    raw.set_part(DrawCategory::Sprite, 0, quad(6));
    raw.set_part(DrawCategory::Translucent, 0, quad(6));
    raw
}

fn frame(position: Point3<f32>, camera_block: u8) -> FrameInput {
    FrameInput {
        camera: CameraPose {
            position,
            yaw: Rad(0.0),
            pitch: Rad(0.0),
        },
        camera_block,
        delta_time: 1.0 / 60.0,
    }
}

fn renderer_with(
    provider: Box<dyn MeshProvider>,
    config: RendererConfig,
) -> (StSystem<TraceGraphics>, MapRenderer<TraceGraphics>) {
    let gfx = StSystem::new(TraceGraphics::new());
    let blocks: Rc<dyn BlockInfo> = Rc::new(StandardBlocks);
    let renderer = MapRenderer::new(gfx.clone(), provider, blocks, config);
    (gfx, renderer)
}

fn without_uploads(calls: &[GraphicsCall]) -> Vec<GraphicsCall> {
    calls
        .iter()
        .filter(|call| {
            !matches!(
                call,
                GraphicsCall::CreateVertexBuffer { .. } | GraphicsCall::CreateIndexBuffer { .. }
            )
        })
        .cloned()
        .collect()
}

#[test]
fn a_frame_issues_the_full_pass_sequence() {
    let provider = ScriptedProvider {
        raw: two_page_geometry(),
        calls: 0,
    };
    let config = RendererConfig {
        atlas_pages: 2,
        ..RendererConfig::default()
    };
    let (gfx, mut renderer) = renderer_with(Box::new(provider), config);
    renderer.on_map_loaded(16, 16, 16);

    renderer.render(&frame(Point3::new(8.0, 8.0, 8.0), 0), &Everything);

    // Upload order is deterministic, so buffer handles are too.
    let vb = |n| VertexBufferId(n);
    let ib = |n| IndexBufferId(n);
    let draw = |n| GraphicsCall::DrawIndexed {
        vb: vb(n),
        ib: ib(n),
        index_count: 6,
        start_vertex: 0,
        start_index: 0,
    };

    use GraphicsCall::*;
    let expected = vec![
        // Opaque depth-fill, then sprites without face culling.
        BeginTerrainBatch,
        Texturing(true),
        AlphaTest(true),
        FaceCulling(true),
        BindTexturePage(0),
        draw(1),
        BindTexturePage(1),
        draw(2),
        FaceCulling(false),
        BindTexturePage(0),
        draw(3),
        BindTexturePage(1),
        AlphaTest(false),
        Texturing(false),
        EndTerrainBatch,
        // Translucent depth pre-pass (no texture binds), then the blended
        // colour pass over the settled depth.
        BeginTerrainBatch,
        FaceCulling(true),
        Texturing(false),
        AlphaBlending(false),
        ColourWrite(false),
        DepthWrite(true),
        SetDepthFunc(DepthFunc::LessEqual),
        draw(4),
        AlphaBlending(true),
        Texturing(true),
        ColourWrite(true),
        DepthWrite(false),
        BindTexturePage(0),
        draw(4),
        BindTexturePage(1),
        DepthWrite(true),
        SetDepthFunc(DepthFunc::Less),
        AlphaBlending(false),
        Texturing(false),
        FaceCulling(false),
        EndTerrainBatch,
    ];
    assert_eq!(without_uploads(gfx.get().calls()), expected);

    // The colour passes counted three parts of six indices each; the
    // depth pre-pass counted nothing.
    assert_eq!(renderer.stats().indices_drawn, 24);
}

#[test]
fn standing_in_water_disables_translucent_face_culling() {
    let provider = ScriptedProvider {
        raw: two_page_geometry(),
        calls: 0,
    };
    let (gfx, mut renderer) = renderer_with(Box::new(provider), RendererConfig::default());
    renderer.on_map_loaded(16, 16, 16);

    renderer.render(
        &frame(Point3::new(8.0, 8.0, 8.0), BlockType::WATER.id()),
        &Everything,
    );

    let calls = gfx.get().calls().to_vec();
    let second_batch: Vec<&GraphicsCall> = calls
        .iter()
        .skip_while(|call| !matches!(call, GraphicsCall::EndTerrainBatch))
        .skip(1)
        .collect();
    assert!(second_batch
        .iter()
        .all(|call| !matches!(call, GraphicsCall::FaceCulling(_))));
}

#[test]
fn oversized_parts_split_into_two_draws_at_the_device_limit() {
    let mut raw = RawChunkGeometry::new(1);
    raw.set_part(DrawCategory::Opaque, 0, quad(18));
    let provider = ScriptedProvider { raw, calls: 0 };

    let gfx = StSystem::new(TraceGraphics::with_max_indices(12));
    let blocks: Rc<dyn BlockInfo> = Rc::new(StandardBlocks);
    let mut renderer = MapRenderer::new(
        gfx.clone(),
        Box::new(provider),
        blocks,
        RendererConfig::default(),
    );
    renderer.on_map_loaded(16, 16, 16);

    renderer.render(&frame(Point3::new(8.0, 8.0, 8.0), 0), &Everything);

    let draws: Vec<(u32, u32, u32)> = gfx
        .get()
        .calls()
        .iter()
        .filter_map(|call| match call {
            GraphicsCall::DrawIndexed {
                index_count,
                start_vertex,
                start_index,
                ..
            } => Some((*index_count, *start_vertex, *start_index)),
            _ => None,
        })
        .collect();
    // 18 indices against a limit of 12: one full draw, then the remainder
    // resuming at vertex 8 (12 indices / 6 * 4 vertices).
    assert_eq!(draws, vec![(12, 0, 0), (6, 8, 12)]);
}

#[test]
fn passes_run_even_when_there_is_nothing_to_draw() {
    let (gfx, mut renderer) = renderer_with(Box::new(EmptyProvider), RendererConfig::default());
    renderer.on_map_loaded(16, 16, 16);

    renderer.render(&frame(Point3::new(8.0, 8.0, 8.0), 0), &Everything);

    let calls = gfx.get().calls();
    let begins = calls
        .iter()
        .filter(|call| matches!(call, GraphicsCall::BeginTerrainBatch))
        .count();
    let draws = calls
        .iter()
        .filter(|call| matches!(call, GraphicsCall::DrawIndexed { .. }))
        .count();
    assert_eq!(begins, 2);
    assert_eq!(draws, 0);
}

#[test]
fn two_translucent_chunks_share_one_depth_prepass() {
    let mut raw = RawChunkGeometry::new(1);
    raw.set_part(DrawCategory::Translucent, 0, quad(6));
    let provider = ScriptedProvider { raw, calls: 0 };
    let (gfx, mut renderer) = renderer_with(Box::new(provider), RendererConfig::default());
    // Two chunks side by side, both translucent-only.
    renderer.on_map_loaded(32, 16, 16);

    renderer.render(&frame(Point3::new(8.0, 8.0, 8.0), 0), &Everything);

    let calls = gfx.get().calls().to_vec();
    let prepass_start = calls
        .iter()
        .position(|call| matches!(call, GraphicsCall::ColourWrite(false)))
        .expect("no depth pre-pass");
    let colour_start = calls
        .iter()
        .position(|call| matches!(call, GraphicsCall::DepthWrite(false)))
        .expect("no colour pass");

    let prepass_draws = calls[prepass_start..colour_start]
        .iter()
        .filter(|call| matches!(call, GraphicsCall::DrawIndexed { .. }))
        .count();
    let colour_draws = calls[colour_start..]
        .iter()
        .filter(|call| matches!(call, GraphicsCall::DrawIndexed { .. }))
        .count();
    assert_eq!(prepass_draws, 2);
    assert_eq!(colour_draws, 2);

    // Depth writes are on for the pre-pass and off for the colour pass.
    assert!(calls[prepass_start..colour_start]
        .iter()
        .any(|call| matches!(call, GraphicsCall::DepthWrite(true))));
}

#[test]
fn shrinking_the_view_distance_hides_chunks_without_camera_motion() {
    let provider = ScriptedProvider {
        raw: two_page_geometry(),
        calls: 0,
    };
    let config = RendererConfig {
        atlas_pages: 2,
        ..RendererConfig::default()
    };
    let (_gfx, mut renderer) = renderer_with(Box::new(provider), config);
    // Six chunks along X, camera parked in the first.
    renderer.on_map_loaded(96, 16, 16);

    let input = frame(Point3::new(8.0, 8.0, 8.0), 0);
    renderer.render(&input, &Everything);
    let drawn_at_default = renderer.stats().indices_drawn;
    assert!(drawn_at_default > 0);

    // Same pose; only the chunks within 16 + margin remain drawable.
    renderer.on_view_distance_changed(16);
    renderer.render(&input, &Everything);
    let drawn_after = renderer.stats().indices_drawn;
    assert!(drawn_after > 0);
    assert!(drawn_after < drawn_at_default);
}

#[test]
fn an_atlas_element_change_forces_a_full_rebuild() {
    let provider = ScriptedProvider {
        raw: two_page_geometry(),
        calls: 0,
    };
    let config = RendererConfig {
        atlas_pages: 2,
        ..RendererConfig::default()
    };
    let (gfx, mut renderer) = renderer_with(Box::new(provider), config);
    renderer.on_map_loaded(16, 16, 16);

    let input = frame(Point3::new(8.0, 8.0, 8.0), 0);
    renderer.render(&input, &Everything);
    let buffers_after_build = gfx.get().live_vertex_buffers();
    assert!(buffers_after_build > 0);

    // Same element count: nothing is discarded.
    renderer.on_atlas_changed(2, 16);
    assert_eq!(gfx.get().live_vertex_buffers(), buffers_after_build);

    // Different element count: every baked coordinate is stale.
    renderer.on_atlas_changed(2, 32);
    assert_eq!(gfx.get().live_vertex_buffers(), 0);

    renderer.render(&input, &Everything);
    assert!(gfx.get().live_vertex_buffers() > 0);
}

#[test]
fn unloading_the_map_releases_every_buffer() {
    let provider = ScriptedProvider {
        raw: two_page_geometry(),
        calls: 0,
    };
    let (gfx, mut renderer) = renderer_with(Box::new(provider), RendererConfig::default());
    renderer.on_map_loaded(48, 48, 48);

    renderer.render(&frame(Point3::new(24.0, 24.0, 24.0), 0), &Everything);
    assert!(gfx.get().live_vertex_buffers() > 0);

    renderer.on_new_map();
    assert_eq!(gfx.get().live_vertex_buffers(), 0);
    assert_eq!(gfx.get().live_index_buffers(), 0);

    // Rendering with no map loaded is a no-op.
    gfx.get_mut().take_calls();
    renderer.render(&frame(Point3::new(24.0, 24.0, 24.0), 0), &Everything);
    assert!(gfx.get().calls().is_empty());
}

#[test]
fn a_generated_world_renders_end_to_end() {
    let world = Rc::new(RefCell::new(VoxelMap::generate(48, 32, 48, 3)));
    let config = RendererConfig::default();
    let gfx = StSystem::new(TraceGraphics::new());
    let provider = NaiveMesher::new(world.clone(), config.atlas_pages, config.elements_per_page);
    let blocks: Rc<dyn BlockInfo> = Rc::new(StandardBlocks);
    let mut renderer = MapRenderer::new(gfx.clone(), Box::new(provider), blocks, config);
    {
        let world = world.borrow();
        renderer.on_map_loaded(world.width(), world.height(), world.length());
    }

    let projection = cgmath::perspective(Deg(70.0), 16.0 / 9.0, 0.1, 1000.0);
    let eye = Point3::new(24.0, 28.0, 60.0);
    let view = Matrix4::look_at_rh(eye, Point3::new(24.0, 12.0, 24.0), Vector3::unit_y());
    let frustum = Frustum::from_matrix(projection * view);

    // Enough frames for the budgeted scheduler to work through the grid.
    for _ in 0..32 {
        let camera_block = world.borrow().block_at_head(eye);
        renderer.render(
            &FrameInput {
                camera: CameraPose {
                    position: eye,
                    yaw: Rad(0.0),
                    pitch: Rad(-0.4),
                },
                camera_block,
                delta_time: 1.0 / 60.0,
            },
            &frustum,
        );
    }

    let stats = renderer.stats();
    assert!(stats.chunk_builds > 0);
    assert!(stats.indices_drawn > 0);

    // An edit invalidates, the next frames rebuild, and drawing goes on.
    let edit = {
        let mut world = world.borrow_mut();
        let y = world.light_height(24, 24).unwrap();
        world.set_block(24, y, 24, 0).unwrap()
    };
    renderer.redraw_block(&edit);
    let builds_before = renderer.stats().chunk_builds;
    for _ in 0..4 {
        let camera_block = world.borrow().block_at_head(eye);
        renderer.render(
            &FrameInput {
                camera: CameraPose {
                    position: eye,
                    yaw: Rad(0.0),
                    pitch: Rad(-0.4),
                },
                camera_block,
                delta_time: 1.0 / 60.0,
            },
            &frustum,
        );
    }
    assert!(renderer.stats().chunk_builds > builds_before);

    renderer.dispose();
    assert_eq!(gfx.get().live_vertex_buffers(), 0);
}
