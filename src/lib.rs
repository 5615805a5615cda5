#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Map Renderer
//!
//! An incremental chunk mesh cache and multi-pass terrain renderer for
//! voxel worlds, built with Rust.
//!
//! The world is a 3D grid of block-typed cells partitioned into 16-block
//! chunks. This crate owns the per-chunk render cache: which chunks have
//! geometry, which need (re)building after an edit, which are visible, in
//! what order they draw, and the pass/state sequence that produces a
//! correct image — including blended translucency — from partially built
//! state.
//!
//! ## Key Modules
//!
//! * `renderer` - The chunk cache, invalidation, build scheduling, and the
//!   terrain pass protocol
//! * `graphics` - The abstract device interface and a recording headless
//!   device
//! * `provider` - The mesh building contract
//! * `blocks`, `world`, `mesher`, `culling` - Demo collaborators: block
//!   metadata, a bounded block store, a naive face-culling mesh builder,
//!   and frustum extraction
//!
//! ## Architecture
//!
//! The renderer core is deliberately thin on dependencies on its
//! surroundings: geometry generation, the graphics backend, world storage,
//! and camera math are all collaborators reached through traits, injected
//! explicitly at construction or passed per frame. Everything runs on one
//! thread in frame order — build, then draw — so the cache the draw passes
//! observe is exactly what the build step left behind.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_map_renderer::run();
//! }
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};
use log::info;
use web_time::Instant;

pub mod blocks;
pub mod config;
pub mod core;
pub mod culling;
pub mod graphics;
pub mod mesher;
pub mod provider;
pub mod renderer;
pub mod world;

use crate::core::StSystem;

use blocks::StandardBlocks;
use config::RendererConfig;
use culling::Frustum;
use graphics::TraceGraphics;
use mesher::NaiveMesher;
use renderer::{CameraPose, FrameInput, MapRenderer};
use world::VoxelMap;

/// Runs the headless demo: generates a world, renders an orbiting camera
/// for a few seconds of simulated frames, and logs what the chunk cache
/// did.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = RendererConfig::default();
    let atlas_pages = config.atlas_pages;
    let elements_per_page = config.elements_per_page;

    let world = Rc::new(RefCell::new(VoxelMap::generate(96, 48, 96, 42)));
    let gfx = StSystem::new(TraceGraphics::new());
    let provider = NaiveMesher::new(world.clone(), atlas_pages, elements_per_page);
    let blocks: Rc<dyn blocks::BlockInfo> = Rc::new(StandardBlocks);

    let mut renderer = MapRenderer::new(gfx.clone(), Box::new(provider), blocks, config);
    {
        let world = world.borrow();
        renderer.on_map_loaded(world.width(), world.height(), world.length());
    }

    let projection = cgmath::perspective(Deg(70.0), 16.0 / 9.0, 0.1, 1000.0);
    let target = Point3::new(48.0, 16.0, 48.0);

    let mut last_frame = Instant::now();
    let mut delta_time = 1.0 / 60.0f32;
    for frame in 0..240u32 {
        let angle = frame as f32 * 0.01;
        let eye = Point3::new(
            48.0 + angle.cos() * 40.0,
            30.0,
            48.0 + angle.sin() * 40.0,
        );
        let view = Matrix4::look_at_rh(eye, target, Vector3::unit_y());
        let frustum = Frustum::from_matrix(projection * view);
        let camera = CameraPose {
            position: eye,
            yaw: Rad(angle),
            pitch: Rad(-0.35),
        };
        let camera_block = world.borrow().block_at_head(eye);

        renderer.render(
            &FrameInput {
                camera,
                camera_block,
                delta_time,
            },
            &frustum,
        );

        // Punch a hole in the terrain every second of simulated time.
        if frame % 60 == 30 {
            let x = 40 + (frame / 60) as i32 * 3;
            let surface = world.borrow().light_height(x, 48);
            if let Some(y) = surface {
                if let Some(edit) = world.borrow_mut().set_block(x, y, 48, 0) {
                    renderer.redraw_block(&edit);
                    info!("removed block at ({x}, {y}, 48)");
                }
            }
        }

        if frame % 30 == 0 {
            let stats = renderer.stats();
            info!(
                "frame {frame}: {} indices drawn, {} chunks built, budget {}",
                stats.indices_drawn,
                stats.chunk_builds,
                renderer.build_budget()
            );
        }

        // Keep the trace from growing without bound.
        gfx.get_mut().take_calls();

        let now = Instant::now();
        delta_time = (now - last_frame).as_secs_f32().max(1e-4);
        last_frame = now;
    }

    renderer.dispose();
    info!(
        "demo finished; {} vertex buffers live after dispose",
        gfx.get().live_vertex_buffers()
    );
}
