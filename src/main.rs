//! # Voxel Map Renderer Entry Point
//!
//! Runs the headless demo: a generated world rendered through the chunk
//! cache against the recording device, with statistics on stdout.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    voxel_map_renderer::run();
}
