//! # Core Module
//!
//! Core utilities shared across the renderer. Collaborators (the graphics
//! device, the world, the mesh builder) are created once by the application
//! and passed explicitly to each component that needs them; `StSystem` is
//! the shared handle type used for that wiring.

mod st_system;

pub use st_system::StSystem;
