//! Renderer configuration.
//!
//! All tunables the chunk cache consults live here. The application either
//! builds a [`RendererConfig`] in code or deserializes one from JSON; every
//! field has a sensible default so partial config files work.

use serde::Deserialize;

/// Tunables for the chunk cache and build scheduler.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// View distance in world units; chunks beyond it are neither built nor
    /// drawn.
    pub view_distance: i32,

    /// Margin added to the view distance before range tests, so chunks do
    /// not pop at the exact boundary. The default matches the chunk
    /// bounding-sphere radius.
    pub view_distance_margin: i32,

    /// Target frame time in seconds. Frames faster than this grow the
    /// per-frame build budget; slower frames shrink it.
    pub target_frame_time: f32,

    /// Lower clamp for the per-frame chunk build budget.
    pub min_build_budget: u32,

    /// Upper clamp for the per-frame chunk build budget.
    pub max_build_budget: u32,

    /// Number of texture-atlas pages until the atlas collaborator reports
    /// otherwise.
    pub atlas_pages: usize,

    /// Atlas elements per page until the atlas collaborator reports
    /// otherwise. A change to this value forces a full refresh because
    /// baked texture coordinates depend on it.
    pub elements_per_page: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            view_distance: 512,
            view_distance_margin: 14,
            target_frame_time: 1.0 / 60.0,
            min_build_budget: 4,
            max_build_budget: 12,
            atlas_pages: 1,
            elements_per_page: 16,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from JSON, filling unspecified fields with
    /// their defaults.
    ///
    /// # Errors
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RendererConfig::from_json(r#"{ "view_distance": 128 }"#).unwrap();
        assert_eq!(config.view_distance, 128);
        assert_eq!(config.min_build_budget, 4);
        assert_eq!(config.max_build_budget, 12);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RendererConfig::from_json("{ nope }").is_err());
    }
}
