//! Resolves a `RunConfig`'s diffusion preset into a concrete backbone.

use core_config::{DiffusionPreset, RunConfig};
use denoising_driver::{Backbone, HttpBackbone, MockBackbone};

pub fn resolve(config: &RunConfig) -> Backbone {
    match config.diffusion_preset {
        DiffusionPreset::Mock => Backbone::Mock(MockBackbone::new()),
        DiffusionPreset::Fast | DiffusionPreset::Balanced | DiffusionPreset::Quality => {
            let endpoint = config
                .diffusion_endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:8008/generate".to_string());
            Backbone::Http(HttpBackbone::new(
                endpoint,
                config.api_keys.diffusion.clone(),
                config.timeouts.generation(),
            ))
        }
    }
}
