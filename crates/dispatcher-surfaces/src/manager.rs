use std::collections::HashMap;

use tracing::warn;

use crate::error::{Result, SurfaceError};
use crate::surface::UserSurface;
use crate::types::ActionChoice;

/// Registry of outbound surface adapters, keyed by `Surface::to_string()`.
///
/// Unlike a long-lived transport connection this has nothing to reconnect —
/// each send is a one-shot webhook/HTTP call — so there is no connect/backoff
/// lifecycle here, only routing.
pub struct SurfaceManager {
    surfaces: HashMap<String, Box<dyn UserSurface>>,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
        }
    }

    pub fn register(&mut self, surface: Box<dyn UserSurface>) {
        self.surfaces.insert(surface.name().to_string(), surface);
    }

    pub async fn send_text(&self, surface: &str, channel_key: &str, text: &str) -> Result<()> {
        let adapter = self.lookup(surface)?;
        adapter.send_text(channel_key, text).await
    }

    pub async fn send_actions(&self, surface: &str, channel_key: &str, prompt_text: &str, actions: &[ActionChoice]) -> Result<()> {
        let adapter = self.lookup(surface)?;
        adapter.send_actions(channel_key, prompt_text, actions).await
    }

    fn lookup(&self, surface: &str) -> Result<&dyn UserSurface> {
        self.surfaces
            .get(surface)
            .map(|b| b.as_ref())
            .ok_or_else(|| {
                warn!(surface = %surface, "no adapter registered for surface");
                SurfaceError::UnknownSurface(surface.to_string())
            })
    }
}

impl Default for SurfaceManager {
    fn default() -> Self {
        Self::new()
    }
}
