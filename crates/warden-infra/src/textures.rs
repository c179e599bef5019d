// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Redirects expensive textures (volumetrics, blur, fog) to one flat texture.

use crossbeam_channel::{Sender, TrySendError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::backend::InterceptEvent;
use warden_core::error::{WardenError, WardenResult};
use warden_core::texture::{TextureHandle, TextureOverrides};

/// The replacement texture loaded by [`FlatTextureOverrides::reload`].
pub const DEFAULT_FLAT_TEXTURE: &str = "texture_flat_grayscale_minimal.dds";

/// Texture names redirected by default.
pub const DEFAULT_OVERRIDES: [&str; 6] = [
    "clouds_volumetric_layer.dds",
    "atmosphere_blur_cube.dds",
    "shader_fog_gradient.dds",
    "motion_blur_occlusion.dds",
    "volumetric_godrays.dds",
    "low_quality_cloudlayer.dds",
];

/// Loads and releases texture resources on behalf of the override table.
pub trait TextureSource: Send + Sync {
    /// Loads the texture at `path`.
    fn load_texture(&self, path: &str) -> WardenResult<TextureHandle>;

    /// Releases a texture returned by [`load_texture`](Self::load_texture).
    fn release_texture(&self, texture: TextureHandle);
}

#[derive(Debug, Default)]
struct OverrideTable {
    flat: Option<TextureHandle>,
    redirects: HashMap<String, TextureHandle>,
}

/// A name → flat-texture redirect table.
///
/// Every hit is announced as an [`InterceptEvent`] on the optional event
/// channel; a full channel drops the event rather than blocking the caller.
pub struct FlatTextureOverrides {
    source: Arc<dyn TextureSource>,
    flat_path: String,
    names: Vec<String>,
    table: Mutex<OverrideTable>,
    events: Option<Sender<InterceptEvent>>,
}

impl FlatTextureOverrides {
    /// Creates an empty table. [`reload`](Self::reload) loads `flat_path` and
    /// redirects every name in `names` to it.
    pub fn new(
        source: Arc<dyn TextureSource>,
        flat_path: impl Into<String>,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source,
            flat_path: flat_path.into(),
            names: names.into_iter().map(Into::into).collect(),
            table: Mutex::new(OverrideTable::default()),
            events: None,
        }
    }

    /// An empty table using [`DEFAULT_FLAT_TEXTURE`] and [`DEFAULT_OVERRIDES`].
    pub fn with_defaults(source: Arc<dyn TextureSource>) -> Self {
        Self::new(source, DEFAULT_FLAT_TEXTURE, DEFAULT_OVERRIDES)
    }

    /// Sends an [`InterceptEvent`] on `events` for every lookup hit.
    pub fn with_events(mut self, events: Sender<InterceptEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, OverrideTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the flat texture from `path`. Does nothing if one is already loaded.
    pub fn load_flat(&self, path: &str) -> WardenResult<TextureHandle> {
        if let Some(flat) = self.lock().flat {
            return Ok(flat);
        }
        let loaded = self.source.load_texture(path).inspect_err(|e| {
            log::error!("FlatTextureOverrides: Failed to load flat texture: {}", e);
        })?;

        let mut table = self.lock();
        let current = table.flat;
        match current {
            // Lost a race with another loader; keep theirs.
            Some(existing) => {
                drop(table);
                self.source.release_texture(loaded);
                Ok(existing)
            }
            None => {
                table.flat = Some(loaded);
                log::info!("FlatTextureOverrides: Flat texture loaded from {}", path);
                Ok(loaded)
            }
        }
    }

    /// Redirects `name` to the flat texture.
    /// ## Errors
    /// * `WardenError::InvalidHandle` - No flat texture is loaded.
    pub fn register_override(&self, name: impl Into<String>) -> WardenResult<()> {
        let mut table = self.lock();
        let flat = table.flat.ok_or(WardenError::InvalidHandle("flat texture"))?;
        table.redirects.insert(name.into(), flat);
        Ok(())
    }

    /// Releases the flat texture and drops every redirect.
    pub fn clear(&self) {
        let flat = {
            let mut table = self.lock();
            table.redirects.clear();
            table.flat.take()
        };
        if let Some(flat) = flat {
            self.source.release_texture(flat);
        }
        log::info!("FlatTextureOverrides: Cleared overrides.");
    }

    /// Clears the table, reloads the flat texture and re-registers the configured names.
    ///
    /// Returns the number of redirects installed.
    pub fn reload(&self) -> WardenResult<usize> {
        self.clear();
        self.load_flat(&self.flat_path)?;
        for name in &self.names {
            self.register_override(name.as_str())?;
        }
        log::info!(
            "FlatTextureOverrides: Reloaded {} overrides.",
            self.names.len()
        );
        Ok(self.names.len())
    }

    /// Number of redirected names.
    pub fn len(&self) -> usize {
        self.lock().redirects.len()
    }

    /// Returns `true` if nothing is redirected.
    pub fn is_empty(&self) -> bool {
        self.lock().redirects.is_empty()
    }
}

impl TextureOverrides for FlatTextureOverrides {
    fn lookup(&self, name: &str) -> Option<TextureHandle> {
        let hit = self.lock().redirects.get(name).copied()?;
        log::debug!("FlatTextureOverrides: Overriding texture: {}", name);
        if let Some(events) = &self.events {
            let event = InterceptEvent::new("texture_override", name);
            if let Err(TrySendError::Full(event)) = events.try_send(event) {
                log::warn!("FlatTextureOverrides: Event queue full, dropped '{}'", event);
            }
        }
        Some(hit)
    }
}

impl Drop for FlatTextureOverrides {
    fn drop(&mut self) {
        let flat = self.lock().flat.take();
        if let Some(flat) = flat {
            self.source.release_texture(flat);
        }
    }
}
