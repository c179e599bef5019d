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

//! Assembly of the subsystems into one shared context.

use crate::config::WardenConfig;
use anyhow::Context as _;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use warden_control::{ActiveBackend, BackendRegistry, DrawRouter, SuppressionPolicy};
use warden_core::backend::{BackendLoader, InterceptEvent};
use warden_core::clock::{FrameClock, SystemClock};
use warden_core::error::WardenResult;
use warden_infra::{
    headless_pipeline, FactoryLoader, FlatTextureOverrides, HeadlessConfig, HeadlessContext,
    HeadlessDevice, TextureSource, BUILTIN_SCHEME,
};
use warden_lanes::{PipelineHookManager, QueryPollConfig};
use warden_telemetry::JitterEstimator;

/// Every subsystem of one stability-layer instance, shared by `Arc`.
///
/// The orchestrator's frame thread and the control thread hold the same
/// context; each subsystem guards its own state.
pub struct WardenContext {
    /// The configuration the context was built from.
    pub config: WardenConfig,
    /// Frame-jitter estimator.
    pub estimator: Arc<JitterEstimator>,
    /// The slot every subsystem consults for the active backend.
    pub active: Arc<ActiveBackend>,
    /// Label-keyed backend ownership.
    pub registry: Arc<BackendRegistry>,
    /// Per-draw suppression.
    pub router: Arc<DrawRouter>,
    /// Hook into the host pipeline.
    pub hook: Arc<PipelineHookManager>,
    /// Flat-texture redirects.
    pub overrides: Arc<FlatTextureOverrides>,
    events_tx: Sender<InterceptEvent>,
    events_rx: Receiver<InterceptEvent>,
}

impl WardenContext {
    /// Builds every subsystem from `config`. Nothing is hooked or activated yet.
    pub fn new(
        config: WardenConfig,
        clock: Arc<dyn FrameClock>,
        loader: Arc<dyn BackendLoader>,
        textures: Arc<dyn TextureSource>,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::bounded(config.intercept_buffer_size);

        let estimator = Arc::new(JitterEstimator::new(clock));
        let active = Arc::new(ActiveBackend::new());
        let registry = Arc::new(BackendRegistry::new(loader, Arc::clone(&active)));
        let router = Arc::new(
            DrawRouter::new(Arc::clone(&estimator), Arc::clone(&active)).with_policy(
                SuppressionPolicy {
                    enabled: config.routing_enabled,
                    threshold: config.entropy_threshold,
                },
            ),
        );
        let hook = Arc::new(PipelineHookManager::new(
            Arc::clone(&active),
            QueryPollConfig::from(&config.query_poll),
        ));
        let overrides = Arc::new(
            FlatTextureOverrides::new(
                textures,
                config.flat_texture.clone(),
                config.texture_overrides.iter().cloned(),
            )
            .with_events(events_tx.clone()),
        );

        if config.estimator_enabled {
            estimator.set_enabled(true);
        }

        Self {
            config,
            estimator,
            active,
            registry,
            router,
            hook,
            overrides,
            events_tx,
            events_rx,
        }
    }

    /// A sender for raising intercept events from any thread.
    pub fn intercept_sender(&self) -> Sender<InterceptEvent> {
        self.events_tx.clone()
    }

    pub(crate) fn intercept_receiver(&self) -> Receiver<InterceptEvent> {
        self.events_rx.clone()
    }

    /// Registers and activates the configured startup backend.
    ///
    /// Returns the label it was registered under, or `None` when no startup
    /// backend is configured.
    pub fn start_backend(&self) -> WardenResult<Option<String>> {
        let Some(locator) = self.config.startup_backend.as_deref() else {
            return Ok(None);
        };
        let label = locator.strip_prefix(BUILTIN_SCHEME).unwrap_or(locator);
        self.registry.register_ai(label, locator)?;
        self.registry.activate(label)?;
        Ok(Some(label.to_string()))
    }
}

/// A context running on the headless pipeline, plus the pipeline itself.
pub struct HeadlessWarden {
    /// The assembled context.
    pub context: Arc<WardenContext>,
    /// Headless device the context is hooked to.
    pub device: Arc<HeadlessDevice>,
    /// Headless context the context is hooked to.
    pub graphics: Arc<HeadlessContext>,
}

/// Builds a context on a headless pipeline, hooks it, loads the texture
/// overrides and activates the startup backend.
///
/// Failing to load overrides or the startup backend is logged and the
/// context is still returned.
pub fn assemble_headless(
    config: WardenConfig,
    headless: HeadlessConfig,
) -> anyhow::Result<HeadlessWarden> {
    config.validate()?;
    let (device, graphics) = headless_pipeline(headless);
    let context = Arc::new(WardenContext::new(
        config,
        Arc::new(SystemClock::new()),
        Arc::new(FactoryLoader::new()),
        device.clone(),
    ));

    context
        .hook
        .hook_pipeline(Some(device.clone()), Some(graphics.clone()))
        .context("Failed to hook the headless pipeline")?;

    if let Err(e) = context.overrides.reload() {
        log::warn!("Warden: Texture overrides unavailable: {}", e);
    }

    match context.start_backend() {
        Ok(Some(label)) => log::info!("Warden: Startup backend '{}' active.", label),
        Ok(None) => log::info!("Warden: No startup backend configured."),
        Err(e) => log::warn!("Warden: Startup backend unavailable: {}", e),
    }

    Ok(HeadlessWarden {
        context,
        device,
        graphics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_assembly_activates_startup_backend() {
        let warden = assemble_headless(WardenConfig::default(), HeadlessConfig::default()).unwrap();
        let ctx = &warden.context;
        assert!(ctx.hook.is_hooked());
        assert!(ctx.estimator.is_enabled());
        assert_eq!(ctx.registry.active_label().as_deref(), Some("console"));
        assert_eq!(ctx.overrides.len(), 6);
    }

    #[test]
    fn bad_startup_backend_is_not_fatal() {
        let config = WardenConfig {
            startup_backend: Some("builtin:nope".into()),
            ..Default::default()
        };
        let warden = assemble_headless(config, HeadlessConfig::default()).unwrap();
        assert!(!warden.context.active.is_set());
        assert!(warden.context.registry.is_empty());
    }

    #[test]
    fn config_drives_router_and_estimator() {
        let config = WardenConfig {
            routing_enabled: false,
            estimator_enabled: false,
            entropy_threshold: 0.3,
            startup_backend: None,
            ..Default::default()
        };
        let warden = assemble_headless(config, HeadlessConfig::default()).unwrap();
        let ctx = &warden.context;
        assert!(!ctx.router.is_routing_enabled());
        assert_eq!(ctx.router.entropy_threshold(), 0.3);
        assert!(!ctx.estimator.is_enabled());
        assert!(!ctx.active.is_set());
    }
}
