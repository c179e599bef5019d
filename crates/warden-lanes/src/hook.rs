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

//! Binding to the host's graphics pipeline.
//!
//! The `PipelineHookManager` is handed an opaque device/context pair once and
//! from then on can:
//! - replace the active pixel shader, keeping ownership of each override until cleared
//! - flag the renderer into minimal mode
//! - probe the pipeline with a measured one-triangle draw and report its statistics
//!
//! Every method is callable from any thread. The device and context are cloned
//! out of the state lock before they are used, so no graphics call ever runs
//! while one of the manager's locks is held.

use crate::probe::{wait_for_query, ProbeVertex, QueryPollConfig, PROBE_TRIANGLE};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_control::ActiveBackend;
use warden_core::error::{WardenError, WardenResult};
use warden_core::renderer::{
    GraphicsContext, GraphicsDevice, PipelineStatistics, QueryHandle, ShaderHandle,
};

#[derive(Default)]
struct HookState {
    device: Option<Arc<dyn GraphicsDevice>>,
    context: Option<Arc<dyn GraphicsContext>>,
    enabled: bool,
}

impl HookState {
    fn is_hooked(&self) -> bool {
        self.device.is_some() && self.context.is_some()
    }
}

/// Owns the hook into the host pipeline and the set of override shaders.
pub struct PipelineHookManager {
    state: Mutex<HookState>,
    overrides: Mutex<Vec<ShaderHandle>>,
    minimal: AtomicBool,
    last_statistics: Mutex<Option<PipelineStatistics>>,
    active: Arc<ActiveBackend>,
    poll: QueryPollConfig,
}

impl PipelineHookManager {
    /// Creates an unhooked manager that reports through `active`.
    pub fn new(active: Arc<ActiveBackend>, poll: QueryPollConfig) -> Self {
        Self {
            state: Mutex::new(HookState::default()),
            overrides: Mutex::new(Vec::new()),
            minimal: AtomicBool::new(false),
            last_statistics: Mutex::new(None),
            active,
            poll,
        }
    }

    fn state(&self) -> MutexGuard<'_, HookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn overrides(&self) -> MutexGuard<'_, Vec<ShaderHandle>> {
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn info(&self, msg: &str) {
        log::info!("{}", msg);
        self.active.log(msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
        self.active.log_error(msg);
    }

    fn hooked_pair(&self) -> Option<(Arc<dyn GraphicsDevice>, Arc<dyn GraphicsContext>)> {
        let state = self.state();
        match (&state.device, &state.context) {
            (Some(device), Some(context)) => Some((Arc::clone(device), Arc::clone(context))),
            _ => None,
        }
    }

    fn context(&self) -> Option<Arc<dyn GraphicsContext>> {
        self.state().context.clone()
    }

    /// Binds the manager to the host's device and context.
    ///
    /// Once established the hook is permanent; later calls succeed without rebinding.
    /// ## Errors
    /// * `WardenError::InitializationFailure` - `device` or `context` is missing.
    pub fn hook_pipeline(
        &self,
        device: Option<Arc<dyn GraphicsDevice>>,
        context: Option<Arc<dyn GraphicsContext>>,
    ) -> WardenResult<()> {
        {
            let mut state = self.state();
            if state.is_hooked() {
                return Ok(());
            }
            match (device, context) {
                (Some(device), Some(context)) => {
                    state.device = Some(device);
                    state.context = Some(context);
                }
                _ => {
                    drop(state);
                    self.error("PipelineHook: Invalid device/context.");
                    return Err(WardenError::InitializationFailure(
                        "graphics device or context missing".to_string(),
                    ));
                }
            }
        }
        self.info("PipelineHook: HookPipeline successful.");
        Ok(())
    }

    /// Returns `true` once [`hook_pipeline`](Self::hook_pipeline) has succeeded.
    pub fn is_hooked(&self) -> bool {
        self.state().is_hooked()
    }

    /// Enables or disables shader overriding.
    ///
    /// Disabling releases every override currently held.
    /// ## Errors
    /// * `WardenError::HookNotEstablished` - Enabling before the pipeline is hooked.
    pub fn set_enabled(&self, enable: bool) -> WardenResult<()> {
        if enable {
            {
                let mut state = self.state();
                if state.is_hooked() {
                    state.enabled = true;
                } else {
                    state.enabled = false;
                    drop(state);
                    self.error("PipelineHook: Cannot enable - pipeline not hooked.");
                    return Err(WardenError::HookNotEstablished);
                }
            }
            self.info("PipelineHook: Shader overrides ENABLED.");
        } else {
            self.state().enabled = false;
            self.clear_overrides();
            self.info("PipelineHook: Shader overrides DISABLED.");
        }
        Ok(())
    }

    /// Returns `true` if shader overriding is enabled.
    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Binds `shader` as the active pixel shader and takes ownership of it.
    /// ## Errors
    /// * `WardenError::InvalidHandle` - `shader` is null.
    /// * `WardenError::HookNotEstablished` - No graphics context is bound.
    pub fn override_pixel_shader(&self, shader: ShaderHandle) -> WardenResult<()> {
        if shader.is_null() {
            return Err(WardenError::InvalidHandle("pixel shader"));
        }
        let context = self.context().ok_or(WardenError::HookNotEstablished)?;

        context.bind_pixel_shader(shader);
        self.overrides().push(shader);
        self.info("PipelineHook: Custom pixel shader applied.");
        Ok(())
    }

    /// Number of override shaders currently held.
    pub fn override_count(&self) -> usize {
        self.overrides().len()
    }

    /// Releases every held override exactly once and returns how many were released.
    pub fn clear_overrides(&self) -> usize {
        let released = mem::take(&mut *self.overrides());
        if released.is_empty() {
            return 0;
        }
        if let Some(context) = self.context() {
            for shader in &released {
                context.release_shader(*shader);
            }
        }
        self.info("PipelineHook: Cleared all shader overrides.");
        released.len()
    }

    /// Sets the minimal-rendering flag read by the host renderer.
    pub fn force_minimal(&self, state: bool) {
        let previous = self.minimal.swap(state, Ordering::AcqRel);
        if previous != state {
            log::info!("PipelineHook: Minimal mode {}", if state { "ON" } else { "OFF" });
        }
    }

    /// Returns the minimal-rendering flag.
    pub fn is_minimal(&self) -> bool {
        self.minimal.load(Ordering::Acquire)
    }

    /// The statistics reported by the last successful probe.
    pub fn last_statistics(&self) -> Option<PipelineStatistics> {
        *self
            .last_statistics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Measures one synthetic triangle draw with a pipeline-statistics query.
    ///
    /// Returns `None` when the pipeline is not hooked, or when any step of the
    /// probe fails; failures are logged and never abort the caller's frame.
    pub fn frame_monitor(&self) -> Option<PipelineStatistics> {
        let (device, context) = self.hooked_pair()?;

        let query = match device.create_statistics_query() {
            Ok(query) => query,
            Err(e) => {
                self.error(&format!("PipelineHook: {}", e));
                return None;
            }
        };

        let result = self.measure(device.as_ref(), context.as_ref(), query);
        context.release_query(query);

        match result {
            Ok(stats) => {
                let report = format!("[PipelineHook] FrameMonitor :: {}", stats);
                log::debug!("{}", report);
                self.active.log(&report);
                *self
                    .last_statistics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(stats);
                Some(stats)
            }
            Err(e) => {
                self.error(&format!("PipelineHook: {}", e));
                None
            }
        }
    }

    fn measure(
        &self,
        device: &dyn GraphicsDevice,
        context: &dyn GraphicsContext,
        query: QueryHandle,
    ) -> WardenResult<PipelineStatistics> {
        let stride = mem::size_of::<ProbeVertex>() as u32;
        let buffer = device.create_vertex_buffer(bytemuck::cast_slice(&PROBE_TRIANGLE), stride)?;

        context.begin_statistics_query(query);
        context.set_vertex_buffer(buffer, stride, 0);
        context.draw(PROBE_TRIANGLE.len() as u32, 0);
        context.end_statistics_query(query);
        device.release_buffer(buffer);

        let polls = wait_for_query(context, query, &self.poll)?;
        log::trace!("PipelineHook: Query {} ready after {} polls", query, polls);
        context.read_query_result(query)
    }
}

impl Drop for PipelineHookManager {
    fn drop(&mut self) {
        self.clear_overrides();
    }
}
