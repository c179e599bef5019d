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

//! A software stand-in for a GPU device/context pair.
//!
//! The headless pipeline tracks every resource it hands out, counts pipeline
//! statistics for draws issued inside a query, and resolves queries after a
//! configurable number of polls. It backs the `warden` binary and the
//! integration tests.

use crate::textures::TextureSource;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::error::{WardenError, WardenResult};
use warden_core::renderer::{
    GraphicsContext, GraphicsDevice, PipelineStatistics, QueryHandle, ShaderHandle,
    VertexBufferHandle,
};
use warden_core::texture::TextureHandle;

/// Behaviour knobs for the headless pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Polls a query needs before it reports ready.
    pub query_latency_polls: u32,
    /// Pixel-shader invocations counted per rasterized triangle.
    pub pixels_per_primitive: u64,
    /// When `true`, `create_statistics_query` fails.
    pub fail_query_creation: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            query_latency_polls: 2,
            pixels_per_primitive: 120,
            fail_query_creation: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryPhase {
    Created,
    Recording,
    Ended,
}

#[derive(Debug)]
struct QueryRecord {
    phase: QueryPhase,
    stats: PipelineStatistics,
    polls: u32,
}

#[derive(Debug, Default)]
struct GpuState {
    queries: HashMap<QueryHandle, QueryRecord>,
    buffers: HashMap<VertexBufferHandle, usize>,
    shaders: HashMap<ShaderHandle, u32>,
    textures: HashSet<TextureHandle>,
    bound_shader: Option<ShaderHandle>,
    bound_buffer: Option<VertexBufferHandle>,
    draw_calls: u64,
    invalid_releases: u64,
}

#[derive(Debug)]
struct Gpu {
    latency: u32,
    pixels_per_primitive: u64,
    fail_queries: AtomicBool,
    next_id: AtomicU64,
    state: Mutex<GpuState>,
}

impl Gpu {
    fn lock(&self) -> MutexGuard<'_, GpuState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Creates a connected headless device/context pair.
pub fn headless_pipeline(config: HeadlessConfig) -> (Arc<HeadlessDevice>, Arc<HeadlessContext>) {
    let gpu = Arc::new(Gpu {
        latency: config.query_latency_polls,
        pixels_per_primitive: config.pixels_per_primitive,
        fail_queries: AtomicBool::new(config.fail_query_creation),
        next_id: AtomicU64::new(1),
        state: Mutex::new(GpuState::default()),
    });
    (
        Arc::new(HeadlessDevice {
            gpu: Arc::clone(&gpu),
        }),
        Arc::new(HeadlessContext { gpu }),
    )
}

/// The resource-creating half of the headless pipeline.
#[derive(Debug)]
pub struct HeadlessDevice {
    gpu: Arc<Gpu>,
}

impl HeadlessDevice {
    /// Creates a pixel shader with one outstanding reference.
    pub fn create_pixel_shader(&self) -> ShaderHandle {
        let handle = ShaderHandle(self.gpu.next_id());
        self.gpu.lock().shaders.insert(handle, 1);
        handle
    }

    /// Makes subsequent query creation fail (or succeed again).
    pub fn set_fail_query_creation(&self, fail: bool) {
        self.gpu.fail_queries.store(fail, Ordering::Relaxed);
    }

    /// Vertex buffers created and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.gpu.lock().buffers.len()
    }

    /// Queries created and not yet released.
    pub fn live_queries(&self) -> usize {
        self.gpu.lock().queries.len()
    }

    /// Textures loaded and not yet released.
    pub fn live_textures(&self) -> usize {
        self.gpu.lock().textures.len()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_statistics_query(&self) -> WardenResult<QueryHandle> {
        if self.gpu.fail_queries.load(Ordering::Relaxed) {
            return Err(WardenError::QueryCreationFailure(
                "headless device configured to refuse queries".to_string(),
            ));
        }
        let handle = QueryHandle(self.gpu.next_id());
        self.gpu.lock().queries.insert(
            handle,
            QueryRecord {
                phase: QueryPhase::Created,
                stats: PipelineStatistics::default(),
                polls: 0,
            },
        );
        Ok(handle)
    }

    fn create_vertex_buffer(&self, data: &[u8], stride: u32) -> WardenResult<VertexBufferHandle> {
        if stride == 0 || data.len() % stride as usize != 0 {
            return Err(WardenError::InvalidHandle("vertex buffer layout"));
        }
        let handle = VertexBufferHandle(self.gpu.next_id());
        self.gpu.lock().buffers.insert(handle, data.len());
        Ok(handle)
    }

    fn release_buffer(&self, buffer: VertexBufferHandle) {
        let mut state = self.gpu.lock();
        if state.buffers.remove(&buffer).is_none() {
            state.invalid_releases += 1;
            log::warn!("HeadlessDevice: Released unknown buffer {}", buffer);
        }
        if state.bound_buffer == Some(buffer) {
            state.bound_buffer = None;
        }
    }
}

impl TextureSource for HeadlessDevice {
    fn load_texture(&self, path: &str) -> WardenResult<TextureHandle> {
        if path.trim().is_empty() {
            return Err(WardenError::InitializationFailure(
                "empty texture path".to_string(),
            ));
        }
        let handle = TextureHandle(self.gpu.next_id());
        self.gpu.lock().textures.insert(handle);
        log::debug!("HeadlessDevice: Loaded '{}' as {}", path, handle);
        Ok(handle)
    }

    fn release_texture(&self, texture: TextureHandle) {
        let mut state = self.gpu.lock();
        if !state.textures.remove(&texture) {
            state.invalid_releases += 1;
        }
    }
}

/// The command-issuing half of the headless pipeline.
#[derive(Debug)]
pub struct HeadlessContext {
    gpu: Arc<Gpu>,
}

impl HeadlessContext {
    /// The currently bound pixel shader.
    pub fn bound_pixel_shader(&self) -> Option<ShaderHandle> {
        self.gpu.lock().bound_shader
    }

    /// Pixel shaders with at least one outstanding reference.
    pub fn live_shaders(&self) -> usize {
        self.gpu.lock().shaders.len()
    }

    /// Number of draw calls issued.
    pub fn draw_calls(&self) -> u64 {
        self.gpu.lock().draw_calls
    }

    /// Releases of resources that were unknown or already released.
    pub fn invalid_releases(&self) -> u64 {
        self.gpu.lock().invalid_releases
    }
}

impl GraphicsContext for HeadlessContext {
    fn bind_pixel_shader(&self, shader: ShaderHandle) {
        self.gpu.lock().bound_shader = Some(shader);
    }

    fn release_shader(&self, shader: ShaderHandle) {
        let mut guard = self.gpu.lock();
        let state = &mut *guard;
        match state.shaders.get_mut(&shader) {
            Some(refs) if *refs > 1 => *refs -= 1,
            Some(_) => {
                state.shaders.remove(&shader);
                if state.bound_shader == Some(shader) {
                    state.bound_shader = None;
                }
            }
            None => {
                state.invalid_releases += 1;
                log::warn!("HeadlessContext: Released unknown shader {}", shader);
            }
        }
    }

    fn set_vertex_buffer(&self, buffer: VertexBufferHandle, _stride: u32, _offset: u32) {
        let mut state = self.gpu.lock();
        state.bound_buffer = state.buffers.contains_key(&buffer).then_some(buffer);
    }

    fn draw(&self, vertex_count: u32, _start_vertex: u32) {
        let pixels = self.gpu.pixels_per_primitive;
        let mut state = self.gpu.lock();
        state.draw_calls += 1;
        if state.bound_buffer.is_none() {
            return;
        }
        let primitives = u64::from(vertex_count / 3);
        for record in state.queries.values_mut() {
            if record.phase == QueryPhase::Recording {
                record.stats.vs_invocations += u64::from(vertex_count);
                record.stats.raster_primitives += primitives;
                record.stats.ps_invocations += primitives * pixels;
            }
        }
    }

    fn begin_statistics_query(&self, query: QueryHandle) {
        if let Some(record) = self.gpu.lock().queries.get_mut(&query) {
            record.phase = QueryPhase::Recording;
            record.stats = PipelineStatistics::default();
            record.polls = 0;
        }
    }

    fn end_statistics_query(&self, query: QueryHandle) {
        if let Some(record) = self.gpu.lock().queries.get_mut(&query) {
            if record.phase == QueryPhase::Recording {
                record.phase = QueryPhase::Ended;
            }
        }
    }

    fn poll_query_ready(&self, query: QueryHandle) -> bool {
        let latency = self.gpu.latency;
        match self.gpu.lock().queries.get_mut(&query) {
            Some(record) if record.phase == QueryPhase::Ended => {
                record.polls = record.polls.saturating_add(1);
                record.polls >= latency
            }
            _ => false,
        }
    }

    fn read_query_result(&self, query: QueryHandle) -> WardenResult<PipelineStatistics> {
        let latency = self.gpu.latency;
        match self.gpu.lock().queries.get(&query) {
            Some(record) if record.phase == QueryPhase::Ended && record.polls >= latency => {
                Ok(record.stats)
            }
            Some(_) => Err(WardenError::QueryReadFailure(format!(
                "{} has not resolved",
                query
            ))),
            None => Err(WardenError::QueryReadFailure(format!(
                "{} does not exist",
                query
            ))),
        }
    }

    fn release_query(&self, query: QueryHandle) {
        let mut state = self.gpu.lock();
        if state.queries.remove(&query).is_none() {
            state.invalid_releases += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_BYTES: [u8; 36] = [0; 36];

    #[test]
    fn measured_triangle_statistics() {
        let (device, context) = headless_pipeline(HeadlessConfig {
            query_latency_polls: 3,
            pixels_per_primitive: 50,
            fail_query_creation: false,
        });
        let query = device.create_statistics_query().unwrap();
        let buffer = device.create_vertex_buffer(&TRIANGLE_BYTES, 12).unwrap();

        context.begin_statistics_query(query);
        context.set_vertex_buffer(buffer, 12, 0);
        context.draw(3, 0);
        context.end_statistics_query(query);

        assert!(!context.poll_query_ready(query));
        assert!(context.read_query_result(query).is_err());
        assert!(!context.poll_query_ready(query));
        assert!(context.poll_query_ready(query));

        let stats = context.read_query_result(query).unwrap();
        assert_eq!(
            stats,
            PipelineStatistics {
                vs_invocations: 3,
                ps_invocations: 50,
                raster_primitives: 1,
            }
        );

        device.release_buffer(buffer);
        context.release_query(query);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_queries(), 0);
        assert_eq!(context.invalid_releases(), 0);
    }

    #[test]
    fn draws_outside_a_query_are_not_counted() {
        let (device, context) = headless_pipeline(HeadlessConfig::default());
        let buffer = device.create_vertex_buffer(&TRIANGLE_BYTES, 12).unwrap();
        context.set_vertex_buffer(buffer, 12, 0);
        context.draw(3, 0);

        let query = device.create_statistics_query().unwrap();
        context.begin_statistics_query(query);
        context.end_statistics_query(query);
        while !context.poll_query_ready(query) {}
        assert_eq!(
            context.read_query_result(query).unwrap(),
            PipelineStatistics::default()
        );
        assert_eq!(context.draw_calls(), 1);
    }

    #[test]
    fn double_release_is_recorded() {
        let (device, context) = headless_pipeline(HeadlessConfig::default());
        let shader = device.create_pixel_shader();
        context.bind_pixel_shader(shader);
        assert_eq!(context.bound_pixel_shader(), Some(shader));

        context.release_shader(shader);
        assert_eq!(context.live_shaders(), 0);
        assert_eq!(context.bound_pixel_shader(), None);
        context.release_shader(shader);
        assert_eq!(context.invalid_releases(), 1);
    }

    #[test]
    fn refusing_query_creation() {
        let (device, _) = headless_pipeline(HeadlessConfig {
            fail_query_creation: true,
            ..Default::default()
        });
        assert!(matches!(
            device.create_statistics_query(),
            Err(WardenError::QueryCreationFailure(_))
        ));
        device.set_fail_query_creation(false);
        assert!(device.create_statistics_query().is_ok());
    }

    #[test]
    fn rejects_misaligned_vertex_data() {
        let (device, _) = headless_pipeline(HeadlessConfig::default());
        assert!(device.create_vertex_buffer(&[0u8; 10], 12).is_err());
        assert!(device.create_vertex_buffer(&[0u8; 12], 0).is_err());
    }
}
