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

use std::sync::Arc;
use std::time::Duration;

use warden_control::ActiveBackend;
use warden_core::backend::BackendHandle;
use warden_core::renderer::PipelineStatistics;
use warden_infra::{headless_pipeline, HeadlessConfig, JournalBackend};
use warden_lanes::{PipelineHookManager, QueryPollConfig};

fn quick_poll() -> QueryPollConfig {
    QueryPollConfig {
        max_polls: 64,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

#[test]
fn test_frame_monitor_on_headless_pipeline() {
    let (device, context) = headless_pipeline(HeadlessConfig {
        query_latency_polls: 5,
        pixels_per_primitive: 96,
        fail_query_creation: false,
    });
    let manager = PipelineHookManager::new(Arc::new(ActiveBackend::new()), quick_poll());
    manager
        .hook_pipeline(Some(device.clone()), Some(context.clone()))
        .unwrap();

    let stats = manager.frame_monitor().unwrap();
    assert_eq!(
        stats,
        PipelineStatistics {
            vs_invocations: 3,
            ps_invocations: 96,
            raster_primitives: 1,
        }
    );
    assert_eq!(device.live_queries(), 0, "query released");
    assert_eq!(device.live_buffers(), 0, "probe buffer released");
}

#[test]
fn test_failed_query_creation_does_not_stop_later_frames() {
    let (device, context) = headless_pipeline(HeadlessConfig {
        fail_query_creation: true,
        ..Default::default()
    });
    let manager = PipelineHookManager::new(Arc::new(ActiveBackend::new()), quick_poll());
    manager
        .hook_pipeline(Some(device.clone()), Some(context.clone()))
        .unwrap();

    assert_eq!(manager.frame_monitor(), None);
    device.set_fail_query_creation(false);
    assert!(manager.frame_monitor().is_some());
}

#[test]
fn test_timeout_is_reported_to_active_backend() {
    let (device, context) = headless_pipeline(HeadlessConfig {
        query_latency_polls: 1_000,
        ..Default::default()
    });
    let journal = Arc::new(BackendHandle::new(Box::new(JournalBackend::default())));
    assert!(journal.ensure_initialized());
    let active = Arc::new(ActiveBackend::new());
    active.replace(Some(journal.clone()));

    let manager = PipelineHookManager::new(active, quick_poll());
    manager.hook_pipeline(Some(device), Some(context)).unwrap();

    assert_eq!(manager.frame_monitor(), None);
    assert!(journal.query("echo").starts_with("ERROR: PipelineHook:"));
}

#[test]
fn test_overrides_release_headless_shaders() {
    let (device, context) = headless_pipeline(HeadlessConfig::default());
    let manager = PipelineHookManager::new(Arc::new(ActiveBackend::new()), quick_poll());
    manager
        .hook_pipeline(Some(device.clone()), Some(context.clone()))
        .unwrap();
    manager.set_enabled(true).unwrap();

    let a = device.create_pixel_shader();
    let b = device.create_pixel_shader();
    manager.override_pixel_shader(a).unwrap();
    manager.override_pixel_shader(b).unwrap();
    assert_eq!(context.bound_pixel_shader(), Some(b));

    manager.set_enabled(false).unwrap();
    assert_eq!(context.live_shaders(), 0);
    assert_eq!(context.invalid_releases(), 0);
    assert_eq!(manager.clear_overrides(), 0);
}
