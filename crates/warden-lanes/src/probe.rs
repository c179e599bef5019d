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

//! The synthetic geometry and the bounded query wait used by the statistics probe.

use std::thread;
use std::time::Duration;
use warden_core::error::{WardenError, WardenResult};
use warden_core::renderer::{GraphicsContext, QueryHandle};

/// A position-only vertex, laid out exactly as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProbeVertex {
    /// Clip-space position.
    pub position: [f32; 3],
}

/// The single triangle drawn inside every statistics query.
pub const PROBE_TRIANGLE: [ProbeVertex; 3] = [
    ProbeVertex {
        position: [-0.5, -0.5, 0.0],
    },
    ProbeVertex {
        position: [0.5, -0.5, 0.0],
    },
    ProbeVertex {
        position: [0.0, 0.5, 0.0],
    },
];

/// Bounds for waiting on a statistics query.
///
/// Polls start at `initial_backoff` between attempts and double up to
/// `max_backoff`. After `max_polls` unsuccessful polls the wait gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPollConfig {
    /// Maximum number of readiness polls.
    pub max_polls: u32,
    /// Sleep after the first unsuccessful poll.
    pub initial_backoff: Duration,
    /// Upper bound for the sleep between polls.
    pub max_backoff: Duration,
}

impl Default for QueryPollConfig {
    fn default() -> Self {
        Self {
            max_polls: 10_000,
            initial_backoff: Duration::from_micros(1),
            max_backoff: Duration::from_millis(1),
        }
    }
}

/// Polls `query` until it is ready or the budget in `config` is spent.
///
/// Returns the number of polls it took.
/// ## Errors
/// * `WardenError::QueryTimeout` - The query never became ready.
pub fn wait_for_query(
    context: &dyn GraphicsContext,
    query: QueryHandle,
    config: &QueryPollConfig,
) -> WardenResult<u32> {
    let mut backoff = config.initial_backoff;
    for poll in 1..=config.max_polls {
        if context.poll_query_ready(query) {
            return Ok(poll);
        }
        if poll < config.max_polls && !backoff.is_zero() {
            thread::sleep(backoff);
            backoff = (backoff * 2).min(config.max_backoff);
        }
    }
    Err(WardenError::QueryTimeout {
        polls: config.max_polls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use warden_core::renderer::{PipelineStatistics, ShaderHandle, VertexBufferHandle};

    /// Becomes ready after `ready_after` polls.
    #[derive(Debug)]
    struct SlowQuery {
        ready_after: u32,
        polls: AtomicU32,
    }

    impl GraphicsContext for SlowQuery {
        fn bind_pixel_shader(&self, _: ShaderHandle) {}
        fn release_shader(&self, _: ShaderHandle) {}
        fn set_vertex_buffer(&self, _: VertexBufferHandle, _: u32, _: u32) {}
        fn draw(&self, _: u32, _: u32) {}
        fn begin_statistics_query(&self, _: QueryHandle) {}
        fn end_statistics_query(&self, _: QueryHandle) {}
        fn poll_query_ready(&self, _: QueryHandle) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_after
        }
        fn read_query_result(&self, _: QueryHandle) -> WardenResult<PipelineStatistics> {
            Ok(PipelineStatistics::default())
        }
        fn release_query(&self, _: QueryHandle) {}
    }

    fn fast_config(max_polls: u32) -> QueryPollConfig {
        QueryPollConfig {
            max_polls,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn probe_triangle_is_tightly_packed() {
        let bytes: &[u8] = bytemuck::cast_slice(&PROBE_TRIANGLE);
        assert_eq!(std::mem::size_of::<ProbeVertex>(), 12);
        assert_eq!(bytes.len(), 36);
    }

    #[test]
    fn waits_until_ready() {
        let context = SlowQuery {
            ready_after: 5,
            polls: AtomicU32::new(0),
        };
        assert_eq!(
            wait_for_query(&context, QueryHandle(1), &fast_config(10)),
            Ok(5)
        );
    }

    #[test]
    fn gives_up_after_budget() {
        let context = SlowQuery {
            ready_after: u32::MAX,
            polls: AtomicU32::new(0),
        };
        assert_eq!(
            wait_for_query(&context, QueryHandle(1), &fast_config(8)),
            Err(WardenError::QueryTimeout { polls: 8 })
        );
        assert_eq!(context.polls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn backoff_is_capped() {
        let context = SlowQuery {
            ready_after: 4,
            polls: AtomicU32::new(0),
        };
        let config = QueryPollConfig {
            max_polls: 4,
            initial_backoff: Duration::from_micros(1),
            max_backoff: Duration::from_micros(2),
        };
        assert_eq!(wait_for_query(&context, QueryHandle(1), &config), Ok(4));
    }
}
