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

use super::{PipelineStatistics, QueryHandle, ShaderHandle, VertexBufferHandle};
use crate::error::WardenResult;
use std::fmt::Debug;

/// The resource-creating half of the host's graphics pipeline.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a pipeline-statistics query.
    /// ## Errors
    /// * `WardenError::QueryCreationFailure` - If the device cannot create the query.
    fn create_statistics_query(&self) -> WardenResult<QueryHandle>;

    /// Creates an immutable vertex buffer initialised with `data`.
    /// ## Arguments
    /// * `data` - Raw vertex bytes.
    /// * `stride` - Size in bytes of one vertex.
    fn create_vertex_buffer(&self, data: &[u8], stride: u32) -> WardenResult<VertexBufferHandle>;

    /// Releases a vertex buffer created by [`create_vertex_buffer`](Self::create_vertex_buffer).
    fn release_buffer(&self, buffer: VertexBufferHandle);
}

/// The command-issuing half of the host's graphics pipeline.
pub trait GraphicsContext: Send + Sync + Debug + 'static {
    /// Binds `shader` as the active pixel shader.
    fn bind_pixel_shader(&self, shader: ShaderHandle);

    /// Drops one reference to `shader`.
    fn release_shader(&self, shader: ShaderHandle);

    /// Binds `buffer` to the input assembler.
    fn set_vertex_buffer(&self, buffer: VertexBufferHandle, stride: u32, offset: u32);

    /// Submits a non-indexed triangle-list draw of the bound geometry.
    fn draw(&self, vertex_count: u32, start_vertex: u32);

    /// Starts collecting statistics into `query`.
    fn begin_statistics_query(&self, query: QueryHandle);

    /// Stops collecting statistics into `query`.
    fn end_statistics_query(&self, query: QueryHandle);

    /// Returns `true` once the GPU has resolved `query`.
    fn poll_query_ready(&self, query: QueryHandle) -> bool;

    /// Reads the counters of a resolved query.
    /// ## Errors
    /// * `WardenError::QueryReadFailure` - If the data cannot be retrieved.
    fn read_query_result(&self, query: QueryHandle) -> WardenResult<PipelineStatistics>;

    /// Releases `query`.
    fn release_query(&self, query: QueryHandle);
}
