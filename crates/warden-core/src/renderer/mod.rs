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

//! Abstract view of the host's rendering pipeline.
//!
//! The stability layer never talks to a concrete graphics API. It binds to an
//! opaque [`GraphicsDevice`]/[`GraphicsContext`] pair supplied by the host and
//! refers to resources through copyable handles.

mod handles;
mod stats;
mod traits;

pub(crate) use handles::opaque_handle;
pub use handles::{QueryHandle, ShaderHandle, VertexBufferHandle};
pub use stats::PipelineStatistics;
pub use traits::{GraphicsContext, GraphicsDevice};
