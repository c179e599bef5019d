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

//! # Warden Core
//!
//! Foundational crate containing the traits, core types, and interface contracts
//! shared by every layer of the frame-stability stack.

#![warn(missing_docs)]

pub mod backend;
pub mod clock;
pub mod error;
pub mod renderer;
pub mod texture;

pub use backend::{
    BackendHandle, BackendLifecycle, BackendLoader, BackendState, DecisionBackend, InterceptEvent,
};
pub use clock::{FrameClock, ManualClock, SystemClock};
pub use error::{WardenError, WardenResult};
pub use renderer::{
    GraphicsContext, GraphicsDevice, PipelineStatistics, QueryHandle, ShaderHandle,
    VertexBufferHandle,
};
pub use texture::{TextureHandle, TextureOverrides};
