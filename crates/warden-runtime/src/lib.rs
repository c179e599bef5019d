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

//! # Warden Runtime
//!
//! Wires the stability layer together: configuration, the per-frame
//! orchestrator, and the control surface driven by the `warden` binary.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod control;
pub mod orchestrator;

pub use config::{QueryPollSettings, WardenConfig, BACKEND_ENV};
pub use context::{assemble_headless, HeadlessWarden, WardenContext};
pub use control::{ControlCommand, ControlSurface, ParseCommandError};
pub use orchestrator::{FrameReport, Orchestrator};
