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

//! The pluggable decision-backend contract.
//!
//! A decision backend is a policy object that can veto draws when it judges
//! the frame unstable, and that receives per-frame lifecycle notifications
//! while it is the active backend. Backends are shared between the frame
//! thread and the control thread, so every method takes `&self`; implementors
//! keep their mutable state behind interior mutability.

mod lifecycle;
mod loader;

pub use lifecycle::{BackendHandle, BackendLifecycle, BackendState};
pub use loader::BackendLoader;

use std::fmt;

/// An event raised by the host renderer and forwarded to the active backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptEvent {
    /// The subsystem that raised the event (e.g. `"texture_override"`).
    pub source: String,
    /// Free-form detail, such as the intercepted resource name.
    pub detail: String,
}

impl InterceptEvent {
    /// Creates a new intercept event.
    pub fn new(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InterceptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.detail)
    }
}

/// The capability set every pluggable decision policy must satisfy.
///
/// The first eight methods are mandatory. The lifecycle hooks after them are
/// optional and default to doing nothing.
pub trait DecisionBackend: Send + Sync {
    /// Prepares the backend for use. Must be idempotent.
    ///
    /// Returns `false` if the backend cannot operate.
    fn initialize(&self) -> bool;

    /// Records an informational message.
    fn log(&self, msg: &str);

    /// Records an error message.
    fn log_error(&self, msg: &str);

    /// Called once per frame while this backend is active.
    fn on_frame(&self);

    /// Returns `true` while the backend considers itself live.
    fn is_active(&self) -> bool;

    /// Votes on whether the current draw should be suppressed.
    ///
    /// A `true` vote always suppresses. A `false` vote defers to the router's
    /// threshold rule; it can never force a draw through.
    fn should_suppress_draw(&self, entropy: f32) -> bool;

    /// A stable identifier for this backend implementation.
    fn identify(&self) -> String;

    /// A short, human-readable status line.
    fn status_string(&self) -> String;

    /// Called before any other per-frame work.
    fn on_frame_start(&self) {}

    /// Called after all per-frame work.
    fn on_frame_end(&self) {}

    /// Called for each intercept event raised by the host renderer.
    fn on_intercept_event(&self, _event: &InterceptEvent) {}

    /// Called once when the last owner releases the backend.
    fn shutdown(&self) {}

    /// Answers a free-form query from the control surface.
    fn query(&self, _input: &str) -> String {
        format!("[{}] Default query handler.", self.identify())
    }
}
