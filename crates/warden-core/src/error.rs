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

//! Defines the error taxonomy shared by every subsystem of the stability layer.
//!
//! Steady-state operations report failure through a [`WardenResult`]; nothing in
//! the frame path unwinds. Per-frame failures (a statistics query that cannot be
//! created, for instance) are logged by the caller and the frame continues.

use thiserror::Error;

/// Convenience alias for results produced by the stability layer.
pub type WardenResult<T> = Result<T, WardenError>;

/// Every failure the stability layer can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WardenError {
    /// The opaque device/context pair handed to the hook manager was missing or invalid.
    #[error("Pipeline initialization failed: {0}")]
    InitializationFailure(String),

    /// A backend locator could not be resolved, or its entry point is missing.
    #[error("Failed to load decision backend from '{locator}': {reason}")]
    BackendLoadFailure {
        /// The locator that was requested.
        locator: String,
        /// Why the loader gave up.
        reason: String,
    },

    /// A factory produced no instance, or the instance refused to initialize.
    #[error("Failed to construct decision backend '{label}': {reason}")]
    BackendConstructionFailure {
        /// The label (or locator) the backend was meant to live under.
        label: String,
        /// Why construction failed.
        reason: String,
    },

    /// The graphics device could not create a pipeline-statistics query.
    #[error("Failed to create pipeline statistics query: {0}")]
    QueryCreationFailure(String),

    /// A statistics query never resolved within the bounded poll budget.
    #[error("Pipeline statistics query did not resolve after {polls} polls")]
    QueryTimeout {
        /// Number of polls performed before giving up.
        polls: u32,
    },

    /// A resolved statistics query could not be read back.
    #[error("Failed to retrieve pipeline statistics: {0}")]
    QueryReadFailure(String),

    /// A null handle was passed to an operation expecting a live one.
    #[error("Invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// An operation needs the rendering pipeline to be hooked first.
    #[error("The rendering pipeline is not hooked")]
    HookNotEstablished,

    /// No backend is registered under the requested label.
    #[error("No decision backend registered under '{0}'")]
    BackendNotFound(String),

    /// An entropy threshold that is negative or not finite.
    #[error("Invalid entropy threshold: {0}")]
    InvalidThreshold(f32),
}

impl WardenError {
    /// Builds a [`WardenError::BackendLoadFailure`].
    pub fn load_failure(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendLoadFailure {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`WardenError::BackendConstructionFailure`].
    pub fn construction_failure(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendConstructionFailure {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures that only affect the current frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::QueryCreationFailure(_) | Self::QueryTimeout { .. } | Self::QueryReadFailure(_)
        )
    }
}
