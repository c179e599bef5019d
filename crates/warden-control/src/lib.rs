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

//! # Warden Control
//!
//! Decision making for the stability layer: which backend is active, and
//! whether the next draw should be suppressed.

#![warn(missing_docs)]

pub mod active;
pub mod registry;
pub mod router;

pub use active::ActiveBackend;
pub use registry::BackendRegistry;
pub use router::{
    DrawCall, DrawOutcome, DrawRouter, SuppressionDecision, SuppressionPolicy,
    DEFAULT_ENTROPY_THRESHOLD,
};
