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

use super::DecisionBackend;
use crate::error::WardenResult;

/// Factory contract for constructing decision backends from a locator string.
///
/// How the locator is resolved (a static factory table, a plugin directory,
/// a shared library) is entirely up to the implementation. The registry only
/// depends on this trait.
pub trait BackendLoader: Send + Sync {
    /// Resolves `locator` and constructs a new, uninitialized backend.
    /// ## Errors
    /// * `WardenError::BackendLoadFailure` - The locator is unknown or its entry point is missing.
    /// * `WardenError::BackendConstructionFailure` - The entry point produced no instance.
    fn load(&self, locator: &str) -> WardenResult<Box<dyn DecisionBackend>>;
}
