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

//! Name-based backend construction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use warden_core::backend::{BackendLoader, DecisionBackend};
use warden_core::error::{WardenError, WardenResult};

/// Locator prefix resolved by [`FactoryLoader`].
pub const BUILTIN_SCHEME: &str = "builtin:";

/// The constructor signature every factory exposes.
pub type ConstructFn = fn() -> Option<Box<dyn DecisionBackend>>;

/// A named constructor for a decision backend.
///
/// Submit one with `inventory::submit!` to make it resolvable as
/// `builtin:<name>`.
#[derive(Debug)]
pub struct BackendFactory {
    /// The name after the `builtin:` prefix.
    pub name: &'static str,
    /// Builds a fresh instance, or `None` if the backend cannot be created.
    pub construct: ConstructFn,
}

impl BackendFactory {
    /// Creates a factory entry.
    pub const fn new(name: &'static str, construct: ConstructFn) -> Self {
        Self { name, construct }
    }
}

inventory::collect!(BackendFactory);

/// Resolves `builtin:<name>` locators against the submitted factories.
///
/// Factories added at runtime with [`register_factory`](Self::register_factory)
/// shadow submitted ones with the same name.
#[derive(Debug, Default)]
pub struct FactoryLoader {
    runtime: RwLock<HashMap<String, ConstructFn>>,
}

impl FactoryLoader {
    /// Creates a loader that knows every submitted factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory at runtime.
    pub fn register_factory(&self, name: impl Into<String>, construct: ConstructFn) {
        let name = name.into();
        log::debug!("FactoryLoader: Registered runtime factory '{}'", name);
        self.runtime
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, construct);
    }

    fn find(&self, name: &str) -> Option<ConstructFn> {
        let runtime = self
            .runtime
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied();
        runtime.or_else(|| {
            inventory::iter::<BackendFactory>
                .into_iter()
                .find(|f| f.name == name)
                .map(|f| f.construct)
        })
    }

    /// Every resolvable factory name, sorted and deduplicated.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = inventory::iter::<BackendFactory>
            .into_iter()
            .map(|f| f.name.to_string())
            .collect();
        names.extend(
            self.runtime
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .keys()
                .cloned(),
        );
        names.sort();
        names.dedup();
        names
    }
}

impl BackendLoader for FactoryLoader {
    fn load(&self, locator: &str) -> WardenResult<Box<dyn DecisionBackend>> {
        let name = locator.strip_prefix(BUILTIN_SCHEME).ok_or_else(|| {
            WardenError::load_failure(locator, "unsupported locator; expected 'builtin:<name>'")
        })?;

        let construct = self
            .find(name)
            .ok_or_else(|| WardenError::load_failure(locator, "no factory with that name"))?;

        let backend = construct().ok_or_else(|| {
            WardenError::construction_failure(locator, "factory returned no instance")
        })?;
        log::info!(
            "FactoryLoader: Loaded '{}' ({})",
            locator,
            backend.identify()
        );
        Ok(backend)
    }
}
