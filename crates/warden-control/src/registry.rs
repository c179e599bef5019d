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

//! Label-keyed registry of decision backends.

use crate::active::ActiveBackend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::backend::{BackendHandle, BackendLoader, DecisionBackend};
use warden_core::error::{WardenError, WardenResult};

/// Owns decision backends by label and tracks which one is active.
///
/// The registry is the owner of every instance it holds: replacing a label or
/// clearing the registry releases the previous instances (and empties the
/// active slot if it pointed at one of them).
pub struct BackendRegistry {
    backends: Mutex<HashMap<String, Arc<BackendHandle>>>,
    active: Arc<ActiveBackend>,
    loader: Arc<dyn BackendLoader>,
}

impl BackendRegistry {
    /// Creates an empty registry that resolves locators with `loader` and
    /// publishes its active backend through `active`.
    pub fn new(loader: Arc<dyn BackendLoader>, active: Arc<ActiveBackend>) -> Self {
        Self {
            backends: Mutex::new(HashMap::new()),
            active,
            loader,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<BackendHandle>>> {
        self.backends.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The slot consulted by the router and the hook manager.
    pub fn active_slot(&self) -> &Arc<ActiveBackend> {
        &self.active
    }

    /// Registers `backend` under `label`, releasing any previous owner of that label.
    pub fn register(&self, label: impl Into<String>, backend: Box<dyn DecisionBackend>) {
        self.insert(label.into(), Arc::new(BackendHandle::new(backend)));
    }

    fn insert(&self, label: String, handle: Arc<BackendHandle>) {
        log::info!(
            "BackendRegistry: Registered '{}' ({})",
            label,
            handle.identify()
        );
        let previous = self.lock().insert(label.clone(), handle);
        if let Some(previous) = previous {
            if self.active.clear_if(&previous) {
                log::warn!(
                    "BackendRegistry: '{}' was active and has been replaced; no backend is active now.",
                    label
                );
            }
            log::debug!("BackendRegistry: Released previous owner of '{}'.", label);
        }
    }

    /// Loads a backend through the injected loader, initializes it, and
    /// registers it under `label`.
    ///
    /// Nothing is registered on failure, and the active backend is left untouched.
    /// ## Errors
    /// * `WardenError::BackendLoadFailure` - The locator could not be resolved.
    /// * `WardenError::BackendConstructionFailure` - No instance, or `initialize()` failed.
    pub fn register_ai(&self, label: &str, locator: &str) -> WardenResult<()> {
        let backend = self.loader.load(locator).inspect_err(|e| {
            log::error!("BackendRegistry: Could not load '{}': {}", label, e);
        })?;

        let handle = Arc::new(BackendHandle::new(backend));
        if !handle.ensure_initialized() {
            let err = WardenError::construction_failure(label, "initialize() returned false");
            log::error!("BackendRegistry: {}", err);
            return Err(err);
        }

        self.insert(label.to_string(), handle);
        Ok(())
    }

    /// Returns the backend registered under `label`.
    pub fn get(&self, label: &str) -> Option<Arc<BackendHandle>> {
        self.lock().get(label).cloned()
    }

    /// Returns every registered label, sorted.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.lock().keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Returns the number of registered backends.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no backends are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Releases every registered backend.
    pub fn clear(&self) {
        let released: Vec<Arc<BackendHandle>> = self.lock().drain().map(|(_, h)| h).collect();
        for handle in &released {
            self.active.clear_if(handle);
        }
        log::info!("BackendRegistry: Released {} backend(s).", released.len());
    }

    /// Makes the backend registered under `label` the active one.
    ///
    /// The backend is initialized first if needed; the swap itself is atomic.
    /// If `label` is re-registered while the backend initializes, the newer
    /// instance is activated instead, so the slot never holds a released backend.
    /// ## Errors
    /// * `WardenError::BackendNotFound` - Nothing is registered under `label`.
    /// * `WardenError::BackendConstructionFailure` - The backend refused to initialize.
    pub fn activate(&self, label: &str) -> WardenResult<()> {
        loop {
            let handle = self
                .get(label)
                .ok_or_else(|| WardenError::BackendNotFound(label.to_string()))?;
            if !handle.ensure_initialized() {
                return Err(WardenError::construction_failure(
                    label,
                    "initialize() returned false",
                ));
            }

            // The map lock is held across the swap so `insert` and `clear`
            // cannot release `handle` in between.
            let previous = {
                let backends = self.lock();
                match backends.get(label) {
                    Some(current) if Arc::ptr_eq(current, &handle) => {
                        self.active.replace(Some(Arc::clone(&handle)))
                    }
                    _ => {
                        log::debug!(
                            "BackendRegistry: '{}' was replaced during activation; retrying.",
                            label
                        );
                        continue;
                    }
                }
            };
            drop(previous);

            handle.log("Activated via control surface.");
            log::info!("BackendRegistry: '{}' is now active.", label);
            return Ok(());
        }
    }

    /// Returns the label under which the active backend is registered.
    pub fn active_label(&self) -> Option<String> {
        let active = self.active.snapshot()?;
        self.lock()
            .iter()
            .find(|(_, h)| Arc::ptr_eq(h, &active))
            .map(|(label, _)| label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use warden_core::backend::BackendState;

    struct Stub {
        name: &'static str,
        init_ok: bool,
        shutdowns: Arc<AtomicUsize>,
    }

    impl Stub {
        fn boxed(name: &'static str) -> Box<dyn DecisionBackend> {
            Box::new(Stub {
                name,
                init_ok: true,
                shutdowns: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    impl DecisionBackend for Stub {
        fn initialize(&self) -> bool {
            self.init_ok
        }
        fn log(&self, _: &str) {}
        fn log_error(&self, _: &str) {}
        fn on_frame(&self) {}
        fn is_active(&self) -> bool {
            true
        }
        fn should_suppress_draw(&self, _: f32) -> bool {
            false
        }
        fn identify(&self) -> String {
            self.name.to_string()
        }
        fn status_string(&self) -> String {
            "stub".to_string()
        }
        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NoLoader;

    impl BackendLoader for NoLoader {
        fn load(&self, locator: &str) -> WardenResult<Box<dyn DecisionBackend>> {
            Err(WardenError::load_failure(locator, "loading disabled"))
        }
    }

    fn registry() -> BackendRegistry {
        BackendRegistry::new(Arc::new(NoLoader), Arc::new(ActiveBackend::new()))
    }

    #[test]
    fn test_labels_are_sorted() {
        let registry = registry();
        registry.register("shodan", Stub::boxed("S"));
        registry.register("mara", Stub::boxed("M"));
        registry.register("olivia", Stub::boxed("O"));
        assert_eq!(registry.labels(), vec!["mara", "olivia", "shodan"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_activate_unknown_keeps_previous() {
        let registry = registry();
        registry.register("a", Stub::boxed("A"));
        registry.activate("a").unwrap();

        let err = registry.activate("missing").unwrap_err();
        assert_eq!(err, WardenError::BackendNotFound("missing".into()));
        assert_eq!(registry.active_label().as_deref(), Some("a"));
    }

    #[test]
    fn test_activate_refusing_backend() {
        let registry = registry();
        registry.register(
            "broken",
            Box::new(Stub {
                name: "B",
                init_ok: false,
                shutdowns: Arc::new(AtomicUsize::new(0)),
            }),
        );
        assert!(matches!(
            registry.activate("broken"),
            Err(WardenError::BackendConstructionFailure { .. })
        ));
        assert!(!registry.active_slot().is_set());
    }

    #[test]
    fn test_replacing_active_label_releases_it() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let registry = registry();
        registry.register(
            "x",
            Box::new(Stub {
                name: "A",
                init_ok: true,
                shutdowns: Arc::clone(&shutdowns),
            }),
        );
        registry.activate("x").unwrap();
        let a = registry.get("x").unwrap();
        assert_eq!(a.state(), BackendState::Active);
        drop(a);

        registry.register("x", Stub::boxed("B"));
        assert!(!registry.active_slot().is_set());
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(registry.get("x").unwrap().identify(), "B");
    }

    #[test]
    fn test_clear_empties_active_slot() {
        let registry = registry();
        registry.register("a", Stub::boxed("A"));
        registry.activate("a").unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.active_slot().is_set());
        assert!(registry.active_label().is_none());
    }

    /// Blocks inside `initialize()` until the test lets it through.
    struct Gated {
        entered: Arc<Barrier>,
        release: Arc<Barrier>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl DecisionBackend for Gated {
        fn initialize(&self) -> bool {
            self.entered.wait();
            self.release.wait();
            true
        }
        fn log(&self, _: &str) {}
        fn log_error(&self, _: &str) {}
        fn on_frame(&self) {}
        fn is_active(&self) -> bool {
            true
        }
        fn should_suppress_draw(&self, _: f32) -> bool {
            false
        }
        fn identify(&self) -> String {
            "A".to_string()
        }
        fn status_string(&self) -> String {
            "gated".to_string()
        }
        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_reregister_during_activation_never_leaves_released_backend_active() {
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(registry());
        registry.register(
            "x",
            Box::new(Gated {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
                shutdowns: Arc::clone(&shutdowns),
            }),
        );

        let activation = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.activate("x"))
        };
        entered.wait();
        registry.register("x", Stub::boxed("B"));
        release.wait();
        activation.join().unwrap().unwrap();

        let active = registry.active_slot().snapshot().unwrap();
        assert_eq!(active.identify(), "B");
        drop(active);
        assert_eq!(registry.active_label().as_deref(), Some("x"));
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1, "A released once");

        registry.clear();
        assert!(!registry.active_slot().is_set());
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }
}
