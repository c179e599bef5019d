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

//! Per-instance lifecycle tracking for decision backends.

use super::DecisionBackend;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, Ordering};

/// The lifecycle state of a single backend instance.
///
/// `Constructed → Initialized → Active ⇄ Initialized → Shutdown`.
/// `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BackendState {
    /// Built by a factory, `initialize()` not yet called successfully.
    Constructed = 0,
    /// `initialize()` succeeded.
    Initialized = 1,
    /// Currently the active backend and receiving per-frame calls.
    Active = 2,
    /// Released. No further calls are expected.
    Shutdown = 3,
}

impl BackendState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BackendState::Constructed,
            1 => BackendState::Initialized,
            2 => BackendState::Active,
            _ => BackendState::Shutdown,
        }
    }
}

/// Lock-free state machine for one backend instance.
#[derive(Debug)]
pub struct BackendLifecycle {
    state: AtomicU8,
}

impl BackendLifecycle {
    /// Creates a lifecycle in the `Constructed` state.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(BackendState::Constructed as u8),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> BackendState {
        BackendState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: BackendState, to: BackendState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Constructed → Initialized`. Returns `false` from any other state.
    pub fn mark_initialized(&self) -> bool {
        self.transition(BackendState::Constructed, BackendState::Initialized)
    }

    /// `Initialized → Active`. Returns `false` from any other state.
    pub fn activate(&self) -> bool {
        self.transition(BackendState::Initialized, BackendState::Active)
    }

    /// `Active → Initialized`. Returns `false` from any other state.
    pub fn deactivate(&self) -> bool {
        self.transition(BackendState::Active, BackendState::Initialized)
    }

    /// Moves to `Shutdown`, returning the previous state.
    ///
    /// Returns `None` if the lifecycle was already shut down.
    pub fn shut_down(&self) -> Option<BackendState> {
        let previous =
            BackendState::from_u8(self.state.swap(BackendState::Shutdown as u8, Ordering::AcqRel));
        (previous != BackendState::Shutdown).then_some(previous)
    }
}

impl Default for BackendLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// An owned decision backend together with its lifecycle.
///
/// Handles are shared as `Arc<BackendHandle>`: the registry holds the owning
/// reference, the active slot and in-flight callers hold short-lived clones.
/// When the last reference is dropped the backend's
/// [`shutdown`](DecisionBackend::shutdown) hook runs exactly once, provided it
/// was ever initialized.
pub struct BackendHandle {
    backend: Box<dyn DecisionBackend>,
    lifecycle: BackendLifecycle,
}

impl BackendHandle {
    /// Wraps a freshly constructed backend.
    pub fn new(backend: Box<dyn DecisionBackend>) -> Self {
        Self {
            backend,
            lifecycle: BackendLifecycle::new(),
        }
    }

    /// Returns the wrapped backend.
    pub fn backend(&self) -> &dyn DecisionBackend {
        self.backend.as_ref()
    }

    /// Returns the lifecycle state of this instance.
    pub fn state(&self) -> BackendState {
        self.lifecycle.state()
    }

    /// Calls `initialize()` once if the backend has not been initialized yet.
    ///
    /// Returns `true` if the backend is initialized (or active) afterwards.
    pub fn ensure_initialized(&self) -> bool {
        match self.lifecycle.state() {
            BackendState::Initialized | BackendState::Active => true,
            BackendState::Shutdown => false,
            BackendState::Constructed => {
                if self.backend.initialize() {
                    self.lifecycle.mark_initialized();
                    true
                } else {
                    log::warn!(
                        "BackendHandle: '{}' refused to initialize.",
                        self.backend.identify()
                    );
                    false
                }
            }
        }
    }

    /// Marks the backend as the active one, or back to merely initialized.
    pub fn set_active(&self, active: bool) {
        if active {
            self.lifecycle.activate();
        } else {
            self.lifecycle.deactivate();
        }
    }
}

impl Deref for BackendHandle {
    type Target = dyn DecisionBackend;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("identity", &self.backend.identify())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

impl Drop for BackendHandle {
    fn drop(&mut self) {
        match self.lifecycle.shut_down() {
            Some(BackendState::Initialized) | Some(BackendState::Active) => {
                log::debug!("BackendHandle: Shutting down '{}'.", self.backend.identify());
                self.backend.shutdown();
            }
            _ => {}
        }
    }
}
