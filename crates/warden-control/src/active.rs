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

//! The shared "active decision backend" slot.

use std::sync::{Arc, PoisonError, RwLock};
use warden_core::backend::BackendHandle;

/// Holds at most one active decision backend.
///
/// Swapping is a single pointer replacement under the write lock. Readers call
/// [`snapshot`](Self::snapshot), which clones the `Arc` and releases the lock
/// before the backend is invoked: an in-flight call always completes against
/// the instance it started with, even if a swap happens meanwhile.
#[derive(Debug, Default)]
pub struct ActiveBackend {
    slot: RwLock<Option<Arc<BackendHandle>>>,
}

impl ActiveBackend {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the active backend, if any.
    pub fn snapshot(&self) -> Option<Arc<BackendHandle>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` if a backend is active.
    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Installs `next` as the active backend and returns the previous one.
    pub fn replace(&self, next: Option<Arc<BackendHandle>>) -> Option<Arc<BackendHandle>> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, next);
        if let Some(prev) = &previous {
            let same = slot.as_ref().is_some_and(|n| Arc::ptr_eq(prev, n));
            if !same {
                prev.set_active(false);
            }
        }
        if let Some(current) = slot.as_ref() {
            current.set_active(true);
        }
        previous
    }

    /// Empties the slot and returns what it held.
    pub fn clear(&self) -> Option<Arc<BackendHandle>> {
        self.replace(None)
    }

    /// Empties the slot only if it currently holds `handle`.
    ///
    /// Returns `true` if the slot was cleared.
    pub fn clear_if(&self, handle: &Arc<BackendHandle>) -> bool {
        let taken = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|h| Arc::ptr_eq(h, handle)) {
                slot.take()
            } else {
                None
            }
        };
        // Dropped after the lock is released: this may be the last reference.
        match taken {
            Some(prev) => {
                prev.set_active(false);
                true
            }
            None => false,
        }
    }

    /// Forwards an informational line to the active backend, if any.
    pub fn log(&self, msg: &str) {
        if let Some(backend) = self.snapshot() {
            backend.log(msg);
        }
    }

    /// Forwards an error line to the active backend, if any.
    pub fn log_error(&self, msg: &str) {
        if let Some(backend) = self.snapshot() {
            backend.log_error(msg);
        }
    }
}
