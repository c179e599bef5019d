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

use super::factory::BackendFactory;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use warden_core::backend::{DecisionBackend, InterceptEvent};

#[derive(Debug, Default)]
struct Journal {
    entries: VecDeque<String>,
    last_echo: String,
}

/// A backend that keeps a bounded journal of everything it is told.
///
/// `query("echo")` returns the last message; `query("journal")` returns the
/// retained entries, oldest first. It never vetoes a draw.
#[derive(Debug)]
pub struct JournalBackend {
    capacity: usize,
    journal: Mutex<Journal>,
    frames: AtomicU64,
    intercepts: AtomicU64,
}

impl JournalBackend {
    /// Entries retained by the `builtin:journal` factory.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Creates a journal retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            journal: Mutex::new(Journal::default()),
            frames: AtomicU64::new(0),
            intercepts: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, entry: String) {
        let mut journal = self.lock();
        if journal.entries.len() == self.capacity {
            journal.entries.pop_front();
        }
        journal.entries.push_back(entry.clone());
        journal.last_echo = entry;
    }

    /// The retained entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Intercept events received.
    pub fn intercepts(&self) -> u64 {
        self.intercepts.load(Ordering::Relaxed)
    }
}

impl Default for JournalBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl DecisionBackend for JournalBackend {
    fn initialize(&self) -> bool {
        self.append("Journal opened.".to_string());
        true
    }

    fn log(&self, msg: &str) {
        log::debug!("[JournalBackend] {}", msg);
        self.append(msg.to_string());
    }

    fn log_error(&self, msg: &str) {
        log::debug!("[JournalBackend] ERROR: {}", msg);
        self.append(format!("ERROR: {}", msg));
    }

    fn on_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn is_active(&self) -> bool {
        true
    }

    fn should_suppress_draw(&self, _entropy: f32) -> bool {
        false
    }

    fn identify(&self) -> String {
        "JournalBackend".to_string()
    }

    fn status_string(&self) -> String {
        format!(
            "JournalBackend: {} entries, {} frames, {} intercepts",
            self.lock().entries.len(),
            self.frames.load(Ordering::Relaxed),
            self.intercepts()
        )
    }

    fn on_intercept_event(&self, event: &InterceptEvent) {
        self.intercepts.fetch_add(1, Ordering::Relaxed);
        self.log(&format!("[INTERCEPT] :: {}", event));
    }

    fn shutdown(&self) {
        self.append("Journal closed.".to_string());
    }

    fn query(&self, input: &str) -> String {
        match input.trim() {
            "echo" => self.lock().last_echo.clone(),
            "journal" => self.entries().join("\n"),
            other => format!("JournalBackend received: {}", other),
        }
    }
}

fn construct() -> Option<Box<dyn DecisionBackend>> {
    Some(Box::new(JournalBackend::default()))
}

inventory::submit! {
    BackendFactory::new("journal", construct)
}
