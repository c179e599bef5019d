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
use std::sync::atomic::{AtomicU64, Ordering};
use warden_core::backend::DecisionBackend;

/// The fallback backend: forwards messages to the log and never vetoes a draw.
#[derive(Debug, Default)]
pub struct ConsoleBackend {
    frames: AtomicU64,
}

impl ConsoleBackend {
    /// Creates a console backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames observed while active.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl DecisionBackend for ConsoleBackend {
    fn initialize(&self) -> bool {
        log::info!("[ConsoleBackend] Initialized successfully.");
        true
    }

    fn log(&self, msg: &str) {
        log::info!("[ConsoleBackend] Log: {}", msg);
    }

    fn log_error(&self, msg: &str) {
        log::error!("[ConsoleBackend] Error: {}", msg);
    }

    fn on_frame(&self) {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("[ConsoleBackend] Frame tick {}.", n);
    }

    fn is_active(&self) -> bool {
        true
    }

    fn should_suppress_draw(&self, _entropy: f32) -> bool {
        false
    }

    fn identify(&self) -> String {
        "ConsoleBackend".to_string()
    }

    fn status_string(&self) -> String {
        format!("ConsoleBackend: advisory only, {} frames observed", self.frames())
    }

    fn shutdown(&self) {
        log::info!("[ConsoleBackend] Shut down after {} frames.", self.frames());
    }
}

fn construct() -> Option<Box<dyn DecisionBackend>> {
    Some(Box::new(ConsoleBackend::new()))
}

inventory::submit! {
    BackendFactory::new("console", construct)
}
