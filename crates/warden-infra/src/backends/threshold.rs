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
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use warden_core::backend::DecisionBackend;

/// A backend that vetoes draws whenever the entropy rate exceeds its own ceiling.
#[derive(Debug)]
pub struct ThresholdBackend {
    ceiling: f32,
    // f32 bits of the last entropy seen.
    last_entropy: AtomicU32,
    vetoes: AtomicU64,
}

impl ThresholdBackend {
    /// Ceiling used by the `builtin:threshold` factory.
    pub const DEFAULT_CEILING: f32 = 0.05;

    /// Creates a backend that vetoes above `ceiling`.
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling,
            last_entropy: AtomicU32::new(0f32.to_bits()),
            vetoes: AtomicU64::new(0),
        }
    }

    /// The veto ceiling.
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// The entropy rate of the last vote.
    pub fn last_entropy(&self) -> f32 {
        f32::from_bits(self.last_entropy.load(Ordering::Relaxed))
    }

    /// Number of vetoes issued.
    pub fn vetoes(&self) -> u64 {
        self.vetoes.load(Ordering::Relaxed)
    }
}

impl Default for ThresholdBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CEILING)
    }
}

impl DecisionBackend for ThresholdBackend {
    fn initialize(&self) -> bool {
        self.ceiling.is_finite() && self.ceiling >= 0.0
    }

    fn log(&self, msg: &str) {
        log::info!("[ThresholdBackend] {}", msg);
    }

    fn log_error(&self, msg: &str) {
        log::warn!("[ThresholdBackend] {}", msg);
    }

    fn on_frame(&self) {}

    fn is_active(&self) -> bool {
        true
    }

    fn should_suppress_draw(&self, entropy: f32) -> bool {
        self.last_entropy.store(entropy.to_bits(), Ordering::Relaxed);
        if entropy > self.ceiling {
            self.vetoes.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    fn identify(&self) -> String {
        "ThresholdBackend".to_string()
    }

    fn status_string(&self) -> String {
        format!(
            "ThresholdBackend: ceiling {:.4}, last entropy {:.6}, {} vetoes",
            self.ceiling,
            self.last_entropy(),
            self.vetoes()
        )
    }

    fn query(&self, input: &str) -> String {
        match input.trim() {
            "status" => self.status_string(),
            "entropy" => format!("{:.6}", self.last_entropy()),
            "ceiling" => format!("{:.6}", self.ceiling),
            other => format!("ThresholdBackend received: {}", other),
        }
    }
}

fn construct() -> Option<Box<dyn DecisionBackend>> {
    Some(Box::new(ThresholdBackend::default()))
}

inventory::submit! {
    BackendFactory::new("threshold", construct)
}
