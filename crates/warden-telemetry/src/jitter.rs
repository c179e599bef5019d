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

//! Sliding-window frame-jitter estimation.
//!
//! The estimator timestamps every frame, keeps the last [`JITTER_WINDOW`]
//! frame deltas and publishes their population standard deviation as the
//! *entropy rate*: a cheap proxy for how unstable frame pacing currently is.

use crate::ring_buffer::RingBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use warden_core::clock::{FrameClock, SystemClock};

/// Number of frame deltas kept in the window (two seconds at 60 Hz).
pub const JITTER_WINDOW: usize = 120;

#[derive(Debug)]
struct JitterState {
    window: RingBuffer<f32, JITTER_WINDOW>,
    last_time: Duration,
    entropy_rate: f32,
    initialized: bool,
    enabled: bool,
}

impl JitterState {
    fn reset(&mut self, now: Duration) {
        self.window.clear();
        self.last_time = now;
        self.entropy_rate = 0.0;
        self.initialized = true;
    }

    fn push(&mut self, delta: f32) {
        self.window.push(delta.max(0.0));
        self.entropy_rate = self.window.std_dev();
    }
}

/// Thread-safe frame-jitter estimator.
///
/// Starts disabled; call [`set_enabled(true)`](Self::set_enabled) (or
/// [`initialize`](Self::initialize) followed by `set_enabled`) before frames
/// are recorded.
#[derive(Debug)]
pub struct JitterEstimator {
    clock: Arc<dyn FrameClock>,
    state: Mutex<JitterState>,
    overloaded: AtomicBool,
}

impl JitterEstimator {
    /// Creates an estimator timed by `clock`.
    pub fn new(clock: Arc<dyn FrameClock>) -> Self {
        Self {
            clock,
            state: Mutex::new(JitterState {
                window: RingBuffer::new(),
                last_time: Duration::ZERO,
                entropy_rate: 0.0,
                initialized: false,
                enabled: false,
            }),
            overloaded: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JitterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the window and captures a fresh baseline timestamp.
    ///
    /// Safe to call repeatedly; an initialized estimator is simply reset.
    pub fn initialize(&self) -> bool {
        let now = self.clock.now();
        self.lock().reset(now);
        log::debug!("JitterEstimator: Initialized.");
        true
    }

    /// Enables or disables frame recording.
    ///
    /// Disabling drops every sample and zeroes the entropy rate. Enabling
    /// initializes the estimator if it is not initialized yet.
    pub fn set_enabled(&self, enable: bool) {
        let now = self.clock.now();
        {
            let mut state = self.lock();
            state.enabled = enable;
            if enable {
                if !state.initialized {
                    state.reset(now);
                }
            } else {
                state.window.clear();
                state.entropy_rate = 0.0;
                state.initialized = false;
            }
        }
        log::info!(
            "JitterEstimator: {}",
            if enable { "Enabled" } else { "Disabled" }
        );
    }

    /// Returns `true` if frames are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Returns `true` once a baseline timestamp has been captured.
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Timestamps the current frame and refreshes the entropy rate.
    ///
    /// Does nothing while disabled or uninitialized.
    pub fn update_cycle(&self) {
        let now = self.clock.now();
        let mut state = self.lock();
        if !state.initialized || !state.enabled {
            return;
        }
        let delta = now.saturating_sub(state.last_time).as_secs_f32();
        state.last_time = now;
        state.push(delta);
        log::trace!(
            "JitterEstimator: EntropyRate = {:.6} over {} samples",
            state.entropy_rate,
            state.window.count()
        );
    }

    /// Records an externally measured frame delta, in seconds.
    ///
    /// Same gating and statistics as [`update_cycle`](Self::update_cycle).
    /// Negative deltas are stored as `0.0`.
    pub fn record_sample(&self, delta_secs: f32) {
        let mut state = self.lock();
        if !state.initialized || !state.enabled {
            return;
        }
        state.push(delta_secs);
    }

    /// Returns the last computed entropy rate (population standard deviation, seconds).
    pub fn current_entropy_rate(&self) -> f32 {
        self.lock().entropy_rate
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.lock().window.count()
    }

    /// A copy of the window, oldest sample first.
    pub fn window(&self) -> Vec<f32> {
        self.lock().window.iter().copied().collect()
    }

    /// Returns the overload signal.
    ///
    /// This flag is raised by an external observer and is deliberately not
    /// derived from the entropy rate.
    pub fn is_overloaded(&self) -> bool {
        self.overloaded.load(Ordering::Acquire)
    }

    /// Raises or clears the overload signal.
    pub fn set_overloaded(&self, overloaded: bool) {
        let previous = self.overloaded.swap(overloaded, Ordering::AcqRel);
        if previous != overloaded {
            log::info!("JitterEstimator: Overload signal set to {}", overloaded);
        }
    }
}

impl Default for JitterEstimator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }
}
