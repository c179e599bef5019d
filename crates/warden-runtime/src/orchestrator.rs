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

//! The per-frame driver.
//!
//! One frame runs, in order:
//! 1. `on_frame_start` on the active backend
//! 2. the overload fold (overload flag → minimal mode)
//! 3. the jitter estimator update
//! 4. the draw decision (and the scene draw, if one is attached)
//! 5. the periodic statistics probe
//! 6. delivery of queued intercept events
//! 7. `on_frame` then `on_frame_end` on the active backend
//!
//! The whole frame runs against the backend that was active when it started.

use crate::context::WardenContext;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use warden_control::{DrawCall, DrawOutcome};
use warden_core::backend::InterceptEvent;
use warden_core::renderer::{GraphicsContext, PipelineStatistics};

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// 1-based frame index.
    pub frame: u64,
    /// Whether the router suppressed draws this frame.
    pub suppressed: bool,
    /// Outcome of the attached scene draw, if any.
    pub draw: Option<DrawOutcome>,
    /// Statistics from the probe, on probe frames that succeeded.
    pub statistics: Option<PipelineStatistics>,
    /// Intercept events delivered to the backend.
    pub intercepts: usize,
    /// Minimal mode after the overload fold.
    pub minimal: bool,
}

struct Scene {
    context: Arc<dyn GraphicsContext>,
    call: DrawCall,
}

struct FrameDriver {
    warden: Arc<WardenContext>,
    events: Receiver<InterceptEvent>,
    scene: Option<Scene>,
    frame: AtomicU64,
    // Minimal mode was switched on by the overload fold (and not by someone else).
    minimal_from_overload: AtomicBool,
}

impl FrameDriver {
    fn fold_overload(&self) -> bool {
        let hook = &self.warden.hook;
        let overloaded = self.warden.estimator.is_overloaded();
        if overloaded {
            if !hook.is_minimal() {
                hook.force_minimal(true);
                self.minimal_from_overload.store(true, Ordering::Relaxed);
                log::info!("Orchestrator: Overload detected, minimal mode engaged.");
            }
        } else if self.minimal_from_overload.swap(false, Ordering::Relaxed) {
            hook.force_minimal(false);
            log::info!("Orchestrator: Overload cleared, minimal mode released.");
        }
        hook.is_minimal()
    }

    fn tick(&self) -> FrameReport {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let backend = self.warden.active.snapshot();

        if let Some(backend) = &backend {
            backend.on_frame_start();
        }

        let minimal = self.fold_overload();

        self.warden.estimator.update_cycle();

        let (suppressed, draw) = match &self.scene {
            Some(scene) => {
                let outcome = self
                    .warden
                    .router
                    .attempt_draw(scene.context.as_ref(), scene.call);
                (matches!(outcome, DrawOutcome::Suppressed(_)), Some(outcome))
            }
            None => (self.warden.router.should_suppress_draw(), None),
        };

        let every = self.warden.config.monitor_every_frames;
        let statistics = if every > 0 && frame % every == 0 {
            self.warden.hook.frame_monitor()
        } else {
            None
        };

        let mut intercepts = 0;
        while let Ok(event) = self.events.try_recv() {
            if let Some(backend) = &backend {
                backend.on_intercept_event(&event);
            }
            intercepts += 1;
        }

        if let Some(backend) = &backend {
            backend.on_frame();
            backend.on_frame_end();
        }

        log::trace!(
            "Orchestrator: Frame {} (suppressed: {}, intercepts: {})",
            frame,
            suppressed,
            intercepts
        );

        FrameReport {
            frame,
            suppressed,
            draw,
            statistics,
            intercepts,
            minimal,
        }
    }
}

/// Drives frames, either one at a time with [`tick`](Self::tick) or on a
/// background thread with [`start`](Self::start).
pub struct Orchestrator {
    driver: Arc<FrameDriver>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Orchestrator {
    /// Creates an orchestrator over `warden`.
    pub fn new(warden: Arc<WardenContext>) -> Self {
        let events = warden.intercept_receiver();
        Self {
            driver: Arc::new(FrameDriver {
                warden,
                events,
                scene: None,
                frame: AtomicU64::new(0),
                minimal_from_overload: AtomicBool::new(false),
            }),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Submits `call` through the router on `context` every frame.
    ///
    /// Must be called before [`start`](Self::start).
    pub fn with_scene(mut self, context: Arc<dyn GraphicsContext>, call: DrawCall) -> Self {
        match Arc::get_mut(&mut self.driver) {
            Some(driver) => driver.scene = Some(Scene { context, call }),
            None => log::warn!("Orchestrator: Scene ignored, frames are already running."),
        }
        self
    }

    /// Runs one frame on the calling thread.
    pub fn tick(&self) -> FrameReport {
        self.driver.tick()
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.driver.frame.load(Ordering::Relaxed)
    }

    /// Returns `true` while the background thread runs.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the frame thread. It stops on its own after `frame_limit`
    /// frames, if given.
    pub fn start(&mut self, frame_limit: Option<u64>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let running = Arc::clone(&self.running);
        let driver = Arc::clone(&self.driver);
        let tick_duration = driver.warden.config.tick_interval();

        let handle = thread::spawn(move || {
            log::info!("Orchestrator thread started.");
            let mut ran = 0u64;
            while running.load(Ordering::Relaxed) {
                let start_time = Instant::now();
                driver.tick();
                ran += 1;
                if frame_limit.is_some_and(|limit| ran >= limit) {
                    running.store(false, Ordering::SeqCst);
                    break;
                }

                let elapsed = start_time.elapsed();
                if elapsed < tick_duration {
                    thread::sleep(tick_duration - elapsed);
                }
            }
            log::info!("Orchestrator thread stopped after {} frames.", ran);
        });

        self.handle = Some(handle);
    }

    /// Waits for the frame thread to finish on its own.
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                self.running.store(false, Ordering::SeqCst);
                log::error!("Orchestrator: Frame thread panicked.");
            }
        }
    }

    /// Stops the frame thread and waits for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.wait();
    }

    /// Sleep target between frames.
    pub fn tick_interval(&self) -> Duration {
        self.driver.warden.config.tick_interval()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WardenConfig;
    use warden_infra::HeadlessConfig;

    fn quiet_config() -> WardenConfig {
        WardenConfig {
            startup_backend: None,
            monitor_every_frames: 0,
            tick_interval_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn overload_fold_engages_and_releases_minimal_mode() {
        let warden = crate::assemble_headless(quiet_config(), HeadlessConfig::default()).unwrap();
        let orchestrator = Orchestrator::new(Arc::clone(&warden.context));

        assert!(!orchestrator.tick().minimal);
        warden.context.estimator.set_overloaded(true);
        assert!(orchestrator.tick().minimal);
        assert!(warden.context.hook.is_minimal());
        warden.context.estimator.set_overloaded(false);
        assert!(!orchestrator.tick().minimal);
    }

    #[test]
    fn fold_leaves_externally_forced_minimal_mode_alone() {
        let warden = crate::assemble_headless(quiet_config(), HeadlessConfig::default()).unwrap();
        let orchestrator = Orchestrator::new(Arc::clone(&warden.context));

        warden.context.hook.force_minimal(true);
        assert!(orchestrator.tick().minimal);
        assert!(orchestrator.tick().minimal);
    }

    #[test]
    fn frame_limit_stops_thread() {
        let warden = crate::assemble_headless(quiet_config(), HeadlessConfig::default()).unwrap();
        let mut orchestrator = Orchestrator::new(Arc::clone(&warden.context));
        orchestrator.start(Some(5));
        orchestrator.wait();
        assert_eq!(orchestrator.frames(), 5);
        assert!(!orchestrator.is_running());
    }
}
