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

use std::sync::{Arc, Mutex};
use std::thread;

use warden_control::{DrawCall, DrawOutcome};
use warden_core::backend::{DecisionBackend, InterceptEvent};
use warden_core::renderer::GraphicsDevice;
use warden_core::texture::TextureOverrides;
use warden_infra::HeadlessConfig;
use warden_runtime::{assemble_headless, HeadlessWarden, Orchestrator, WardenConfig};

/// Records the frame callbacks it receives.
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    veto: bool,
}

impl Recorder {
    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl DecisionBackend for Recorder {
    fn initialize(&self) -> bool {
        true
    }
    fn log(&self, _: &str) {}
    fn log_error(&self, _: &str) {}
    fn on_frame(&self) {
        self.push("frame");
    }
    fn is_active(&self) -> bool {
        true
    }
    fn should_suppress_draw(&self, _: f32) -> bool {
        self.veto
    }
    fn identify(&self) -> String {
        "Recorder".into()
    }
    fn status_string(&self) -> String {
        "recording".into()
    }
    fn on_frame_start(&self) {
        self.push("start");
    }
    fn on_frame_end(&self) {
        self.push("end");
    }
    fn on_intercept_event(&self, event: &InterceptEvent) {
        self.push(format!("intercept {}", event.detail));
    }
}

fn recorded(veto: bool) -> (HeadlessWarden, Arc<Mutex<Vec<String>>>) {
    let config = WardenConfig {
        startup_backend: None,
        monitor_every_frames: 0,
        tick_interval_ms: 1,
        ..Default::default()
    };
    let warden = assemble_headless(config, HeadlessConfig::default()).unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    warden.context.registry.register(
        "recorder",
        Box::new(Recorder {
            calls: calls.clone(),
            veto,
        }),
    );
    warden.context.registry.activate("recorder").unwrap();
    (warden, calls)
}

#[test]
fn callbacks_run_in_frame_order() {
    let (warden, calls) = recorded(false);
    let orchestrator = Orchestrator::new(warden.context.clone());

    let report = orchestrator.tick();
    assert_eq!(report.frame, 1);
    assert_eq!(*calls.lock().unwrap(), ["start", "frame", "end"]);
}

#[test]
fn intercepts_are_delivered_before_on_frame() {
    let (warden, calls) = recorded(false);
    let orchestrator = Orchestrator::new(warden.context.clone());

    assert!(warden.context.overrides.lookup("shader_fog_gradient.dds").is_some());
    assert!(warden.context.overrides.lookup("player_diffuse.dds").is_none());

    let report = orchestrator.tick();
    assert_eq!(report.intercepts, 1);
    assert_eq!(
        *calls.lock().unwrap(),
        ["start", "intercept shader_fog_gradient.dds", "frame", "end"]
    );

    assert_eq!(orchestrator.tick().intercepts, 0);
}

#[test]
fn vetoed_scene_draws_are_suppressed() {
    let (warden, _calls) = recorded(true);
    let buffer = warden.device.create_vertex_buffer(&[0u8; 36], 12).unwrap();
    let call = DrawCall {
        vertex_count: 3,
        ..DrawCall::bind(buffer, 12, 0)
    };
    let orchestrator =
        Orchestrator::new(warden.context.clone()).with_scene(warden.graphics.clone(), call);

    let report = orchestrator.tick();
    assert!(report.suppressed);
    assert!(matches!(report.draw, Some(DrawOutcome::Suppressed(_))));
    assert_eq!(warden.graphics.draw_calls(), 0);

    warden.context.router.enable_routing(false);
    let report = orchestrator.tick();
    assert_eq!(report.draw, Some(DrawOutcome::Submitted));
    assert_eq!(warden.graphics.draw_calls(), 1);
}

#[test]
fn probe_runs_on_schedule() {
    let config = WardenConfig {
        startup_backend: None,
        monitor_every_frames: 2,
        ..Default::default()
    };
    let warden = assemble_headless(config, HeadlessConfig::default()).unwrap();
    let orchestrator = Orchestrator::new(warden.context.clone());

    assert!(orchestrator.tick().statistics.is_none());
    let stats = orchestrator.tick().statistics.expect("probe frame");
    assert_eq!(stats.vs_invocations, 3);
    assert_eq!(warden.device.live_queries(), 0);
}

#[test]
fn frames_continue_while_backends_swap() {
    let (warden, calls) = recorded(false);
    let mut orchestrator = Orchestrator::new(warden.context.clone());
    orchestrator.start(None);
    while orchestrator.frames() < 3 {
        thread::yield_now();
    }

    for _ in 0..20 {
        warden
            .context
            .registry
            .register_ai("journal", "builtin:journal")
            .unwrap();
        warden.context.registry.activate("journal").unwrap();
        warden.context.registry.activate("recorder").unwrap();
    }
    orchestrator.stop();

    assert!(!orchestrator.is_running());
    assert!(orchestrator.frames() > 0);
    let calls = calls.lock().unwrap();
    let starts = calls.iter().filter(|c| *c == "start").count();
    let ends = calls.iter().filter(|c| *c == "end").count();
    assert_eq!(starts, ends);
}

/// Panics on its first frame.
struct Faulty;

impl DecisionBackend for Faulty {
    fn initialize(&self) -> bool {
        true
    }
    fn log(&self, _: &str) {}
    fn log_error(&self, _: &str) {}
    fn on_frame(&self) {
        panic!("faulty backend");
    }
    fn is_active(&self) -> bool {
        true
    }
    fn should_suppress_draw(&self, _: f32) -> bool {
        false
    }
    fn identify(&self) -> String {
        "Faulty".into()
    }
    fn status_string(&self) -> String {
        "faulty".into()
    }
}

#[test]
fn panicked_frame_thread_is_reported_stopped() {
    let config = WardenConfig {
        startup_backend: None,
        monitor_every_frames: 0,
        tick_interval_ms: 1,
        ..Default::default()
    };
    let warden = assemble_headless(config, HeadlessConfig::default()).unwrap();
    warden.context.registry.register("faulty", Box::new(Faulty));
    warden.context.registry.activate("faulty").unwrap();

    let mut orchestrator = Orchestrator::new(warden.context.clone());
    orchestrator.start(None);
    orchestrator.wait();

    assert!(!orchestrator.is_running());
    assert_eq!(orchestrator.frames(), 1);
}
