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

//! Per-draw suppression routing.
//!
//! The router combines two votes: the active decision backend's veto and a
//! fixed threshold on the estimator's entropy rate. Either one is enough to
//! suppress a draw; the backend can never force a draw through.

use crate::active::ActiveBackend;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use warden_core::error::{WardenError, WardenResult};
use warden_core::renderer::{GraphicsContext, VertexBufferHandle};
use warden_telemetry::JitterEstimator;

/// Entropy rate (seconds of frame-time standard deviation) above which draws are dropped.
pub const DEFAULT_ENTROPY_THRESHOLD: f32 = 0.010;

/// Routing switch and threshold owned by a [`DrawRouter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionPolicy {
    /// When `false`, no draw is ever suppressed.
    pub enabled: bool,
    /// Entropy rate strictly above which a draw is suppressed.
    pub threshold: f32,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_ENTROPY_THRESHOLD,
        }
    }
}

/// Outcome of a single suppression evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuppressionDecision {
    /// The draw may proceed. `entropy` is `None` when routing is disabled.
    Allow {
        /// The entropy rate that was observed, if any.
        entropy: Option<f32>,
    },
    /// The active backend vetoed the draw.
    SuppressedByBackend {
        /// The entropy rate handed to the backend.
        entropy: f32,
    },
    /// The entropy rate exceeded the router's threshold.
    SuppressedByThreshold {
        /// The entropy rate that was observed.
        entropy: f32,
        /// The threshold it was compared against.
        threshold: f32,
    },
}

impl SuppressionDecision {
    /// Returns `true` if the draw must be skipped.
    pub fn is_suppressed(&self) -> bool {
        !matches!(self, SuppressionDecision::Allow { .. })
    }
}

/// A draw submitted through [`DrawRouter::attempt_draw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Geometry to bind. A null handle is never forwarded.
    pub vertex_buffer: VertexBufferHandle,
    /// Size in bytes of one vertex.
    pub stride: u32,
    /// Byte offset of the first vertex.
    pub offset: u32,
    /// Vertices to draw once bound; `0` only binds the buffer.
    pub vertex_count: u32,
}

impl DrawCall {
    /// A bind-only call for `vertex_buffer`.
    pub fn bind(vertex_buffer: VertexBufferHandle, stride: u32, offset: u32) -> Self {
        Self {
            vertex_buffer,
            stride,
            offset,
            vertex_count: 0,
        }
    }
}

/// What [`DrawRouter::attempt_draw`] did with a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOutcome {
    /// The buffer was bound (and drawn, if requested) on the context.
    Submitted,
    /// The draw was dropped.
    Suppressed(SuppressionDecision),
    /// The draw was allowed but there was nothing to bind.
    Skipped,
}

/// Decides, draw by draw, whether work should reach the graphics context.
#[derive(Debug)]
pub struct DrawRouter {
    policy: Mutex<SuppressionPolicy>,
    estimator: Arc<JitterEstimator>,
    active: Arc<ActiveBackend>,
}

impl DrawRouter {
    /// Creates a router with the default policy (enabled, threshold `0.010`).
    pub fn new(estimator: Arc<JitterEstimator>, active: Arc<ActiveBackend>) -> Self {
        Self {
            policy: Mutex::new(SuppressionPolicy::default()),
            estimator,
            active,
        }
    }

    /// Replaces the initial policy.
    pub fn with_policy(self, policy: SuppressionPolicy) -> Self {
        *self.lock() = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SuppressionPolicy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current policy.
    pub fn policy(&self) -> SuppressionPolicy {
        *self.lock()
    }

    /// Turns routing on or off.
    pub fn enable_routing(&self, enable: bool) {
        self.lock().enabled = enable;
        let msg = format!(
            "DrawRouter: Routing {}",
            if enable { "ENABLED" } else { "DISABLED" }
        );
        log::info!("{}", msg);
        self.active.log(&msg);
    }

    /// Returns `true` if routing is on.
    pub fn is_routing_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Sets the entropy threshold.
    /// ## Errors
    /// * `WardenError::InvalidThreshold` - The value is negative, NaN or infinite.
    pub fn set_entropy_threshold(&self, threshold: f32) -> WardenResult<()> {
        if !threshold.is_finite() || threshold < 0.0 {
            log::warn!("DrawRouter: Rejected entropy threshold {}", threshold);
            return Err(WardenError::InvalidThreshold(threshold));
        }
        self.lock().threshold = threshold;
        let msg = format!("DrawRouter: Set entropy threshold to {:.6}", threshold);
        log::info!("{}", msg);
        self.active.log(&msg);
        Ok(())
    }

    /// The current entropy threshold.
    pub fn entropy_threshold(&self) -> f32 {
        self.lock().threshold
    }

    /// Evaluates the suppression rule for the next draw.
    pub fn decide(&self) -> SuppressionDecision {
        let policy = self.policy();
        if !policy.enabled {
            return SuppressionDecision::Allow { entropy: None };
        }

        let entropy = self.estimator.current_entropy_rate();
        if let Some(backend) = self.active.snapshot() {
            if backend.should_suppress_draw(entropy) {
                return SuppressionDecision::SuppressedByBackend { entropy };
            }
        }

        if entropy > policy.threshold {
            SuppressionDecision::SuppressedByThreshold {
                entropy,
                threshold: policy.threshold,
            }
        } else {
            SuppressionDecision::Allow {
                entropy: Some(entropy),
            }
        }
    }

    /// Returns `true` if the next draw should be skipped.
    pub fn should_suppress_draw(&self) -> bool {
        self.decide().is_suppressed()
    }

    /// Forwards `call` to `context` unless the router suppresses it.
    pub fn attempt_draw(&self, context: &dyn GraphicsContext, call: DrawCall) -> DrawOutcome {
        let decision = self.decide();
        if decision.is_suppressed() {
            log::trace!("DrawRouter: Suppressed draw ({:?})", decision);
            self.active
                .log_error("DrawRouter: Suppressed draw call due to high entropy.");
            return DrawOutcome::Suppressed(decision);
        }

        if call.vertex_buffer.is_null() {
            return DrawOutcome::Skipped;
        }

        context.set_vertex_buffer(call.vertex_buffer, call.stride, call.offset);
        if call.vertex_count > 0 {
            context.draw(call.vertex_count, 0);
        }
        DrawOutcome::Submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use warden_core::backend::{BackendHandle, DecisionBackend};
    use warden_core::clock::ManualClock;
    use warden_core::error::WardenResult;
    use warden_core::renderer::{PipelineStatistics, QueryHandle, ShaderHandle};

    #[derive(Default)]
    struct Voter {
        veto: AtomicBool,
        errors: Arc<AtomicUsize>,
    }

    impl DecisionBackend for Voter {
        fn initialize(&self) -> bool {
            true
        }
        fn log(&self, _: &str) {}
        fn log_error(&self, _: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_frame(&self) {}
        fn is_active(&self) -> bool {
            true
        }
        fn should_suppress_draw(&self, _: f32) -> bool {
            self.veto.load(Ordering::SeqCst)
        }
        fn identify(&self) -> String {
            "Voter".into()
        }
        fn status_string(&self) -> String {
            String::new()
        }
    }

    #[derive(Debug, Default)]
    struct RecordingContext {
        binds: AtomicUsize,
        draws: AtomicUsize,
    }

    impl GraphicsContext for RecordingContext {
        fn bind_pixel_shader(&self, _: ShaderHandle) {}
        fn release_shader(&self, _: ShaderHandle) {}
        fn set_vertex_buffer(&self, _: VertexBufferHandle, _: u32, _: u32) {
            self.binds.fetch_add(1, Ordering::SeqCst);
        }
        fn draw(&self, _: u32, _: u32) {
            self.draws.fetch_add(1, Ordering::SeqCst);
        }
        fn begin_statistics_query(&self, _: QueryHandle) {}
        fn end_statistics_query(&self, _: QueryHandle) {}
        fn poll_query_ready(&self, _: QueryHandle) -> bool {
            true
        }
        fn read_query_result(&self, _: QueryHandle) -> WardenResult<PipelineStatistics> {
            Ok(PipelineStatistics::default())
        }
        fn release_query(&self, _: QueryHandle) {}
    }

    /// An estimator whose entropy rate is exactly `rate` (two samples `rate` apart around a mean).
    fn estimator_at(rate: f32) -> Arc<JitterEstimator> {
        let estimator = Arc::new(JitterEstimator::new(Arc::new(ManualClock::new())));
        estimator.set_enabled(true);
        estimator.record_sample(0.5 - rate);
        estimator.record_sample(0.5 + rate);
        estimator
    }

    fn with_voter(veto: bool) -> (Arc<ActiveBackend>, Arc<AtomicUsize>) {
        let errors = Arc::new(AtomicUsize::new(0));
        let voter = Voter {
            veto: AtomicBool::new(veto),
            errors: Arc::clone(&errors),
        };
        let handle = Arc::new(BackendHandle::new(Box::new(voter)));
        assert!(handle.ensure_initialized());
        let active = Arc::new(ActiveBackend::new());
        active.replace(Some(handle));
        (active, errors)
    }

    #[test]
    fn threshold_rule() {
        let active = Arc::new(ActiveBackend::new());
        let high = DrawRouter::new(estimator_at(0.02), Arc::clone(&active));
        assert!(high.should_suppress_draw());

        let low = DrawRouter::new(estimator_at(0.005), active);
        assert!(!low.should_suppress_draw());
    }

    #[test]
    fn disabled_routing_never_suppresses() {
        let (active, _) = with_voter(true);
        let router = DrawRouter::new(estimator_at(1.0), active);
        router.enable_routing(false);
        assert!(!router.is_routing_enabled());
        assert_eq!(router.decide(), SuppressionDecision::Allow { entropy: None });
    }

    #[test]
    fn backend_veto_wins_over_low_entropy() {
        let (active, _) = with_voter(true);
        let router = DrawRouter::new(estimator_at(0.0), active);
        assert!(matches!(
            router.decide(),
            SuppressionDecision::SuppressedByBackend { .. }
        ));
    }

    #[test]
    fn backend_cannot_force_a_draw_through() {
        let (active, _) = with_voter(false);
        let router = DrawRouter::new(estimator_at(0.02), active);
        assert!(matches!(
            router.decide(),
            SuppressionDecision::SuppressedByThreshold { .. }
        ));
    }

    #[test]
    fn entropy_equal_to_threshold_is_allowed() {
        let estimator = Arc::new(JitterEstimator::default());
        estimator.set_enabled(true);
        estimator.record_sample(0.016);
        let router = DrawRouter::new(estimator, Arc::new(ActiveBackend::new()))
            .with_policy(SuppressionPolicy {
                enabled: true,
                threshold: 0.0,
            });
        assert!(!router.should_suppress_draw());
    }

    #[test]
    fn rejects_invalid_thresholds() {
        let router = DrawRouter::new(estimator_at(0.0), Arc::new(ActiveBackend::new()));
        assert_eq!(
            router.set_entropy_threshold(-0.5),
            Err(WardenError::InvalidThreshold(-0.5))
        );
        assert!(router.set_entropy_threshold(f32::NAN).is_err());
        assert!(router.set_entropy_threshold(f32::INFINITY).is_err());
        assert_eq!(router.entropy_threshold(), DEFAULT_ENTROPY_THRESHOLD);

        router.set_entropy_threshold(0.25).unwrap();
        assert_eq!(router.entropy_threshold(), 0.25);
    }

    #[test]
    fn attempt_draw_suppressed_reports_to_backend() {
        let (active, errors) = with_voter(true);
        let router = DrawRouter::new(estimator_at(0.0), active);
        let context = RecordingContext::default();

        let outcome = router.attempt_draw(&context, DrawCall::bind(VertexBufferHandle(4), 12, 0));
        assert!(matches!(outcome, DrawOutcome::Suppressed(_)));
        assert_eq!(context.binds.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn attempt_draw_forwards_allowed_calls() {
        let router = DrawRouter::new(estimator_at(0.0), Arc::new(ActiveBackend::new()));
        let context = RecordingContext::default();

        let call = DrawCall {
            vertex_buffer: VertexBufferHandle(9),
            stride: 12,
            offset: 0,
            vertex_count: 3,
        };
        assert_eq!(router.attempt_draw(&context, call), DrawOutcome::Submitted);
        assert_eq!(context.binds.load(Ordering::SeqCst), 1);
        assert_eq!(context.draws.load(Ordering::SeqCst), 1);

        let null = DrawCall::bind(VertexBufferHandle::NULL, 12, 0);
        assert_eq!(router.attempt_draw(&context, null), DrawOutcome::Skipped);
        assert_eq!(context.binds.load(Ordering::SeqCst), 1);
    }
}
