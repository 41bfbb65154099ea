use crate::error::BridgeError;
use crate::gesture::{GestureSample, SharedGestureState};
use crate::lifecycle::{LifecycleController, LifecycleState, LoopSignal};
use crate::pointer::backend::{PointerBackend, PointerBackendFactory, PointerEvent, ScreenSize};
use crate::pointer::filter::{ButtonDebouncer, ButtonTransition, SmoothingFilter};
use crate::pointer::mapping::{to_absolute, viewport_bounds};
use crate::viewport::{ViewportSnapshot, ViewportTracker};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ControlConfig {
    pub tick_rate_hz: u32,
    pub smoothing_factor: f64,
    pub join_timeout: Duration,
}

impl ControlConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 120,
            smoothing_factor: SmoothingFilter::DEFAULT_ALPHA,
            join_timeout: Duration::from_secs(2),
        }
    }
}

/// Events planned for one tick, plus the button state to commit once they
/// have been delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct TickPlan {
    pub events: Vec<PointerEvent>,
    pub pressed: bool,
    pub position: (i32, i32),
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Metrics were available and the plan is ready to emit.
    Emit(TickPlan),
    /// Screen metrics unavailable; nothing is synthesized this tick.
    Skipped(BridgeError),
}

/// Filter and button state owned by the control loop. One call to
/// [`ControlCore::plan`] is one tick of the pipeline minus the I/O, so it can
/// be driven deterministically.
#[derive(Debug, Clone)]
pub struct ControlCore {
    filter: SmoothingFilter,
    button: ButtonDebouncer,
    viewport_generation: Option<u64>,
}

impl ControlCore {
    pub fn new(smoothing_factor: f64) -> Self {
        Self {
            filter: SmoothingFilter::new(smoothing_factor),
            button: ButtonDebouncer::default(),
            viewport_generation: None,
        }
    }

    pub fn filtered(&self) -> (f64, f64) {
        self.filter.value()
    }

    pub fn is_pressed(&self) -> bool {
        self.button.is_pressed()
    }

    /// Smooth, map and debounce one sample. The button state is left
    /// uncommitted; call [`ControlCore::commit`] after a successful emit.
    pub fn plan(
        &mut self,
        sample: GestureSample,
        viewport: ViewportSnapshot,
        screen: Option<ScreenSize>,
    ) -> TickOutcome {
        if self.viewport_generation != Some(viewport.generation) {
            // New target: jump straight to the raw position.
            self.filter.reset();
            self.viewport_generation = Some(viewport.generation);
        }
        let (fx, fy) = self.filter.update(sample.x, sample.y);

        let Some(screen) = screen.filter(ScreenSize::is_valid) else {
            return TickOutcome::Skipped(BridgeError::TransientEnvironment(
                "screen metrics unavailable",
            ));
        };

        let bounds = viewport_bounds(viewport.rect, screen);
        let (nx, ny) = bounds.clamp(fx, fy);
        let (ax, ay) = to_absolute(nx, ny);

        let pressed = sample.gesture.is_pressed();
        let mut events = Vec::with_capacity(2);
        events.push(PointerEvent::MoveAbsolute { x: ax, y: ay });
        match self.button.transition(pressed) {
            Some(ButtonTransition::Press) => events.push(PointerEvent::Press),
            Some(ButtonTransition::Release) => events.push(PointerEvent::Release),
            None => {}
        }

        TickOutcome::Emit(TickPlan {
            events,
            pressed,
            position: (ax, ay),
        })
    }

    pub fn commit(&mut self, plan: &TickPlan) {
        self.button.commit(plan.pressed);
    }

    /// Run one full tick against `backend`.
    pub fn tick(
        &mut self,
        sample: GestureSample,
        viewport: ViewportSnapshot,
        backend: &mut dyn PointerBackend,
    ) {
        let screen = backend.screen_size();
        match self.plan(sample, viewport, screen) {
            TickOutcome::Emit(plan) => match backend.emit(&plan.events) {
                Ok(()) => self.commit(&plan),
                Err(err) => {
                    tracing::warn!(
                        ?err,
                        backend = backend.name(),
                        "pointer emission failed; retrying next tick"
                    );
                }
            },
            TickOutcome::Skipped(reason) => {
                tracing::debug!(%reason, "skipping pointer tick");
            }
        }
    }

    /// Leave the host's button released when the loop goes away.
    fn release_if_pressed(&mut self, backend: &mut dyn PointerBackend) {
        if !self.button.is_pressed() {
            return;
        }
        match backend.emit(&[PointerEvent::Release]) {
            Ok(()) => self.button.commit(false),
            Err(err) => tracing::warn!(?err, "failed to release pointer button on shutdown"),
        }
    }
}

impl Default for ControlCore {
    fn default() -> Self {
        Self::new(SmoothingFilter::DEFAULT_ALPHA)
    }
}

/// Fixed-rate thread turning the latest gesture into pointer input.
pub struct PointerControlLoop {
    config: ControlConfig,
    gestures: Arc<SharedGestureState>,
    viewport: Arc<ViewportTracker>,
    backend_factory: Arc<dyn PointerBackendFactory>,
    controller: LifecycleController,
}

impl PointerControlLoop {
    pub fn new(
        config: ControlConfig,
        gestures: Arc<SharedGestureState>,
        viewport: Arc<ViewportTracker>,
        backend_factory: Arc<dyn PointerBackendFactory>,
    ) -> Self {
        let controller = LifecycleController::new("pointer-control", config.join_timeout);
        Self {
            config,
            gestures,
            viewport,
            backend_factory,
            controller,
        }
    }

    /// Spawn the loop. Returns `false` if it is already running.
    pub fn start(&mut self) -> bool {
        if self.controller.is_running() {
            return false;
        }
        let config = self.config.clone();
        let gestures = Arc::clone(&self.gestures);
        let viewport = Arc::clone(&self.viewport);
        let backend = self.backend_factory.create();
        let started = self.controller.launch(move |signal| {
            run_loop(config, gestures, viewport, backend, signal)
        });
        if started {
            tracing::info!(
                tick_rate_hz = self.config.tick_rate_hz,
                smoothing = self.config.smoothing_factor,
                "pointer control loop started"
            );
        }
        started
    }

    /// Stop and wait for the thread to exit. Safe to call repeatedly.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.controller.stop()
    }

    pub fn pause(&self) -> LifecycleState {
        self.controller.pause()
    }

    pub fn resume(&self) -> LifecycleState {
        self.controller.resume()
    }

    pub fn toggle(&self) -> LifecycleState {
        self.controller.toggle()
    }

    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Ticks completed by the current loop instance.
    pub fn ticks(&self) -> u64 {
        self.controller.ticks()
    }
}

fn run_loop(
    config: ControlConfig,
    gestures: Arc<SharedGestureState>,
    viewport: Arc<ViewportTracker>,
    mut backend: Box<dyn PointerBackend>,
    signal: Arc<LoopSignal>,
) {
    let period = config.tick_period();
    let mut core = ControlCore::new(config.smoothing_factor);
    let mut next_tick = Instant::now();
    tracing::debug!(backend = backend.name(), ?period, "pointer loop running");

    while signal.wait_until_runnable() {
        let view = viewport.snapshot();
        let sample = gestures.read();
        core.tick(sample, view, backend.as_mut());
        signal.record_tick();

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind (e.g. after a pause); resynchronise.
            next_tick = now;
        }
    }

    core.release_if_pressed(backend.as_mut());
    tracing::debug!(ticks = signal.ticks(), "pointer loop exited");
}
