use crate::error::BridgeError;
use crate::gesture::{GestureSample, SharedGestureState};
use crate::ingest::{GestureIngestionService, IngestConfig, IngestStats};
use crate::lifecycle::LifecycleState;
use crate::pointer::{
    ControlConfig, DefaultBackendFactory, PointerBackendFactory, PointerControlLoop,
};
use crate::settings::BridgeSettings;
use crate::viewport::{TargetWindow, ViewportRect, ViewportTracker};
use std::net::SocketAddr;
use std::sync::Arc;

/// Point-in-time view of the bridge for host status displays.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeStatus {
    pub loop_state: LifecycleState,
    pub ticks: u64,
    pub ingest_addr: Option<SocketAddr>,
    pub ingest: IngestStats,
    pub sample: GestureSample,
    pub viewport: Option<ViewportRect>,
}

/// Everything the host application talks to: lifecycle calls plus target
/// assignment. Owns the shared register and viewport for its whole life; the
/// worker threads only hold clones of those `Arc`s.
pub struct GestureBridge {
    gestures: Arc<SharedGestureState>,
    viewport: Arc<ViewportTracker>,
    ingestion: GestureIngestionService,
    control: PointerControlLoop,
}

impl GestureBridge {
    pub fn new(
        ingest: IngestConfig,
        control: ControlConfig,
        backend_factory: Arc<dyn PointerBackendFactory>,
    ) -> Self {
        let gestures = Arc::new(SharedGestureState::new());
        let viewport = Arc::new(ViewportTracker::new());
        let ingestion = GestureIngestionService::new(ingest, Arc::clone(&gestures));
        let control = PointerControlLoop::new(
            control,
            Arc::clone(&gestures),
            Arc::clone(&viewport),
            backend_factory,
        );
        Self {
            gestures,
            viewport,
            ingestion,
            control,
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Result<Self, BridgeError> {
        let factory = DefaultBackendFactory::new(settings.backend, settings.fallback_screen());
        Ok(Self::new(
            settings.ingest_config()?,
            settings.control_config()?,
            Arc::new(factory),
        ))
    }

    /// Start the pointer loop, then the ingestion endpoint. A bind failure is
    /// returned but leaves the loop running on the register's current
    /// (default idle) values.
    pub fn start(&mut self) -> Result<SocketAddr, BridgeError> {
        self.control.start();
        match self.ingestion.start() {
            Ok(addr) => Ok(addr),
            Err(err) => {
                tracing::error!(%err, "gesture ingestion unavailable; pointer stays on last sample");
                Err(err)
            }
        }
    }

    /// Stop the pointer loop and wait for it, then the ingestion worker. Both
    /// are attempted even if the first fails; the first error is returned.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        let control = self.control.stop();
        let ingestion = self.ingestion.stop();
        if let Err(err) = &control {
            tracing::error!(%err, "pointer loop teardown incomplete");
        }
        if let Err(err) = &ingestion {
            tracing::error!(%err, "gesture ingestion teardown incomplete");
        }
        control.and(ingestion)
    }

    pub fn pause(&self) -> LifecycleState {
        self.control.pause()
    }

    pub fn resume(&self) -> LifecycleState {
        self.control.resume()
    }

    pub fn toggle(&self) -> LifecycleState {
        self.control.toggle()
    }

    pub fn assign_target(&self, target: &dyn TargetWindow) -> Option<ViewportRect> {
        self.viewport.assign(target)
    }

    pub fn clear_target(&self) {
        self.viewport.clear()
    }

    /// The register the ingestion worker publishes into. Hosts with their own
    /// transport may publish directly.
    pub fn gestures(&self) -> &Arc<SharedGestureState> {
        &self.gestures
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            loop_state: self.control.state(),
            ticks: self.control.ticks(),
            ingest_addr: self.ingestion.local_addr(),
            ingest: self.ingestion.stats(),
            sample: self.gestures.read(),
            viewport: self.viewport.rect(),
        }
    }
}

impl Drop for GestureBridge {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
