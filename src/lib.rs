pub mod bridge;
pub mod error;
pub mod gesture;
pub mod ingest;
pub mod lifecycle;
pub mod logging;
pub mod pointer;
pub mod settings;
pub mod viewport;

mod worker;

pub use bridge::{BridgeStatus, GestureBridge};
pub use error::BridgeError;
pub use gesture::{GestureSample, HandGesture, SharedGestureState};
pub use lifecycle::LifecycleState;
pub use settings::BridgeSettings;
pub use viewport::{TargetWindow, ViewportRect, ViewportTracker};
