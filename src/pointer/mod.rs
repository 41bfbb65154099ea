pub mod backend;
pub mod control;
pub mod filter;
pub mod mapping;

pub use backend::{
    BackendKind, DefaultBackendFactory, NullPointerBackend, PointerBackend, PointerBackendFactory,
    PointerEvent, RecordingPointerBackend, ScreenSize,
};
#[cfg(windows)]
pub use backend::SendInputBackend;
pub use control::{ControlConfig, ControlCore, PointerControlLoop, TickOutcome, TickPlan};
