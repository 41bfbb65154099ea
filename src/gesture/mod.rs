mod sample;
mod state;

pub use sample::{GestureSample, HandGesture};
pub use state::SharedGestureState;
