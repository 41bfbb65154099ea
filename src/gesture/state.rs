use crate::gesture::sample::GestureSample;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Register {
    sample: GestureSample,
    history: Option<String>,
    publishes: u64,
}

/// Latest gesture observation, shared between the ingestion worker (writer)
/// and the pointer control loop (reader).
///
/// Every access copies or replaces the whole value under one short lock, so a
/// reader never sees fields from two different publishes. The lock is never
/// held across I/O or event synthesis.
#[derive(Debug, Default)]
pub struct SharedGestureState {
    inner: Mutex<Register>,
}

impl SharedGestureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current sample. The auxiliary history tag is replaced only
    /// when the publisher supplies one.
    pub fn publish(&self, sample: GestureSample, history: Option<String>) {
        let mut register = self.lock();
        register.sample = sample;
        if history.is_some() {
            register.history = history;
        }
        register.publishes += 1;
    }

    pub fn read(&self) -> GestureSample {
        self.lock().sample
    }

    /// Reserved auxiliary channel (the recognizer's `finger_gesture`). Stored
    /// for callers that want it; the control loop does not consume it.
    pub fn history(&self) -> Option<String> {
        self.lock().history.clone()
    }

    pub fn publish_count(&self) -> u64 {
        self.lock().publishes
    }

    // The register only holds plain values, so a writer that panicked
    // mid-publish cannot leave it half-updated in a way that matters more
    // than a dropped datagram.
    fn lock(&self) -> MutexGuard<'_, Register> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
