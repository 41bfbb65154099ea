use crate::error::BridgeError;
use crate::worker::{join_with_timeout, spawn_contained};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Paused,
    /// Terminal for a loop instance; starting again spawns a new one.
    Stopped,
}

pub fn can_transition(from: LifecycleState, to: LifecycleState) -> bool {
    matches!(
        (from, to),
        (LifecycleState::Running, LifecycleState::Paused)
            | (LifecycleState::Paused, LifecycleState::Running)
            | (LifecycleState::Running, LifecycleState::Stopped)
            | (LifecycleState::Paused, LifecycleState::Stopped)
    ) || from == to
}

/// Lifecycle flag shared between the controller and one loop thread, with
/// the condition variable a paused loop parks on.
#[derive(Debug)]
pub struct LoopSignal {
    state: Mutex<LifecycleState>,
    wake: Condvar,
    ticks: AtomicU64,
}

impl LoopSignal {
    fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Running),
            wake: Condvar::new(),
            ticks: AtomicU64::new(0),
        }
    }

    fn stopped() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Stopped),
            wake: Condvar::new(),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock()
    }

    /// Block while paused. Returns `false` once the loop must exit. Stop is
    /// checked before the first wait and again after every wake, so it
    /// always wins over a concurrent resume.
    pub fn wait_until_runnable(&self) -> bool {
        let mut state = self.lock();
        loop {
            match *state {
                LifecycleState::Stopped => return false,
                LifecycleState::Running => return true,
                LifecycleState::Paused => {
                    state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn request_stop(&self) {
        let mut state = self.lock();
        *state = LifecycleState::Stopped;
        self.wake.notify_all();
    }

    fn transition(&self, to: LifecycleState) -> LifecycleState {
        let mut state = self.lock();
        if !can_transition(*state, to) {
            tracing::debug!(from = ?*state, to = ?to, "ignoring lifecycle transition");
            return *state;
        }
        if *state != to {
            *state = to;
            if to == LifecycleState::Running {
                self.wake.notify_all();
            }
            tracing::info!(state = ?to, "pointer loop lifecycle changed");
        }
        *state
    }

    fn toggle(&self) -> LifecycleState {
        let mut state = self.lock();
        let next = match *state {
            LifecycleState::Running => LifecycleState::Paused,
            LifecycleState::Paused => LifecycleState::Running,
            LifecycleState::Stopped => return LifecycleState::Stopped,
        };
        *state = next;
        if next == LifecycleState::Running {
            self.wake.notify_all();
        }
        tracing::info!(state = ?next, "pointer loop lifecycle changed");
        next
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Starts, pauses, resumes and stops one worker thread at a time.
pub struct LifecycleController {
    name: &'static str,
    signal: Arc<LoopSignal>,
    worker: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl LifecycleController {
    pub fn new(name: &'static str, join_timeout: Duration) -> Self {
        Self {
            name,
            signal: Arc::new(LoopSignal::stopped()),
            worker: None,
            join_timeout,
        }
    }

    /// Spawn `body` with a fresh signal in the running state. Returns `false`
    /// if a worker is already alive.
    pub fn launch<F>(&mut self, body: F) -> bool
    where
        F: FnOnce(Arc<LoopSignal>) + Send + 'static,
    {
        if self.worker.is_some() {
            return false;
        }

        let signal = Arc::new(LoopSignal::new());
        let worker_signal = Arc::clone(&signal);
        match spawn_contained(self.name, move || body(worker_signal)) {
            Ok(join) => {
                self.signal = signal;
                self.worker = Some(join);
                true
            }
            Err(err) => {
                tracing::error!(?err, worker = self.name, "failed to spawn worker");
                false
            }
        }
    }

    /// Idempotent. Wakes a paused worker, then waits for it to exit within
    /// the join timeout.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.signal.request_stop();
        match self.worker.take() {
            Some(join) => join_with_timeout(join, self.name, self.join_timeout),
            None => Ok(()),
        }
    }

    pub fn pause(&self) -> LifecycleState {
        self.signal.transition(LifecycleState::Paused)
    }

    pub fn resume(&self) -> LifecycleState {
        self.signal.transition(LifecycleState::Running)
    }

    pub fn toggle(&self) -> LifecycleState {
        self.signal.toggle()
    }

    pub fn state(&self) -> LifecycleState {
        self.signal.state()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn ticks(&self) -> u64 {
        self.signal.ticks()
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(%err, "worker teardown incomplete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn stopped_is_terminal() {
        for to in [LifecycleState::Running, LifecycleState::Paused] {
            assert!(!can_transition(LifecycleState::Stopped, to));
        }
        assert!(can_transition(LifecycleState::Running, LifecycleState::Paused));
        assert!(can_transition(LifecycleState::Paused, LifecycleState::Running));
        assert!(can_transition(LifecycleState::Paused, LifecycleState::Stopped));
    }

    #[test]
    fn controls_before_launch_are_noops() {
        let mut controller = LifecycleController::new("test-idle", Duration::from_secs(1));
        assert_eq!(controller.state(), LifecycleState::Stopped);
        assert_eq!(controller.pause(), LifecycleState::Stopped);
        assert_eq!(controller.resume(), LifecycleState::Stopped);
        assert_eq!(controller.toggle(), LifecycleState::Stopped);
        assert!(controller.stop().is_ok());
    }

    #[test]
    fn toggle_flips_between_running_and_paused() {
        let mut controller = LifecycleController::new("test-toggle", Duration::from_secs(1));
        assert!(controller.launch(|signal| {
            while signal.wait_until_runnable() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }));
        assert!(!controller.launch(|_| {}));
        assert_eq!(controller.toggle(), LifecycleState::Paused);
        assert_eq!(controller.toggle(), LifecycleState::Running);
        controller.stop().unwrap();
        assert_eq!(controller.state(), LifecycleState::Stopped);
        assert!(!controller.is_running());
    }

    #[test]
    fn stop_wakes_a_paused_worker() {
        let (parked_tx, parked_rx) = mpsc::channel();
        let mut controller = LifecycleController::new("test-pause", Duration::from_secs(2));
        controller.launch(move |signal| {
            let _ = parked_tx.send(());
            while signal.wait_until_runnable() {
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        controller.pause();
        parked_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        controller.stop().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
