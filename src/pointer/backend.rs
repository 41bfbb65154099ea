use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Synthetic input for the single logical pointer button and the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Absolute move in device space, `0..=ABSOLUTE_MAX` on both axes.
    MoveAbsolute { x: i32, y: i32 },
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Emission capability the control loop drives. The loop logic is identical
/// whichever implementation sits behind it.
pub trait PointerBackend: Send {
    fn name(&self) -> &'static str;

    /// Primary screen extent, or `None` while it cannot be queried.
    fn screen_size(&self) -> Option<ScreenSize>;

    /// Emit one tick's events as a single batch.
    fn emit(&mut self, events: &[PointerEvent]) -> anyhow::Result<()>;
}

/// Builds a fresh backend each time the control loop starts.
pub trait PointerBackendFactory: Send + Sync {
    fn create(&self) -> Box<dyn PointerBackend>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OS synthetic input where available, otherwise no-op.
    #[default]
    Native,
    Noop,
}

/// Runs the whole pipeline and drops the events.
#[derive(Debug, Clone, Copy)]
pub struct NullPointerBackend {
    screen: ScreenSize,
}

impl NullPointerBackend {
    pub fn new(screen: ScreenSize) -> Self {
        Self { screen }
    }
}

impl PointerBackend for NullPointerBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        Some(self.screen)
    }

    fn emit(&mut self, _events: &[PointerEvent]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Captures emitted events. Clones share the same log, so a test can keep one
/// handle while the control loop owns another.
#[derive(Debug, Clone)]
pub struct RecordingPointerBackend {
    events: Arc<Mutex<Vec<PointerEvent>>>,
    screen: Arc<Mutex<Option<ScreenSize>>>,
    fail_emits: Arc<Mutex<u32>>,
}

impl RecordingPointerBackend {
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            screen: Arc::new(Mutex::new(Some(screen))),
            fail_emits: Arc::new(Mutex::new(0)),
        }
    }

    pub fn events(&self) -> Vec<PointerEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn press_count(&self) -> usize {
        self.count(|e| matches!(e, PointerEvent::Press))
    }

    pub fn release_count(&self) -> usize {
        self.count(|e| matches!(e, PointerEvent::Release))
    }

    pub fn move_count(&self) -> usize {
        self.count(|e| matches!(e, PointerEvent::MoveAbsolute { .. }))
    }

    pub fn last_move(&self) -> Option<(i32, i32)> {
        self.events().iter().rev().find_map(|e| match *e {
            PointerEvent::MoveAbsolute { x, y } => Some((x, y)),
            _ => None,
        })
    }

    /// Simulate the screen metrics going away (`None`) or coming back.
    pub fn set_screen(&self, screen: Option<ScreenSize>) {
        *self.screen.lock().unwrap_or_else(PoisonError::into_inner) = screen;
    }

    /// Make the next `n` emits fail without recording anything.
    pub fn fail_next_emits(&self, n: u32) {
        *self.fail_emits.lock().unwrap_or_else(PoisonError::into_inner) = n;
    }

    fn count(&self, pred: impl Fn(&PointerEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|e| pred(e)).count())
            .unwrap_or(0)
    }
}

impl PointerBackend for RecordingPointerBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        *self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&mut self, events: &[PointerEvent]) -> anyhow::Result<()> {
        {
            let mut remaining = self.fail_emits.lock().unwrap_or_else(PoisonError::into_inner);
            if *remaining > 0 {
                *remaining -= 1;
                anyhow::bail!("simulated emission failure");
            }
        }
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("recording backend lock poisoned"))?
            .extend_from_slice(events);
        Ok(())
    }
}

impl PointerBackendFactory for RecordingPointerBackend {
    fn create(&self) -> Box<dyn PointerBackend> {
        Box::new(self.clone())
    }
}

/// Factory selected from settings.
#[derive(Debug, Clone, Copy)]
pub struct DefaultBackendFactory {
    kind: BackendKind,
    fallback_screen: ScreenSize,
}

impl DefaultBackendFactory {
    pub fn new(kind: BackendKind, fallback_screen: ScreenSize) -> Self {
        Self {
            kind,
            fallback_screen,
        }
    }
}

impl PointerBackendFactory for DefaultBackendFactory {
    fn create(&self) -> Box<dyn PointerBackend> {
        match self.kind {
            BackendKind::Noop => Box::new(NullPointerBackend::new(self.fallback_screen)),
            BackendKind::Native => native_backend(self.fallback_screen),
        }
    }
}

#[cfg(windows)]
fn native_backend(_fallback_screen: ScreenSize) -> Box<dyn PointerBackend> {
    Box::new(SendInputBackend)
}

#[cfg(not(windows))]
fn native_backend(fallback_screen: ScreenSize) -> Box<dyn PointerBackend> {
    tracing::info!("no synthetic input facility on this platform; pointer events are dropped");
    Box::new(NullPointerBackend::new(fallback_screen))
}

/// Win32 `SendInput` with absolute mouse coordinates.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SendInputBackend;

#[cfg(windows)]
impl PointerBackend for SendInputBackend {
    fn name(&self) -> &'static str {
        "send_input"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

        let screen = unsafe {
            ScreenSize::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN))
        };
        screen.is_valid().then_some(screen)
    }

    fn emit(&mut self, events: &[PointerEvent]) -> anyhow::Result<()> {
        use windows::Win32::UI::Input::KeyboardAndMouse::{
            SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
            MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEINPUT, MOUSE_EVENT_FLAGS,
        };

        if events.is_empty() {
            return Ok(());
        }

        let mouse = |dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS| INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };

        let mut pos = (0, 0);
        let inputs: Vec<INPUT> = events
            .iter()
            .map(|event| match *event {
                PointerEvent::MoveAbsolute { x, y } => {
                    pos = (x, y);
                    mouse(x, y, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)
                }
                PointerEvent::Press => mouse(pos.0, pos.1, MOUSEEVENTF_LEFTDOWN),
                PointerEvent::Release => mouse(pos.0, pos.1, MOUSEEVENTF_LEFTUP),
            })
            .collect();

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            anyhow::bail!("SendInput accepted {sent} of {} events", inputs.len());
        }
        Ok(())
    }
}
