use std::sync::{Mutex, PoisonError};

/// Absolute screen rectangle of the window the pointer is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ViewportRect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }
}

/// Something the host can point the bridge at. Queried once per assignment.
pub trait TargetWindow {
    fn screen_rect(&self) -> Option<ViewportRect>;
}

/// Hosts that already know their geometry can hand over the rectangle.
impl TargetWindow for ViewportRect {
    fn screen_rect(&self) -> Option<ViewportRect> {
        Some(*self)
    }
}

/// A native top-level window, identified by its raw `HWND` value.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    hwnd: isize,
}

#[cfg(windows)]
impl NativeWindow {
    pub fn from_raw(hwnd: isize) -> Self {
        Self { hwnd }
    }
}

#[cfg(windows)]
impl TargetWindow for NativeWindow {
    fn screen_rect(&self) -> Option<ViewportRect> {
        use windows::Win32::Foundation::{HWND, RECT};
        use windows::Win32::UI::WindowsAndMessaging::GetWindowRect;

        let hwnd = HWND(self.hwnd as *mut core::ffi::c_void);
        if hwnd.is_invalid() {
            return None;
        }
        let mut rect = RECT::default();
        if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
            tracing::warn!(hwnd = self.hwnd, "failed to query target window rect");
            return None;
        }
        Some(ViewportRect {
            left: rect.left,
            top: rect.top,
            width: rect.right - rect.left,
            height: rect.bottom - rect.top,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Cached {
    rect: Option<ViewportRect>,
    generation: u64,
}

/// Snapshot handed to the control loop each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportSnapshot {
    pub rect: Option<ViewportRect>,
    /// Bumped on every `assign`/`clear`.
    pub generation: u64,
}

/// Cached rectangle of the current target. Not repolled: it lags a window
/// move until the host assigns the target again.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    cached: Mutex<Cached>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query `target` once and cache the result. A target that cannot report
    /// its rectangle leaves the tracker unset.
    pub fn assign(&self, target: &dyn TargetWindow) -> Option<ViewportRect> {
        // Query outside the lock; it may call into the OS.
        let rect = target.screen_rect();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached.rect = rect;
        cached.generation += 1;
        match rect {
            Some(rect) => tracing::info!(?rect, "pointer target assigned"),
            None => tracing::warn!("pointer target has no screen rect; mapping to full screen"),
        }
        rect
    }

    pub fn clear(&self) {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached.rect = None;
        cached.generation += 1;
        tracing::info!("pointer target cleared");
    }

    pub fn rect(&self) -> Option<ViewportRect> {
        self.snapshot().rect
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        let cached = *self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        ViewportSnapshot {
            rect: cached.rect,
            generation: cached.generation,
        }
    }
}
