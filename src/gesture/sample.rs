use std::fmt;

/// Hand pose classification reported by the recognizer.
///
/// The recognizer's label set is small and closed. Labels we do not know
/// map to [`HandGesture::Unknown`] so a newer recognizer never gets its
/// samples rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandGesture {
    #[default]
    Idle,
    Open,
    Close,
    Pointer,
    Ok,
    /// Sent once by the recognizer when it shuts down.
    Exit,
    Unknown,
}

impl HandGesture {
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("idle") {
            HandGesture::Idle
        } else if tag.eq_ignore_ascii_case("open") {
            HandGesture::Open
        } else if tag.eq_ignore_ascii_case("close") || tag.eq_ignore_ascii_case("closed") {
            HandGesture::Close
        } else if tag.eq_ignore_ascii_case("pointer") {
            HandGesture::Pointer
        } else if tag.eq_ignore_ascii_case("ok") {
            HandGesture::Ok
        } else if tag.eq_ignore_ascii_case("exit") {
            HandGesture::Exit
        } else {
            HandGesture::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandGesture::Idle => "idle",
            HandGesture::Open => "open",
            HandGesture::Close => "close",
            HandGesture::Pointer => "pointer",
            HandGesture::Ok => "ok",
            HandGesture::Exit => "exit",
            HandGesture::Unknown => "unknown",
        }
    }

    /// Whether this pose holds the logical pointer button down.
    pub fn is_pressed(self) -> bool {
        self == HandGesture::Close
    }
}

impl fmt::Display for HandGesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation from the recognizer. `x` and `y` are normalized to the
/// unit square of the camera frame; values outside `[0, 1]` are kept as-is
/// and clamped later by the pointer mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub gesture: HandGesture,
    pub x: f64,
    pub y: f64,
}

impl GestureSample {
    pub fn new(gesture: HandGesture, x: f64, y: f64) -> Self {
        Self { gesture, x, y }
    }
}

impl Default for GestureSample {
    fn default() -> Self {
        Self {
            gesture: HandGesture::Idle,
            x: 0.5,
            y: 0.5,
        }
    }
}
