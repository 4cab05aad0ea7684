//! Button debounce handling.
//!
//! Time-based edge detection so contact bounce on the Display Pack buttons
//! does not turn into several taps. Time is passed in by the caller, which
//! keeps the logic free of a time driver and testable on the host.

/// Changes closer together than this are treated as bounce.
pub const DEBOUNCE_MS: u64 = 50;

/// Debounce state for one active-low button.
#[derive(Debug, Default)]
pub struct Debouncer {
    pressed: bool,
    last_change_ms: Option<u64>,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            pressed: false,
            last_change_ms: None,
        }
    }

    /// Feed the current pin level. Returns true once per press, on the
    /// falling edge.
    pub fn update(
        &mut self,
        is_low: bool,
        now_ms: u64,
    ) -> bool {
        if is_low == self.pressed {
            return false;
        }
        if let Some(last) = self.last_change_ms
            && now_ms.saturating_sub(last) < DEBOUNCE_MS
        {
            return false;
        }

        self.pressed = is_low;
        self.last_change_ms = Some(now_ms);
        is_low
    }

    #[inline]
    pub const fn is_pressed(&self) -> bool { self.pressed }
}
