//! Retriggerable one-shot for the bus activity indicator
//!
//! Any endpoint interrupt asserts the activity indicator and (re)starts a
//! countdown; when the countdown elapses the indicator goes out. The timer
//! is a pure two-state machine so it can be driven from interrupt context:
//! the caller owns the indicator output and the tick source.
//!
//! ```ignore
//! let mut timer = ActivityTimer::new(16.millis(), 1.millis());
//!
//! // in every endpoint interrupt handler:
//! indicators.set_activity(true);
//! timer.retrigger();
//!
//! // in the tick interrupt handler:
//! if timer.tick() {
//!     indicators.set_activity(false);
//! }
//! ```

use fugit::MillisDurationU32;

pub struct ActivityTimer {
    reload: u32,
    // 0 while idle
    remaining: u32,
}

impl ActivityTimer {
    /// Build a timer that keeps the indicator on for `pulse` after the last
    /// trigger, given a tick source firing every `tick`.
    pub fn new(pulse: MillisDurationU32, tick: MillisDurationU32) -> Self {
        let ticks = pulse.ticks().div_ceil(tick.ticks()).max(1);
        ActivityTimer { reload: ticks, remaining: 0 }
    }

    /// Start, or restart, the countdown. The caller asserts the indicator.
    pub fn retrigger(&mut self) {
        self.remaining = self.reload;
    }

    /// Advance the countdown by one tick.
    ///
    /// Returns `true` exactly when the pulse elapses, i.e. when the caller
    /// should deassert the indicator. Ticks while idle return `false`.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            0 => false,
            1 => {
                self.remaining = 0;
                true
            }
            _ => {
                self.remaining -= 1;
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }
}
