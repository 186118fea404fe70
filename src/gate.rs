//! Interrupt-to-main-loop handoff primitives
//!
//! Interrupt handlers never do real work; they only latch that work is
//! owed. The main loop observes and clears the latches through the types
//! below, which are the sole shared state between the two contexts.
//!
//! Both latches coalesce: any number of interrupt firings before servicing
//! collapse into a single pending action. There is no queueing and no
//! counting.

use portable_atomic::{AtomicBool, Ordering};

/// Single-slot admission control for control requests.
///
/// At most one request is logically in flight between the interrupt that
/// sees its header and the main-loop handler that decodes it. A second
/// header arriving while the slot is taken must be rejected with a stall
/// and must not disturb the request in progress.
///
/// ```ignore
/// static SETUP_GATE: SetupGate = SetupGate::new();
///
/// // in the setup interrupt handler:
/// if !SETUP_GATE.admit() {
///     /* stall the control endpoint */
/// }
/// ```
pub struct SetupGate(AtomicBool);

impl SetupGate {
    pub const fn new() -> Self {
        SetupGate(AtomicBool::new(false))
    }

    /// Interrupt side: try to take the slot for a newly arrived header.
    ///
    /// Returns `false` if a request is already pending; the caller must
    /// stall the control endpoint and leave all other state untouched.
    pub fn admit(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Main-loop side: whether a request is waiting to be decoded.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Main-loop side: open the gate for the next header.
    ///
    /// The dispatcher calls this as soon as the current header is decoded,
    /// before any data stage work, so the next request can be latched while
    /// the current body is still streaming.
    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A coalescing "work is owed" latch, set from interrupt context and
/// drained by the main loop.
pub struct PendingFlag(AtomicBool);

impl PendingFlag {
    pub const fn new() -> Self {
        PendingFlag(AtomicBool::new(false))
    }

    /// Interrupt side: mark the condition pending.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Main-loop side: consume the latch.
    ///
    /// Clears before the caller services the condition, so an edge arriving
    /// during servicing is latched for the next loop iteration instead of
    /// being lost.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
