use defmt::bitflags;

bitflags! {
    /// Device status bits, as reported by the status read operation.
    ///
    /// Bit positions are fixed by the host-side client.
    pub struct Status: u8 {
        const ERROR = 1 << 0;
        const FPGA_READY = 1 << 1;
        const ALERT = 1 << 2;
    }
}

/// Sticky status latch.
///
/// Each bit, once raised, stays raised until the one operation defined to
/// clear it does so: a status read clears [`Status::ERROR`], an alert poll
/// clears [`Status::ALERT`], and a bitstream restart clears
/// [`Status::FPGA_READY`].
///
/// The latch is deliberately self-clearing on observation rather than
/// stalling the endpoint: a stall surfaces on the host as a timeout, which
/// is much slower than reading a flag, and clearing on the read that
/// observed it still guarantees every error is reported at least once.
pub struct StatusLatch(Status);

impl StatusLatch {
    pub fn new() -> Self {
        StatusLatch(Status::empty())
    }

    /// Current snapshot of all bits.
    pub fn get(&self) -> Status {
        self.0
    }

    /// Raise `bits`, without touching any others.
    pub fn raise(&mut self, bits: Status) {
        self.0 |= bits;
    }

    /// Whether all of `bits` are currently raised.
    pub fn test(&self, bits: Status) -> bool {
        self.0.contains(bits)
    }

    /// Clear `bits` if any of them are raised. Returns whether the latch
    /// changed, so the caller knows to refresh the indicators.
    pub fn clear_if_set(&mut self, bits: Status) -> bool {
        if self.0.intersects(bits) {
            self.0 &= !bits;
            true
        } else {
            false
        }
    }
}

impl Default for StatusLatch {
    fn default() -> Self {
        Self::new()
    }
}
