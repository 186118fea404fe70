//! Device-side control plane for a USB-attached debug adapter.
//!
//! This crate interprets vendor control requests and drives chunked data
//! transfers to an EEPROM, an FPGA configuration port and an analog I/O
//! subsystem, while keeping a small sticky status latch that is reflected
//! on the adapter's indicators.
//!
//! It is deliberately single-threaded: interrupt handlers only latch that
//! work is owed (through [`gate::SetupGate`] and [`gate::PendingFlag`]),
//! and [`Device::poll`], called from the main loop, performs each operation
//! synchronously, start to finish. Once a request is dispatched, nothing
//! preempts it; later events are observed on the next loop iteration. That
//! trade favors deterministic, non-reentrant handling of one request at a
//! time over responsiveness to overlapping events.
//!
//! The hardware is reached through two seams: [`link::ControlLink`] for the
//! control endpoint (owned by the external USB engine) and the driver
//! traits in [`periph`] for everything behind it.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod activity;
pub mod gate;
pub mod link;
pub mod periph;
pub mod status;
pub mod types;

mod dispatch;
mod xfer;

#[cfg(test)]
mod mock;

use defmt::debug;
use gate::{PendingFlag, SetupGate};
use link::ControlLink;
use periph::{AnalogIo, Eeprom, Fpga, Indicators};
use status::{Status, StatusLatch};

/// The control plane of the adapter.
///
/// Owns the control link, the peripheral drivers and all protocol state.
/// The two gate references are the only state shared with interrupt
/// context; everything else is mutated exclusively from [`Device::poll`].
pub struct Device<'a, L, E, F, A, I> {
    pub(crate) link: L,
    pub(crate) eeprom: E,
    pub(crate) fpga: F,
    pub(crate) analog: A,
    pub(crate) indicators: I,
    pub(crate) status: StatusLatch,
    /// Index of the last accepted bitstream piece. Monotonic within one
    /// download; reset only by accepting a piece at index 0.
    pub(crate) bitstream_idx: u16,
    pub(crate) setup: &'a SetupGate,
    alert: &'a PendingFlag,
}

impl<'a, L, E, F, A, I> Device<'a, L, E, F, A, I>
where
    L: ControlLink,
    E: Eeprom,
    F: Fpga,
    A: AnalogIo,
    I: Indicators,
{
    /// Build the control plane and probe the initial FPGA state.
    ///
    /// `setup` and `alert` are the latches raised by the corresponding
    /// interrupt handlers; they normally live in `static`s so both contexts
    /// can reach them.
    pub fn new(
        link: L,
        eeprom: E,
        fpga: F,
        analog: A,
        indicators: I,
        setup: &'a SetupGate,
        alert: &'a PendingFlag,
    ) -> Self {
        let mut dev = Device {
            link,
            eeprom,
            fpga,
            analog,
            indicators,
            status: StatusLatch::new(),
            bitstream_idx: 0,
            setup,
            alert,
        };
        // a design may already be running, e.g. after a warm restart
        if dev.fpga.is_ready() {
            dev.latch(Status::FPGA_READY);
        }
        dev
    }

    /// Run one main loop iteration.
    ///
    /// Services a latched control request, then a latched alert, in that
    /// order. This must be called continuously; each call returns once the
    /// owed work (if any) has run to completion.
    pub fn poll(&mut self) {
        if self.setup.is_pending() {
            dispatch::process_request(self);
        }
        if self.alert.take() {
            self.service_alert();
        }
    }

    /// Snapshot of the status latch.
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// React to a hardware alert edge: record it, find out which ports
    /// tripped, and bring them to a quiescent level.
    ///
    /// The driver's own alert latch is left set so that a subsequent alert
    /// poll request still sees the tripped ports.
    fn service_alert(&mut self) {
        self.latch(Status::ALERT);
        let mask = self.analog.poll_alert(false);
        debug!("voltage alert on ports {}", mask);
        let _ = self.analog.set_voltage(mask, 0);
    }

    pub(crate) fn latch(&mut self, bits: Status) {
        self.status.raise(bits);
        self.refresh_indicators();
    }

    pub(crate) fn clear_status(&mut self, bits: Status) {
        if self.status.clear_if_set(bits) {
            self.refresh_indicators();
        }
    }

    fn refresh_indicators(&mut self) {
        let status = self.status.get();
        self.indicators.set_error(status.intersects(Status::ERROR | Status::ALERT));
        self.indicators.set_ready(status.contains(Status::FPGA_READY));
    }
}
