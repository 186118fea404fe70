//! Interfaces for the peripheral drivers
//!
//! The control plane does not talk to hardware directly; it drives four
//! collaborator drivers through the traits below. The drivers own their
//! protocol details (I2C transactions, configuration port timing, DAC/ADC
//! access), the control plane owns sequencing and error policy.
//!
//! All fallible driver calls report failure through [`Fault`], which the
//! dispatcher translates into either a protocol stall or a sticky error
//! latch, depending on the operation.

use crate::types::{ChipAddr, PortMask};
use fugit::MillisDurationU32;

/// A driver-reported failure. Carries no detail: the host-visible outcomes
/// are only "stall" or "error latched", so none is needed.
pub struct Fault;

/// Byte-addressed access to the EEPROM chips.
pub trait Eeprom {
    /// Fill `buf` from the given chip, starting at `addr`.
    ///
    /// `wide_addr` selects two-byte addressing; all chips on this board use it.
    fn read(&mut self, chip: ChipAddr, addr: u16, buf: &mut [u8], wide_addr: bool) -> Result<(), Fault>;

    /// Write `data` to the given chip, starting at `addr`.
    ///
    /// `timeout` bounds the write-completion poll for each page.
    fn write(&mut self, chip: ChipAddr, addr: u16, data: &[u8], wide_addr: bool, timeout: MillisDurationU32) -> Result<(), Fault>;
}

/// FPGA configuration port and register file access.
pub trait Fpga {
    /// Put the FPGA into configuration mode, discarding any running design.
    fn reset(&mut self);

    /// Shift the next piece of the bitstream into the configuration port.
    fn load(&mut self, data: &[u8]);

    /// Finish configuration and attempt to start the design.
    fn start(&mut self);

    /// Whether the FPGA reports a running design.
    fn is_ready(&mut self) -> bool;

    /// Select the register for subsequent [`read_register`](Fpga::read_register) /
    /// [`write_register`](Fpga::write_register) calls. Fails if the design
    /// does not expose the address.
    fn select_register(&mut self, addr: u8) -> Result<(), Fault>;

    /// Read from the selected register into `buf`.
    fn read_register(&mut self, buf: &mut [u8]) -> Result<(), Fault>;

    /// Write `data` to the selected register.
    fn write_register(&mut self, data: &[u8]);
}

/// The analog I/O subsystem: per-port voltage DACs, the sense ADC, and the
/// alert comparator.
pub trait AnalogIo {
    /// Read back the configured output voltage for the masked ports.
    fn get_voltage(&mut self, mask: PortMask) -> Result<u16, Fault>;

    /// Set the output voltage for the masked ports, in millivolts.
    fn set_voltage(&mut self, mask: PortMask, millivolts: u16) -> Result<(), Fault>;

    /// Measure the current voltage on the masked ports.
    fn measure_voltage(&mut self, mask: PortMask) -> Result<u16, Fault>;

    /// Read back the low/high alert thresholds for the masked ports.
    fn get_alert(&mut self, mask: PortMask) -> Result<(u16, u16), Fault>;

    /// Set the low/high alert thresholds for the masked ports, in millivolts.
    fn set_alert(&mut self, mask: PortMask, low: u16, high: u16) -> Result<(), Fault>;

    /// Return the mask of ports with a latched alert condition.
    ///
    /// With `clear` set, the driver's internal latch is cleared as part of
    /// the read; otherwise the latch is left for a later poll.
    fn poll_alert(&mut self, clear: bool) -> PortMask;
}

/// The indicator outputs on the adapter.
pub trait Indicators {
    /// Error/alert indicator.
    fn set_error(&mut self, on: bool);
    /// FPGA-ready indicator.
    fn set_ready(&mut self, on: bool);
    /// Bus activity indicator, driven by [`crate::activity::ActivityTimer`].
    fn set_activity(&mut self, on: bool);
}
