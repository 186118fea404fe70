//! Interface to the control endpoint hardware
//!
//! In order to use `usbdc` on a given device, there must be a
//! [`link::ControlLink`](ControlLink) implementation, backed by the external
//! USB engine that handles enumeration and the standard request machinery.
//!
//! The engine is expected to have validated that a request is addressed to
//! this device and to have queued the associated data stage before the
//! control plane ever sees the header.

/// Capacity of the shared control endpoint buffer.
///
/// Transfers longer than this are moved in bounded chunks by the
/// dispatcher; no single chunk ever exceeds this size.
pub const BUF_CAPACITY: usize = 64;

pub trait ControlLink {
    /// Return a copy of the raw 8-byte header of the most recently latched
    /// setup transaction.
    ///
    /// Only called while the setup gate is held, so the engine must keep
    /// the header stable until the gate is released.
    fn setup_data(&mut self) -> [u8; 8];

    /// Block until the control buffer is free of any prior transmission.
    ///
    /// This is the only blocking point in the control plane. It is bounded
    /// by hardware transfer time, not by host behavior; implementations on
    /// targets with a scheduler should wrap it in a timeout rather than
    /// spin forever.
    fn wait_idle(&mut self);

    /// Access the control buffer.
    ///
    /// The returned slice is exactly [`BUF_CAPACITY`] bytes long. The buffer
    /// is shared between IN and OUT transfers: only one direction is ever in
    /// flight, so whoever holds the setup gate owns it.
    fn buffer(&mut self) -> &mut [u8];

    /// Hand the first `len` bytes of the buffer to the engine for
    /// transmission to the host.
    fn submit(&mut self, len: usize);

    /// Arm the buffer to receive the next data stage chunk from the host.
    ///
    /// The data is available in [`buffer`](ControlLink::buffer) once
    /// [`wait_idle`](ControlLink::wait_idle) returns.
    fn receive(&mut self);

    /// Complete the transaction with an empty status stage.
    fn ack(&mut self);

    /// Signal a protocol error to the host, terminating the transaction.
    fn stall(&mut self);
}
