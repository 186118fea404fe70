//! Chunked movement of a logical payload through the control buffer
//!
//! The control buffer holds at most [`BUF_CAPACITY`] bytes, so longer
//! payloads alternate between host-facing buffer refill/drain and
//! device-facing driver calls, one bounded chunk at a time.
//!
//! A driver fault aborts the remaining chunks immediately; the caller is
//! expected to stall. Data already handed to the host is not retracted.

use crate::link::{ControlLink, BUF_CAPACITY};
use crate::periph::Fault;

/// Stream `length` bytes to the host, chunk by chunk.
///
/// `fill` is called once per chunk with the payload offset and the chunk's
/// window into the control buffer, after the buffer has drained from the
/// previous chunk.
pub(crate) fn stream_to_host<L: ControlLink>(
    link: &mut L,
    length: u16,
    mut fill: impl FnMut(u16, &mut [u8]) -> Result<(), Fault>,
) -> Result<(), Fault> {
    let mut offset = 0;
    while offset < length {
        let chunk_len = (length - offset).min(BUF_CAPACITY as u16);
        link.wait_idle();
        fill(offset, &mut link.buffer()[..chunk_len as usize])?;
        link.submit(chunk_len as usize);
        offset += chunk_len;
    }
    Ok(())
}

/// Stream `length` bytes from the host, chunk by chunk.
///
/// `drain` is called once per chunk with the payload offset and the
/// received bytes, after the chunk has fully arrived.
pub(crate) fn stream_from_host<L: ControlLink>(
    link: &mut L,
    length: u16,
    mut drain: impl FnMut(u16, &[u8]) -> Result<(), Fault>,
) -> Result<(), Fault> {
    let mut offset = 0;
    while offset < length {
        let chunk_len = (length - offset).min(BUF_CAPACITY as u16);
        link.receive();
        link.wait_idle();
        drain(offset, &link.buffer()[..chunk_len as usize])?;
        offset += chunk_len;
    }
    Ok(())
}
