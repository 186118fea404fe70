//! Decoding and execution of vendor control requests
//!
//! A latched header is decoded into one of the [`Op`] variants and executed
//! synchronously, start to finish, from the main loop. The match rules are
//! disjoint over (request class, selector, declared length), so at most one
//! operation can claim a given header; anything unclaimed is stalled.
//!
//! The setup gate is released as soon as decoding is done, before any data
//! stage work: the next header can then be latched while the current body
//! is still streaming through the control buffer.

use crate::link::ControlLink;
use crate::periph::{AnalogIo, Eeprom, Fpga, Indicators};
use crate::status::Status;
use crate::types::{self, parse, ChipAddr, PortMask, SetupPacket};
use crate::xfer::{stream_from_host, stream_to_host};
use crate::Device;
use defmt::{debug, trace, Format};
use fugit::MillisDurationU32;
use usb_device::UsbDirection;

/// Per-page completion poll bound for EEPROM writes.
const EEPROM_WRITE_TIMEOUT_MS: u32 = 166;

/// A decoded control request.
#[derive(Clone, Copy, Format)]
pub(crate) enum Op {
    /// Chunked read or write of an EEPROM chip. An unmapped chip index
    /// decodes to `chip: None` and stalls during execution, after the gate
    /// is released.
    Eeprom { read: bool, chip: Option<ChipAddr>, addr: u16, len: u16 },
    /// Chunked read or write of an FPGA design register.
    Register { read: bool, addr: u8, len: u16 },
    /// Snapshot of the status latch; clears the error bit afterwards.
    ReadStatus,
    /// One admitted piece of the bitstream (or, with `len == 0`, the
    /// request to finalize configuration).
    Bitstream { index: u16, len: u16 },
    /// Get or set the I/O voltage for a port mask.
    IoVoltage { get: bool, mask: PortMask },
    /// Measure the current voltage on a port mask.
    SenseVoltage { mask: PortMask },
    /// Get or set the low/high alert thresholds for a port mask.
    AlertVoltage { get: bool, mask: PortMask },
    /// Read and clear the alert port mask; clears the alert bit afterwards.
    PollAlert,
}

/// Match a header against the operation table.
///
/// `bitstream_idx` is the index of the last accepted bitstream piece:
/// admission of the next piece happens here, so an out-of-order index never
/// matches and falls through to the stall without touching any state.
pub(crate) fn decode(req: &SetupPacket, bitstream_idx: u16) -> Option<Op> {
    if !req.is_vendor_to_device() {
        return None;
    }
    let read = req.direction() == UsbDirection::In;
    match (req.request, read, req.length) {
        (types::REQ_LEGACY_EEPROM, _, len) => Some(Op::Eeprom {
            read,
            chip: Some(ChipAddr::SYSTEM),
            addr: req.value,
            len,
        }),
        (types::REQ_EEPROM, _, len) => Some(Op::Eeprom {
            read,
            chip: ChipAddr::from_index(req.index),
            addr: req.value,
            len,
        }),
        (types::REQ_REGISTER, _, len) => Some(Op::Register { read, addr: req.value as u8, len }),
        (types::REQ_STATUS, true, 1) => Some(Op::ReadStatus),
        (types::REQ_FPGA_CFG, false, len)
            if req.index == 0 || req.index == bitstream_idx.wrapping_add(1) =>
        {
            Some(Op::Bitstream { index: req.index, len })
        }
        (types::REQ_IO_VOLT, _, 2) => Some(Op::IoVoltage { get: read, mask: PortMask(req.index as u8) }),
        (types::REQ_SENSE_VOLT, true, 2) => Some(Op::SenseVoltage { mask: PortMask(req.index as u8) }),
        (types::REQ_ALERT_VOLT, _, 4) => Some(Op::AlertVoltage { get: read, mask: PortMask(req.index as u8) }),
        (types::REQ_POLL_ALERT, true, 1) => Some(Op::PollAlert),
        _ => None,
    }
}

/// Handle the header currently held by the setup gate.
pub(crate) fn process_request<L, E, F, A, I>(dev: &mut Device<'_, L, E, F, A, I>)
where
    L: ControlLink,
    E: Eeprom,
    F: Fpga,
    A: AnalogIo,
    I: Indicators,
{
    let raw = dev.link.setup_data();
    let req = match parse::setup_packet(&raw) {
        Ok((_, req)) => req,
        Err(_) => {
            // release regardless, so a malformed header cannot wedge the gate
            dev.link.stall();
            dev.setup.release();
            return;
        }
    };

    let op = decode(&req, dev.bitstream_idx);
    dev.setup.release();

    match op {
        Some(op) => {
            trace!("control request: {}", op);
            execute(dev, op);
        }
        None => {
            debug!("unmatched control request {=u8:#x}, stalling", req.request);
            dev.link.stall();
        }
    }
}

fn execute<L, E, F, A, I>(dev: &mut Device<'_, L, E, F, A, I>, op: Op)
where
    L: ControlLink,
    E: Eeprom,
    F: Fpga,
    A: AnalogIo,
    I: Indicators,
{
    match op {
        Op::Eeprom { read, chip, addr, len } => {
            let Some(chip) = chip else {
                dev.link.stall();
                return;
            };
            let Device { link, eeprom, .. } = dev;
            let result = if read {
                stream_to_host(link, len, |offset, buf| {
                    eeprom.read(chip, addr.wrapping_add(offset), buf, true)
                })
            } else {
                stream_from_host(link, len, |offset, data| {
                    eeprom.write(
                        chip,
                        addr.wrapping_add(offset),
                        data,
                        true,
                        MillisDurationU32::millis(EEPROM_WRITE_TIMEOUT_MS),
                    )
                })
            };
            if result.is_err() {
                dev.link.stall();
            }
        }

        Op::Register { read, addr, len } => {
            if dev.fpga.select_register(addr).is_err() {
                dev.link.stall();
                return;
            }
            let Device { link, fpga, .. } = dev;
            let result = if read {
                stream_to_host(link, len, |_, buf| fpga.read_register(buf))
            } else {
                stream_from_host(link, len, |_, data| {
                    fpga.write_register(data);
                    Ok(())
                })
            };
            if result.is_err() {
                dev.link.stall();
            }
        }

        Op::ReadStatus => {
            dev.link.wait_idle();
            let snapshot = dev.status.get();
            dev.link.buffer()[0] = snapshot.bits();
            dev.link.submit(1);
            // the read that observed the error also acknowledges it
            dev.clear_status(Status::ERROR);
        }

        Op::Bitstream { index, len } => {
            if len > 0 {
                if index == 0 {
                    debug!("bitstream restart");
                    dev.clear_status(Status::FPGA_READY);
                    dev.fpga.reset();
                }
                let Device { link, fpga, .. } = dev;
                let result = stream_from_host(link, len, |_, data| {
                    fpga.load(data);
                    Ok(())
                });
                // the index is recorded only once the piece is fully loaded
                if result.is_ok() {
                    dev.bitstream_idx = index;
                } else {
                    dev.link.stall();
                }
            } else {
                dev.fpga.start();
                if dev.fpga.is_ready() {
                    debug!("bitstream configured, design running");
                    dev.latch(Status::FPGA_READY);
                } else {
                    debug!("bitstream configuration failed");
                    dev.latch(Status::ERROR);
                }
                dev.link.ack();
            }
        }

        Op::IoVoltage { get, mask } => {
            if get {
                dev.link.wait_idle();
                match dev.analog.get_voltage(mask) {
                    Ok(millivolts) => {
                        dev.link.buffer()[..2].copy_from_slice(&millivolts.to_le_bytes());
                        dev.link.submit(2);
                    }
                    Err(_) => dev.link.stall(),
                }
            } else {
                dev.link.receive();
                dev.link.wait_idle();
                let mut word = [0; 2];
                word.copy_from_slice(&dev.link.buffer()[..2]);
                let millivolts = match parse::millivolts(&word) {
                    Ok((_, millivolts)) => millivolts,
                    Err(_) => {
                        dev.link.stall();
                        return;
                    }
                };
                // the transfer still completes; the failure is only latched
                if dev.analog.set_voltage(mask, millivolts).is_err() {
                    dev.latch(Status::ERROR);
                }
            }
        }

        Op::SenseVoltage { mask } => {
            dev.link.wait_idle();
            match dev.analog.measure_voltage(mask) {
                Ok(millivolts) => {
                    dev.link.buffer()[..2].copy_from_slice(&millivolts.to_le_bytes());
                    dev.link.submit(2);
                }
                Err(_) => dev.link.stall(),
            }
        }

        Op::AlertVoltage { get, mask } => {
            if get {
                dev.link.wait_idle();
                match dev.analog.get_alert(mask) {
                    Ok((low, high)) => {
                        let buf = dev.link.buffer();
                        buf[..2].copy_from_slice(&low.to_le_bytes());
                        buf[2..4].copy_from_slice(&high.to_le_bytes());
                        dev.link.submit(4);
                    }
                    Err(_) => dev.link.stall(),
                }
            } else {
                dev.link.receive();
                dev.link.wait_idle();
                let mut words = [0; 4];
                words.copy_from_slice(&dev.link.buffer()[..4]);
                let (low, high) = match parse::alert_thresholds(&words) {
                    Ok((_, thresholds)) => thresholds,
                    Err(_) => {
                        dev.link.stall();
                        return;
                    }
                };
                if dev.analog.set_alert(mask, low, high).is_err() {
                    dev.latch(Status::ERROR);
                }
            }
        }

        Op::PollAlert => {
            dev.link.wait_idle();
            let mask = dev.analog.poll_alert(true);
            dev.link.buffer()[0] = mask.0;
            dev.link.submit(1);
            dev.clear_status(Status::ALERT);
        }
    }
}
