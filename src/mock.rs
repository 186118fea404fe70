//! Recording fakes for the control link and the peripheral drivers.
//!
//! The fakes log every call so tests can assert on ordering (for instance,
//! that every chunk is preceded by a buffer-drain wait) as well as on the
//! final state.

use crate::gate::{PendingFlag, SetupGate};
use crate::link::{ControlLink, BUF_CAPACITY};
use crate::periph::{AnalogIo, Eeprom, Fault, Fpga, Indicators};
use crate::types::{ChipAddr, PortMask};
use crate::Device;
use core::cell::RefCell;
use fugit::MillisDurationU32;
use std::boxed::Box;
use std::rc::Rc;
use std::vec::Vec;

pub const VENDOR_IN: u8 = 0xC0;
pub const VENDOR_OUT: u8 = 0x40;

/// Raw 8-byte setup header, as the engine would latch it.
pub fn setup_bytes(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    let mut raw = [0; 8];
    raw[0] = request_type;
    raw[1] = request;
    raw[2..4].copy_from_slice(&value.to_le_bytes());
    raw[4..6].copy_from_slice(&index.to_le_bytes());
    raw[6..8].copy_from_slice(&length.to_le_bytes());
    raw
}

pub fn vendor_in(request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    setup_bytes(VENDOR_IN, request, value, index, length)
}

pub fn vendor_out(request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    setup_bytes(VENDOR_OUT, request, value, index, length)
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LinkOp {
    Wait,
    Receive,
    Submit(usize),
    Ack,
    Stall,
}

pub struct MockLink {
    pub setup: [u8; 8],
    pub buf: [u8; BUF_CAPACITY],
    pub ops: Vec<LinkOp>,
    /// Copies of every submitted chunk, in order.
    pub sent: Vec<Vec<u8>>,
    /// Flat data stage payload, consumed chunk by chunk on `receive`.
    pub incoming: Vec<u8>,
    pub in_pos: usize,
}

impl Default for MockLink {
    fn default() -> Self {
        MockLink {
            setup: [0; 8],
            buf: [0; BUF_CAPACITY],
            ops: Vec::new(),
            sent: Vec::new(),
            incoming: Vec::new(),
            in_pos: 0,
        }
    }
}

impl MockLink {
    pub fn stalled(&self) -> bool {
        self.ops.contains(&LinkOp::Stall)
    }
}

impl ControlLink for MockLink {
    fn setup_data(&mut self) -> [u8; 8] {
        self.setup
    }

    fn wait_idle(&mut self) {
        self.ops.push(LinkOp::Wait);
    }

    fn buffer(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn submit(&mut self, len: usize) {
        self.ops.push(LinkOp::Submit(len));
        self.sent.push(self.buf[..len].to_vec());
    }

    fn receive(&mut self) {
        self.ops.push(LinkOp::Receive);
        let available = self.incoming.len() - self.in_pos;
        let chunk_len = available.min(BUF_CAPACITY);
        self.buf[..chunk_len].copy_from_slice(&self.incoming[self.in_pos..self.in_pos + chunk_len]);
        self.in_pos += chunk_len;
    }

    fn ack(&mut self) {
        self.ops.push(LinkOp::Ack);
    }

    fn stall(&mut self) {
        self.ops.push(LinkOp::Stall);
    }
}

#[derive(Default)]
pub struct MockEeprom {
    pub reads: Vec<(ChipAddr, u16, usize, bool)>,
    pub writes: Vec<(ChipAddr, u16, Vec<u8>, bool)>,
    /// Byte used to satisfy reads.
    pub fill: u8,
    /// Fail the n-th driver call (0-based), counting reads and writes.
    pub fail_on: Option<usize>,
    pub last_timeout: Option<MillisDurationU32>,
    calls: usize,
}

impl MockEeprom {
    fn failing(&mut self) -> bool {
        let call = self.calls;
        self.calls += 1;
        self.fail_on == Some(call)
    }
}

impl Eeprom for MockEeprom {
    fn read(&mut self, chip: ChipAddr, addr: u16, buf: &mut [u8], wide_addr: bool) -> Result<(), Fault> {
        if self.failing() {
            return Err(Fault);
        }
        buf.fill(self.fill);
        self.reads.push((chip, addr, buf.len(), wide_addr));
        Ok(())
    }

    fn write(&mut self, chip: ChipAddr, addr: u16, data: &[u8], wide_addr: bool, timeout: MillisDurationU32) -> Result<(), Fault> {
        if self.failing() {
            return Err(Fault);
        }
        self.last_timeout = Some(timeout);
        self.writes.push((chip, addr, data.to_vec(), wide_addr));
        Ok(())
    }
}

pub struct MockFpga {
    pub resets: usize,
    pub loads: Vec<usize>,
    pub started: usize,
    pub ready: bool,
    pub selected: Option<u8>,
    pub select_ok: bool,
    pub read_ok: bool,
    pub reg_reads: Vec<usize>,
    pub reg_writes: Vec<Vec<u8>>,
}

impl Default for MockFpga {
    fn default() -> Self {
        MockFpga {
            resets: 0,
            loads: Vec::new(),
            started: 0,
            ready: false,
            selected: None,
            select_ok: true,
            read_ok: true,
            reg_reads: Vec::new(),
            reg_writes: Vec::new(),
        }
    }
}

impl Fpga for MockFpga {
    fn reset(&mut self) {
        self.resets += 1;
    }

    fn load(&mut self, data: &[u8]) {
        self.loads.push(data.len());
    }

    fn start(&mut self) {
        self.started += 1;
    }

    fn is_ready(&mut self) -> bool {
        self.ready
    }

    fn select_register(&mut self, addr: u8) -> Result<(), Fault> {
        if self.select_ok {
            self.selected = Some(addr);
            Ok(())
        } else {
            Err(Fault)
        }
    }

    fn read_register(&mut self, buf: &mut [u8]) -> Result<(), Fault> {
        if self.read_ok {
            buf.fill(0);
            self.reg_reads.push(buf.len());
            Ok(())
        } else {
            Err(Fault)
        }
    }

    fn write_register(&mut self, data: &[u8]) {
        self.reg_writes.push(data.to_vec());
    }
}

pub struct MockAnalog {
    pub voltage: u16,
    pub measured: u16,
    pub thresholds: (u16, u16),
    pub alert_mask: u8,
    pub get_ok: bool,
    pub set_ok: bool,
    pub measure_ok: bool,
    pub get_alert_ok: bool,
    pub set_alert_ok: bool,
    pub set_calls: Vec<(PortMask, u16)>,
    pub set_alert_calls: Vec<(PortMask, u16, u16)>,
    pub poll_calls: Vec<bool>,
}

impl Default for MockAnalog {
    fn default() -> Self {
        MockAnalog {
            voltage: 0,
            measured: 0,
            thresholds: (0, 0),
            alert_mask: 0,
            get_ok: true,
            set_ok: true,
            measure_ok: true,
            get_alert_ok: true,
            set_alert_ok: true,
            set_calls: Vec::new(),
            set_alert_calls: Vec::new(),
            poll_calls: Vec::new(),
        }
    }
}

impl AnalogIo for MockAnalog {
    fn get_voltage(&mut self, _mask: PortMask) -> Result<u16, Fault> {
        if self.get_ok {
            Ok(self.voltage)
        } else {
            Err(Fault)
        }
    }

    fn set_voltage(&mut self, mask: PortMask, millivolts: u16) -> Result<(), Fault> {
        self.set_calls.push((mask, millivolts));
        if self.set_ok {
            Ok(())
        } else {
            Err(Fault)
        }
    }

    fn measure_voltage(&mut self, _mask: PortMask) -> Result<u16, Fault> {
        if self.measure_ok {
            Ok(self.measured)
        } else {
            Err(Fault)
        }
    }

    fn get_alert(&mut self, _mask: PortMask) -> Result<(u16, u16), Fault> {
        if self.get_alert_ok {
            Ok(self.thresholds)
        } else {
            Err(Fault)
        }
    }

    fn set_alert(&mut self, mask: PortMask, low: u16, high: u16) -> Result<(), Fault> {
        self.set_alert_calls.push((mask, low, high));
        if self.set_alert_ok {
            Ok(())
        } else {
            Err(Fault)
        }
    }

    fn poll_alert(&mut self, clear: bool) -> PortMask {
        self.poll_calls.push(clear);
        let mask = self.alert_mask;
        if clear {
            self.alert_mask = 0;
        }
        PortMask(mask)
    }
}

#[derive(Default, Clone, Copy)]
pub struct IndicatorState {
    pub error: bool,
    pub ready: bool,
    pub activity: bool,
}

/// Indicator outputs, shared with the test through an `Rc` so they can be
/// inspected while the device owns the driver.
pub struct MockIndicators(pub Rc<RefCell<IndicatorState>>);

impl Indicators for MockIndicators {
    fn set_error(&mut self, on: bool) {
        self.0.borrow_mut().error = on;
    }

    fn set_ready(&mut self, on: bool) {
        self.0.borrow_mut().ready = on;
    }

    fn set_activity(&mut self, on: bool) {
        self.0.borrow_mut().activity = on;
    }
}

pub struct Fixture {
    pub dev: Device<'static, MockLink, MockEeprom, MockFpga, MockAnalog, MockIndicators>,
    pub gate: &'static SetupGate,
    pub alert: &'static PendingFlag,
    pub leds: Rc<RefCell<IndicatorState>>,
}

impl Fixture {
    pub fn poll(&mut self) {
        self.dev.poll();
    }

    /// Latch a new header, as if the engine had received another setup
    /// transaction, and reset the link's logs.
    pub fn relatch(&mut self, raw: [u8; 8]) {
        self.dev.link.setup = raw;
        self.dev.link.ops.clear();
        self.dev.link.sent.clear();
        self.dev.link.incoming.clear();
        self.dev.link.in_pos = 0;
        assert!(self.gate.admit());
    }
}

/// A device with the given header already admitted by the setup gate.
pub fn fixture(raw: [u8; 8]) -> Fixture {
    fixture_with(raw, MockFpga::default())
}

pub fn fixture_with(raw: [u8; 8], fpga: MockFpga) -> Fixture {
    let gate: &'static SetupGate = Box::leak(Box::new(SetupGate::new()));
    let alert: &'static PendingFlag = Box::leak(Box::new(PendingFlag::new()));
    let leds = Rc::new(RefCell::new(IndicatorState::default()));
    let link = MockLink { setup: raw, ..MockLink::default() };
    let dev = Device::new(
        link,
        MockEeprom::default(),
        fpga,
        MockAnalog::default(),
        MockIndicators(leds.clone()),
        gate,
        alert,
    );
    assert!(gate.admit());
    Fixture { dev, gate, alert, leds }
}
