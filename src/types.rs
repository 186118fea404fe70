use defmt::Format;
use usb_device::control::{Recipient, RequestType};
use usb_device::UsbDirection;

// Vendor request selectors. These are a wire compatibility surface: the
// host-side client hardcodes them, so the values must never change.
pub const REQ_EEPROM: u8 = 0x10;
pub const REQ_FPGA_CFG: u8 = 0x11;
pub const REQ_STATUS: u8 = 0x12;
pub const REQ_REGISTER: u8 = 0x13;
pub const REQ_IO_VOLT: u8 = 0x14;
pub const REQ_SENSE_VOLT: u8 = 0x15;
pub const REQ_ALERT_VOLT: u8 = 0x16;
pub const REQ_POLL_ALERT: u8 = 0x17;
/// Second-stage bootloader compatible EEPROM access. Always targets the
/// system EEPROM, regardless of the index parameter.
pub const REQ_LEGACY_EEPROM: u8 = 0xA9;

/// I2C address of one of the EEPROM chips behind the adapter.
#[derive(Clone, Copy, PartialEq, Debug, Format)]
pub struct ChipAddr(pub u8);

impl ChipAddr {
    /// System EEPROM, holding the USB identity and factory data.
    pub const SYSTEM: ChipAddr = ChipAddr(0x51);
    /// First bank of the bitstream EEPROM.
    pub const BITSTREAM_0: ChipAddr = ChipAddr(0x52);
    /// Second bank of the bitstream EEPROM.
    pub const BITSTREAM_1: ChipAddr = ChipAddr(0x53);

    /// Maps the index parameter of an EEPROM request to a chip address.
    pub fn from_index(index: u16) -> Option<ChipAddr> {
        match index {
            0 => Some(ChipAddr::SYSTEM),
            1 => Some(ChipAddr::BITSTREAM_0),
            2 => Some(ChipAddr::BITSTREAM_1),
            _ => None,
        }
    }
}

/// Selects a subset of the I/O ports, one bit per port.
#[derive(Clone, Copy, PartialEq, Debug, Format)]
pub struct PortMask(pub u8);

/// The 8-byte header of a control request, as received on the control
/// endpoint.
#[derive(Clone, Copy, Format)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn new(direction: UsbDirection, request_type: RequestType, recipient: Recipient, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type: (recipient as u8) | ((request_type as u8) << 5) | (direction as u8),
            request,
            value,
            index,
            length,
        }
    }

    pub fn direction(&self) -> UsbDirection {
        UsbDirection::from(self.request_type)
    }

    /// Checks that the request is a vendor request addressed to the device,
    /// in either direction. All operations this crate handles are of this
    /// class; everything else belongs to the external USB engine.
    pub fn is_vendor_to_device(&self) -> bool {
        self.request_type & 0x7f == ((RequestType::Vendor as u8) << 5) | (Recipient::Device as u8)
    }
}

pub mod parse {
    //! Parsers for the raw header and the little-endian request payloads.

    use super::SetupPacket;
    use nom::combinator::map;
    use nom::number::complete::{le_u16, u8};
    use nom::sequence::tuple;
    use nom::IResult;

    /// Parse the raw 8-byte setup header.
    pub fn setup_packet(input: &[u8]) -> IResult<&[u8], SetupPacket> {
        map(
            tuple((u8, u8, le_u16, le_u16, le_u16)),
            |(request_type, request, value, index, length)| {
                SetupPacket { request_type, request, value, index, length }
            }
        )(input)
    }

    /// Parse a voltage payload (single millivolt word)
    pub fn millivolts(input: &[u8]) -> IResult<&[u8], u16> {
        le_u16(input)
    }

    /// Parse an alert threshold payload (low, high millivolt words)
    pub fn alert_thresholds(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
        tuple((le_u16, le_u16))(input)
    }
}
