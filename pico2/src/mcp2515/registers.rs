//! MCP2515 SPI instructions, register addresses and bit fields.

/// SPI instruction bytes.
pub mod cmd {
    pub const RESET: u8 = 0xC0;
    pub const READ: u8 = 0x03;
    pub const WRITE: u8 = 0x02;
    pub const BIT_MODIFY: u8 = 0x05;
    pub const READ_STATUS: u8 = 0xA0;
    /// Read starting at RXBnSIDH. The matching RXnIF flag clears when CS rises.
    pub const READ_RX_BUFFER_0: u8 = 0x90;
    pub const READ_RX_BUFFER_1: u8 = 0x94;
}

/// Register addresses.
#[allow(dead_code)]
pub mod reg {
    pub const RXF0SIDH: u8 = 0x00;
    pub const RXF1SIDH: u8 = 0x04;
    pub const RXF2SIDH: u8 = 0x08;
    pub const RXF3SIDH: u8 = 0x10;
    pub const RXF4SIDH: u8 = 0x14;
    pub const RXF5SIDH: u8 = 0x18;
    pub const CANSTAT: u8 = 0x0E;
    pub const CANCTRL: u8 = 0x0F;
    pub const RXM0SIDH: u8 = 0x20;
    pub const RXM1SIDH: u8 = 0x24;
    pub const CNF3: u8 = 0x28;
    pub const CNF2: u8 = 0x29;
    pub const CNF1: u8 = 0x2A;
    pub const CANINTE: u8 = 0x2B;
    pub const CANINTF: u8 = 0x2C;
    pub const EFLG: u8 = 0x2D;
    pub const RXB0CTRL: u8 = 0x60;
    pub const RXB0SIDH: u8 = 0x61;
    pub const RXB1CTRL: u8 = 0x70;
    pub const RXB1SIDH: u8 = 0x71;

    /// Acceptance filters, each four registers wide (SIDH, SIDL, EID8, EID0).
    pub const FILTERS: [u8; 6] = [RXF0SIDH, RXF1SIDH, RXF2SIDH, RXF3SIDH, RXF4SIDH, RXF5SIDH];
    pub const MASKS: [u8; 2] = [RXM0SIDH, RXM1SIDH];
}

// CANCTRL / CANSTAT
pub const OPMODE_MASK: u8 = 0xE0;

// CNF2
pub const BTLMODE: u8 = 0x80;

// RXBnCTRL
/// Receive any message, filters off.
pub const RXM_ANY: u8 = 0x60;
/// RXB0 rolls over into RXB1 when full.
pub const BUKT: u8 = 0x04;

// CANINTF / READ STATUS
pub const RX0IF: u8 = 0x01;
pub const RX1IF: u8 = 0x02;

// EFLG
pub const RX0OVR: u8 = 0x40;
pub const RX1OVR: u8 = 0x80;

// RXBnSIDL
pub const SRR: u8 = 0x10;
pub const IDE: u8 = 0x08;

// RXBnDLC
pub const RTR: u8 = 0x40;
pub const DLC_MASK: u8 = 0x0F;

/// Bytes in a receive buffer read: SIDH, SIDL, EID8, EID0, DLC, D0..D7.
pub const RX_BUFFER_LEN: usize = 13;

/// Controller operating mode as encoded in CANCTRL.REQOP / CANSTAT.OPMOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum OpMode {
    Normal = 0x00,
    Sleep = 0x20,
    Loopback = 0x40,
    ListenOnly = 0x60,
    Configuration = 0x80,
}

impl OpMode {
    #[inline]
    pub const fn bits(self) -> u8 { self as u8 }

    /// Decode the mode bits of a CANSTAT value.
    pub const fn from_canstat(canstat: u8) -> Option<Self> {
        match canstat & OPMODE_MASK {
            0x00 => Some(Self::Normal),
            0x20 => Some(Self::Sleep),
            0x40 => Some(Self::Loopback),
            0x60 => Some(Self::ListenOnly),
            0x80 => Some(Self::Configuration),
            _ => None,
        }
    }
}

/// Encode an identifier into the SIDH, SIDL, EID8, EID0 layout shared by the
/// filter, mask and buffer registers. `extended` sets EXIDE (filters only).
pub const fn encode_id(
    id: u32,
    extended: bool,
) -> [u8; 4] {
    if extended {
        [
            (id >> 21) as u8,
            (((id >> 18) & 0x07) << 5) as u8 | IDE | ((id >> 16) & 0x03) as u8,
            (id >> 8) as u8,
            id as u8,
        ]
    } else {
        [(id >> 3) as u8, ((id & 0x07) << 5) as u8, 0, 0]
    }
}

/// Decode the identifier from a receive buffer header.
/// Returns the raw id and whether it is extended.
pub const fn decode_id(header: &[u8; 4]) -> (u32, bool) {
    let [sidh, sidl, eid8, eid0] = *header;
    let sid = ((sidh as u32) << 3) | ((sidl as u32) >> 5);
    if sidl & IDE == 0 {
        (sid, false)
    } else {
        let eid = (((sidl & 0x03) as u32) << 16) | ((eid8 as u32) << 8) | eid0 as u32;
        ((sid << 18) | eid, true)
    }
}
