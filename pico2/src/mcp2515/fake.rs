//! Register model of an MCP2515 for driver tests.
//!
//! [`Chip`] keeps the register file, applies mode requests to CANSTAT and
//! moves frames from a timed queue into the receive buffers. [`FakeSpi`]
//! decodes the instruction stream and [`FakeDelay`] advances the chip clock,
//! so receive deadlines are deterministic.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

use super::registers::{
    DLC_MASK,
    OPMODE_MASK,
    OpMode,
    RTR,
    RX_BUFFER_LEN,
    RX0IF,
    RX1IF,
    SRR,
    cmd,
    encode_id,
    reg,
};
use super::Mcp2515;

const REGISTER_COUNT: usize = 128;

pub struct Chip {
    regs: [u8; REGISTER_COUNT],
    /// Frames on the wire: (arrival time in us, buffer image).
    wire: VecDeque<(u64, [u8; RX_BUFFER_LEN])>,
    now_ns: u64,
    pub resets: usize,
    /// No chip on the bus: MISO floats high.
    pub absent: bool,
    /// Every transfer fails.
    pub spi_broken: bool,
    /// CANSTAT ignores mode requests.
    pub mode_locked: bool,
}

impl Chip {
    fn power_on() -> Self {
        let mut chip = Self {
            regs: [0; REGISTER_COUNT],
            wire: VecDeque::new(),
            now_ns: 0,
            resets: 0,
            absent: false,
            spi_broken: false,
            mode_locked: false,
        };
        chip.load_reset_values();
        chip
    }

    fn load_reset_values(&mut self) {
        self.regs = [0; REGISTER_COUNT];
        self.regs[usize::from(reg::CANSTAT)] = OpMode::Configuration.bits();
        self.regs[usize::from(reg::CANCTRL)] = OpMode::Configuration.bits() | 0x07;
    }

    pub fn reg(
        &self,
        addr: u8,
    ) -> u8 {
        self.regs[usize::from(addr)]
    }

    pub fn regs_at(
        &self,
        addr: u8,
        len: usize,
    ) -> Vec<u8> {
        let start = usize::from(addr);
        self.regs[start..start + len].to_vec()
    }

    pub fn set_reg(
        &mut self,
        addr: u8,
        value: u8,
    ) {
        self.regs[usize::from(addr)] = value;
    }

    pub fn mode(&self) -> OpMode {
        OpMode::from_canstat(self.reg(reg::CANSTAT)).unwrap_or_else(|| panic!("bad CANSTAT {:#x}", self.reg(reg::CANSTAT)))
    }

    pub fn now_us(&self) -> u64 { self.now_ns / 1000 }

    // =========================================================================
    // Wire
    // =========================================================================

    pub fn push_standard(
        &mut self,
        at_us: u64,
        id: u16,
        data: &[u8],
    ) {
        self.push(at_us, encode_id(u32::from(id), false), data.len() as u8, data);
    }

    pub fn push_extended(
        &mut self,
        at_us: u64,
        id: u32,
        data: &[u8],
    ) {
        // EXIDE in a filter is IDE in a receive buffer
        self.push(at_us, encode_id(id, true), data.len() as u8, data);
    }

    pub fn push_remote(
        &mut self,
        at_us: u64,
        id: u16,
        dlc: u8,
    ) {
        let mut header = encode_id(u32::from(id), false);
        header[1] |= SRR;
        self.push(at_us, header, dlc & DLC_MASK, &[]);
    }

    fn push(
        &mut self,
        at_us: u64,
        header: [u8; 4],
        dlc: u8,
        data: &[u8],
    ) {
        let mut image = [0u8; RX_BUFFER_LEN];
        image[..4].copy_from_slice(&header);
        image[4] = dlc & !RTR;
        image[5..5 + data.len()].copy_from_slice(data);
        self.wire.push_back((at_us, image));
    }

    /// Move arrived frames into free receive buffers.
    fn deliver(&mut self) {
        let mode = OpMode::from_canstat(self.reg(reg::CANSTAT));
        if !matches!(mode, Some(OpMode::Normal | OpMode::ListenOnly | OpMode::Loopback)) {
            return;
        }
        for (flag, base) in [(RX0IF, reg::RXB0SIDH), (RX1IF, reg::RXB1SIDH)] {
            if self.reg(reg::CANINTF) & flag != 0 {
                continue;
            }
            let Some(&(at_us, image)) = self.wire.front() else {
                return;
            };
            if at_us > self.now_us() {
                return;
            }
            self.wire.pop_front();
            let start = usize::from(base);
            self.regs[start..start + RX_BUFFER_LEN].copy_from_slice(&image);
            self.regs[usize::from(reg::CANINTF)] |= flag;
        }
    }

    // =========================================================================
    // Instruction decoding
    // =========================================================================

    /// Byte `index` of the response to the instruction in `sent`.
    fn response(
        &self,
        sent: &[u8],
        index: usize,
    ) -> u8 {
        if self.absent {
            return 0xFF;
        }
        let from = |base: u8| self.regs[(usize::from(base) + index) % REGISTER_COUNT];
        match sent.first().copied() {
            Some(cmd::READ) => from(sent[1]),
            Some(cmd::READ_STATUS) => self.reg(reg::CANINTF) & (RX0IF | RX1IF),
            Some(cmd::READ_RX_BUFFER_0) => from(reg::RXB0SIDH),
            Some(cmd::READ_RX_BUFFER_1) => from(reg::RXB1SIDH),
            _ => 0xFF,
        }
    }

    /// Apply the side effects of a finished transaction (CS high).
    fn complete(
        &mut self,
        sent: &[u8],
    ) {
        if self.absent {
            return;
        }
        match sent.first().copied() {
            Some(cmd::RESET) => {
                self.resets += 1;
                self.load_reset_values();
            }
            Some(cmd::WRITE) => {
                let start = usize::from(sent[1]);
                for (offset, &value) in sent[2..].iter().enumerate() {
                    self.regs[(start + offset) % REGISTER_COUNT] = value;
                }
                self.apply_mode_request();
            }
            Some(cmd::BIT_MODIFY) => {
                let (addr, mask, value) = (usize::from(sent[1]), sent[2], sent[3]);
                self.regs[addr] = (self.regs[addr] & !mask) | (value & mask);
                self.apply_mode_request();
            }
            Some(cmd::READ_RX_BUFFER_0) => self.regs[usize::from(reg::CANINTF)] &= !RX0IF,
            Some(cmd::READ_RX_BUFFER_1) => self.regs[usize::from(reg::CANINTF)] &= !RX1IF,
            _ => {}
        }
    }

    fn apply_mode_request(&mut self) {
        if self.mode_locked {
            return;
        }
        let requested = self.reg(reg::CANCTRL) & OPMODE_MASK;
        let canstat = &mut self.regs[usize::from(reg::CANSTAT)];
        *canstat = (*canstat & !OPMODE_MASK) | requested;
    }
}

#[derive(Debug)]
pub struct FakeSpiError;

impl spi::Error for FakeSpiError {
    fn kind(&self) -> ErrorKind { ErrorKind::Other }
}

pub struct FakeSpi(Rc<RefCell<Chip>>);

impl ErrorType for FakeSpi {
    type Error = FakeSpiError;
}

impl SpiDevice for FakeSpi {
    fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        if chip.spi_broken {
            return Err(FakeSpiError);
        }
        chip.deliver();

        let mut sent = Vec::new();
        let mut received = 0;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => sent.extend_from_slice(bytes),
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = chip.response(&sent, received);
                        received += 1;
                    }
                }
                Operation::DelayNs(_) => {}
                _ => panic!("driver only issues plain writes and reads"),
            }
        }
        chip.complete(&sent);
        Ok(())
    }
}

pub struct FakeDelay(Rc<RefCell<Chip>>);

impl DelayNs for FakeDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.0.borrow_mut().now_ns += u64::from(ns);
    }
}

/// Driver wired to a fresh chip.
pub struct Rig {
    pub driver: Mcp2515<FakeSpi, FakeDelay>,
    pub chip: Rc<RefCell<Chip>>,
}

impl Rig {
    pub fn new(osc_hz: u32) -> Self {
        let chip = Rc::new(RefCell::new(Chip::power_on()));
        Self {
            driver: Mcp2515::new(FakeSpi(Rc::clone(&chip)), FakeDelay(Rc::clone(&chip)), osc_hz),
            chip,
        }
    }
}
