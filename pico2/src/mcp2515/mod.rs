//! MCP2515 stand-alone CAN controller on a blocking SPI bus.
//!
//! Implements [`Transceiver`] so the controller plugs straight into
//! [`CanBus`](leaf_dashboard_common::CanBus):
//!
//! | Call        | Controller action                                        |
//! |-------------|----------------------------------------------------------|
//! | `install`   | reset, check configuration mode, bit timing, filters     |
//! | `start`     | request normal, listen-only or loopback mode             |
//! | `stop`      | back to configuration mode (settings are kept)           |
//! | `uninstall` | sleep mode                                               |
//! | `receive`   | poll both receive buffers until a frame or the deadline  |
//!
//! The INT pin is not used. `receive` polls READ STATUS every
//! [`RX_POLL_US`] microseconds and measures its deadline in delay time, so it
//! works with any `DelayNs` implementation.

mod registers;
pub mod timing;

#[cfg(test)]
mod fake;

use core::time::Duration;

use embedded_can::{ExtendedId, Frame, Id, StandardId};
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use leaf_dashboard_common::bus::{BusConfig, DriverFault, Filter, IdKind, Mode, Transceiver};
use leaf_dashboard_common::frame::{CanFrame, MAX_DATA_LEN};
pub use registers::OpMode;
use registers::{
    BUKT,
    DLC_MASK,
    IDE,
    OPMODE_MASK,
    RTR,
    RX_BUFFER_LEN,
    RX0IF,
    RX0OVR,
    RX1IF,
    RX1OVR,
    RXM_ANY,
    SRR,
    cmd,
    decode_id,
    encode_id,
    reg,
};
pub use timing::BitTiming;

/// Driver specific codes carried by [`DriverFault::Code`].
pub mod fault {
    /// The SPI transfer itself failed.
    pub const SPI: i32 = -1;
    /// No configuration mode after reset: controller missing or unpowered.
    pub const NO_RESPONSE: i32 = -2;
    /// The controller did not enter the requested operating mode.
    pub const MODE_CHANGE: i32 = -3;
    /// A receive buffer held an identifier or length that is not a CAN frame.
    pub const MALFORMED_FRAME: i32 = -4;
}

/// Oscillator start-up time after a reset instruction.
const RESET_DELAY_US: u32 = 2_000;

/// Mode requests are confirmed through CANSTAT within this many polls.
const MODE_CHANGE_ATTEMPTS: u32 = 10;
const MODE_POLL_US: u32 = 100;

/// Receive buffer poll interval.
pub const RX_POLL_US: u32 = 500;

#[inline]
fn spi_fault<E>(_: E) -> DriverFault { DriverFault::Code(fault::SPI) }

/// MCP2515 driver.
pub struct Mcp2515<SPI, D> {
    spi: SPI,
    delay: D,
    osc_hz: u32,
    /// Mode entered by `start`, picked at install time.
    run_mode: OpMode,
    installed: bool,
    running: bool,
    overflows: u32,
}

impl<SPI, D> Mcp2515<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Wrap an SPI device. `osc_hz` is the crystal on the controller module.
    pub const fn new(
        spi: SPI,
        delay: D,
        osc_hz: u32,
    ) -> Self {
        Self {
            spi,
            delay,
            osc_hz,
            run_mode: OpMode::Normal,
            installed: false,
            running: false,
            overflows: 0,
        }
    }

    #[inline]
    pub const fn is_installed(&self) -> bool { self.installed }

    #[inline]
    pub const fn is_running(&self) -> bool { self.running }

    /// Receive buffer overruns seen so far (frames lost because nobody polled).
    #[inline]
    pub const fn overflow_count(&self) -> u32 { self.overflows }

    /// Give back the bus and delay.
    pub fn release(self) -> (SPI, D) { (self.spi, self.delay) }

    /// Current operating mode as reported by CANSTAT.
    pub fn operating_mode(&mut self) -> Result<OpMode, DriverFault> {
        let canstat = self.read_register(reg::CANSTAT)?;
        OpMode::from_canstat(canstat).ok_or(DriverFault::Code(fault::NO_RESPONSE))
    }

    // =========================================================================
    // SPI primitives
    // =========================================================================

    fn read_register(
        &mut self,
        addr: u8,
    ) -> Result<u8, DriverFault> {
        let mut value = [0u8];
        self.spi
            .transaction(&mut [Operation::Write(&[cmd::READ, addr]), Operation::Read(&mut value)])
            .map_err(spi_fault)?;
        Ok(value[0])
    }

    /// Sequential write starting at `addr`.
    fn write_registers(
        &mut self,
        addr: u8,
        values: &[u8],
    ) -> Result<(), DriverFault> {
        self.spi
            .transaction(&mut [Operation::Write(&[cmd::WRITE, addr]), Operation::Write(values)])
            .map_err(spi_fault)
    }

    fn modify_register(
        &mut self,
        addr: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), DriverFault> {
        self.spi.write(&[cmd::BIT_MODIFY, addr, mask, value]).map_err(spi_fault)
    }

    fn read_status(&mut self) -> Result<u8, DriverFault> {
        let mut status = [0u8];
        self.spi
            .transaction(&mut [Operation::Write(&[cmd::READ_STATUS]), Operation::Read(&mut status)])
            .map_err(spi_fault)?;
        Ok(status[0])
    }

    fn reset(&mut self) -> Result<(), DriverFault> {
        self.spi.write(&[cmd::RESET]).map_err(spi_fault)?;
        self.delay.delay_us(RESET_DELAY_US);
        Ok(())
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    fn request_mode(
        &mut self,
        mode: OpMode,
    ) -> Result<(), DriverFault> {
        self.modify_register(reg::CANCTRL, OPMODE_MASK, mode.bits())?;
        for _ in 0..MODE_CHANGE_ATTEMPTS {
            let canstat = self.read_register(reg::CANSTAT)?;
            if OpMode::from_canstat(canstat) == Some(mode) {
                return Ok(());
            }
            self.delay.delay_us(MODE_POLL_US);
        }
        Err(DriverFault::Code(fault::MODE_CHANGE))
    }

    /// Program both masks and all six filters with the same match, or switch
    /// the filters off when the mask is empty.
    fn configure_filter(
        &mut self,
        filter: &Filter,
    ) -> Result<(), DriverFault> {
        if filter.mask() == 0 {
            self.write_registers(reg::RXB0CTRL, &[RXM_ANY | BUKT])?;
            return self.write_registers(reg::RXB1CTRL, &[RXM_ANY]);
        }

        let extended = filter.kind() == IdKind::Extended;
        let mut mask = encode_id(filter.mask(), extended);
        // EXIDE is only meaningful in the filter registers
        mask[1] &= !IDE;
        let id = encode_id(filter.id(), extended);

        for addr in reg::MASKS {
            self.write_registers(addr, &mask)?;
        }
        for addr in reg::FILTERS {
            self.write_registers(addr, &id)?;
        }
        self.write_registers(reg::RXB0CTRL, &[BUKT])?;
        self.write_registers(reg::RXB1CTRL, &[0])
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    fn read_rx_buffer(
        &mut self,
        instruction: u8,
    ) -> Result<CanFrame, DriverFault> {
        let mut raw = [0u8; RX_BUFFER_LEN];
        self.spi
            .transaction(&mut [Operation::Write(&[instruction]), Operation::Read(&mut raw)])
            .map_err(spi_fault)?;
        decode_frame(&raw).ok_or(DriverFault::Code(fault::MALFORMED_FRAME))
    }

    /// Count and clear receive overruns.
    fn check_overflow(&mut self) -> Result<(), DriverFault> {
        let eflg = self.read_register(reg::EFLG)?;
        let lost = eflg & (RX0OVR | RX1OVR);
        if lost != 0 {
            self.overflows = self.overflows.saturating_add(lost.count_ones());
            self.modify_register(reg::EFLG, lost, 0)?;
        }
        Ok(())
    }
}

/// Build a frame from a receive buffer dump (SIDH..D7).
fn decode_frame(raw: &[u8; RX_BUFFER_LEN]) -> Option<CanFrame> {
    let header = [raw[0], raw[1], raw[2], raw[3]];
    let (raw_id, extended) = decode_id(&header);
    let id: Id = if extended {
        ExtendedId::new(raw_id)?.into()
    } else {
        StandardId::new(raw_id as u16)?.into()
    };
    let remote = if extended { raw[4] & RTR != 0 } else { raw[1] & SRR != 0 };
    let dlc = usize::from(raw[4] & DLC_MASK).min(MAX_DATA_LEN);

    if remote {
        CanFrame::new_remote(id, dlc)
    } else {
        CanFrame::new(id, &raw[5..5 + dlc])
    }
}

impl<SPI, D> Transceiver for Mcp2515<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    fn install(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), DriverFault> {
        if self.installed {
            return Err(DriverFault::InvalidState);
        }
        let timing = BitTiming::compute(self.osc_hz, &config.timing).ok_or(DriverFault::InvalidArgument)?;

        self.reset()?;
        if self.operating_mode()? != OpMode::Configuration {
            return Err(DriverFault::Code(fault::NO_RESPONSE));
        }

        // CNF3, CNF2, CNF1 are consecutive
        self.write_registers(reg::CNF3, &[timing.cnf3, timing.cnf2, timing.cnf1])?;
        // Polled operation: no interrupts, clear stale flags
        self.write_registers(reg::CANINTE, &[0, 0])?;
        self.configure_filter(&config.filter)?;

        self.run_mode = match config.mode {
            Mode::Normal => OpMode::Normal,
            Mode::ListenOnly => OpMode::ListenOnly,
            // Loopback acknowledges its own frames, the closest match
            Mode::NoAck => OpMode::Loopback,
        };
        self.installed = true;
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), DriverFault> {
        if !self.installed || self.running {
            return Err(DriverFault::InvalidState);
        }
        self.installed = false;
        self.request_mode(OpMode::Sleep)
    }

    fn start(&mut self) -> Result<(), DriverFault> {
        if !self.installed || self.running {
            return Err(DriverFault::InvalidState);
        }
        self.request_mode(self.run_mode)?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverFault> {
        if !self.running {
            return Err(DriverFault::InvalidState);
        }
        self.running = false;
        self.request_mode(OpMode::Configuration)
    }

    fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<CanFrame, DriverFault> {
        if !self.running {
            return Err(DriverFault::InvalidState);
        }

        let budget_us = u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX);
        let mut waited_us = 0u32;
        loop {
            let status = self.read_status()?;
            if status & RX0IF != 0 {
                return self.read_rx_buffer(cmd::READ_RX_BUFFER_0);
            }
            if status & RX1IF != 0 {
                return self.read_rx_buffer(cmd::READ_RX_BUFFER_1);
            }
            if waited_us >= budget_us {
                self.check_overflow()?;
                return Err(DriverFault::Timeout);
            }

            let step = RX_POLL_US.min(budget_us - waited_us);
            self.delay.delay_us(step);
            waited_us += step;
        }
    }
}
