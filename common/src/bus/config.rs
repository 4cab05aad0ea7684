//! Transceiver configuration: pins, operating mode, bit timing and
//! acceptance filter.
//!
//! The values here describe *what* the bus should look like. Each
//! [`Transceiver`](super::Transceiver) implementation translates them into
//! its own register settings (prescalers, filter masks, mode bits).

use core::fmt;

use embedded_can::Id;

/// GPIO pins routed to the CAN transceiver.
///
/// Controllers with a fixed pinout (for example an MCP2515 driven over SPI)
/// ignore these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransceiverPins {
    /// Controller TX -> transceiver TXD.
    pub tx: u8,
    /// Transceiver RXD -> controller RX.
    pub rx: u8,
}

/// Controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Regular participant: acknowledges frames and may transmit.
    #[default]
    Normal,
    /// Transmits without requiring acknowledgement (self test).
    NoAck,
    /// Receives without ever driving the bus, not even ACK bits.
    ListenOnly,
}

impl fmt::Display for Mode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::NoAck => "no-ack",
            Self::ListenOnly => "listen-only",
        })
    }
}

/// Bit timing, expressed independently of the controller clock.
///
/// Drivers derive prescaler and segment lengths from `bitrate` and
/// `sample_point`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Nominal bitrate in bit/s.
    pub bitrate: u32,
    /// Sample point in permille of the bit time (875 = 87.5%).
    pub sample_point: u16,
    /// Synchronisation jump width in time quanta (1-4).
    pub sjw: u8,
}

impl Timing {
    pub const KBPS_25: Self = Self::new(25_000);
    pub const KBPS_50: Self = Self::new(50_000);
    pub const KBPS_100: Self = Self::new(100_000);
    pub const KBPS_125: Self = Self::new(125_000);
    pub const KBPS_250: Self = Self::new(250_000);
    pub const KBPS_500: Self = Self::new(500_000);
    pub const KBPS_800: Self = Self::new(800_000);
    pub const MBPS_1: Self = Self {
        bitrate: 1_000_000,
        sample_point: 750,
        sjw: 1,
    };

    /// Timing with the CiA recommended 87.5% sample point.
    pub const fn new(bitrate: u32) -> Self {
        Self {
            bitrate,
            sample_point: 875,
            sjw: 1,
        }
    }

    /// Nominal bitrate in bit/s.
    #[inline]
    pub const fn bitrate(&self) -> u32 { self.bitrate }
}

impl Default for Timing {
    fn default() -> Self { Self::KBPS_500 }
}

/// Which identifier format a filter matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdKind {
    /// Standard and extended frames.
    Any,
    /// Standard (11-bit) frames only.
    Standard,
    /// Extended (29-bit) frames only.
    Extended,
}

/// Single acceptance filter.
///
/// A frame passes when its identifier has the filter's [`IdKind`] and every
/// identifier bit set in `mask` equals the same bit of `id`. A zero mask with
/// [`IdKind::Any`] accepts everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Filter {
    id: u32,
    mask: u32,
    kind: IdKind,
}

impl Filter {
    /// Accept every frame.
    pub const ACCEPT_ALL: Self = Self {
        id: 0,
        mask: 0,
        kind: IdKind::Any,
    };

    /// Accept exactly one standard (11-bit) identifier.
    pub const fn standard(id: u16) -> Self {
        Self {
            id: (id & 0x7FF) as u32,
            mask: 0x7FF,
            kind: IdKind::Standard,
        }
    }

    /// Accept exactly one extended (29-bit) identifier.
    pub const fn extended(id: u32) -> Self {
        Self {
            id: id & 0x1FFF_FFFF,
            mask: 0x1FFF_FFFF,
            kind: IdKind::Extended,
        }
    }

    #[inline]
    pub const fn id(&self) -> u32 { self.id }

    #[inline]
    pub const fn mask(&self) -> u32 { self.mask }

    #[inline]
    pub const fn kind(&self) -> IdKind { self.kind }

    /// Whether a frame with this identifier passes the filter.
    pub fn accepts(
        &self,
        id: Id,
    ) -> bool {
        let raw = match (self.kind, id) {
            (IdKind::Standard, Id::Extended(_)) | (IdKind::Extended, Id::Standard(_)) => return false,
            (_, Id::Standard(id)) => u32::from(id.as_raw()),
            (_, Id::Extended(id)) => id.as_raw(),
        };
        (raw & self.mask) == (self.id & self.mask)
    }
}

impl Default for Filter {
    fn default() -> Self { Self::ACCEPT_ALL }
}

/// Complete transceiver configuration.
///
/// Building one has no side effects; nothing touches hardware until
/// [`CanBus::start`](super::CanBus::start) installs the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    pub pins: TransceiverPins,
    pub mode: Mode,
    pub timing: Timing,
    pub filter: Filter,
}

impl BusConfig {
    /// Configuration for the given pins with normal mode, 500 kbit/s and an
    /// accept-all filter.
    pub const fn new(
        tx: u8,
        rx: u8,
    ) -> Self {
        Self {
            pins: TransceiverPins { tx, rx },
            mode: Mode::Normal,
            timing: Timing::KBPS_500,
            filter: Filter::ACCEPT_ALL,
        }
    }

    #[must_use]
    pub const fn with_mode(
        mut self,
        mode: Mode,
    ) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_timing(
        mut self,
        timing: Timing,
    ) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub const fn with_filter(
        mut self,
        filter: Filter,
    ) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self { crate::config::DEFAULT_BUS_CONFIG }
}
