//! Classic CAN frame with up to 8 data bytes.
//!
//! [`CanFrame`] implements [`embedded_can::Frame`] so transceiver drivers
//! written against `embedded-can` can hand frames over directly.

use core::fmt;

use embedded_can::{ExtendedId, Frame, Id, StandardId};
use heapless::Vec;

/// Maximum payload of a classic CAN frame.
pub const MAX_DATA_LEN: usize = 8;

/// A received (or to be transmitted) CAN frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    remote: bool,
    dlc: u8,
    data: Vec<u8, MAX_DATA_LEN>,
}

impl CanFrame {
    /// Data frame with a standard 11-bit identifier.
    ///
    /// Returns `None` when the identifier exceeds 11 bits or the payload
    /// exceeds 8 bytes.
    pub fn standard(
        id: u16,
        data: &[u8],
    ) -> Option<Self> {
        Self::new(StandardId::new(id)?, data)
    }

    /// Data frame with an extended 29-bit identifier.
    pub fn extended(
        id: u32,
        data: &[u8],
    ) -> Option<Self> {
        Self::new(ExtendedId::new(id)?, data)
    }

    /// Identifier as a plain integer, regardless of its width.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw(),
        }
    }
}

impl Frame for CanFrame {
    fn new(
        id: impl Into<Id>,
        data: &[u8],
    ) -> Option<Self> {
        let data = Vec::from_slice(data).ok()?;
        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len() as u8,
            data,
        })
    }

    fn new_remote(
        id: impl Into<Id>,
        dlc: usize,
    ) -> Option<Self> {
        if dlc > MAX_DATA_LEN {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            dlc: dlc as u8,
            data: Vec::new(),
        })
    }

    #[inline]
    fn is_extended(&self) -> bool { matches!(self.id, Id::Extended(_)) }

    #[inline]
    fn is_remote_frame(&self) -> bool { self.remote }

    #[inline]
    fn id(&self) -> Id { self.id }

    #[inline]
    fn dlc(&self) -> usize { usize::from(self.dlc) }

    #[inline]
    fn data(&self) -> &[u8] { &self.data }
}

impl fmt::Display for CanFrame {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:#05X} [{}] {}", self.raw_id(), self.dlc, HexBytes(&self.data))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(
        &self,
        f: defmt::Formatter,
    ) {
        defmt::write!(f, "{=u32:#X} [{=u8}] {=[u8]:02X}", self.raw_id(), self.dlc, &self.data[..]);
    }
}

/// Space separated upper-case hex dump of a payload, for log output.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HexBytes<'_> {
    fn format(
        &self,
        f: defmt::Formatter,
    ) {
        defmt::write!(f, "{=[u8]:02X}", self.0);
    }
}
