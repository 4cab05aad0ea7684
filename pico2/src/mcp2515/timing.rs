//! Bit timing calculation for the MCP2515.
//!
//! One bit is `1 + PropSeg + PS1 + PS2` time quanta (TQ), with
//! `TQ = 2 * (BRP + 1) / Fosc`. The search picks the smallest prescaler that
//! divides the oscillator exactly into 8-25 TQ per bit, then places the sample
//! point as close as the segment limits allow.

use leaf_dashboard_common::bus::Timing;

use super::registers::BTLMODE;

const MIN_TQ: u32 = 8;
const MAX_TQ: u32 = 25;
const MAX_BRP: u32 = 64;
/// Fastest bitrate the controller supports.
const MAX_BITRATE: u32 = 1_000_000;

/// CNF1..CNF3 register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    pub cnf1: u8,
    pub cnf2: u8,
    pub cnf3: u8,
}

impl BitTiming {
    /// Derive the register values for `timing` on an `osc_hz` crystal.
    /// Returns `None` when the bitrate cannot be reached exactly.
    pub fn compute(
        osc_hz: u32,
        timing: &Timing,
    ) -> Option<Self> {
        let bitrate = timing.bitrate();
        if bitrate == 0 || bitrate > MAX_BITRATE {
            return None;
        }

        (0..MAX_BRP).find_map(|brp| {
            let divisor = (2 * (brp + 1)).checked_mul(bitrate)?;
            if osc_hz % divisor != 0 {
                return None;
            }
            let tq = osc_hz / divisor;
            if !(MIN_TQ..=MAX_TQ).contains(&tq) {
                return None;
            }
            Self::split(brp, tq, timing)
        })
    }

    fn split(
        brp: u32,
        tq: u32,
        timing: &Timing,
    ) -> Option<Self> {
        let sample_tq = (tq * u32::from(timing.sample_point) + 500) / 1000;
        let ps2 = tq.saturating_sub(sample_tq).clamp(2, 8);
        let tseg1 = tq.checked_sub(1 + ps2)?;
        // PS1 takes the larger half, PropSeg the rest
        let ps1 = tseg1.div_ceil(2).min(8);
        let prop = tseg1 - ps1;
        if !(1..=8).contains(&prop) || ps1 < 1 {
            return None;
        }
        let sjw = u32::from(timing.sjw).clamp(1, 4).min(ps2);

        Some(Self {
            cnf1: (((sjw - 1) << 6) | brp) as u8,
            cnf2: BTLMODE | ((ps1 - 1) << 3) as u8 | (prop - 1) as u8,
            cnf3: (ps2 - 1) as u8,
        })
    }

    /// Total time quanta per bit encoded in these registers.
    pub const fn quanta(&self) -> u32 {
        let prop = (self.cnf2 & 0x07) as u32 + 1;
        let ps1 = ((self.cnf2 >> 3) & 0x07) as u32 + 1;
        let ps2 = (self.cnf3 & 0x07) as u32 + 1;
        1 + prop + ps1 + ps2
    }

    /// Bitrate these registers produce on an `osc_hz` crystal.
    pub const fn bitrate(
        &self,
        osc_hz: u32,
    ) -> u32 {
        let brp = (self.cnf1 & 0x3F) as u32;
        osc_hz / (2 * (brp + 1) * self.quanta())
    }

    /// Sample point in permille.
    pub const fn sample_point(&self) -> u32 {
        let ps2 = (self.cnf3 & 0x07) as u32 + 1;
        (self.quanta() - ps2) * 1000 / self.quanta()
    }
}
