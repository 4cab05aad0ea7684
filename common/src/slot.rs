//! Value slots shared between the CAN producer and the display consumer.
//!
//! A [`ValueSlot`] is one displayed quantity. The producer writes readings
//! through a [`ValueWriter`] whenever a frame arrives; the consumer calls
//! [`ValueSlot::flush`] on its own fixed tick to turn the latest reading into
//! label text. Neither side waits for the other.
//!
//! # Lock-free Storage
//!
//! The tagged reading is packed into one 64-bit word (tag in the high half,
//! payload bits in the low half) and stored in a `portable_atomic::AtomicU64`.
//! A flush therefore sees either the previous or the next reading, never a
//! mix of both. On targets without native 64-bit atomics `portable-atomic`
//! falls back to a short critical section.

use alloc::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};

use crate::render::RenderBridge;
use crate::template::{Number, Template};

/// Current value of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Nothing written yet.
    #[default]
    NoData,
    Integer(i32),
    Float(f32),
}

impl Reading {
    /// The value to format, if there is one.
    #[inline]
    pub const fn number(self) -> Option<Number> {
        match self {
            Self::NoData => None,
            Self::Integer(v) => Some(Number::Integer(v)),
            Self::Float(v) => Some(Number::Float(v)),
        }
    }

    #[inline]
    pub const fn has_data(self) -> bool { !matches!(self, Self::NoData) }
}

// =============================================================================
// Packed Atomic Cell
// =============================================================================

const TAG_NO_DATA: u64 = 0;
const TAG_INTEGER: u64 = 1;
const TAG_FLOAT: u64 = 2;

#[inline]
const fn pack(reading: Reading) -> u64 {
    match reading {
        Reading::NoData => TAG_NO_DATA << 32,
        Reading::Integer(v) => (TAG_INTEGER << 32) | v as u32 as u64,
        Reading::Float(v) => (TAG_FLOAT << 32) | v.to_bits() as u64,
    }
}

#[inline]
const fn unpack(word: u64) -> Reading {
    let payload = word as u32;
    match word >> 32 {
        TAG_INTEGER => Reading::Integer(payload as i32),
        TAG_FLOAT => Reading::Float(f32::from_bits(payload)),
        _ => Reading::NoData,
    }
}

#[derive(Debug)]
struct ValueCell(AtomicU64);

impl ValueCell {
    const fn new() -> Self { Self(AtomicU64::new(pack(Reading::NoData))) }

    #[inline]
    fn load(&self) -> Reading { unpack(self.0.load(Ordering::Acquire)) }

    #[inline]
    fn store(
        &self,
        reading: Reading,
    ) {
        self.0.store(pack(reading), Ordering::Release);
    }
}

// =============================================================================
// Producer Side
// =============================================================================

/// Producer handle to a slot's value. Cheap to clone, `Send` and `Sync`.
///
/// Writing never touches the rendering handle, so it is safe from any thread
/// or core at any time, including before the first flush.
#[derive(Debug, Clone)]
pub struct ValueWriter {
    cell: Arc<ValueCell>,
}

impl ValueWriter {
    #[inline]
    pub fn update_integer(
        &self,
        value: i32,
    ) {
        self.cell.store(Reading::Integer(value));
    }

    #[inline]
    pub fn update_float(
        &self,
        value: f32,
    ) {
        self.cell.store(Reading::Float(value));
    }

    /// Latest written reading.
    #[inline]
    pub fn reading(&self) -> Reading { self.cell.load() }
}

// =============================================================================
// Slot
// =============================================================================

/// One displayed quantity: title, format, latest reading and the label that
/// shows it.
///
/// `H` is the [`RenderBridge::Handle`] of the label. Slots are created by
/// [`ScreenSet::new_value`](crate::ScreenSet::new_value).
#[derive(Debug)]
pub struct ValueSlot<H> {
    title: &'static str,
    template: Template,
    label: H,
    cell: Arc<ValueCell>,
}

impl<H: Copy> ValueSlot<H> {
    pub(crate) fn new(
        title: &'static str,
        template: Template,
        label: H,
    ) -> Self {
        Self {
            title,
            template,
            label,
            cell: Arc::new(ValueCell::new()),
        }
    }

    #[inline]
    pub const fn title(&self) -> &'static str { self.title }

    #[inline]
    pub const fn template(&self) -> &Template { &self.template }

    /// Handle of the label showing the formatted reading.
    #[inline]
    pub const fn label(&self) -> H { self.label }

    #[inline]
    pub fn reading(&self) -> Reading { self.cell.load() }

    /// A producer handle writing into this slot.
    pub fn writer(&self) -> ValueWriter {
        ValueWriter {
            cell: Arc::clone(&self.cell),
        }
    }

    #[inline]
    pub fn update_integer(
        &self,
        value: i32,
    ) {
        self.cell.store(Reading::Integer(value));
    }

    #[inline]
    pub fn update_float(
        &self,
        value: f32,
    ) {
        self.cell.store(Reading::Float(value));
    }

    /// Render the latest reading into the label.
    ///
    /// `NoData` leaves the label alone: the placeholder was set when the slot
    /// was created. The reading itself is never modified, so flushing again
    /// without an update renders the same text.
    pub fn flush<R>(
        &self,
        bridge: &mut R,
    ) where
        R: RenderBridge<Handle = H>,
    {
        match self.cell.load() {
            Reading::NoData => {}
            Reading::Integer(v) => {
                let text = self.template.render(Number::Integer(v));
                bridge.set_text(self.label, &text);
            }
            Reading::Float(v) => {
                let text = self.template.render(Number::Float(v));
                bridge.set_text(self.label, &text);
            }
        }
    }
}
