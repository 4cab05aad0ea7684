//! Pre-computed static text styles to avoid per-frame object construction.
//!
//! `MonoTextStyle` and `TextStyle` are `const` so they live in read-only data
//! and nothing is built while drawing.

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb565,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder},
    text::{Alignment, Baseline, TextStyle, TextStyleBuilder},
};
use profont::{PROFONT_14_POINT, PROFONT_24_POINT};

use crate::colors::{BOX_BG, DIM, GRAY, TEAL, WHITE};

// =============================================================================
// Text Alignment
// =============================================================================

/// Centered horizontally and vertically on the anchor point.
pub const CENTERED: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Center)
    .baseline(Baseline::Middle)
    .build();

// =============================================================================
// Text Styles
// =============================================================================

/// Quantity title ("Voltage", "SoC", ...).
pub const TITLE_STYLE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&PROFONT_14_POINT, TEAL);

/// Formatted reading.
pub const READING_STYLE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&PROFONT_24_POINT, WHITE);

/// Reading label still showing the no-data placeholder.
pub const PLACEHOLDER_STYLE: MonoTextStyle<'static, Rgb565> = MonoTextStyle::new(&PROFONT_24_POINT, DIM);

// =============================================================================
// Shape Styles
// =============================================================================

/// Reading box: filled with a 1px outline.
pub const BOX_STYLE: PrimitiveStyle<Rgb565> = PrimitiveStyleBuilder::new()
    .fill_color(BOX_BG)
    .stroke_color(GRAY)
    .stroke_width(1)
    .build();
