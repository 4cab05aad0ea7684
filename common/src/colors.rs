//! Color constants for the Leaf dashboard.
//!
//! # Rgb565 Color Format
//!
//! Rgb565 uses 16 bits per pixel: 5 bits red, 6 bits green, 5 bits blue.
//! - Red: 0-31 (5 bits)
//! - Green: 0-63 (6 bits)
//! - Blue: 0-31 (5 bits)
//!
//! This format is native to the ST7789 and needs no conversion when writing
//! to the display buffer. Standard colors come from the `RgbColor` trait
//! constants.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

// =============================================================================
// Standard Colors
// =============================================================================

/// Pure black (0, 0, 0). Surface background.
pub const BLACK: Rgb565 = Rgb565::BLACK;

/// Pure white (31, 63, 31). Reading text.
pub const WHITE: Rgb565 = Rgb565::WHITE;

// =============================================================================
// Custom Colors
// =============================================================================

/// Reading box fill. RGB565: (3, 6, 3), just off black so box edges show.
pub const BOX_BG: Rgb565 = Rgb565::new(3, 6, 3);

/// Thin outline around each reading box. RGB565: (8, 16, 8).
pub const GRAY: Rgb565 = Rgb565::new(8, 16, 8);

/// Title text above each reading. RGB565: (0, 40, 20), Leaf teal.
pub const TEAL: Rgb565 = Rgb565::new(0, 40, 20);

/// Placeholder text before the first reading. RGB565: (16, 32, 16).
pub const DIM: Rgb565 = Rgb565::new(16, 32, 16);
