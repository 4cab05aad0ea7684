//! Screen, timing and bus configuration constants.
//!
//! Cell sizes are not fixed here. The widget tree divides a page by the grid
//! shape of its screen set when it lays the page out.

use core::time::Duration;

use crate::bus::{BusConfig, Filter, Mode, Timing, TransceiverPins};

// =============================================================================
// Display Configuration
// =============================================================================

/// Display width in pixels (ST7789 on Pimoroni PIM715: 320x240)
pub const SCREEN_WIDTH: u32 = 320;

/// Display height in pixels
pub const SCREEN_HEIGHT: u32 = 240;

/// Grid columns per page.
pub const DASH_COLS: u8 = 2;

/// Grid rows per page.
pub const DASH_ROWS: u8 = 3;

/// Text shown in a reading box before its first flush with data.
pub const NO_DATA_TEXT: &str = "<no data>";

// =============================================================================
// Timing
// =============================================================================

/// Interval between display flushes (consumer tick).
pub const DISPLAY_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// How long the producer blocks waiting for one frame.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Pause after a receive fault before the producer tries again.
pub const FAULT_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// CAN Bus Defaults
// =============================================================================

/// Default transceiver TX GPIO.
pub const CAN_TX_PIN: u8 = 32;

/// Default transceiver RX GPIO.
pub const CAN_RX_PIN: u8 = 27;

/// Identifier of the Leaf battery management frame carrying pack readings.
pub const LEAF_BMS_FRAME_ID: u16 = 0x1DB;

/// Bus configuration used when nothing else is specified:
/// normal mode, 500 kbit/s, accept every frame.
pub const DEFAULT_BUS_CONFIG: BusConfig = BusConfig {
    pins: TransceiverPins {
        tx: CAN_TX_PIN,
        rx: CAN_RX_PIN,
    },
    mode: Mode::Normal,
    timing: Timing::KBPS_500,
    filter: Filter::ACCEPT_ALL,
};
