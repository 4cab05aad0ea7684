//! Board configuration: pin map, bus clocks and memory sizes.
//!
//! Pin mapping for the Pimoroni PIM715 Display Pack 2.8" (ST7789, SPI0):
//! - DC: GPIO16, CS: GPIO17, CLK: GPIO18, MOSI: GPIO19, Backlight: GPIO20
//! - Buttons (active-low): A=12, B=13, X=14, Y=15
//!
//! MCP2515 CAN module (SPI1):
//! - MISO: GPIO8, CS: GPIO9, CLK: GPIO10, MOSI: GPIO11
//! - INT is left unconnected, the driver polls

use leaf_dashboard_common::bus::{BusConfig, Filter};
use leaf_dashboard_common::config::{DEFAULT_BUS_CONFIG, LEAF_BMS_FRAME_ID};

// =============================================================================
// Display (SPI0)
// =============================================================================

/// ST7789 SPI clock. The controller is specified up to 62.5 MHz.
pub const DISPLAY_SPI_HZ: u32 = 62_500_000;

// =============================================================================
// CAN Controller (SPI1)
// =============================================================================

/// MCP2515 SPI clock. The controller is specified up to 10 MHz.
pub const CAN_SPI_HZ: u32 = 8_000_000;

/// Crystal fitted to the MCP2515 module.
#[cfg(not(feature = "osc-8mhz"))]
pub const CAN_OSC_HZ: u32 = 16_000_000;
#[cfg(feature = "osc-8mhz")]
pub const CAN_OSC_HZ: u32 = 8_000_000;

/// Bus settings used by the firmware: 500 kbit/s, normal mode, battery frame
/// only.
pub const FIRMWARE_BUS_CONFIG: BusConfig = DEFAULT_BUS_CONFIG.with_filter(Filter::standard(LEAF_BMS_FRAME_ID));

// =============================================================================
// Memory
// =============================================================================

/// Heap for value cells and formatted strings.
pub const HEAP_SIZE: usize = 16 * 1024;

/// Stack of the core running the CAN receive loop.
pub const CORE1_STACK_SIZE: usize = 8 * 1024;

#[cfg(test)]
mod tests {
    use embedded_can::{ExtendedId, Id, StandardId};

    use super::*;

    #[test]
    fn test_firmware_bus_config_filters_battery_frame() {
        let filter = FIRMWARE_BUS_CONFIG.filter;
        assert!(filter.accepts(Id::Standard(StandardId::new(0x1DB).unwrap())));
        assert!(!filter.accepts(Id::Standard(StandardId::new(0x11A).unwrap())));
        assert!(!filter.accepts(Id::Extended(ExtendedId::new(0x1DB).unwrap())));
        assert_eq!(FIRMWARE_BUS_CONFIG.timing.bitrate(), 500_000);
    }

    #[test]
    fn test_spi_clocks_within_controller_limits() {
        assert!(DISPLAY_SPI_HZ <= 62_500_000);
        assert!(CAN_SPI_HZ <= 10_000_000);
    }
}
