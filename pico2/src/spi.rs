//! SPI peripheral settings for the two buses on the board.

use embassy_rp::spi::{Config as SpiConfig, Phase, Polarity};
use leaf_dashboard_pico2::config::{CAN_SPI_HZ, DISPLAY_SPI_HZ};

/// SPI0: ST7789 on the Display Pack.
pub fn display_spi_config() -> SpiConfig {
    let mut config = SpiConfig::default();
    config.frequency = DISPLAY_SPI_HZ;
    config
}

/// SPI1: MCP2515, mode 0,0.
pub fn can_spi_config() -> SpiConfig {
    let mut config = SpiConfig::default();
    config.frequency = CAN_SPI_HZ;
    config.phase = Phase::CaptureOnFirstTransition;
    config.polarity = Polarity::IdleLow;
    config
}
