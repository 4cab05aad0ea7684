//! CAN transceiver lifecycle.
//!
//! [`CanBus`] owns a [`Transceiver`] and drives it through a three state
//! machine:
//!
//! ```text
//!  NotStarted --start()--> DriverInstalled --start()--> Started
//!                                 ^                        |
//!                                 +--------stop()----------+
//! ```
//!
//! `start` from `NotStarted` installs and starts in one call. Dropping the
//! bus tears it down: a started bus is stopped, an installed driver is
//! uninstalled. Teardown errors are ignored.
//!
//! Receive failures are classified by [`classify_receive`] so the producer
//! can treat a timeout as "bus quiet" and everything else as a fault.

mod config;
mod error;
mod transceiver;

use core::fmt;
use core::time::Duration;

pub use config::{BusConfig, Filter, IdKind, Mode, Timing, TransceiverPins};
pub use error::{BusError, classify_receive};
pub use transceiver::{DriverFault, Transceiver};

use crate::frame::CanFrame;

// =============================================================================
// Lifecycle State
// =============================================================================

/// Where the transceiver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Configured only, no driver resources held.
    #[default]
    NotStarted,
    /// Driver installed but not participating on the bus.
    DriverInstalled,
    /// Receiving frames.
    Started,
}

impl fmt::Display for BusState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::DriverInstalled => "driver installed",
            Self::Started => "started",
        })
    }
}

// =============================================================================
// CanBus
// =============================================================================

/// A configured CAN transceiver and its lifecycle state.
pub struct CanBus<T: Transceiver> {
    driver: T,
    config: BusConfig,
    state: BusState,
}

impl<T: Transceiver> CanBus<T> {
    /// Store the configuration. No driver call is made until [`start`](Self::start).
    pub const fn new(
        driver: T,
        config: BusConfig,
    ) -> Self {
        Self {
            driver,
            config,
            state: BusState::NotStarted,
        }
    }

    #[inline]
    pub const fn state(&self) -> BusState { self.state }

    #[inline]
    pub const fn config(&self) -> &BusConfig { &self.config }

    /// Install the driver if needed, then start it.
    ///
    /// On an install failure the bus stays `NotStarted`. On a start failure
    /// the state is left as it was (`DriverInstalled` after a fresh install).
    /// Calling this while already started re-issues the driver start.
    pub fn start(&mut self) -> Result<(), BusError> {
        if self.state == BusState::NotStarted {
            if let Err(fault) = self.driver.install(&self.config) {
                error!("Failed to install CAN driver: {}", fault);
                return Err(BusError::Driver(fault));
            }
            info!("CAN driver installed");
            self.state = BusState::DriverInstalled;
        }

        if let Err(fault) = self.driver.start() {
            error!("Failed to start CAN driver: {}", fault);
            return Err(BusError::Driver(fault));
        }

        info!("CAN started ({} bit/s, {})", self.config.timing.bitrate, self.config.mode);
        self.state = BusState::Started;
        Ok(())
    }

    /// Leave the bus while keeping the driver installed.
    ///
    /// The bus counts as `DriverInstalled` even if the driver reports a stop
    /// failure; the failure is still returned.
    pub fn stop(&mut self) -> Result<(), BusError> {
        if self.state != BusState::Started {
            return Err(BusError::InvalidState(self.state));
        }

        self.state = BusState::DriverInstalled;
        if let Err(fault) = self.driver.stop() {
            error!("Failed to stop CAN driver: {}", fault);
            return Err(BusError::Driver(fault));
        }

        info!("CAN stopped");
        Ok(())
    }

    /// Wait up to `timeout` for one frame.
    ///
    /// No state precondition is enforced here; a driver that is not running
    /// reports it and the failure comes back as `ReceiveInvalidState`.
    pub fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<CanFrame, BusError> {
        self.driver.receive(timeout).map_err(classify_receive)
    }

    /// Borrow the underlying driver.
    #[inline]
    pub fn driver(&self) -> &T { &self.driver }
}

impl<T: Transceiver> Drop for CanBus<T> {
    fn drop(&mut self) {
        if self.state == BusState::Started {
            let _ = self.stop();
        }
        if self.state == BusState::DriverInstalled {
            match self.driver.uninstall() {
                Ok(()) => info!("CAN driver uninstalled"),
                Err(fault) => warn!("Failed to uninstall CAN driver: {}", fault),
            }
            self.state = BusState::NotStarted;
        }
    }
}
