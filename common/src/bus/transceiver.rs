//! Driver contract for a CAN controller.

use core::fmt;
use core::time::Duration;

use super::BusConfig;
use crate::frame::CanFrame;

/// Low level failure reported by a transceiver driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverFault {
    /// Nothing arrived within the requested timeout.
    Timeout,
    /// The driver rejected an argument (bad timing, null buffer, ...).
    InvalidArgument,
    /// The driver is not in a state that allows the call.
    InvalidState,
    /// Any other driver specific error code.
    Code(i32),
}

impl fmt::Display for DriverFault {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::InvalidState => f.write_str("invalid state"),
            Self::Code(code) => write!(f, "driver error {code}"),
        }
    }
}

/// A CAN controller plus transceiver.
///
/// The calls mirror the controller lifecycle: `install` claims the hardware
/// and applies the configuration, `start` joins the bus, `stop` leaves it
/// while keeping the configuration, `uninstall` releases the hardware.
/// [`CanBus`](super::CanBus) guarantees the calls arrive in a valid order.
pub trait Transceiver {
    fn install(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), DriverFault>;

    fn uninstall(&mut self) -> Result<(), DriverFault>;

    fn start(&mut self) -> Result<(), DriverFault>;

    fn stop(&mut self) -> Result<(), DriverFault>;

    /// Block for up to `timeout` waiting for one frame.
    fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<CanFrame, DriverFault>;
}

impl<T: Transceiver + ?Sized> Transceiver for &mut T {
    fn install(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), DriverFault> {
        (**self).install(config)
    }

    fn uninstall(&mut self) -> Result<(), DriverFault> { (**self).uninstall() }

    fn start(&mut self) -> Result<(), DriverFault> { (**self).start() }

    fn stop(&mut self) -> Result<(), DriverFault> { (**self).stop() }

    fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<CanFrame, DriverFault> {
        (**self).receive(timeout)
    }
}
