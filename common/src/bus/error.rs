//! Errors surfaced by [`CanBus`](super::CanBus).

use core::fmt;

use super::{BusState, DriverFault};

/// Failure of a bus operation.
///
/// Receive failures are classified into their own variants so callers can
/// tell a quiet bus (`ReceiveTimeout`) from a real fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Install, start or stop failed in the driver.
    Driver(DriverFault),
    /// The operation is not allowed in the current lifecycle state.
    InvalidState(BusState),
    /// No frame arrived within the timeout.
    ReceiveTimeout,
    /// The driver rejected the receive arguments.
    ReceiveInvalidArgument,
    /// The driver is not running.
    ReceiveInvalidState,
    /// Any other receive failure.
    ReceiveFailed(DriverFault),
}

impl BusError {
    /// Whether this is the routine "nothing arrived" outcome.
    #[inline]
    pub const fn is_timeout(&self) -> bool { matches!(self, Self::ReceiveTimeout) }
}

/// Map a driver receive failure onto the bus level classification.
pub const fn classify_receive(fault: DriverFault) -> BusError {
    match fault {
        DriverFault::Timeout => BusError::ReceiveTimeout,
        DriverFault::InvalidArgument => BusError::ReceiveInvalidArgument,
        DriverFault::InvalidState => BusError::ReceiveInvalidState,
        DriverFault::Code(_) => BusError::ReceiveFailed(fault),
    }
}

impl fmt::Display for BusError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Driver(fault) => write!(f, "driver failure: {fault}"),
            Self::InvalidState(state) => write!(f, "not allowed while {state}"),
            Self::ReceiveTimeout => f.write_str("message receive timed out"),
            Self::ReceiveInvalidArgument => f.write_str("message receive got invalid argument"),
            Self::ReceiveInvalidState => f.write_str("message receive in invalid state"),
            Self::ReceiveFailed(fault) => write!(f, "message receive failed: {fault}"),
        }
    }
}

impl core::error::Error for BusError {}
