//! Producer side: receive frames and write them into the value slots.
//!
//! The producer blocks on [`CanBus::receive`] with a bounded timeout. A
//! timeout only means the bus was quiet for that interval and is not
//! reported as a fault. Every other receive failure is logged, and the loops
//! wait [`FAULT_BACKOFF`] before the next attempt so a dead link does not
//! flood the log.

use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::FAULT_BACKOFF;
use crate::bus::{BusError, CanBus, Transceiver};
use crate::frame::CanFrame;
use crate::leaf::FrameSink;

/// Result of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A frame arrived and was handed to the sink.
    Frame(CanFrame),
    /// Nothing arrived within the timeout.
    Idle,
    /// Receive failed for another reason.
    Fault(BusError),
}

/// Wait up to `timeout` for one frame and feed it to `sink`.
pub fn poll_once<T, S>(
    bus: &mut CanBus<T>,
    sink: &S,
    timeout: Duration,
) -> PollOutcome
where
    T: Transceiver,
    S: FrameSink + ?Sized,
{
    match bus.receive(timeout) {
        Ok(frame) => {
            debug!("Message received: {}", frame);
            sink.accept(&frame);
            PollOutcome::Frame(frame)
        }
        Err(err) if err.is_timeout() => {
            trace!("No message within {} ms", timeout.as_millis() as u32);
            PollOutcome::Idle
        }
        Err(err) => {
            warn!("Message receive failed: {}", err);
            PollOutcome::Fault(err)
        }
    }
}

/// Poll once and back off on `delay` after a fault.
fn step<T, S, D>(
    bus: &mut CanBus<T>,
    sink: &S,
    timeout: Duration,
    delay: &mut D,
) -> PollOutcome
where
    T: Transceiver,
    S: FrameSink + ?Sized,
    D: DelayNs,
{
    let outcome = poll_once(bus, sink, timeout);
    if let PollOutcome::Fault(_) = outcome {
        delay.delay_ms(FAULT_BACKOFF.as_millis() as u32);
    }
    outcome
}

/// Poll while `keep_running` returns true. Returns the number of frames
/// delivered.
pub fn run_while<T, S, D, F>(
    bus: &mut CanBus<T>,
    sink: &S,
    timeout: Duration,
    delay: &mut D,
    mut keep_running: F,
) -> usize
where
    T: Transceiver,
    S: FrameSink + ?Sized,
    D: DelayNs,
    F: FnMut() -> bool,
{
    let mut frames = 0;
    while keep_running() {
        if let PollOutcome::Frame(_) = step(bus, sink, timeout, delay) {
            frames += 1;
        }
    }
    frames
}

/// Poll forever.
pub fn run<T, S, D>(
    bus: &mut CanBus<T>,
    sink: &S,
    timeout: Duration,
    delay: &mut D,
) -> !
where
    T: Transceiver,
    S: FrameSink + ?Sized,
    D: DelayNs,
{
    loop {
        step(bus, sink, timeout, delay);
    }
}
