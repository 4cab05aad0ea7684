//! In-process CAN transceiver backed by a channel.
//!
//! The simulated vehicle sends frames into an `mpsc` channel; the
//! [`VirtualTransceiver`] is its receiving end and behaves like a real
//! controller: it must be installed before it can be started, it only
//! delivers frames while started, and it applies the acceptance filter.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use embedded_can::Frame;
use leaf_dashboard_common::bus::Filter;
use leaf_dashboard_common::{BusConfig, CanFrame, DriverFault, Transceiver};

/// Create the vehicle side and the dashboard side of a virtual bus.
pub fn virtual_bus() -> (Sender<CanFrame>, VirtualTransceiver) {
    let (tx, rx) = mpsc::channel();
    (tx, VirtualTransceiver::new(rx))
}

pub struct VirtualTransceiver {
    rx: Receiver<CanFrame>,
    filter: Option<Filter>,
    running: bool,
}

impl VirtualTransceiver {
    const fn new(rx: Receiver<CanFrame>) -> Self {
        Self {
            rx,
            filter: None,
            running: false,
        }
    }

    /// Discard frames that arrived while the controller was off the bus.
    fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl Transceiver for VirtualTransceiver {
    fn install(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), DriverFault> {
        if self.filter.is_some() {
            return Err(DriverFault::InvalidState);
        }
        self.filter = Some(config.filter);
        tracing::debug!(
            bitrate = config.timing.bitrate,
            mode = %config.mode,
            "virtual transceiver installed"
        );
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), DriverFault> {
        if self.filter.take().is_none() {
            return Err(DriverFault::InvalidState);
        }
        self.running = false;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverFault> {
        if self.filter.is_none() {
            return Err(DriverFault::InvalidState);
        }
        if !self.running {
            self.drain();
            self.running = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverFault> {
        if !self.running {
            return Err(DriverFault::InvalidState);
        }
        self.running = false;
        Ok(())
    }

    fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<CanFrame, DriverFault> {
        let Some(filter) = self.filter.filter(|_| self.running) else {
            return Err(DriverFault::InvalidState);
        };

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(frame) if filter.accepts(frame.id()) => return Ok(frame),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Err(DriverFault::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    // Nobody left on the bus: as quiet as it gets
                    thread::sleep(remaining);
                    return Err(DriverFault::Timeout);
                }
            }
        }
    }
}
