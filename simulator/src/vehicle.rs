//! Simulated Leaf putting battery frames on the virtual bus.
//!
//! Readings follow slow sine waves so every box on the dashboard keeps
//! changing. Unrelated traffic on another identifier exercises the
//! acceptance filter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use leaf_dashboard_common::CanFrame;
use leaf_dashboard_common::config::LEAF_BMS_FRAME_ID;

use crate::error::SimulatorError;
use crate::timing::CHATTER_PERIOD;

/// Identifier of the unrelated traffic (drive motor status on a real car).
const CHATTER_FRAME_ID: u16 = 0x11A;

/// Battery readings at time `t` seconds, one byte each:
/// voltage, current, state of charge, gids.
pub fn battery_payload(t: f32) -> [u8; 4] {
    [
        fake_signal(t, 190.0, 250.0, 0.21) as u8,
        fake_signal(t, 0.0, 120.0, 0.9) as u8,
        fake_signal(t, 20.0, 95.0, 0.05) as u8,
        fake_signal(t, 60.0, 250.0, 0.05) as u8,
    ]
}

fn fake_signal(
    t: f32,
    min: f32,
    max: f32,
    freq: f32,
) -> f32 {
    let normalized = (t * freq).sin().mul_add(0.5, 0.5);
    min + normalized * (max - min)
}

/// Running vehicle thread.
pub struct Vehicle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Vehicle {
    /// Clear the shared running flag and wait for the thread to finish.
    pub fn stop(self) -> Result<(), SimulatorError> {
        self.running.store(false, Ordering::Relaxed);
        self.thread.join().map_err(|_| SimulatorError::ThreadPanicked("vehicle"))
    }
}

/// Start the vehicle thread. It stops when `running` is cleared or the
/// dashboard side of the bus is gone.
pub fn spawn(
    bus: Sender<CanFrame>,
    frame_period: Duration,
    running: Arc<AtomicBool>,
) -> std::io::Result<Vehicle> {
    let flag = Arc::clone(&running);
    let thread = thread::Builder::new().name("vehicle".into()).spawn(move || {
        let start = Instant::now();
        let mut next_battery = start;
        let mut chatter_counter = 0u8;

        while running.load(Ordering::Relaxed) {
            let now = Instant::now();
            let frame = if now >= next_battery {
                next_battery += frame_period;
                CanFrame::standard(LEAF_BMS_FRAME_ID, &battery_payload(start.elapsed().as_secs_f32()))
            } else {
                chatter_counter = chatter_counter.wrapping_add(1);
                CanFrame::standard(CHATTER_FRAME_ID, &[chatter_counter, 0, 0, 0, 0, 0, 0, 0])
            };

            if let Some(frame) = frame
                && bus.send(frame).is_err()
            {
                tracing::debug!("virtual bus closed, vehicle stopping");
                break;
            }
            thread::sleep(CHATTER_PERIOD.min(next_battery.saturating_duration_since(Instant::now())));
        }
    })?;
    Ok(Vehicle { running: flag, thread })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_stays_in_range() {
        for step in 0..2_000 {
            let [voltage, current, soc, gids] = battery_payload(step as f32 * 0.1);
            assert!((190..=250).contains(&voltage));
            assert!(current <= 120);
            assert!((20..=95).contains(&soc));
            assert!(gids >= 60);
        }
    }

    #[test]
    fn test_vehicle_stops_when_bus_closes() {
        let (tx, rx) = std::sync::mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn(tx, Duration::from_millis(5), Arc::clone(&running)).unwrap();
        let first = rx.recv().unwrap();
        assert_eq!(first.raw_id(), u32::from(LEAF_BMS_FRAME_ID));
        drop(rx);
        handle.thread.join().unwrap();
    }

    #[test]
    fn test_stop_clears_flag_and_joins() {
        let (tx, rx) = std::sync::mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let vehicle = spawn(tx, Duration::from_millis(5), Arc::clone(&running)).unwrap();
        rx.recv().unwrap();
        vehicle.stop().unwrap();
        assert!(!running.load(Ordering::Relaxed));
        // The thread is gone, so its sender is too
        while rx.recv().is_ok() {}
    }
}
