//! Timing constants and the thread-sleeping delay for the simulator.
//!
//! These use `std::time::Duration` arithmetic with `Instant`, so they live
//! here rather than in the common crate.

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Target window frame time (~50 FPS). The main loop sleeps if a frame
/// completes early. Display flushes run on their own, slower tick.
pub const FRAME_TIME: Duration = Duration::from_millis(20);

/// Default interval between simulated battery frames.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(250);

/// Period of unrelated traffic the simulated car puts on the bus.
pub const CHATTER_PERIOD: Duration = Duration::from_millis(40);

/// `DelayNs` that parks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
