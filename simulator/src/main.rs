//! Leaf CAN dashboard simulator for desktop platforms.
//!
//! Runs the same dashboard core as the firmware inside an
//! `embedded-graphics-simulator` window:
//!
//! - a simulated vehicle thread puts battery frames on a virtual CAN bus
//! - a producer thread receives them and writes the value slots
//! - the main thread is the consumer: it flushes the slots on the display
//!   tick, redraws when something changed and turns mouse clicks into taps
//!
//! Press `Y` or click the screen to switch pages. Set `RUST_LOG=debug` to see
//! every received frame.

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

mod error;
mod timing;
mod vehicle;
mod virtual_bus;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::sdl2::{Keycode, MouseButton};
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use leaf_dashboard_common::bus::Filter;
use leaf_dashboard_common::colors::BLACK;
use leaf_dashboard_common::config::{
    DASH_COLS,
    DASH_ROWS,
    DEFAULT_BUS_CONFIG,
    DISPLAY_UPDATE_INTERVAL,
    LEAF_BMS_FRAME_ID,
    RECEIVE_TIMEOUT,
    SCREEN_HEIGHT,
    SCREEN_WIDTH,
};
use leaf_dashboard_common::producer;
use leaf_dashboard_common::{CanBus, LeafDashboard, WidgetTree};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::SimulatorError;
use crate::timing::{DEFAULT_FRAME_PERIOD, FRAME_TIME, ThreadDelay};
use crate::vehicle::Vehicle;
use crate::virtual_bus::virtual_bus;

/// Leaf CAN dashboard desktop simulator
#[derive(Debug, Parser)]
#[command(name = "simulator", version)]
struct Args {
    /// Window pixel scale
    #[arg(long, default_value_t = 2)]
    scale: u32,

    /// Display flush interval in milliseconds
    #[arg(long, default_value_t = DISPLAY_UPDATE_INTERVAL.as_millis() as u64)]
    tick_ms: u64,

    /// CAN receive timeout in milliseconds
    #[arg(long, default_value_t = RECEIVE_TIMEOUT.as_millis() as u64)]
    rx_timeout_ms: u64,

    /// Interval between simulated battery frames in milliseconds
    #[arg(long, default_value_t = DEFAULT_FRAME_PERIOD.as_millis() as u64)]
    frame_period_ms: u64,

    /// Grid columns per page
    #[arg(long, default_value_t = DASH_COLS)]
    cols: u8,

    /// Grid rows per page
    #[arg(long, default_value_t = DASH_ROWS)]
    rows: u8,

    /// Decode every frame on the bus, not only the battery frame
    #[arg(long)]
    accept_all: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SimulatorError> {
    let tick = Duration::from_millis(args.tick_ms.max(1));
    let rx_timeout = Duration::from_millis(args.rx_timeout_ms);
    let frame_period = Duration::from_millis(args.frame_period_ms.max(1));

    let mut display: SimulatorDisplay<Rgb565> = SimulatorDisplay::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT));
    let output_settings = OutputSettingsBuilder::new().scale(args.scale.max(1)).build();
    let mut window = Window::new("Leaf CAN Dash Sim", &output_settings);

    display.clear(BLACK).ok();
    window.update(&display);

    // Dashboard first so the producer has somewhere to write
    let tree = WidgetTree::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT));
    let mut dash = LeafDashboard::with_grid(tree, args.cols, args.rows)?;
    let writers = dash.writers();

    let running = Arc::new(AtomicBool::new(true));
    let (vehicle_tx, transceiver) = virtual_bus();
    let vehicle = vehicle::spawn(vehicle_tx, frame_period, Arc::clone(&running))
        .map_err(|source| SimulatorError::Spawn { name: "vehicle", source })?;

    let config = if args.accept_all {
        DEFAULT_BUS_CONFIG
    } else {
        DEFAULT_BUS_CONFIG.with_filter(Filter::standard(LEAF_BMS_FRAME_ID))
    };
    let mut bus = CanBus::new(transceiver, config);
    if let Err(e) = bus.start() {
        halt_vehicle(vehicle);
        return Err(e.into());
    }

    let producer_running = Arc::clone(&running);
    let spawned = thread::Builder::new().name("producer".into()).spawn(move || {
        let frames = producer::run_while(&mut bus, &writers, rx_timeout, &mut ThreadDelay, || {
            producer_running.load(Ordering::Relaxed)
        });
        tracing::info!(frames, "producer stopped");
        // Dropping the bus here stops and uninstalls the transceiver
    });
    let producer = match spawned {
        Ok(handle) => handle,
        Err(source) => {
            halt_vehicle(vehicle);
            return Err(SimulatorError::Spawn { name: "producer", source });
        }
    };

    consume(&mut dash, &mut display, &mut window, tick);

    tracing::info!("shutting down");
    running.store(false, Ordering::Relaxed);
    producer.join().map_err(|_| SimulatorError::ThreadPanicked("producer"))?;
    vehicle.stop()
}

/// Stop the vehicle on an error path. The original error wins, so a panic
/// here is only logged.
fn halt_vehicle(vehicle: Vehicle) {
    if let Err(e) = vehicle.stop() {
        tracing::warn!("{e}");
    }
}

/// Consumer loop: events, display tick, redraw. Returns when the window closes.
fn consume(
    dash: &mut LeafDashboard<WidgetTree>,
    display: &mut SimulatorDisplay<Rgb565>,
    window: &mut Window,
    tick: Duration,
) {
    let mut next_flush = Instant::now();

    loop {
        let frame_start = Instant::now();

        for ev in window.events() {
            match ev {
                SimulatorEvent::Quit => return,
                SimulatorEvent::MouseButtonUp {
                    mouse_btn: MouseButton::Left,
                    point,
                } => {
                    if let Some(target) = dash.bridge_mut().hit_test(point) {
                        dash.handle_tap(target);
                    }
                }
                SimulatorEvent::KeyDown {
                    keycode: Keycode::Y,
                    repeat: false,
                    ..
                } => dash.advance(),
                _ => {}
            }
        }

        if frame_start >= next_flush {
            dash.flush();
            next_flush += tick;
            // Do not try to catch up after a stall
            if next_flush < frame_start {
                next_flush = frame_start + tick;
            }
        }

        // SimulatorDisplay drawing is infallible
        let _ = dash.bridge_mut().render_if_dirty(display);
        window.update(display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_TIME {
            thread::sleep(FRAME_TIME - elapsed);
        }
    }
}
