//! Leaf CAN Dashboard Firmware for Raspberry Pi Pico 2 (RP2350)
//!
//! Shows the Leaf battery readings on the Pimoroni PIM715 Display Pack 2.8",
//! read from an MCP2515 CAN module on SPI1.
//!
//! # Architecture
//!
//! - Core 1: blocking producer. Waits on the MCP2515 for the battery frame and
//!   writes the readings into the value slots.
//! - Core 0: embassy executor and consumer. Every display tick it flushes the
//!   slots into the widget tree, redraws the framebuffer when something
//!   changed and pushes it to the ST7789 over DMA.
//!
//! The two cores only share the value slots, which are lock-free.
//!
//! # Button Controls
//!
//! - **Y**: Tap, shows the next page

#![no_std]
#![no_main]
// Crate-level lints (match lib.rs for consistency)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

extern crate alloc;

// Modules only used in the binary (not testable on host)
mod spi;
mod st7789;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::multicore::{Stack, spawn_core1};
use embassy_rp::spi::Spi;
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_alloc::LlffHeap as Heap;
use embedded_graphics::prelude::*;
use embedded_hal_bus::spi::ExclusiveDevice;
use leaf_dashboard_common::colors::BLACK;
use leaf_dashboard_common::config::{DISPLAY_UPDATE_INTERVAL, RECEIVE_TIMEOUT, SCREEN_HEIGHT, SCREEN_WIDTH};
use leaf_dashboard_common::{CanBus, LeafDashboard, WidgetTree, producer};
use leaf_dashboard_pico2::config::{CAN_OSC_HZ, CORE1_STACK_SIZE, FIRMWARE_BUS_CONFIG, HEAP_SIZE};
use leaf_dashboard_pico2::{Debouncer, Mcp2515};
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use crate::spi::{can_spi_config, display_spi_config};
use crate::st7789::{BUFFER_SIZE, FrameBuffer, St7789};

// =============================================================================
// Memory
// =============================================================================

// Value cells and formatted readings live on the heap
#[global_allocator]
static HEAP: Heap = Heap::empty();

/// Framebuffer (153,600 bytes), too large to build on the stack.
static FRAMEBUFFER: ConstStaticCell<[u8; BUFFER_SIZE]> = ConstStaticCell::new([0u8; BUFFER_SIZE]);

static CORE1_STACK: StaticCell<Stack<CORE1_STACK_SIZE>> = StaticCell::new();

/// Buttons are sampled this often between display ticks.
const BUTTON_POLL: Duration = Duration::from_millis(10);

fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Leaf CAN dashboard starting...");
    init_heap();
    let p = embassy_rp::init(Default::default());

    // Display: PIM715 CS=17, DC=16, CLK=18, MOSI=19, Backlight=20
    let cs = Output::new(p.PIN_17, Level::High);
    let dc = Output::new(p.PIN_16, Level::Low);
    let _backlight = Output::new(p.PIN_20, Level::High);
    let display_spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH0, display_spi_config());
    let mut panel = St7789::new(display_spi, dc, cs);
    panel.init().await;

    let mut frame = FrameBuffer::new(FRAMEBUFFER.take());
    frame.clear(BLACK).ok();
    panel.flush(&frame).await;
    info!("Display initialized");

    // Widget tree and the four Leaf readings
    let tree = WidgetTree::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT));
    let mut dash = match LeafDashboard::new(tree) {
        Ok(dash) => dash,
        Err(e) => defmt::panic!("Dashboard layout failed: {}", e),
    };

    // CAN: MCP2515 on SPI1 MISO=8, CS=9, CLK=10, MOSI=11
    let can_spi = Spi::new_blocking(p.SPI1, p.PIN_10, p.PIN_11, p.PIN_8, can_spi_config());
    let Ok(can_device) = ExclusiveDevice::new_no_delay(can_spi, Output::new(p.PIN_9, Level::High));
    let mut bus = CanBus::new(Mcp2515::new(can_device, Delay, CAN_OSC_HZ), FIRMWARE_BUS_CONFIG);

    match bus.start() {
        Ok(()) => {
            let writers = dash.writers();
            spawn_core1(p.CORE1, CORE1_STACK.init(Stack::new()), move || {
                info!("CAN producer running on core 1");
                producer::run(&mut bus, &writers, RECEIVE_TIMEOUT, &mut Delay)
            });
        }
        // Keep the display alive, every reading stays at "<no data>"
        Err(e) => error!("CAN bus unavailable: {}", e),
    }

    // Y button (active-low with internal pull-up)
    let btn_y = Input::new(p.PIN_15, Pull::Up);
    let mut y_button = Debouncer::new();

    let tick = Duration::from_millis(DISPLAY_UPDATE_INTERVAL.as_millis() as u64);
    let mut next_flush = Instant::now();

    info!("Main loop starting");
    loop {
        let now = Instant::now();

        if y_button.update(btn_y.is_low(), now.as_millis()) {
            dash.tap_visible_page();
        }

        if now >= next_flush {
            dash.flush();
            next_flush += tick;
            if next_flush < now {
                next_flush = now + tick;
            }
        }

        let Ok(redrawn) = dash.bridge_mut().render_if_dirty(&mut frame);
        if redrawn {
            panel.flush(&frame).await;
        }

        Timer::after(BUTTON_POLL).await;
    }
}
