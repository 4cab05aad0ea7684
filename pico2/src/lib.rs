//! Leaf dashboard firmware library - board logic that can be tested on the
//! host machine.
//!
//! The binary (`main.rs`) wires these modules to the RP2350 peripherals.
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test -p leaf-dashboard-pico2 --lib --target x86_64-unknown-linux-gnu  # Linux/macOS
//! cargo test -p leaf-dashboard-pico2 --lib --target x86_64-pc-windows-msvc    # Windows
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the standard
//! test framework while the actual firmware runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// === Pure logic modules (testable on host, no ARM dependencies) ===

pub mod button;
pub mod config;
pub mod mcp2515;

pub use button::Debouncer;
pub use mcp2515::Mcp2515;
