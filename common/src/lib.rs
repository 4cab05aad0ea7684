//! Core logic for the Leaf CAN dashboard.
//!
//! This crate contains everything that does not depend on a specific board
//! and is shared between the desktop simulator and the Pico 2 firmware:
//!
//! - [`bus`]: CAN transceiver lifecycle (install, start, stop, teardown) and
//!   receive outcome classification
//! - [`frame`]: CAN frame type (`embedded_can::Frame`)
//! - [`template`]: printf-style display format templates
//! - [`slot`]: typed value slots shared between the CAN producer and the
//!   display consumer
//! - [`render`]: the rendering collaborator contract ([`RenderBridge`])
//! - [`screens`]: paginated grid of slots with cyclic page navigation
//! - [`widgets`]: retained `embedded-graphics` widget tree implementing
//!   [`RenderBridge`]
//! - [`leaf`]: Leaf payload decoding and the application dashboard
//! - [`producer`]: CAN receive loop feeding the slots
//! - [`config`]: layout, timing and bus defaults
//!
//! # no_std Compatibility
//!
//! The crate is `no_std` and needs `alloc` (value cells are reference counted,
//! formatted values are sized to their exact length). Tests run on the host
//! with `std`.
//!
//! # Logging
//!
//! Enable the `defmt` feature on firmware or the `log` feature on hosted
//! targets. With neither enabled all log statements compile away.

#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

extern crate alloc;

// Must stay first so the log macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod bus;
pub mod colors;
pub mod config;
pub mod frame;
pub mod leaf;
pub mod producer;
pub mod render;
pub mod screens;
pub mod slot;
pub mod styles;
pub mod template;
pub mod widgets;

#[cfg(test)]
pub(crate) mod mocks;

// Re-export commonly used items
pub use bus::{BusConfig, BusError, BusState, CanBus, DriverFault, Transceiver};
pub use frame::CanFrame;
pub use leaf::{FrameSink, LeafDashboard, LeafWriters};
pub use producer::PollOutcome;
pub use render::{GridCell, RenderBridge, TextRole};
pub use screens::ScreenSet;
pub use slot::{Reading, ValueSlot, ValueWriter};
pub use template::{Number, Template, TemplateError};
pub use widgets::{WidgetId, WidgetTree};
