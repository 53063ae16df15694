//! Host side PS/2 keyboard driver for bit-banged clock and data lines.
//!
//! The pin change interrupt calls [`Ps2Port::on_clock_edge`]. Everything
//! else runs in normal flow through [`Keyboard`]:
//!
//! ```ignore
//! static PORT: Ps2Port<MyLine> = Ps2Port::new();
//!
//! let mut keyboard = Keyboard::new(&PORT, line, delay, Config::default(), |event| handle(event));
//! keyboard.initialize()?;
//!
//! loop {
//!     keyboard.poll();
//!     keyboard.update_leds()?;
//! }
//! ```
//!
//! # Reference material
//! * <http://classiccomputers.info/down/IBM_PS2/documents/PS2_Hardware_Interface_Technical_Reference_May88.pdf>
//! * <https://wiki.osdev.org/PS/2_Keyboard>

#![cfg_attr(not(test), no_std)]
#![forbid(missing_debug_implementations)]

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod keyboard;

pub use pc_keyboard::{self, KeyCode, KeyEvent, KeyState};

pub use config::Config;
pub use controller::{driver::Ps2Port, io::{Line, OpenDrainLine}};
pub use device::keyboard::{
    raw::{ScancodeSet, Typematic},
    state::LockStates,
};
pub use error::{Error, TimeoutPhase};
pub use keyboard::{Diagnostics, Keyboard};
