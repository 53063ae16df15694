//! Bit positions of the PS/2 serial frame and line timing.
//!
//! ```text
//!  bit:   0     1..=8      9       10     11
//!       start  data LSB  parity   stop   ack (host to device only)
//! ```

pub const START_BIT_POS: u8 = 0;
pub const DATA_BIT0_POS: u8 = 1;
pub const PARITY_BIT_POS: u8 = 9;
pub const STOP_BIT_POS: u8 = 10;
pub const ACK_BIT_POS: u8 = 11;

pub const START_BIT_VALUE: u16 = 0;
pub const STOP_BIT_VALUE: u16 = 1;

/// Device to host frame width.
pub const RECEIVE_FRAME_BITS: u8 = 11;

pub const DATA_MASK: u16 = 0x00FF;

/// Mask covering every bit a device to host frame can carry.
pub const FRAME_MASK: u16 = (1 << RECEIVE_FRAME_BITS) - 1;

/// Shortest time the host must hold the clock low to take the line.
pub const MIN_INHIBIT_MS: u32 = 100;
