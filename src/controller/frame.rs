//! Encoding and decoding of a single PS/2 frame.
//!
//! Data is sent LSB first between a 0 start bit and a 1 stop bit, followed by
//! an odd parity bit covering the eight data bits. Frames sent by the host
//! are additionally followed by an ack bit driven by the device, which is
//! handled by the line driver and not stored here.

use super::raw::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Parity bit does not make the total number of ones odd.
    Parity,
    /// Stop bit was not 1.
    StopBit,
}

/// Raw frame bits, bit 0 is the start bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame(u16);

impl Frame {
    pub fn encode(data: u8) -> Self {
        let mut raw = START_BIT_VALUE << START_BIT_POS;
        raw |= u16::from(data) << DATA_BIT0_POS;
        raw |= u16::from(odd_parity(data)) << PARITY_BIT_POS;
        raw |= STOP_BIT_VALUE << STOP_BIT_POS;

        Frame(raw)
    }

    /// Bits above the stop bit are discarded.
    pub const fn from_raw(raw: u16) -> Self {
        Frame(raw & FRAME_MASK)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn bit(self, index: u8) -> bool {
        (self.0 >> index) & 1 == 1
    }

    pub fn data(self) -> u8 {
        ((self.0 >> DATA_BIT0_POS) & DATA_MASK) as u8
    }

    pub fn parity_bit(self) -> bool {
        self.bit(PARITY_BIT_POS)
    }

    pub fn stop_bit(self) -> bool {
        self.bit(STOP_BIT_POS)
    }

    /// Extract the data byte. Callers must drop the frame on error.
    pub fn decode(self) -> Result<u8, FrameError> {
        let data = self.data();

        if odd_parity(data) != self.parity_bit() {
            return Err(FrameError::Parity);
        }

        if !self.stop_bit() {
            return Err(FrameError::StopBit);
        }

        Ok(data)
    }
}

/// Parity bit value which makes the number of ones in `data` plus parity odd.
pub fn odd_parity(data: u8) -> bool {
    data.count_ones() % 2 == 0
}
