//! Bit level state machine driven by falling clock edges.

use crate::controller::{
    frame::Frame,
    io::Line,
    raw::{ACK_BIT_POS, DATA_BIT0_POS, RECEIVE_FRAME_BITS, STOP_BIT_POS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Waiting for the device to start a frame.
    Idle,
    /// Between the start and stop bit of a device frame.
    Receiving,
    /// Host holds the clock low. Edges are ignored.
    Inhibiting,
    /// Device clocks in a host frame.
    Transmitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitStatus {
    Acknowledged,
    /// Data line was high in the ack bit slot.
    NotAcknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEvent {
    /// All bits of a device frame were sampled. Not yet checked.
    FrameReceived(Frame),
    TransmitComplete(TransmitStatus),
}

#[derive(Debug)]
pub struct BitSampler {
    mode: Mode,
    index: u8,
    receive_buffer: u16,
    transmit_frame: Frame,
}

impl BitSampler {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Idle,
            index: 0,
            receive_buffer: 0,
            transmit_frame: Frame::from_raw(0),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Handle one falling clock edge.
    pub fn on_falling_edge<L: Line>(&mut self, line: &mut L) -> Option<EdgeEvent> {
        match self.mode {
            Mode::Idle | Mode::Receiving => self.receive_bit(line),
            Mode::Transmitting => self.transmit_bit(line),
            Mode::Inhibiting => None,
        }
    }

    fn receive_bit<L: Line>(&mut self, line: &mut L) -> Option<EdgeEvent> {
        let bit = u16::from(line.data_is_high());
        self.receive_buffer |= bit << self.index;

        if self.index == STOP_BIT_POS {
            let frame = Frame::from_raw(self.receive_buffer);
            self.reset(Mode::Idle);
            return Some(EdgeEvent::FrameReceived(frame));
        }

        self.mode = Mode::Receiving;
        self.index = (self.index + 1) % RECEIVE_FRAME_BITS;
        None
    }

    fn transmit_bit<L: Line>(&mut self, line: &mut L) -> Option<EdgeEvent> {
        if self.index <= STOP_BIT_POS {
            if self.transmit_frame.bit(self.index) {
                line.release_data();
            } else {
                line.hold_data_low();
            }

            self.index += 1;
            return None;
        }

        debug_assert_eq!(self.index, ACK_BIT_POS);

        line.release_data();
        let status = if line.data_is_high() {
            TransmitStatus::NotAcknowledged
        } else {
            TransmitStatus::Acknowledged
        };

        self.reset(Mode::Idle);
        Some(EdgeEvent::TransmitComplete(status))
    }

    /// Pull the clock low to take the line from the device. Any partially
    /// received frame is dropped.
    pub fn inhibit<L: Line>(&mut self, line: &mut L) {
        line.hold_clock_low();
        self.reset(Mode::Inhibiting);
    }

    /// Assert the start bit and hand the clock to the device. The line must
    /// have been inhibited for the minimum inhibit time.
    pub fn start_transmit<L: Line>(&mut self, frame: Frame, line: &mut L) {
        line.hold_data_low();
        line.release_clock();

        self.reset(Mode::Transmitting);
        self.transmit_frame = frame;
        self.index = DATA_BIT0_POS;
    }

    /// Stop driving both lines and wait for the device again.
    pub fn release<L: Line>(&mut self, line: &mut L) {
        line.release_data();
        line.release_clock();
        self.reset(Mode::Idle);
    }

    fn reset(&mut self, mode: Mode) {
        self.mode = mode;
        self.index = 0;
        self.receive_buffer = 0;
    }
}

impl Default for BitSampler {
    fn default() -> Self {
        Self::new()
    }
}
