//! Command/response state machine for a single keyboard command.

use super::keyboard::raw::{CommandReturnData, FromKeyboard, ScancodeSet, StatusIndicators, Typematic};
use crate::error::Error;

/// Byte level transmit seam. Implementations block until the device has
/// clocked in the frame.
pub trait SendToDevice {
    fn send(&mut self, data: u8) -> Result<(), Error>;
}

/// Terminal result of a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    Ack,
    /// Self-test passed after reset.
    Ready,
    /// Two ID bytes, first received byte in the low half.
    DeviceId(u16),
    Byte(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AckResponse { command: u8 },
    Reset { state: ResetState },
    AckResponseWithReturnTwoBytes { command: u8, byte1: u8, state: AckResponseWithReturnTwoBytesState },
    SendCommandAndData { command: u8, data: u8, state: SendCommandAndDataState },
    /// Any byte (or the `expected` one) ends the command.
    ReturnByte { command: u8, expected: Option<u8> },
}

impl Command {
    pub fn reset() -> Self {
        Command::Reset { state: ResetState::WaitAck }
    }

    pub fn enable() -> Self {
        Command::AckResponse { command: CommandReturnData::ENABLE }
    }

    pub fn default_disable() -> Self {
        Command::AckResponse { command: CommandReturnData::DEFAULT_DISABLE }
    }

    pub fn set_default() -> Self {
        Command::AckResponse { command: CommandReturnData::SET_DEFAULT }
    }

    pub fn read_id() -> Self {
        Command::AckResponseWithReturnTwoBytes {
            command: CommandReturnData::READ_ID,
            byte1: 0,
            state: AckResponseWithReturnTwoBytesState::WaitAck,
        }
    }

    pub fn set_status_indicators(indicators: StatusIndicators) -> Self {
        Self::command_and_data(CommandReturnData::SET_STATUS_INDICATORS, indicators.bits())
    }

    pub fn set_typematic_rate(typematic: Typematic) -> Self {
        Self::command_and_data(CommandReturnData::SET_TYPEMATIC_RATE, typematic.packed())
    }

    pub fn select_scancode_set(set: ScancodeSet) -> Self {
        Self::command_and_data(CommandReturnData::SELECT_ALTERNATE_SCANCODES, set as u8)
    }

    pub fn echo() -> Self {
        Command::ReturnByte { command: CommandReturnData::ECHO, expected: Some(FromKeyboard::ECHO) }
    }

    /// Ask the device to repeat the last byte it sent.
    pub fn resend() -> Self {
        Command::ReturnByte { command: CommandReturnData::RESEND, expected: None }
    }

    fn command_and_data(command: u8, data: u8) -> Self {
        Command::SendCommandAndData { command, data, state: SendCommandAndDataState::WaitAck1 }
    }

    pub fn command_byte(&self) -> u8 {
        match self {
            Command::AckResponse { command }
            | Command::AckResponseWithReturnTwoBytes { command, .. }
            | Command::SendCommandAndData { command, .. }
            | Command::ReturnByte { command, .. } => *command,
            Command::Reset { .. } => CommandReturnData::RESET,
        }
    }

    /// `false` while the device is sending data bytes, where `0xFE` is
    /// payload and not a resend request.
    fn accepts_resend(&self) -> bool {
        !matches!(
            self,
            Command::Reset { state: ResetState::WaitSelfTest }
                | Command::AckResponseWithReturnTwoBytes {
                    state: AckResponseWithReturnTwoBytesState::WaitFirstByte
                        | AckResponseWithReturnTwoBytesState::WaitSecondByte,
                    ..
                }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    WaitAck,
    WaitSelfTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckResponseWithReturnTwoBytesState {
    WaitAck,
    WaitFirstByte,
    WaitSecondByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCommandAndDataState {
    WaitAck1,
    WaitAck2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    CommandInProgress,
    CommandFinished(Response),
}

/// One in-flight command. Owns retransmission of the last sent byte.
#[derive(Debug)]
pub struct Transaction {
    command: Command,
    last_sent: u8,
    resends: u8,
    max_resends: u8,
}

impl Transaction {
    /// Send the command byte and start waiting for the response.
    pub fn start<T: SendToDevice>(command: Command, max_resends: u8, device: &mut T) -> Result<Self, Error> {
        let first = command.command_byte();
        device.send(first)?;

        Ok(Self {
            command,
            last_sent: first,
            resends: 0,
            max_resends,
        })
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Feed one response byte. An `Err` is terminal.
    pub fn receive_data<T: SendToDevice>(&mut self, new_data: u8, device: &mut T) -> Result<Status, Error> {
        if new_data == FromKeyboard::RESEND && self.command.accepts_resend() {
            self.resend(device)?;
            return Ok(Status::CommandInProgress);
        }

        let mut next_byte = None;

        let status = match &mut self.command {
            Command::AckResponse { .. } => {
                if new_data == FromKeyboard::ACK {
                    Status::CommandFinished(Response::Ack)
                } else {
                    return Err(Error::Protocol(new_data));
                }
            }
            Command::Reset { state: s @ ResetState::WaitAck } => match new_data {
                FromKeyboard::ACK => {
                    *s = ResetState::WaitSelfTest;
                    Status::CommandInProgress
                }
                // Some keyboards skip the ack and report the self-test directly.
                FromKeyboard::BAT_COMPLETION_CODE => Status::CommandFinished(Response::Ready),
                _ => return Err(Error::Protocol(new_data)),
            },
            Command::Reset { state: ResetState::WaitSelfTest } => {
                if new_data == FromKeyboard::BAT_COMPLETION_CODE {
                    Status::CommandFinished(Response::Ready)
                } else {
                    return Err(Error::Protocol(new_data));
                }
            }
            Command::AckResponseWithReturnTwoBytes { state: s @ AckResponseWithReturnTwoBytesState::WaitAck, .. } => {
                if new_data == FromKeyboard::ACK {
                    *s = AckResponseWithReturnTwoBytesState::WaitFirstByte;
                    Status::CommandInProgress
                } else {
                    return Err(Error::Protocol(new_data));
                }
            }
            Command::AckResponseWithReturnTwoBytes { state: s @ AckResponseWithReturnTwoBytesState::WaitFirstByte, byte1, .. } => {
                *s = AckResponseWithReturnTwoBytesState::WaitSecondByte;
                *byte1 = new_data;
                Status::CommandInProgress
            }
            Command::AckResponseWithReturnTwoBytes { state: AckResponseWithReturnTwoBytesState::WaitSecondByte, byte1, .. } => {
                Status::CommandFinished(Response::DeviceId(u16::from_le_bytes([*byte1, new_data])))
            }
            Command::SendCommandAndData { state: s @ SendCommandAndDataState::WaitAck1, data, .. } => {
                if new_data == FromKeyboard::ACK {
                    *s = SendCommandAndDataState::WaitAck2;
                    next_byte = Some(*data);
                    Status::CommandInProgress
                } else {
                    return Err(Error::Protocol(new_data));
                }
            }
            Command::SendCommandAndData { state: SendCommandAndDataState::WaitAck2, .. } => {
                if new_data == FromKeyboard::ACK {
                    Status::CommandFinished(Response::Ack)
                } else {
                    return Err(Error::Protocol(new_data));
                }
            }
            Command::ReturnByte { expected, .. } => match expected {
                Some(expected) if *expected != new_data => return Err(Error::Protocol(new_data)),
                _ => Status::CommandFinished(Response::Byte(new_data)),
            },
        };

        if let Some(data) = next_byte {
            self.last_sent = data;
            self.resends = 0;
            device.send(data)?;
        }

        Ok(status)
    }

    fn resend<T: SendToDevice>(&mut self, device: &mut T) -> Result<(), Error> {
        if self.resends >= self.max_resends {
            return Err(Error::ResendLimitExceeded);
        }

        self.resends += 1;
        device.send(self.last_sent)
    }
}
