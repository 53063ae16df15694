//! Normal flow half of the driver.
//!
//! [`Keyboard`] drains frames queued by [`Ps2Port`], runs one command
//! [`Transaction`] at a time and decodes scan code traffic between commands.
//! Every wait is bounded by the limits in [`Config`].

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, info, trace, warn};
use pc_keyboard::{KeyCode, KeyEvent};

use crate::config::Config;
use crate::controller::{
    driver::{sampler::TransmitStatus, Ps2Port},
    frame::{Frame, FrameError},
    io::Line,
};
use crate::device::{
    command::{Command, Response, SendToDevice, Status, Transaction},
    keyboard::{
        ascii,
        raw::{FromKeyboard, ScancodeSet, StatusIndicators, Typematic},
        scancode::{Decoded, ScancodeDecoder},
        state::{DeviceState, LockStates},
    },
};
use crate::error::{Error, TimeoutPhase};

/// Soft failures that were recovered without reaching the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub parity_errors: u32,
    pub stop_bit_errors: u32,
    /// Scan code buffer resets without a match.
    pub desyncs: u32,
    /// Frames dropped because the receive queue was full.
    pub overruns: u32,
    /// Self-test, overrun and stray response bytes seen outside a command.
    pub unsolicited_bytes: u32,
}

impl Diagnostics {
    fn check(&mut self, frame: Frame) -> Option<u8> {
        match frame.decode() {
            Ok(byte) => {
                trace!("received {:#04X}", byte);
                Some(byte)
            }
            Err(FrameError::Parity) => {
                warn!("parity error in frame {:#05X}", frame.raw());
                self.parity_errors = self.parity_errors.wrapping_add(1);
                None
            }
            Err(FrameError::StopBit) => {
                warn!("missing stop bit in frame {:#05X}", frame.raw());
                self.stop_bit_errors = self.stop_bit_errors.wrapping_add(1);
                None
            }
        }
    }
}

/// Transmit side of one transaction.
struct Link<'p, 'd, L, D> {
    port: &'p Ps2Port<L>,
    delay: &'d mut D,
    config: Config,
}

impl<L: Line, D: DelayNs> Link<'_, '_, L, D> {
    fn wait<T>(&mut self, timeout_ms: u32, mut ready: impl FnMut(&Ps2Port<L>) -> Option<T>) -> Option<T> {
        let budget_us = timeout_ms.saturating_mul(1000);
        // A zero interval would never use up the budget.
        let step_us = self.config.poll_interval_us.max(1);
        let mut waited_us: u32 = 0;

        loop {
            if let Some(value) = ready(self.port) {
                return Some(value);
            }
            if waited_us >= budget_us {
                return None;
            }

            self.delay.delay_us(step_us);
            waited_us = waited_us.saturating_add(step_us);
        }
    }

    fn wait_for_frame(&mut self, timeout_ms: u32) -> Option<Frame> {
        self.wait(timeout_ms, |port| port.pop_frame())
    }
}

impl<L: Line, D: DelayNs> SendToDevice for Link<'_, '_, L, D> {
    fn send(&mut self, data: u8) -> Result<(), Error> {
        trace!("sending {:#04X}", data);

        self.port.inhibit();
        self.delay.delay_ms(self.config.inhibit_ms);
        self.port.start_transmit(Frame::encode(data));

        let timeout_ms = self.config.transmit_timeout_ms;
        match self.wait(timeout_ms, |port| port.take_transmit_status()) {
            Some(TransmitStatus::Acknowledged) => Ok(()),
            Some(TransmitStatus::NotAcknowledged) => {
                warn!("byte {:#04X} was not acknowledged", data);
                Err(Error::NotAcknowledged)
            }
            None => {
                self.port.abort_transmit();
                warn!("device did not clock in byte {:#04X}", data);
                Err(Error::Timeout(TimeoutPhase::Transmit))
            }
        }
    }
}

/// Byte the device sent to finish a command with an unexpected response.
fn unexpected(response: Response) -> Error {
    let byte = match response {
        Response::Ack => FromKeyboard::ACK,
        Response::Ready => FromKeyboard::BAT_COMPLETION_CODE,
        Response::DeviceId(id) => id.to_le_bytes()[1],
        Response::Byte(byte) => byte,
    };

    Error::Protocol(byte)
}

/// PS/2 keyboard on a [`Ps2Port`].
///
/// Key events reach `consumer` only from [`Keyboard::poll`] and from the
/// drain that precedes every command. Lock keys are consumed here and
/// toggle the indicator state instead.
pub struct Keyboard<'a, L, D, K> {
    port: &'a Ps2Port<L>,
    delay: D,
    consumer: K,
    config: Config,
    decoder: ScancodeDecoder,
    state: DeviceState,
    diagnostics: Diagnostics,
}

impl<L, D, K> fmt::Debug for Keyboard<'_, L, D, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Keyboard")
            .field("config", &self.config)
            .field("decoder", &self.decoder)
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl<'a, L: Line, D: DelayNs, K: FnMut(KeyEvent)> Keyboard<'a, L, D, K> {
    /// Attach `line` to `port`. The keyboard is not touched until
    /// [`Keyboard::initialize`] or another command.
    ///
    /// A line already attached to `port` is released and dropped. Use
    /// [`Ps2Port::attach`] directly to get it back.
    pub fn new(port: &'a Ps2Port<L>, line: L, delay: D, config: Config, consumer: K) -> Self {
        if port.attach(line).is_some() {
            warn!("replaced the line attached to the port");
        }

        Self {
            port,
            delay,
            consumer,
            config,
            decoder: ScancodeDecoder::new(),
            state: DeviceState::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Reset the keyboard and turn all indicators off.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.reset()?;
        self.set_leds(false, false, false)
    }

    /// Reset and wait for the self-test result.
    pub fn reset(&mut self) -> Result<(), Error> {
        let timeout_ms = self.config.reset_timeout_ms;
        match self.execute(Command::reset(), timeout_ms)? {
            Response::Ready => {
                self.state.defaults_restored();
                self.decoder.change_set(ScancodeSet::Set2);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    pub fn enable(&mut self) -> Result<(), Error> {
        self.execute_ack(Command::enable())
    }

    /// Stop scanning. The keyboard also restores its default settings.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.execute_ack(Command::default_disable())?;
        self.state.defaults_restored();
        Ok(())
    }

    pub fn restore_defaults(&mut self) -> Result<(), Error> {
        self.execute_ack(Command::set_default())?;
        self.state.defaults_restored();
        Ok(())
    }

    pub fn set_leds(&mut self, caps: bool, num: bool, scroll: bool) -> Result<(), Error> {
        self.set_indicators(StatusIndicators::from_locks(caps, num, scroll))
    }

    /// Out of range values are replaced with the defaults. Returns the
    /// setting that was sent.
    pub fn set_typematic_rate(&mut self, delay: u8, rate: u8) -> Result<Typematic, Error> {
        let typematic = Typematic::new(delay, rate);
        self.execute_ack(Command::set_typematic_rate(typematic))?;
        self.state.typematic_set(typematic);
        Ok(typematic)
    }

    /// Keyboard ID with the first received byte in the low half, `0x83AB`
    /// for a standard MF2 keyboard.
    pub fn read_device_id(&mut self) -> Result<u16, Error> {
        let timeout_ms = self.config.response_timeout_ms;
        match self.execute(Command::read_id(), timeout_ms)? {
            Response::DeviceId(id) => {
                self.state.id_read(id);
                Ok(id)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Ask the keyboard to send its last byte again and return it.
    pub fn resend_last_byte(&mut self) -> Result<u8, Error> {
        let timeout_ms = self.config.response_timeout_ms;
        match self.execute(Command::resend(), timeout_ms)? {
            Response::Byte(byte) => Ok(byte),
            other => Err(unexpected(other)),
        }
    }

    /// Presence check.
    pub fn echo(&mut self) -> Result<(), Error> {
        let timeout_ms = self.config.response_timeout_ms;
        match self.execute(Command::echo(), timeout_ms)? {
            Response::Byte(_) => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn set_scancode_set(&mut self, set: ScancodeSet) -> Result<(), Error> {
        self.execute_ack(Command::select_scancode_set(set))?;
        self.decoder.change_set(set);
        Ok(())
    }

    /// Send the indicator state if lock keys changed it since the last
    /// acknowledged update. Returns `true` if a command was sent.
    pub fn update_leds(&mut self) -> Result<bool, Error> {
        match self.state.leds_out_of_sync() {
            Some(leds) => self.set_indicators(leds).map(|()| true),
            None => Ok(false),
        }
    }

    /// Decode every queued frame. Returns how many key events were passed to
    /// the consumer.
    pub fn poll(&mut self) -> usize {
        let mut delivered = 0;

        while let Some(frame) = self.port.pop_frame() {
            if self.scan_frame(frame) {
                delivered += 1;
            }
        }

        delivered
    }

    pub fn lock_states(&self) -> LockStates {
        self.state.lock_states()
    }

    pub fn translate_to_char(&self, code: KeyCode) -> Option<char> {
        ascii::translate_to_char(code, self.state.lock_states().caps)
    }

    pub fn last_key_released(&self) -> bool {
        self.state.last_key_released()
    }

    pub fn device_state(&self) -> &DeviceState {
        &self.state
    }

    pub fn scancode_set(&self) -> ScancodeSet {
        self.decoder.set()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            overruns: self.port.overruns(),
            ..self.diagnostics
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Detach the line from the port.
    pub fn free(self) -> (Option<L>, D) {
        (self.port.detach(), self.delay)
    }

    fn set_indicators(&mut self, leds: StatusIndicators) -> Result<(), Error> {
        self.execute_ack(Command::set_status_indicators(leds))?;
        self.state.leds_set(leds);
        Ok(())
    }

    fn execute_ack(&mut self, command: Command) -> Result<(), Error> {
        let timeout_ms = self.config.response_timeout_ms;
        match self.execute(command, timeout_ms)? {
            Response::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn execute(&mut self, command: Command, timeout_ms: u32) -> Result<Response, Error> {
        // Scan codes queued before the line is taken belong to the decoder,
        // not to this command. Nothing new completes while the clock is low.
        let mut pending = self.port.seize();
        while let Some(frame) = pending.pop_front() {
            self.scan_frame(frame);
        }

        let command_byte = command.command_byte();
        debug!("command {:#04X}", command_byte);

        let result = self.run_transaction(command, timeout_ms);
        match &result {
            Ok(response) => debug!("command {:#04X} finished with {:?}", command_byte, response),
            Err(e) => warn!("command {:#04X} failed: {}", command_byte, e),
        }

        result
    }

    fn run_transaction(&mut self, command: Command, timeout_ms: u32) -> Result<Response, Error> {
        let mut link = Link {
            port: self.port,
            delay: &mut self.delay,
            config: self.config,
        };

        let mut transaction = Transaction::start(command, self.config.max_resends, &mut link)?;

        loop {
            let frame = link
                .wait_for_frame(timeout_ms)
                .ok_or(Error::Timeout(TimeoutPhase::Response))?;

            let byte = match self.diagnostics.check(frame) {
                Some(byte) => byte,
                None => continue,
            };

            if let Status::CommandFinished(response) = transaction.receive_data(byte, &mut link)? {
                return Ok(response);
            }
        }
    }

    fn scan_frame(&mut self, frame: Frame) -> bool {
        match self.diagnostics.check(frame) {
            Some(byte) => self.scan_byte(byte),
            None => false,
        }
    }

    /// Returns `true` if a key event was passed to the consumer.
    fn scan_byte(&mut self, byte: u8) -> bool {
        if self.decoder.pending().is_empty() && self.unsolicited(byte) {
            return false;
        }

        match self.decoder.add_byte(byte) {
            Decoded::Key(event) => {
                if self.state.key_event(&event) {
                    trace!("lock key {:?} {:?}", event.code, event.state);
                    return false;
                }

                (self.consumer)(event);
                true
            }
            Decoded::Desync => {
                warn!("scan code desync at {:#04X}", byte);
                self.diagnostics.desyncs = self.diagnostics.desyncs.wrapping_add(1);
                false
            }
            Decoded::Pending | Decoded::Ignored => false,
        }
    }

    /// Bytes the keyboard sends on its own that are not scan codes.
    fn unsolicited(&mut self, byte: u8) -> bool {
        match byte {
            // In set 1 this is the left shift break code.
            FromKeyboard::BAT_COMPLETION_CODE if self.decoder.set() == ScancodeSet::Set2 => {
                info!("keyboard completed self-test, indicators need resync");
                self.state.leds_lost();
            }
            FromKeyboard::BAT_FAILURE_CODE => warn!("keyboard self-test failed"),
            FromKeyboard::KEY_DETECTION_OVERRUN_SCANCODE_SET_2_AND_3
            | FromKeyboard::KEY_DETECTION_OVERRUN_SCANCODE_SET_1 => warn!("keyboard key detection overrun"),
            FromKeyboard::ACK | FromKeyboard::RESEND => debug!("stray response {:#04X}", byte),
            _ => return false,
        }

        self.diagnostics.unsolicited_bytes = self.diagnostics.unsolicited_bytes.wrapping_add(1);
        true
    }
}
