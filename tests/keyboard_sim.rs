//! Drives `Keyboard` against a simulated keyboard. The keyboard runs inside
//! the delay provider, so every wait the driver makes gives it a chance to
//! clock a frame in either direction.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use pc_keyboard::KeyState;
use ps2_host_keyboard::{
    controller::frame::Frame, Config, Error, KeyCode, KeyEvent, Keyboard, Line, LockStates, Ps2Port, ScancodeSet,
    TimeoutPhase,
};

#[derive(Debug, Default)]
struct Wire {
    host_clock_low: bool,
    host_data_low: bool,
    device_clock_low: bool,
    device_data_low: bool,
}

#[derive(Debug, Clone)]
struct SimLine(Rc<RefCell<Wire>>);

impl Line for SimLine {
    fn clock_is_low(&mut self) -> bool {
        let wire = self.0.borrow();
        wire.host_clock_low || wire.device_clock_low
    }

    fn data_is_high(&mut self) -> bool {
        let wire = self.0.borrow();
        !(wire.host_data_low || wire.device_data_low)
    }

    fn hold_clock_low(&mut self) {
        self.0.borrow_mut().host_clock_low = true;
    }

    fn release_clock(&mut self) {
        self.0.borrow_mut().host_clock_low = false;
    }

    fn hold_data_low(&mut self) {
        self.0.borrow_mut().host_data_low = true;
    }

    fn release_data(&mut self) {
        self.0.borrow_mut().host_data_low = false;
    }
}

#[derive(Debug)]
struct Device {
    /// Bytes clocked in from the host.
    received: Vec<u8>,
    outgoing: VecDeque<u8>,
    last_sent: u8,
    expecting_data: bool,
    /// Answer this many host bytes with a resend request.
    resend_requests: usize,
    /// Never clock in host frames.
    unresponsive_clock: bool,
    /// Clock in host frames but never answer.
    mute: bool,
    no_ack: bool,
}

impl Device {
    fn new() -> Self {
        Self {
            received: Vec::new(),
            outgoing: VecDeque::new(),
            last_sent: 0,
            expecting_data: false,
            resend_requests: 0,
            unresponsive_clock: false,
            mute: false,
            no_ack: false,
        }
    }

    fn host_byte(&mut self, byte: u8) {
        self.received.push(byte);

        if self.mute {
            return;
        }

        if self.resend_requests > 0 {
            self.resend_requests -= 1;
            self.outgoing.push_back(0xFE);
            return;
        }

        if self.expecting_data {
            self.expecting_data = false;
            self.outgoing.push_back(0xFA);
            return;
        }

        match byte {
            0xFF => self.outgoing.extend([0xFA, 0xAA]),
            0xF2 => self.outgoing.extend([0xFA, 0xAB, 0x83]),
            0xEE => self.outgoing.push_back(0xEE),
            0xFE => self.outgoing.push_back(self.last_sent),
            0xED | 0xF3 | 0xF0 => {
                self.expecting_data = true;
                self.outgoing.push_back(0xFA);
            }
            0xF4 | 0xF5 | 0xF6 => self.outgoing.push_back(0xFA),
            _ => self.outgoing.push_back(0xFE),
        }
    }
}

/// Delay provider that runs the simulated keyboard one step per call.
#[derive(Clone)]
struct Sim<'p> {
    port: &'p Ps2Port<SimLine>,
    wire: Rc<RefCell<Wire>>,
    device: Rc<RefCell<Device>>,
}

impl<'p> Sim<'p> {
    fn new(port: &'p Ps2Port<SimLine>) -> (Self, SimLine) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let sim = Sim { port, wire: wire.clone(), device: Rc::new(RefCell::new(Device::new())) };
        (sim, SimLine(wire))
    }

    fn step(&self) {
        let (host_clock_low, host_data_low) = {
            let wire = self.wire.borrow();
            (wire.host_clock_low, wire.host_data_low)
        };

        if host_clock_low {
            return;
        }

        if host_data_low {
            if !self.device.borrow().unresponsive_clock {
                self.clock_in_host_frame();
            }
            return;
        }

        let next = self.device.borrow_mut().outgoing.pop_front();
        if let Some(byte) = next {
            self.device.borrow_mut().last_sent = byte;
            self.send_frame(Frame::encode(byte));
        }
    }

    fn edge(&self) {
        self.wire.borrow_mut().device_clock_low = true;
        self.port.on_clock_edge();
        self.wire.borrow_mut().device_clock_low = false;
        // Rising edge.
        self.port.on_clock_edge();
    }

    fn clock_in_host_frame(&self) {
        let mut raw: u16 = 0;

        for index in 1..=10 {
            self.edge();
            if !self.wire.borrow().host_data_low {
                raw |= 1 << index;
            }
        }

        let ack = !self.device.borrow().no_ack;
        self.wire.borrow_mut().device_data_low = ack;
        self.edge();
        self.wire.borrow_mut().device_data_low = false;

        let frame = Frame::from_raw(raw);
        if let Ok(byte) = frame.decode() {
            self.device.borrow_mut().host_byte(byte);
        }
    }

    fn send_frame(&self, frame: Frame) {
        for index in 0..11 {
            self.wire.borrow_mut().device_data_low = !frame.bit(index);
            self.edge();
        }
        self.wire.borrow_mut().device_data_low = false;
    }

    /// Key presses typed while the host is not waiting on anything.
    fn type_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.send_frame(Frame::encode(byte));
        }
    }

    fn received(&self) -> Vec<u8> {
        self.device.borrow().received.clone()
    }
}

impl DelayNs for Sim<'_> {
    fn delay_ns(&mut self, _ns: u32) {
        self.step();
    }
}

type Events = Rc<RefCell<Vec<KeyEvent>>>;

fn keyboard<'p>(
    port: &'p Ps2Port<SimLine>,
) -> (Keyboard<'p, SimLine, Sim<'p>, impl FnMut(KeyEvent)>, Sim<'p>, Events) {
    keyboard_with_config(port, Config::default())
}

fn keyboard_with_config<'p>(
    port: &'p Ps2Port<SimLine>,
    config: Config,
) -> (Keyboard<'p, SimLine, Sim<'p>, impl FnMut(KeyEvent)>, Sim<'p>, Events) {
    let (sim, line) = Sim::new(port);
    let events: Events = Rc::default();
    let sink = events.clone();
    let keyboard = Keyboard::new(port, line, sim.clone(), config, move |event| sink.borrow_mut().push(event));

    (keyboard, sim, events)
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyState::Down)
}

fn release(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyState::Up)
}

#[test]
fn initialize_resets_and_clears_leds() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);

    keyboard.initialize().unwrap();

    assert_eq!(sim.received(), [0xFF, 0xED, 0x00]);
    assert_eq!(keyboard.lock_states(), LockStates::default());
    assert_eq!(keyboard.device_state().leds_out_of_sync(), None);
}

#[test]
fn set_leds_sends_indicator_bits() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);

    keyboard.set_leds(true, true, false).unwrap();

    assert_eq!(sim.received(), [0xED, 0b110]);
    assert_eq!(keyboard.lock_states(), LockStates { caps: true, num: true, scroll: false });
}

#[test]
fn reads_standard_keyboard_id() {
    let port = Ps2Port::new();
    let (mut keyboard, _, _) = keyboard(&port);

    assert_eq!(keyboard.read_device_id(), Ok(0x83AB));
    assert!(keyboard.device_state().is_standard_keyboard());
}

#[test]
fn typematic_out_of_range_uses_defaults() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);

    let typematic = keyboard.set_typematic_rate(7, 0x40).unwrap();

    assert_eq!(typematic.packed(), 0b0010_1011);
    assert_eq!(sim.received(), [0xF3, 0b0010_1011]);
}

#[test]
fn simple_commands() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);

    keyboard.enable().unwrap();
    keyboard.disable().unwrap();
    keyboard.restore_defaults().unwrap();
    keyboard.echo().unwrap();

    assert_eq!(sim.received(), [0xF4, 0xF5, 0xF6, 0xEE]);
}

#[test]
fn resend_last_byte_returns_repeated_byte() {
    let port = Ps2Port::new();
    let (mut keyboard, _, _) = keyboard(&port);

    keyboard.echo().unwrap();

    assert_eq!(keyboard.resend_last_byte(), Ok(0xEE));
}

#[test]
fn resend_request_is_handled_transparently() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().resend_requests = 1;

    keyboard.enable().unwrap();

    assert_eq!(sim.received(), [0xF4, 0xF4]);
}

#[test]
fn endless_resend_requests_fail() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().resend_requests = usize::MAX;

    assert_eq!(keyboard.enable(), Err(Error::ResendLimitExceeded));
    assert_eq!(sim.received().len(), 4);
}

#[test]
fn silent_device_times_out() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().mute = true;

    assert_eq!(keyboard.enable(), Err(Error::Timeout(TimeoutPhase::Response)));
}

#[test]
fn device_that_never_clocks_times_out_and_releases_lines() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().unresponsive_clock = true;

    assert_eq!(keyboard.reset(), Err(Error::Timeout(TimeoutPhase::Transmit)));

    let wire = sim.wire.borrow();
    assert!(!wire.host_clock_low);
    assert!(!wire.host_data_low);
}

#[test]
fn zero_poll_interval_still_times_out() {
    let port = Ps2Port::new();
    let config = Config { poll_interval_us: 0, ..Config::default() };
    let (mut keyboard, sim, _) = keyboard_with_config(&port, config);
    sim.device.borrow_mut().mute = true;

    assert_eq!(keyboard.enable(), Err(Error::Timeout(TimeoutPhase::Response)));

    sim.device.borrow_mut().unresponsive_clock = true;
    assert_eq!(keyboard.enable(), Err(Error::Timeout(TimeoutPhase::Transmit)));
}

#[test]
fn zero_poll_interval_still_completes_commands() {
    let port = Ps2Port::new();
    let config = Config { poll_interval_us: 0, ..Config::default() };
    let (mut keyboard, sim, _) = keyboard_with_config(&port, config);

    keyboard.set_leds(false, false, true).unwrap();

    assert_eq!(sim.received(), [0xED, 0b001]);
}

#[test]
fn missing_ack_bit_is_reported() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().no_ack = true;

    assert_eq!(keyboard.enable(), Err(Error::NotAcknowledged));
}

#[test]
fn key_events_reach_the_consumer() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);

    sim.type_bytes(&[0x1C, 0xF0, 0x1C, 0xE0, 0x75]);

    assert_eq!(keyboard.poll(), 3);
    assert_eq!(
        *events.borrow(),
        [press(KeyCode::A), release(KeyCode::A), press(KeyCode::ArrowUp)]
    );
    assert!(!keyboard.last_key_released());
}

#[test]
fn caps_lock_is_consumed_and_changes_case() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);

    assert_eq!(keyboard.translate_to_char(KeyCode::Q), Some('q'));

    sim.type_bytes(&[0x58, 0x58, 0xF0, 0x58]);
    keyboard.poll();

    assert!(events.borrow().is_empty());
    assert!(keyboard.lock_states().caps);
    assert_eq!(keyboard.translate_to_char(KeyCode::Q), Some('Q'));
    assert_eq!(keyboard.translate_to_char(KeyCode::Key1), Some('1'));

    assert_eq!(keyboard.update_leds(), Ok(true));
    assert_eq!(sim.received(), [0xED, 0b100]);
    assert_eq!(keyboard.update_leds(), Ok(false));
}

#[test]
fn scan_codes_queued_before_a_command_are_decoded() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);

    sim.type_bytes(&[0x29]);
    keyboard.enable().unwrap();

    assert_eq!(*events.borrow(), [press(KeyCode::Spacebar)]);
}

#[test]
fn queued_ack_like_scan_byte_is_not_taken_as_response() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, _) = keyboard(&port);
    sim.device.borrow_mut().mute = true;

    // Left over from an earlier exchange, still queued when the command starts.
    sim.type_bytes(&[0xFA]);

    assert_eq!(keyboard.enable(), Err(Error::Timeout(TimeoutPhase::Response)));
    assert_eq!(keyboard.diagnostics().unsolicited_bytes, 1);
}

#[test]
fn previously_attached_line_is_released() {
    let port = Ps2Port::new();
    let (sim, line) = Sim::new(&port);
    port.attach(line);
    port.inhibit();
    assert!(sim.wire.borrow().host_clock_low);

    let (_keyboard, _, _) = keyboard(&port);

    assert!(!sim.wire.borrow().host_clock_low);
}

#[test]
fn corrupted_frames_are_counted_and_dropped() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);

    let good = Frame::encode(0x1C);
    sim.send_frame(Frame::from_raw(good.raw() ^ (1 << 9)));
    sim.type_bytes(&[0x00, 0xE0, 0xE0, 0x1C]);

    assert_eq!(keyboard.poll(), 1);
    assert_eq!(*events.borrow(), [press(KeyCode::A)]);

    let diagnostics = keyboard.diagnostics();
    assert_eq!(diagnostics.parity_errors, 1);
    assert_eq!(diagnostics.unsolicited_bytes, 1);
    assert_eq!(diagnostics.desyncs, 1);
}

#[test]
fn hot_plug_self_test_requests_led_resync() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);
    keyboard.set_leds(false, true, false).unwrap();

    sim.type_bytes(&[0xAA]);
    keyboard.poll();

    assert!(events.borrow().is_empty());
    assert_eq!(keyboard.update_leds(), Ok(true));
    assert_eq!(sim.received(), [0xED, 0b010, 0xED, 0b010]);
}

#[test]
fn scancode_set_1_decoding() {
    let port = Ps2Port::new();
    let (mut keyboard, sim, events) = keyboard(&port);

    keyboard.set_scancode_set(ScancodeSet::Set1).unwrap();
    assert_eq!(sim.received(), [0xF0, 0x01]);

    sim.type_bytes(&[0xE0, 0x48, 0xE0, 0xC8, 0xAA]);
    keyboard.poll();

    assert_eq!(
        *events.borrow(),
        [press(KeyCode::ArrowUp), release(KeyCode::ArrowUp), release(KeyCode::ShiftLeft)]
    );
    assert!(keyboard.last_key_released());
}

#[test]
fn reset_returns_to_set_2() {
    let port = Ps2Port::new();
    let (mut keyboard, _, _) = keyboard(&port);

    keyboard.set_scancode_set(ScancodeSet::Set1).unwrap();
    keyboard.reset().unwrap();

    assert_eq!(keyboard.scancode_set(), ScancodeSet::Set2);
}
