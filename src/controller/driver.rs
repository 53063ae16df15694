//! Interrupt shared half of the driver.
//!
//! [`Ps2Port`] owns the [`Line`] and the bit sampler. The platform calls
//! [`Ps2Port::on_clock_edge`] from its pin change interrupt. Completed frames
//! are queued here and interpreted later in normal flow by
//! [`crate::keyboard::Keyboard`], so the interrupt handler never runs the
//! command state machine or the key event consumer.
//!
//! Every access goes through a critical section mutex, which restores the
//! previous interrupt state when the closure returns.

pub mod sampler;

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::Deque;

use super::{frame::Frame, io::Line};
use sampler::{BitSampler, EdgeEvent, Mode, TransmitStatus};

/// Received frames which can wait for normal flow before new ones are dropped.
pub const FRAME_QUEUE_DEPTH: usize = 16;

struct PortState<L> {
    line: Option<L>,
    sampler: BitSampler,
    frames: Deque<Frame, FRAME_QUEUE_DEPTH>,
    transmit_status: Option<TransmitStatus>,
    overruns: u32,
}

pub struct Ps2Port<L> {
    state: Mutex<CriticalSectionRawMutex, RefCell<PortState<L>>>,
}

impl<L> fmt::Debug for Ps2Port<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Ps2Port")
    }
}

impl<L> Ps2Port<L> {
    /// Port without a line. Edges are ignored until [`Ps2Port::attach`].
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(PortState {
                line: None,
                sampler: BitSampler::new(),
                frames: Deque::new(),
                transmit_status: None,
                overruns: 0,
            })),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PortState<L>) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }
}

impl<L> Default for Ps2Port<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Line> Ps2Port<L> {
    /// Take ownership of the line, release both wires and start listening.
    /// Returns the previously attached line with both wires released.
    pub fn attach(&self, mut line: L) -> Option<L> {
        self.with_state(|state| {
            let mut previous = state.line.take();
            if let Some(previous) = previous.as_mut() {
                state.sampler.release(previous);
            }

            state.sampler.release(&mut line);
            state.frames.clear();
            state.transmit_status = None;
            state.line = Some(line);
            previous
        })
    }

    pub fn detach(&self) -> Option<L> {
        self.with_state(|state| {
            let mut line = state.line.take()?;
            state.sampler.release(&mut line);
            Some(line)
        })
    }

    /// Pin change handler. Only falling edges matter, so notifications
    /// where the clock already reads high again are ignored.
    pub fn on_clock_edge(&self) {
        self.with_state(|state| {
            let line = match state.line.as_mut() {
                Some(line) => line,
                None => return,
            };

            if !line.clock_is_low() {
                return;
            }

            match state.sampler.on_falling_edge(line) {
                Some(EdgeEvent::FrameReceived(frame)) => {
                    if state.frames.push_back(frame).is_err() {
                        state.overruns = state.overruns.wrapping_add(1);
                    }
                }
                Some(EdgeEvent::TransmitComplete(status)) => {
                    state.transmit_status = Some(status);
                }
                None => (),
            }
        })
    }

    /// Hold the clock low. The caller keeps it there for the inhibit time
    /// and then calls [`Ps2Port::start_transmit`].
    pub fn inhibit(&self) {
        self.with_state(|state| {
            if let Some(line) = state.line.as_mut() {
                state.sampler.inhibit(line);
            }
            state.transmit_status = None;
        })
    }

    /// [`Ps2Port::inhibit`] and hand back every frame queued so far, in one
    /// critical section. No frame can complete between the two.
    pub fn seize(&self) -> Deque<Frame, FRAME_QUEUE_DEPTH> {
        self.with_state(|state| {
            if let Some(line) = state.line.as_mut() {
                state.sampler.inhibit(line);
            }
            state.transmit_status = None;
            core::mem::take(&mut state.frames)
        })
    }

    pub fn start_transmit(&self, frame: Frame) {
        self.with_state(|state| {
            if let Some(line) = state.line.as_mut() {
                state.sampler.start_transmit(frame, line);
            }
        })
    }

    /// Result of the last transmit, available once the device clocked in the
    /// ack bit.
    pub fn take_transmit_status(&self) -> Option<TransmitStatus> {
        self.with_state(|state| state.transmit_status.take())
    }

    /// Give up on a transmit the device never clocked.
    pub fn abort_transmit(&self) {
        self.with_state(|state| {
            if let Some(line) = state.line.as_mut() {
                state.sampler.release(line);
            }
            state.transmit_status = None;
        })
    }

    pub fn pop_frame(&self) -> Option<Frame> {
        self.with_state(|state| state.frames.pop_front())
    }

    pub fn pending_frames(&self) -> usize {
        self.with_state(|state| state.frames.len())
    }

    /// Frames dropped because normal flow did not drain the queue in time.
    pub fn overruns(&self) -> u32 {
        self.with_state(|state| state.overruns)
    }

    pub fn mode(&self) -> Mode {
        self.with_state(|state| state.sampler.mode())
    }
}
