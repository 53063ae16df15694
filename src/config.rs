use crate::controller::raw::MIN_INHIBIT_MS;

/// Timing and retry limits of [`crate::keyboard::Keyboard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// How long the clock is held low before each host frame.
    pub inhibit_ms: u32,
    /// Bound on the device clocking in one host frame.
    pub transmit_timeout_ms: u32,
    /// Bound on each awaited response byte.
    pub response_timeout_ms: u32,
    /// Bound on the self-test result after a reset.
    pub reset_timeout_ms: u32,
    /// Delay between checks while waiting.
    pub poll_interval_us: u32,
    /// Resend requests honoured per command.
    pub max_resends: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inhibit_ms: 110,
            transmit_timeout_ms: 25,
            response_timeout_ms: 50,
            reset_timeout_ms: 1000,
            poll_interval_us: 100,
            max_resends: 3,
        }
    }
}

impl Config {
    /// Values below the 100 ms minimum are raised to it.
    pub fn with_inhibit_ms(mut self, inhibit_ms: u32) -> Self {
        self.inhibit_ms = inhibit_ms.max(MIN_INHIBIT_MS);
        self
    }

    pub fn with_transmit_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.transmit_timeout_ms = timeout_ms;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_reset_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.reset_timeout_ms = timeout_ms;
        self
    }

    /// Zero is treated as one microsecond.
    pub fn with_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.poll_interval_us = interval_us.max(1);
        self
    }

    pub fn with_max_resends(mut self, max_resends: u8) -> Self {
        self.max_resends = max_resends;
        self
    }
}
