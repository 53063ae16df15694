use core::fmt;

/// Where a bounded wait ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPhase {
    /// The device did not clock in a host frame.
    Transmit,
    /// The device did not answer a command.
    Response,
}

/// Failure of a keyboard command.
///
/// Parity errors and scan code desynchronization never show up here; they
/// are recovered where they happen and counted in
/// [`crate::keyboard::Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The device answered with an unexpected byte.
    Protocol(u8),
    Timeout(TimeoutPhase),
    /// The device did not pull data low in the ack bit slot.
    NotAcknowledged,
    /// The device kept asking for the same byte.
    ResendLimitExceeded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Protocol(byte) => write!(f, "unexpected response byte {:#04X}", byte),
            Error::Timeout(TimeoutPhase::Transmit) => write!(f, "device did not clock in the command"),
            Error::Timeout(TimeoutPhase::Response) => write!(f, "device did not respond in time"),
            Error::NotAcknowledged => write!(f, "device did not acknowledge the frame"),
            Error::ResendLimitExceeded => write!(f, "too many resend requests"),
        }
    }
}
