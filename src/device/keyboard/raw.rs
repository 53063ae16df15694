use bitflags::bitflags;

/// Host to keyboard command bytes.
#[derive(Debug)]
pub struct CommandReturnData;

impl CommandReturnData {
    pub const SET_STATUS_INDICATORS: u8 = 0xED;
    pub const ECHO: u8 = 0xEE;
    pub const SELECT_ALTERNATE_SCANCODES: u8 = 0xF0;
    pub const READ_ID: u8 = 0xF2;
    pub const SET_TYPEMATIC_RATE: u8 = 0xF3;
    pub const ENABLE: u8 = 0xF4;
    pub const DEFAULT_DISABLE: u8 = 0xF5;
    pub const SET_DEFAULT: u8 = 0xF6;
    pub const RESEND: u8 = 0xFE;
    pub const RESET: u8 = 0xFF;
}

/// Keyboard to host bytes that are not scan codes.
#[derive(Debug)]
pub struct FromKeyboard;

impl FromKeyboard {
    pub const KEY_DETECTION_OVERRUN_SCANCODE_SET_2_AND_3: u8 = 0;
    pub const ID_FIRST_BYTE: u8 = 0xAB;
    pub const ID_SECOND_BYTE: u8 = 0x83;
    pub const BAT_COMPLETION_CODE: u8 = 0xAA;
    pub const BAT_FAILURE_CODE: u8 = 0xFC;
    pub const ECHO: u8 = 0xEE;
    pub const ACK: u8 = 0xFA;
    pub const RESEND: u8 = 0xFE;
    pub const KEY_DETECTION_OVERRUN_SCANCODE_SET_1: u8 = 0xFF;
}

/// Scan code prefixes.
#[derive(Debug)]
pub struct Prefix;

impl Prefix {
    pub const EXTENDED: u8 = 0xE0;
    pub const EXTENDED_PAUSE: u8 = 0xE1;
    pub const BREAK: u8 = 0xF0;
    /// Set 1 marks a release by setting the top bit of the make code.
    pub const SET_1_BREAK_BIT: u8 = 0x80;
}

bitflags! {
    /// Data byte of the set status indicators command.
    pub struct StatusIndicators: u8 {
        const SCROLL_LOCK = 0b0000_0001;
        const NUM_LOCK = 0b0000_0010;
        const CAPS_LOCK = 0b0000_0100;
    }
}

impl StatusIndicators {
    pub fn from_locks(caps: bool, num: bool, scroll: bool) -> Self {
        let mut indicators = StatusIndicators::empty();
        indicators.set(StatusIndicators::CAPS_LOCK, caps);
        indicators.set(StatusIndicators::NUM_LOCK, num);
        indicators.set(StatusIndicators::SCROLL_LOCK, scroll);
        indicators
    }
}

/// Typematic delay and repeat rate.
///
/// Wire format: bits 0-4 rate, bits 5-6 delay, bit 7 zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Typematic {
    delay: u8,
    rate: u8,
}

impl Typematic {
    /// 30 Hz
    pub const RATE_MAX: u8 = 0;

    /// 2 Hz
    pub const RATE_MIN: u8 = 0b0001_1111;

    /// 10,9 Hz
    pub const RATE_DEFAULT: u8 = 0b0000_1011;

    /// 1000 ms
    pub const DELAY_MAX: u8 = 3;

    /// 500 ms
    pub const DELAY_DEFAULT: u8 = 1;

    const DELAY_SHIFT: u8 = 5;

    /// Out of range values are replaced with the defaults, not saturated.
    pub fn new(delay: u8, rate: u8) -> Self {
        Self {
            delay: if delay <= Self::DELAY_MAX { delay } else { Self::DELAY_DEFAULT },
            rate: if rate <= Self::RATE_MIN { rate } else { Self::RATE_DEFAULT },
        }
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn rate(&self) -> u8 {
        self.rate
    }

    pub fn delay_milliseconds(&self) -> u16 {
        250 * (u16::from(self.delay) + 1)
    }

    pub fn packed(&self) -> u8 {
        (self.delay << Self::DELAY_SHIFT) | self.rate
    }
}

impl Default for Typematic {
    fn default() -> Self {
        Self::new(Self::DELAY_DEFAULT, Self::RATE_DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ScancodeSet {
    Set1 = 1,
    /// Power on default.
    Set2 = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_bits() {
        assert_eq!(StatusIndicators::from_locks(true, false, false).bits(), 0b100);
        assert_eq!(StatusIndicators::from_locks(false, true, false).bits(), 0b010);
        assert_eq!(StatusIndicators::from_locks(false, false, true).bits(), 0b001);
        assert_eq!(StatusIndicators::from_locks(true, true, true).bits(), 0b111);
    }

    #[test]
    fn typematic_packing() {
        assert_eq!(Typematic::new(0, 0).packed(), 0x00);
        assert_eq!(Typematic::new(3, 0x1F).packed(), 0x7F);
        assert_eq!(Typematic::new(1, 0x0B).packed(), 0b0010_1011);
        assert_eq!(Typematic::default().packed(), 0b0010_1011);
    }

    #[test]
    fn out_of_range_typematic_uses_defaults() {
        let typematic = Typematic::new(4, 0x20);

        assert_eq!(typematic.delay(), Typematic::DELAY_DEFAULT);
        assert_eq!(typematic.rate(), Typematic::RATE_DEFAULT);

        let typematic = Typematic::new(2, 0xFF);
        assert_eq!(typematic.delay(), 2);
        assert_eq!(typematic.rate(), Typematic::RATE_DEFAULT);
        assert_eq!(typematic.delay_milliseconds(), 750);
    }
}
