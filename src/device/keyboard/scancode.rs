//! Scan code sequences to key events.
//!
//! Bytes accumulate in a short buffer until they form a complete make or
//! break sequence from the active table. The buffer is dropped as soon as it
//! can no longer become a known sequence, or when it reaches
//! [`MAX_SEQUENCE_LEN`] without a match.

use heapless::Vec;
use pc_keyboard::{KeyCode, KeyEvent, KeyState};

use super::raw::{Prefix, ScancodeSet};

/// Longest sequence in either table (set 2 pause).
pub const MAX_SEQUENCE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Key(KeyEvent),
    /// Valid prefix, more bytes needed.
    Pending,
    /// Complete sequence that carries no key (fake shifts).
    Ignored,
    /// Buffer dropped without a match.
    Desync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// Break code derived from the make code by the set's rule.
    Derived,
    /// Key has no break code.
    None,
}

#[derive(Debug)]
struct Entry {
    make: &'static [u8],
    key: Option<KeyCode>,
    release: Release,
}

const fn key(make: &'static [u8], key: KeyCode) -> Entry {
    Entry { make, key: Some(key), release: Release::Derived }
}

const fn make_only(make: &'static [u8], key: KeyCode) -> Entry {
    Entry { make, key: Some(key), release: Release::None }
}

/// Shift press/release wrapped around some extended keys.
const fn fake_shift(make: &'static [u8]) -> Entry {
    Entry { make, key: None, release: Release::Derived }
}

#[rustfmt::skip]
static SET_2: &[Entry] = &[
    key(&[0x76], KeyCode::Escape),
    key(&[0x05], KeyCode::F1),
    key(&[0x06], KeyCode::F2),
    key(&[0x04], KeyCode::F3),
    key(&[0x0C], KeyCode::F4),
    key(&[0x03], KeyCode::F5),
    key(&[0x0B], KeyCode::F6),
    key(&[0x83], KeyCode::F7),
    key(&[0x0A], KeyCode::F8),
    key(&[0x01], KeyCode::F9),
    key(&[0x09], KeyCode::F10),
    key(&[0x78], KeyCode::F11),
    key(&[0x07], KeyCode::F12),
    key(&[0xE0, 0x7C], KeyCode::PrintScreen),
    key(&[0x7E], KeyCode::ScrollLock),
    make_only(&[0xE1, 0x14, 0x77, 0xE1, 0xF0, 0x14, 0xF0, 0x77], KeyCode::PauseBreak),
    key(&[0x0E], KeyCode::BackTick),
    key(&[0x16], KeyCode::Key1),
    key(&[0x1E], KeyCode::Key2),
    key(&[0x26], KeyCode::Key3),
    key(&[0x25], KeyCode::Key4),
    key(&[0x2E], KeyCode::Key5),
    key(&[0x36], KeyCode::Key6),
    key(&[0x3D], KeyCode::Key7),
    key(&[0x3E], KeyCode::Key8),
    key(&[0x46], KeyCode::Key9),
    key(&[0x45], KeyCode::Key0),
    key(&[0x4E], KeyCode::Minus),
    key(&[0x55], KeyCode::Equals),
    key(&[0x66], KeyCode::Backspace),
    key(&[0x0D], KeyCode::Tab),
    key(&[0x15], KeyCode::Q),
    key(&[0x1D], KeyCode::W),
    key(&[0x24], KeyCode::E),
    key(&[0x2D], KeyCode::R),
    key(&[0x2C], KeyCode::T),
    key(&[0x35], KeyCode::Y),
    key(&[0x3C], KeyCode::U),
    key(&[0x43], KeyCode::I),
    key(&[0x44], KeyCode::O),
    key(&[0x4D], KeyCode::P),
    key(&[0x54], KeyCode::BracketSquareLeft),
    key(&[0x5B], KeyCode::BracketSquareRight),
    key(&[0x5D], KeyCode::BackSlash),
    key(&[0x58], KeyCode::CapsLock),
    key(&[0x1C], KeyCode::A),
    key(&[0x1B], KeyCode::S),
    key(&[0x23], KeyCode::D),
    key(&[0x2B], KeyCode::F),
    key(&[0x34], KeyCode::G),
    key(&[0x33], KeyCode::H),
    key(&[0x3B], KeyCode::J),
    key(&[0x42], KeyCode::K),
    key(&[0x4B], KeyCode::L),
    key(&[0x4C], KeyCode::SemiColon),
    key(&[0x52], KeyCode::Quote),
    key(&[0x5A], KeyCode::Enter),
    key(&[0x12], KeyCode::ShiftLeft),
    key(&[0x1A], KeyCode::Z),
    key(&[0x22], KeyCode::X),
    key(&[0x21], KeyCode::C),
    key(&[0x2A], KeyCode::V),
    key(&[0x32], KeyCode::B),
    key(&[0x31], KeyCode::N),
    key(&[0x3A], KeyCode::M),
    key(&[0x41], KeyCode::Comma),
    key(&[0x49], KeyCode::Fullstop),
    key(&[0x4A], KeyCode::Slash),
    key(&[0x59], KeyCode::ShiftRight),
    key(&[0x14], KeyCode::ControlLeft),
    key(&[0xE0, 0x1F], KeyCode::WindowsLeft),
    key(&[0x11], KeyCode::AltLeft),
    key(&[0x29], KeyCode::Spacebar),
    key(&[0xE0, 0x11], KeyCode::AltRight),
    key(&[0xE0, 0x27], KeyCode::WindowsRight),
    key(&[0xE0, 0x2F], KeyCode::Menus),
    key(&[0xE0, 0x14], KeyCode::ControlRight),
    key(&[0xE0, 0x70], KeyCode::Insert),
    key(&[0xE0, 0x6C], KeyCode::Home),
    key(&[0xE0, 0x7D], KeyCode::PageUp),
    key(&[0xE0, 0x71], KeyCode::Delete),
    key(&[0xE0, 0x69], KeyCode::End),
    key(&[0xE0, 0x7A], KeyCode::PageDown),
    key(&[0xE0, 0x75], KeyCode::ArrowUp),
    key(&[0xE0, 0x6B], KeyCode::ArrowLeft),
    key(&[0xE0, 0x72], KeyCode::ArrowDown),
    key(&[0xE0, 0x74], KeyCode::ArrowRight),
    key(&[0x77], KeyCode::NumpadLock),
    key(&[0xE0, 0x4A], KeyCode::NumpadSlash),
    key(&[0x7C], KeyCode::NumpadStar),
    key(&[0x7B], KeyCode::NumpadMinus),
    key(&[0x79], KeyCode::NumpadPlus),
    key(&[0xE0, 0x5A], KeyCode::NumpadEnter),
    key(&[0x71], KeyCode::NumpadPeriod),
    key(&[0x70], KeyCode::Numpad0),
    key(&[0x69], KeyCode::Numpad1),
    key(&[0x72], KeyCode::Numpad2),
    key(&[0x7A], KeyCode::Numpad3),
    key(&[0x6B], KeyCode::Numpad4),
    key(&[0x73], KeyCode::Numpad5),
    key(&[0x74], KeyCode::Numpad6),
    key(&[0x6C], KeyCode::Numpad7),
    key(&[0x75], KeyCode::Numpad8),
    key(&[0x7D], KeyCode::Numpad9),
    fake_shift(&[0xE0, 0x12]),
    fake_shift(&[0xE0, 0x59]),
];

#[rustfmt::skip]
static SET_1: &[Entry] = &[
    key(&[0x01], KeyCode::Escape),
    key(&[0x3B], KeyCode::F1),
    key(&[0x3C], KeyCode::F2),
    key(&[0x3D], KeyCode::F3),
    key(&[0x3E], KeyCode::F4),
    key(&[0x3F], KeyCode::F5),
    key(&[0x40], KeyCode::F6),
    key(&[0x41], KeyCode::F7),
    key(&[0x42], KeyCode::F8),
    key(&[0x43], KeyCode::F9),
    key(&[0x44], KeyCode::F10),
    key(&[0x57], KeyCode::F11),
    key(&[0x58], KeyCode::F12),
    key(&[0xE0, 0x37], KeyCode::PrintScreen),
    key(&[0x46], KeyCode::ScrollLock),
    make_only(&[0xE1, 0x1D, 0x45, 0xE1, 0x9D, 0xC5], KeyCode::PauseBreak),
    key(&[0x29], KeyCode::BackTick),
    key(&[0x02], KeyCode::Key1),
    key(&[0x03], KeyCode::Key2),
    key(&[0x04], KeyCode::Key3),
    key(&[0x05], KeyCode::Key4),
    key(&[0x06], KeyCode::Key5),
    key(&[0x07], KeyCode::Key6),
    key(&[0x08], KeyCode::Key7),
    key(&[0x09], KeyCode::Key8),
    key(&[0x0A], KeyCode::Key9),
    key(&[0x0B], KeyCode::Key0),
    key(&[0x0C], KeyCode::Minus),
    key(&[0x0D], KeyCode::Equals),
    key(&[0x0E], KeyCode::Backspace),
    key(&[0x0F], KeyCode::Tab),
    key(&[0x10], KeyCode::Q),
    key(&[0x11], KeyCode::W),
    key(&[0x12], KeyCode::E),
    key(&[0x13], KeyCode::R),
    key(&[0x14], KeyCode::T),
    key(&[0x15], KeyCode::Y),
    key(&[0x16], KeyCode::U),
    key(&[0x17], KeyCode::I),
    key(&[0x18], KeyCode::O),
    key(&[0x19], KeyCode::P),
    key(&[0x1A], KeyCode::BracketSquareLeft),
    key(&[0x1B], KeyCode::BracketSquareRight),
    key(&[0x2B], KeyCode::BackSlash),
    key(&[0x3A], KeyCode::CapsLock),
    key(&[0x1E], KeyCode::A),
    key(&[0x1F], KeyCode::S),
    key(&[0x20], KeyCode::D),
    key(&[0x21], KeyCode::F),
    key(&[0x22], KeyCode::G),
    key(&[0x23], KeyCode::H),
    key(&[0x24], KeyCode::J),
    key(&[0x25], KeyCode::K),
    key(&[0x26], KeyCode::L),
    key(&[0x27], KeyCode::SemiColon),
    key(&[0x28], KeyCode::Quote),
    key(&[0x1C], KeyCode::Enter),
    key(&[0x2A], KeyCode::ShiftLeft),
    key(&[0x2C], KeyCode::Z),
    key(&[0x2D], KeyCode::X),
    key(&[0x2E], KeyCode::C),
    key(&[0x2F], KeyCode::V),
    key(&[0x30], KeyCode::B),
    key(&[0x31], KeyCode::N),
    key(&[0x32], KeyCode::M),
    key(&[0x33], KeyCode::Comma),
    key(&[0x34], KeyCode::Fullstop),
    key(&[0x35], KeyCode::Slash),
    key(&[0x36], KeyCode::ShiftRight),
    key(&[0x1D], KeyCode::ControlLeft),
    key(&[0xE0, 0x5B], KeyCode::WindowsLeft),
    key(&[0x38], KeyCode::AltLeft),
    key(&[0x39], KeyCode::Spacebar),
    key(&[0xE0, 0x38], KeyCode::AltRight),
    key(&[0xE0, 0x5C], KeyCode::WindowsRight),
    key(&[0xE0, 0x5D], KeyCode::Menus),
    key(&[0xE0, 0x1D], KeyCode::ControlRight),
    key(&[0xE0, 0x52], KeyCode::Insert),
    key(&[0xE0, 0x47], KeyCode::Home),
    key(&[0xE0, 0x49], KeyCode::PageUp),
    key(&[0xE0, 0x53], KeyCode::Delete),
    key(&[0xE0, 0x4F], KeyCode::End),
    key(&[0xE0, 0x51], KeyCode::PageDown),
    key(&[0xE0, 0x48], KeyCode::ArrowUp),
    key(&[0xE0, 0x4B], KeyCode::ArrowLeft),
    key(&[0xE0, 0x50], KeyCode::ArrowDown),
    key(&[0xE0, 0x4D], KeyCode::ArrowRight),
    key(&[0x45], KeyCode::NumpadLock),
    key(&[0xE0, 0x35], KeyCode::NumpadSlash),
    key(&[0x37], KeyCode::NumpadStar),
    key(&[0x4A], KeyCode::NumpadMinus),
    key(&[0x4E], KeyCode::NumpadPlus),
    key(&[0xE0, 0x1C], KeyCode::NumpadEnter),
    key(&[0x53], KeyCode::NumpadPeriod),
    key(&[0x52], KeyCode::Numpad0),
    key(&[0x4F], KeyCode::Numpad1),
    key(&[0x50], KeyCode::Numpad2),
    key(&[0x51], KeyCode::Numpad3),
    key(&[0x4B], KeyCode::Numpad4),
    key(&[0x4C], KeyCode::Numpad5),
    key(&[0x4D], KeyCode::Numpad6),
    key(&[0x47], KeyCode::Numpad7),
    key(&[0x48], KeyCode::Numpad8),
    key(&[0x49], KeyCode::Numpad9),
    fake_shift(&[0xE0, 0x2A]),
    fake_shift(&[0xE0, 0x36]),
];

type Sequence = Vec<u8, MAX_SEQUENCE_LEN>;

impl Entry {
    fn break_code(&self, set: ScancodeSet) -> Option<Sequence> {
        if self.release == Release::None {
            return None;
        }

        let (&last, head) = self.make.split_last()?;
        let mut sequence = Sequence::new();
        sequence.extend_from_slice(head).ok()?;

        match set {
            ScancodeSet::Set1 => sequence.push(last | Prefix::SET_1_BREAK_BIT).ok()?,
            ScancodeSet::Set2 => {
                sequence.push(Prefix::BREAK).ok()?;
                sequence.push(last).ok()?;
            }
        }

        Some(sequence)
    }
}

enum Lookup {
    Make(Option<KeyCode>),
    Break(Option<KeyCode>),
    Prefix,
    Unknown,
}

fn lookup(set: ScancodeSet, sequence: &[u8]) -> Lookup {
    let table = match set {
        ScancodeSet::Set1 => SET_1,
        ScancodeSet::Set2 => SET_2,
    };

    let mut prefix = false;

    for entry in table {
        if entry.make == sequence {
            return Lookup::Make(entry.key);
        }
        prefix |= entry.make.starts_with(sequence);

        if let Some(break_code) = entry.break_code(set) {
            if break_code.as_slice() == sequence {
                return Lookup::Break(entry.key);
            }
            prefix |= break_code.starts_with(sequence);
        }
    }

    if prefix {
        Lookup::Prefix
    } else {
        Lookup::Unknown
    }
}

#[derive(Debug)]
pub struct ScancodeDecoder {
    set: ScancodeSet,
    buffer: Sequence,
}

impl ScancodeDecoder {
    /// Defaults to scancode set 2.
    pub fn new() -> Self {
        Self::with_set(ScancodeSet::Set2)
    }

    pub fn with_set(set: ScancodeSet) -> Self {
        Self { set, buffer: Sequence::new() }
    }

    pub fn set(&self) -> ScancodeSet {
        self.set
    }

    pub fn change_set(&mut self, set: ScancodeSet) {
        self.set = set;
        self.buffer.clear();
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn add_byte(&mut self, byte: u8) -> Decoded {
        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            return Decoded::Desync;
        }

        let result = match lookup(self.set, &self.buffer) {
            Lookup::Make(Some(code)) => Decoded::Key(KeyEvent::new(code, KeyState::Down)),
            Lookup::Break(Some(code)) => Decoded::Key(KeyEvent::new(code, KeyState::Up)),
            Lookup::Make(None) | Lookup::Break(None) => Decoded::Ignored,
            Lookup::Prefix if !self.buffer.is_full() => return Decoded::Pending,
            Lookup::Prefix | Lookup::Unknown => Decoded::Desync,
        };

        self.buffer.clear();
        result
    }
}

impl Default for ScancodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
