//! US layout printable characters, unshifted.

use pc_keyboard::KeyCode;

/// Character for `code`, or `None` for keys without one.
///
/// Caps lock upper cases letters only. Digits and punctuation are never
/// shifted because shift state is left to the key event consumer.
pub fn translate_to_char(code: KeyCode, caps_lock: bool) -> Option<char> {
    let c = printable(code)?;

    if caps_lock && c.is_ascii_alphabetic() {
        Some(c.to_ascii_uppercase())
    } else {
        Some(c)
    }
}

fn printable(code: KeyCode) -> Option<char> {
    let c = match code {
        KeyCode::BackTick => '`',
        KeyCode::Key1 | KeyCode::Numpad1 => '1',
        KeyCode::Key2 | KeyCode::Numpad2 => '2',
        KeyCode::Key3 | KeyCode::Numpad3 => '3',
        KeyCode::Key4 | KeyCode::Numpad4 => '4',
        KeyCode::Key5 | KeyCode::Numpad5 => '5',
        KeyCode::Key6 | KeyCode::Numpad6 => '6',
        KeyCode::Key7 | KeyCode::Numpad7 => '7',
        KeyCode::Key8 | KeyCode::Numpad8 => '8',
        KeyCode::Key9 | KeyCode::Numpad9 => '9',
        KeyCode::Key0 | KeyCode::Numpad0 => '0',
        KeyCode::Minus | KeyCode::NumpadMinus => '-',
        KeyCode::Equals => '=',
        KeyCode::Backspace => '\u{8}',
        KeyCode::Tab => '\t',
        KeyCode::Q => 'q',
        KeyCode::W => 'w',
        KeyCode::E => 'e',
        KeyCode::R => 'r',
        KeyCode::T => 't',
        KeyCode::Y => 'y',
        KeyCode::U => 'u',
        KeyCode::I => 'i',
        KeyCode::O => 'o',
        KeyCode::P => 'p',
        KeyCode::BracketSquareLeft => '[',
        KeyCode::BracketSquareRight => ']',
        KeyCode::BackSlash => '\\',
        KeyCode::A => 'a',
        KeyCode::S => 's',
        KeyCode::D => 'd',
        KeyCode::F => 'f',
        KeyCode::G => 'g',
        KeyCode::H => 'h',
        KeyCode::J => 'j',
        KeyCode::K => 'k',
        KeyCode::L => 'l',
        KeyCode::SemiColon => ';',
        KeyCode::Quote => '\'',
        KeyCode::Enter | KeyCode::NumpadEnter => '\n',
        KeyCode::Z => 'z',
        KeyCode::X => 'x',
        KeyCode::C => 'c',
        KeyCode::V => 'v',
        KeyCode::B => 'b',
        KeyCode::N => 'n',
        KeyCode::M => 'm',
        KeyCode::Comma => ',',
        KeyCode::Fullstop | KeyCode::NumpadPeriod => '.',
        KeyCode::Slash | KeyCode::NumpadSlash => '/',
        KeyCode::Spacebar => ' ',
        KeyCode::NumpadStar => '*',
        KeyCode::NumpadPlus => '+',
        KeyCode::Escape => '\u{1B}',
        KeyCode::Delete => '\u{7F}',
        _ => return None,
    };

    Some(c)
}
