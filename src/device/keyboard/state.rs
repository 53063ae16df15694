use pc_keyboard::{KeyCode, KeyEvent, KeyState};

use super::raw::{FromKeyboard, StatusIndicators, Typematic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockStates {
    pub caps: bool,
    pub num: bool,
    pub scroll: bool,
}

/// Host side view of the keyboard.
#[derive(Debug, Clone)]
pub struct DeviceState {
    leds: StatusIndicators,
    synced_leds: Option<StatusIndicators>,
    /// Lock keys which are currently up.
    released: StatusIndicators,
    typematic: Typematic,
    id: Option<u16>,
    last_key_released: bool,
}

impl DeviceState {
    pub fn new() -> Self {
        Self {
            leds: StatusIndicators::empty(),
            synced_leds: None,
            released: StatusIndicators::all(),
            typematic: Typematic::default(),
            id: None,
            last_key_released: false,
        }
    }

    pub fn lock_states(&self) -> LockStates {
        LockStates {
            caps: self.leds.contains(StatusIndicators::CAPS_LOCK),
            num: self.leds.contains(StatusIndicators::NUM_LOCK),
            scroll: self.leds.contains(StatusIndicators::SCROLL_LOCK),
        }
    }

    pub fn leds(&self) -> StatusIndicators {
        self.leds
    }

    /// LED state the keyboard has not been told about yet.
    pub fn leds_out_of_sync(&self) -> Option<StatusIndicators> {
        match self.synced_leds {
            Some(synced) if synced == self.leds => None,
            _ => Some(self.leds),
        }
    }

    pub fn leds_set(&mut self, leds: StatusIndicators) {
        self.leds = leds;
        self.synced_leds = Some(leds);
    }

    /// Keyboard restarted and lost its indicator state.
    pub fn leds_lost(&mut self) {
        self.synced_leds = None;
    }

    /// Power on defaults after reset or set default. Lock state is kept.
    pub fn defaults_restored(&mut self) {
        self.typematic = Typematic::default();
        self.synced_leds = None;
    }

    pub fn typematic(&self) -> Typematic {
        self.typematic
    }

    pub fn typematic_set(&mut self, typematic: Typematic) {
        self.typematic = typematic;
    }

    pub fn id(&self) -> Option<u16> {
        self.id
    }

    pub fn id_read(&mut self, id: u16) {
        self.id = Some(id);
    }

    /// MF2 keyboard ID, `AB 83` in arrival order.
    pub fn is_standard_keyboard(&self) -> bool {
        self.id == Some(u16::from_le_bytes([FromKeyboard::ID_FIRST_BYTE, FromKeyboard::ID_SECOND_BYTE]))
    }

    pub fn last_key_released(&self) -> bool {
        self.last_key_released
    }

    /// Track a decoded key. Returns `true` if the event is a lock key and
    /// was consumed here.
    ///
    /// A lock toggles on a press that follows a release, so typematic repeats
    /// of a held key do nothing.
    pub fn key_event(&mut self, event: &KeyEvent) -> bool {
        self.last_key_released = event.state == KeyState::Up;

        let flag = match event.code {
            KeyCode::CapsLock => StatusIndicators::CAPS_LOCK,
            KeyCode::NumpadLock => StatusIndicators::NUM_LOCK,
            KeyCode::ScrollLock => StatusIndicators::SCROLL_LOCK,
            _ => return false,
        };

        let pressed = event.state == KeyState::Down;
        if pressed && self.released.contains(flag) {
            self.leds.toggle(flag);
        }
        self.released.set(flag, !pressed);

        true
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}
