pub mod ascii;
pub mod raw;
pub mod scancode;
pub mod state;
