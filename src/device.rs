pub mod command;
pub mod keyboard;
