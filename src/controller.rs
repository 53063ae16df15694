//! Host side of the PS/2 wire.

pub mod driver;
pub mod frame;
pub mod io;
pub mod raw;
