//! # Template Context Generation
//!
//! Produces the records handed to the template stage: rendered peripheral
//! configurations and the board pinout.

mod peripherals;
mod pinout;

pub use peripherals::*;
pub use pinout::*;
