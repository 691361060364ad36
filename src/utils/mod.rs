mod display;
mod interrupts;

pub use display::*;
pub use interrupts::TurnInterrupts;
