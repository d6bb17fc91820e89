//! Shared building blocks: the value type, constants, the mutation gate, the event
//! bus and small utilities.

mod constants;
mod event_bus;
mod gate;
mod util;
mod value;

pub use constants::*;
pub use event_bus::*;
pub use gate::*;
pub use util::*;
pub use value::*;
