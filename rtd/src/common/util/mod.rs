mod clock;
mod name_utils;
mod shared;

pub use clock::*;
pub use name_utils::*;
pub use shared::*;
