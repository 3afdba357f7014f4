mod flight;
mod group;

pub use flight::*;
pub use group::*;
