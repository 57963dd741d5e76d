pub mod intake;
pub mod tags;

pub use intake::*;
pub use tags::*;
