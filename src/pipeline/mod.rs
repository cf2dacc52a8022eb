pub mod cancel;
pub mod executor;

pub use cancel::*;
pub use executor::*;
