pub mod document;
pub mod state;

pub use document::*;
pub use state::*;
