pub mod render;
pub mod retrieve;
pub mod summarize;
pub mod synthesize;

pub use render::*;
pub use retrieve::*;
pub use summarize::*;
pub use synthesize::*;
