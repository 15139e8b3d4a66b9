pub mod build;
pub mod task;

pub use build::*;
pub use task::*;
