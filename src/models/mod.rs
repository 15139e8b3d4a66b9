// Core data models for trendline
// These structs represent build history as read from the store

pub mod task;
pub mod stage;
pub mod build;

pub use task::*;
pub use stage::*;
pub use build::*;
