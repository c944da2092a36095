//! SQLite persistence for the stint time tracker.

pub mod recorder;
pub mod store;

pub use recorder::*;
pub use store::*;
