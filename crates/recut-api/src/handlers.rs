//! Request handlers.

pub mod health;
pub mod process;
pub mod trim;

pub use health::*;
pub use process::*;
pub use trim::*;
