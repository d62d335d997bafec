//! Core types for Wardensync

mod actions;
mod directory;
mod member;

pub use actions::*;
pub use directory::*;
pub use member::*;
