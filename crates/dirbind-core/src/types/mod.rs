//! Core types for Dirbind

mod identity;
mod marker;
mod options;

pub use identity::*;
pub use marker::*;
pub use options::*;
