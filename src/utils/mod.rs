//! Utility modules for the staff engine
//!
//! Small helpers shared by the layout configuration and the JS bindings.

pub mod numbers;

// Re-export commonly used types
pub use numbers::*;
