//! Core traits and types shared by every solver component.

pub mod error;
pub mod evaluation;
pub mod objective;
pub mod types;

// Re-export core types
pub use error::*;
pub use evaluation::*;
pub use objective::*;
pub use types::*;
