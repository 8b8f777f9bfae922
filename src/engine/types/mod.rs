//! Type definitions for the engine
//!
//! - Runtime values (Value)
//! - Block nodes (Block, Field, Input, Mutation)
//! - Thread status (ThreadStatus)
//! - Primitive arguments (Arguments)

pub mod args;
pub mod block;
pub mod status;
pub mod values;

// Re-export all types for convenient access
pub use args::Arguments;
pub use block::*;
pub use status::ThreadStatus;
pub use values::Value;
