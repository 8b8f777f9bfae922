//! # Engine - Block Execution Core
//!
//! Turns trees of blocks into effects one step at a time, across many
//! cooperatively interleaved threads.
//!
//! ## Core Principles
//!
//! 1. **Frames in an arena**: a thread's call stack is a parent-pointing chain
//!    of `StackFrame`s addressed by `FrameId`
//! 2. **Single-step evaluation**: `execute` does one unit of work and recurses
//!    only into unevaluated inputs
//! 3. **Explicit suspension**: primitives return `Reported::Immediate` or
//!    `Reported::Pending`; a pending result parks the thread as `Awaiting`
//!    with all partial input state kept in its frames
//! 4. **Narrow capabilities**: primitives only see a `BlockUtility`
//!
//! The tick scheduler (`TickSequencer`) and the core primitives (`stdlib`) are
//! reference collaborators; hosts can supply their own through the
//! `Sequencer` trait and `Runtime::register_primitive`.

pub mod blocks;
pub mod errors;
pub mod execute;
pub mod frame;
pub mod io;
pub mod promise;
pub mod report;
pub mod runtime;
pub mod sequencer;
pub mod stdlib;
pub mod thread;
pub mod timer;
pub mod types;
pub mod utility;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use blocks::{Blocks, Project, Target, TargetId};
pub use errors::{EngineError, Rejection};
pub use execute::execute;
pub use frame::{ExecutionContext, FrameId, StackFrame};
pub use io::IoDevice;
pub use promise::{promise, Promise, Reported, Resolver, Settlement};
pub use report::{handle_report, settle_pending, ReportContext};
pub use runtime::{BlockSource, HatInfo, Primitive, Runtime, RuntimeEvent};
pub use sequencer::{Sequencer, TickSequencer};
pub use thread::{Thread, ThreadId};
pub use types::{Arguments, Block, BlockId, ThreadStatus, Value};
pub use utility::BlockUtility;
