//! Thread status

use serde::{Deserialize, Serialize};

/// Execution status of a thread
///
/// ```text
/// Running ──(async primitive)──> Awaiting ──(settled)──> Running
///    │ └────(util.yield)──────> Yield ─────(next tick)──> Running
///    │                          YieldOnce ─(next tick)──> Running
///    └────(stack emptied / retired)──> Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ThreadStatus {
    /// Normal stepping, block to block
    Running = 0,
    /// A primitive returned a pending result; stepping halts until it settles
    Awaiting = 1,
    /// Pause after this tick until the scheduler resumes the same frame
    Yield = 2,
    /// Pause for exactly one tick
    YieldOnce = 3,
    /// No more blocks to execute
    Done = 4,
}

impl ThreadStatus {
    pub fn is_done(self) -> bool {
        self == ThreadStatus::Done
    }
}

impl Default for ThreadStatus {
    fn default() -> Self {
        ThreadStatus::Running
    }
}
