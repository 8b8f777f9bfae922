//! Threads: one running script and its call stack

use super::blocks::{Blocks, TargetId};
use super::frame::{FrameArena, FrameId, StackFrame};
use super::promise::Promise;
use super::report::ReportContext;
use super::timer::Timer;
use super::types::{BlockId, ThreadStatus, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of enclosing frames examined by `is_recursive_call`
pub const RECURSION_CHECK_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(Uuid);

impl ThreadId {
    pub fn new() -> Self {
        ThreadId(Uuid::new_v4())
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An asynchronous primitive result the thread is waiting on
#[derive(Debug)]
pub(crate) struct PendingReport {
    pub(crate) promise: Promise,
    pub(crate) context: ReportContext,
}

/// A running stack context and all the metadata needed to step it
#[derive(Debug, Default)]
pub struct Thread {
    pub id: ThreadId,

    /// Entry block of the script
    top_block: Option<BlockId>,

    frames: FrameArena,
    top: Option<FrameId>,

    pub status: ThreadStatus,

    /// Owning target, or `None` once it has been deleted
    pub target: Option<TargetId>,

    /// Whether the script should glow this tick. Reset by the scheduler.
    pub request_script_glow_in_frame: bool,

    /// Block that glows this tick, if any
    pub block_glow_in_frame: Option<BlockId>,

    /// Budget tracker while running in warp mode
    pub warp_timer: Option<Timer>,

    /// Run was explicitly triggered by the user on this script
    pub stack_click: bool,

    /// Script backs a value monitor
    pub update_monitor: bool,

    pub(crate) pending: Vec<PendingReport>,
}

impl Thread {
    /// A thread for `top_block` with an empty stack
    pub fn new(top_block: impl Into<Option<BlockId>>) -> Self {
        Self {
            id: ThreadId::new(),
            top_block: top_block.into(),
            ..Self::default()
        }
    }

    pub fn top_block(&self) -> Option<&BlockId> {
        self.top_block.as_ref()
    }

    /* ===================== Stack ===================== */

    /// Push a frame for `block_id`, inheriting warp mode from the current top
    pub fn push_stack(&mut self, block_id: impl Into<Option<BlockId>>) -> FrameId {
        let id = self.frames.alloc(block_id.into(), self.top);
        self.top = Some(id);
        id
    }

    /// Pop the top frame and return its block id; its parent becomes the top.
    /// Returns `None` on an empty stack or when the frame had no block.
    pub fn pop_stack(&mut self) -> Option<BlockId> {
        let top = self.top?;
        let frame = self.frames.free(top)?;
        self.top = frame.parent();
        frame.block_id
    }

    pub fn peek_stack(&self) -> Option<&BlockId> {
        self.peek_frame().and_then(|f| f.block_id.as_ref())
    }

    pub fn peek_frame(&self) -> Option<&StackFrame> {
        self.top.and_then(|id| self.frames.get(id))
    }

    pub fn peek_frame_mut(&mut self) -> Option<&mut StackFrame> {
        let top = self.top?;
        self.frames.get_mut(top)
    }

    pub fn top_frame_id(&self) -> Option<FrameId> {
        self.top
    }

    pub fn frame(&self, id: FrameId) -> Option<&StackFrame> {
        self.frames.get(id)
    }

    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut StackFrame> {
        self.frames.get_mut(id)
    }

    pub fn stack_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_stack_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Frames from the top down to the outermost one
    fn ancestry(&self, from: Option<FrameId>) -> impl Iterator<Item = &StackFrame> + '_ {
        let mut next = from;
        std::iter::from_fn(move || {
            let frame = self.frames.get(next?)?;
            next = frame.parent();
            Some(frame)
        })
    }

    /* ===================== Reporting and params ===================== */

    /// Hand a value to the parent frame, under the input slot it is waiting
    /// on. No-op for the outermost frame, or a parent not waiting on a slot.
    pub fn push_reported_value(&mut self, value: Option<Value>) {
        let Some(parent) = self.peek_frame().and_then(|f| f.parent()) else {
            return;
        };
        if let Some(parent) = self.frames.get_mut(parent) {
            if let Some(slot) = parent.waiting_reporter.clone() {
                parent.reported.insert(slot, value);
            }
        }
    }

    /// Bind a procedure parameter on the current frame
    pub fn push_param(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.peek_frame_mut() {
            frame.params.insert(name.into(), value);
        }
    }

    /// Innermost binding of a parameter, searching from the top frame down
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.ancestry(self.top).find_map(|f| f.params.get(name))
    }

    /* ===================== Sequencing ===================== */

    /// Whether execution is at the script's entry block
    pub fn at_stack_top(&self) -> bool {
        match (self.peek_stack(), self.top_block.as_ref()) {
            (Some(current), Some(top)) => current == top,
            _ => false,
        }
    }

    /// Move the current frame on to the next block of its sequence, in place
    pub fn go_to_next_block(&mut self, blocks: &Blocks) {
        let next = self.peek_stack().and_then(|id| blocks.get_next_block(id));
        if let Some(frame) = self.peek_frame_mut() {
            frame.reset_for(next);
        }
    }

    /// Pop frames until the stack empties or a procedure call frame is on
    /// top; the call boundary absorbs the stop.
    pub fn stop_this_script(&mut self, blocks: &Blocks) {
        while let Some(frame) = self.peek_frame() {
            let at_call = frame
                .block_id
                .as_deref()
                .and_then(|id| blocks.get_block(id))
                .map_or(false, |block| block.is_procedure_call());
            if at_call {
                break;
            }
            self.pop_stack();
        }

        if self.is_stack_empty() {
            self.request_script_glow_in_frame = false;
            self.status = ThreadStatus::Done;
        }
    }

    /// Best-effort recursion check: looks at no more than
    /// `RECURSION_CHECK_DEPTH` frames above the current one for a call to the
    /// same procedure. Deeper recursion goes unnoticed.
    pub fn is_recursive_call(&self, blocks: &Blocks, procedure_code: &str) -> bool {
        let parent = self.peek_frame().and_then(|f| f.parent());
        self.ancestry(parent)
            .take(RECURSION_CHECK_DEPTH)
            .filter_map(|frame| frame.block_id.as_deref())
            .filter_map(|id| blocks.get_block(id))
            .any(|block| block.is_procedure_call() && block.proccode() == Some(procedure_code))
    }

    /* ===================== Lifecycle ===================== */

    /// Drop every frame and mark the thread finished
    pub fn retire(&mut self) {
        self.frames.clear();
        self.top = None;
        self.pending.clear();
        self.request_script_glow_in_frame = false;
        self.status = ThreadStatus::Done;
    }

    /// Start the script over from its entry block
    pub fn restart(&mut self) {
        self.frames.clear();
        self.top = None;
        self.pending.clear();
        self.warp_timer = None;
        self.status = ThreadStatus::Running;
        let top = self.top_block.clone();
        self.push_stack(top);
    }

    pub fn is_awaiting(&self) -> bool {
        self.status == ThreadStatus::Awaiting
    }

    /// Number of asynchronous results not yet settled
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
