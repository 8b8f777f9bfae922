//! Stack frames and the arena that owns them
//!
//! A thread's call stack is a chain of frames where every frame points at its
//! parent. Frames live in a per-thread arena and refer to their parent by
//! handle, so the chain never owns anything above it and children never hold
//! a reference back into the thread.

use super::types::{BlockId, Value};
use std::collections::HashMap;

/// Scratch state owned by the primitive running in a frame (loop counters,
/// timers). Survives re-entrant steps of the same frame and is wiped when the
/// frame advances to its next block.
pub type ExecutionContext = HashMap<String, Value>;

/// Handle to a frame in a `FrameArena`.
///
/// The generation makes a handle to a popped frame stale even after its slot
/// has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: usize,
    generation: u32,
}

/// One pending block evaluation
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    /// Block this frame evaluates. `None` marks an exhausted body (the end of
    /// a sequence or an empty branch) waiting to be popped by the scheduler.
    pub block_id: Option<BlockId>,

    parent: Option<FrameId>,

    /// This frame's block is a loop whose body is running above it
    pub is_loop: bool,

    /// Inherited from the parent at push time, never recomputed
    pub warp_mode: bool,

    /// Input slot name -> value already produced for it in this pass.
    /// `Some(None)` means the input was evaluated and reported nothing.
    pub reported: HashMap<String, Option<Value>>,

    /// Input slot the child frame is currently filling
    pub waiting_reporter: Option<String>,

    /// Procedure parameter bindings introduced at this level
    pub params: HashMap<String, Value>,

    pub execution_context: ExecutionContext,
}

impl StackFrame {
    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    /// Reset the per-block state when the frame moves on to another block.
    /// Warp mode is a property of the level, not the block, and is kept.
    pub(crate) fn reset_for(&mut self, block_id: Option<BlockId>) {
        self.block_id = block_id;
        self.is_loop = false;
        self.reported.clear();
        self.waiting_reporter = None;
        self.params.clear();
        self.execution_context.clear();
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    frame: Option<StackFrame>,
}

/// Storage for the frames of one thread
#[derive(Debug, Clone, Default)]
pub struct FrameArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a frame for `block_id` whose parent is `parent`.
    /// Warp mode is copied from the parent, or off when there is none.
    pub fn alloc(&mut self, block_id: Option<BlockId>, parent: Option<FrameId>) -> FrameId {
        let warp_mode = parent
            .and_then(|p| self.get(p))
            .map_or(false, |p| p.warp_mode);

        let frame = StackFrame {
            block_id,
            parent,
            warp_mode,
            ..StackFrame::default()
        };

        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.frame = Some(frame);
                FrameId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    frame: Some(frame),
                });
                FrameId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Release a frame, returning it. Stale handles yield `None`.
    pub fn free(&mut self, id: FrameId) -> Option<StackFrame> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let frame = slot.frame.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(frame)
    }

    pub fn get(&self, id: FrameId) -> Option<&StackFrame> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_ref())
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut StackFrame> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.frame.as_mut())
    }

    /// Number of frames currently allocated
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Release every frame. Slots are kept so that handles issued before the
    /// clear stay stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.frame.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index);
        }
        self.live = 0;
    }
}
