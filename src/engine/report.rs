//! Report handling
//!
//! Whatever a step produces, now or after an asynchronous primitive settles,
//! goes through `handle_report`: it feeds the parent frame, gates hat
//! predicates and surfaces top-level values.

use super::promise::{Promise, Settlement};
use super::runtime::Runtime;
use super::sequencer::Sequencer;
use super::thread::{PendingReport, Thread};
use super::types::{BlockId, ThreadStatus, Value};
use tracing::{debug, warn};

/// The block a reported value came from
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub opcode: String,
    pub block_id: BlockId,
    pub is_hat: bool,
}

/// Handle a value produced by a step
pub fn handle_report(
    runtime: &mut Runtime,
    sequencer: &mut dyn Sequencer,
    thread: &mut Thread,
    value: Option<Value>,
    context: &ReportContext,
) {
    thread.push_reported_value(value.clone());

    if context.is_hat {
        let truthy = value.as_ref().map_or(false, Value::is_truthy);
        if runtime.is_edge_activated_hat(&context.opcode) {
            // A user click runs the script regardless of the edge state
            if !thread.stack_click {
                let old = runtime.update_edge_activated_value(&context.block_id, value);
                let was_truthy = old.as_ref().map_or(false, Value::is_truthy);
                if was_truthy || !truthy {
                    debug!(block_id = %context.block_id, "Edge-activated hat did not fire");
                    sequencer.retire_thread(thread);
                }
            }
        } else if !truthy {
            debug!(block_id = %context.block_id, "Hat predicate is false");
            sequencer.retire_thread(thread);
        }
    } else if let Some(value) = value {
        if thread.at_stack_top() {
            if thread.stack_click {
                runtime.visual_report(&context.block_id, value.clone());
            }
            if thread.update_monitor {
                runtime.request_update_monitor(&context.block_id, value.to_string());
            }
        }
    }

    // Producing a value finishes whatever yield cycle was computing it
    if !thread.status.is_done() {
        thread.status = ThreadStatus::Running;
    }
}

/// Park the thread on a pending primitive result
pub(crate) fn suspend(thread: &mut Thread, promise: Promise, context: ReportContext) {
    if thread.status == ThreadStatus::Running {
        thread.status = ThreadStatus::Awaiting;
    }
    thread.pending.push(PendingReport { promise, context });
}

/// Apply every pending result that has settled since the last poll.
///
/// Returns true if anything settled.
pub fn settle_pending(
    runtime: &mut Runtime,
    sequencer: &mut dyn Sequencer,
    thread: &mut Thread,
) -> bool {
    let mut settled_any = false;
    let mut index = 0;
    while index < thread.pending.len() {
        let Some(settlement) = thread.pending[index].promise.try_settle() else {
            index += 1;
            continue;
        };
        let context = thread.pending.remove(index).context;
        settled_any = true;

        match settlement {
            Settlement::Fulfilled(value) => on_fulfilled(runtime, sequencer, thread, value, &context),
            Settlement::Rejected(rejection) => {
                warn!(
                    opcode = %context.opcode,
                    block_id = %context.block_id,
                    reason = %rejection,
                    "Primitive rejected promise"
                );
                thread.status = ThreadStatus::Running;
                thread.pop_stack();
            }
        }

        if thread.status.is_done() {
            thread.pending.clear();
        }
    }
    settled_any
}

fn on_fulfilled(
    runtime: &mut Runtime,
    sequencer: &mut dyn Sequencer,
    thread: &mut Thread,
    value: Option<Value>,
    context: &ReportContext,
) {
    let had_value = value.is_some();
    handle_report(runtime, sequencer, thread, value, context);
    if thread.status.is_done() {
        // Retired by a hat predicate
        return;
    }

    if had_value {
        // Already cached on the parent frame
        thread.pop_stack();
        return;
    }

    // A command that happened to be asynchronous: move past it. Pop until a
    // popped block has a next sibling, or a loop frame is uncovered; the loop
    // is re-entered by the scheduler, not here.
    loop {
        if thread.is_stack_empty() {
            break;
        }
        let popped = thread.pop_stack();
        let next = popped.and_then(|id| {
            runtime
                .blocks_for_thread(thread)
                .and_then(|blocks| blocks.get_next_block(&id))
        });
        if next.is_some() {
            thread.push_stack(next);
            return;
        }
        match thread.peek_frame() {
            None => break,
            Some(frame) if frame.is_loop => {
                // Exhausted-body marker, popped by the scheduler before it
                // steps the loop block again
                thread.push_stack(None::<BlockId>);
                return;
            }
            Some(_) => {}
        }
    }

    thread.request_script_glow_in_frame = false;
    thread.status = ThreadStatus::Done;
}
