//! Single-step evaluator
//!
//! `execute` performs one unit of work on a thread's top frame: resolve a
//! literal, evaluate unevaluated inputs (recursing into itself for each one),
//! or invoke the block's primitive.
//!
//! Input evaluation can suspend. When a nested input leaves the thread
//! `Awaiting`, every active `execute` call returns straight away and the
//! frames stay where they are. The next step re-enters the same block, finds
//! the inputs that already reported in `frame.reported`, and carries on from
//! the one still missing.

use super::errors::EngineError;
use super::frame::FrameId;
use super::promise::Reported;
use super::report::{handle_report, suspend, ReportContext};
use super::runtime::{BlockSource, Runtime};
use super::sequencer::Sequencer;
use super::thread::Thread;
use super::types::{Arguments, Block, ThreadStatus, CUSTOM_BLOCK_INPUT};
use super::utility::BlockUtility;
use tracing::{debug, trace, warn};

/* ===================== Public API ===================== */

/// Execute the block on top of `thread`'s stack
///
/// Missing targets and blocks retire the thread; unknown opcodes and
/// unimplemented primitives are logged and skipped. The only error returned
/// is a fault raised synchronously by a primitive.
pub fn execute(
    runtime: &mut Runtime,
    sequencer: &mut dyn Sequencer,
    thread: &mut Thread,
) -> Result<(), EngineError> {
    // Stop if the target no longer exists
    let target_alive = thread
        .target
        .as_deref()
        .map_or(false, |id| runtime.has_target(id));
    if !target_alive {
        debug!(thread_id = %thread.id, "Target is gone; retiring thread");
        sequencer.retire_thread(thread);
        return Ok(());
    }

    let (Some(frame_id), Some(block_id)) = (thread.top_frame_id(), thread.peek_stack().cloned()) else {
        return Ok(());
    };

    let Some(primary) = Runtime::primary_source(thread) else {
        sequencer.retire_thread(thread);
        return Ok(());
    };
    let Some((source, block)) = runtime
        .lookup_block(&primary, &block_id)
        .map(|(source, block)| (source, block.clone()))
    else {
        debug!(thread_id = %thread.id, block_id = %block_id, "Block not found; retiring thread");
        sequencer.retire_thread(thread);
        return Ok(());
    };

    let Some(opcode) = block.opcode.clone() else {
        warn!(block_id = %block_id, "Could not get opcode for block");
        return Ok(());
    };
    let primitive = runtime.get_opcode_function(&opcode);
    let context = ReportContext {
        is_hat: runtime.is_hat(&opcode),
        opcode,
        block_id,
    };

    // Hats and single-field shadows have no primitive of their own. A hat
    // without a predicate is skipped; its body runs on its own. A block with
    // one field and no inputs is a literal.
    let Some(primitive) = primitive else {
        if context.is_hat {
            return Ok(());
        }
        match literal_value(&block) {
            Some(value) => handle_report(runtime, sequencer, thread, Some(value), &context),
            None => warn!(opcode = %context.opcode, "Could not get implementation for opcode"),
        }
        thread.request_script_glow_in_frame = true;
        return Ok(());
    };

    let mut args = Arguments::from_fields(&block.fields);
    if evaluate_inputs(runtime, sequencer, thread, frame_id, &block, &mut args)? {
        return Ok(());
    }

    if let Some(mutation) = block.mutation.clone() {
        args.set_mutation(mutation);
    }

    // Later executions of this frame (on return from a branch, or after
    // advancing to the next block) must derive fresh inputs
    if let Some(frame) = thread.frame_mut(frame_id) {
        frame.reported.clear();
    }

    trace!(opcode = %context.opcode, block_id = %context.block_id, "Invoking primitive");
    let reported = {
        let mut util = BlockUtility::new(runtime, sequencer, thread, frame_id, source);
        primitive(&args, &mut util)?
    };

    match reported {
        Reported::Immediate(value) => {
            if value.is_none() {
                // Command block
                thread.request_script_glow_in_frame = true;
            }
            if thread.status == ThreadStatus::Running {
                handle_report(runtime, sequencer, thread, value, &context);
            }
        }
        Reported::Pending(promise) => suspend(thread, promise, context),
    }
    Ok(())
}

/* ===================== Inputs ===================== */

fn literal_value(block: &Block) -> Option<super::types::Value> {
    if block.fields.len() == 1 && block.inputs.is_empty() {
        block.fields.values().next().map(|f| f.value.clone())
    } else {
        None
    }
}

/// Evaluate every connected input that has not reported yet, filling `args`.
///
/// Returns true if evaluation was interrupted (the thread is awaiting a
/// nested asynchronous result, or was retired underneath us).
fn evaluate_inputs(
    runtime: &mut Runtime,
    sequencer: &mut dyn Sequencer,
    thread: &mut Thread,
    frame_id: FrameId,
    block: &Block,
    args: &mut Arguments,
) -> Result<bool, EngineError> {
    for (name, input) in &block.inputs {
        // The prototype inside a definition is structure, not an argument
        if name == CUSTOM_BLOCK_INPUT {
            continue;
        }

        let cached = thread
            .frame(frame_id)
            .map_or(false, |f| f.reported.contains_key(name));
        if let (Some(input_block), false) = (&input.block, cached) {
            thread.push_stack(input_block.clone());
            if let Some(frame) = thread.frame_mut(frame_id) {
                frame.waiting_reporter = Some(name.clone());
            }

            execute(runtime, sequencer, thread)?;
            match thread.status {
                ThreadStatus::Awaiting | ThreadStatus::Done => return Ok(true),
                _ => {}
            }

            // Returned immediately, so the value has been reported
            if let Some(frame) = thread.frame_mut(frame_id) {
                frame.waiting_reporter = None;
            }
            thread.pop_stack();
        }

        let value = thread
            .frame(frame_id)
            .and_then(|f| f.reported.get(name))
            .cloned()
            .flatten();
        if let Some(value) = value {
            args.insert(name.clone(), value);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Value;

    #[test]
    fn test_literal_value_needs_exactly_one_field_and_no_inputs() {
        let literal = Block::new("math_number").with_field("NUM", "10");
        assert_eq!(literal_value(&literal), Some(Value::from("10")));

        let two_fields = Block::new("x").with_field("A", 1.0).with_field("B", 2.0);
        assert_eq!(literal_value(&two_fields), None);

        let with_input = Block::new("x").with_field("A", 1.0).with_input("IN", "b");
        assert_eq!(literal_value(&with_input), None);
    }
}
