//! Scheduling
//!
//! `Sequencer` is the boundary the evaluator and the capability handle use to
//! enter branches and procedures and to retire threads. `TickSequencer` is
//! the reference scheduler: it interleaves every thread of a runtime one tick
//! at a time.
//!
//! ## Function Organization
//! 1. step_threads() - one tick over every thread
//! 2. step_thread() - run one thread until it yields, waits or finishes
//! 3. step_to_branch() / step_to_procedure() - entry requests from primitives

use super::blocks::Blocks;
use super::errors::EngineError;
use super::execute::execute;
use super::report::settle_pending;
use super::runtime::Runtime;
use super::thread::{Thread, ThreadId};
use super::timer::Timer;
use super::types::{BlockId, ThreadStatus};
use crate::config::SequencerConfig;
use tracing::{debug, trace};

/// Scheduler operations requested from inside a step
pub trait Sequencer {
    /// Push a frame for branch `branch_num` of the current block.
    /// `is_loop` marks the current frame as the loop that owns the branch.
    fn step_to_branch(&mut self, blocks: &Blocks, thread: &mut Thread, branch_num: usize, is_loop: bool);

    /// Push a frame for the definition of `procedure_code`
    fn step_to_procedure(&mut self, blocks: &Blocks, thread: &mut Thread, procedure_code: &str);

    /// Stop a thread for good
    fn retire_thread(&mut self, thread: &mut Thread) {
        debug!(thread_id = %thread.id, "Retiring thread");
        thread.retire();
    }
}

/// Reference tick scheduler
#[derive(Debug, Clone, Default)]
pub struct TickSequencer {
    config: SequencerConfig,
}

impl TickSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    fn warp_time_ms(&self) -> f64 {
        self.config.warp_time_ms as f64
    }

    fn warp_budget_left(&self, thread: &Thread) -> bool {
        thread
            .warp_timer
            .map_or(true, |timer| timer.elapsed_ms() <= self.warp_time_ms())
    }

    /* ===================== Ticks ===================== */

    /// Run one tick. Returns the ids of threads that finished during it.
    pub fn step_threads(&mut self, runtime: &mut Runtime) -> Result<Vec<ThreadId>, EngineError> {
        for thread in &mut runtime.threads {
            thread.request_script_glow_in_frame = false;
            thread.block_glow_in_frame = None;
            if matches!(thread.status, ThreadStatus::Yield | ThreadStatus::YieldOnce) {
                thread.status = ThreadStatus::Running;
            }
        }
        runtime.start_edge_activated_hats();

        let work_timer = Timer::start();
        let work_time = self.config.work_time_ms as f64;
        let mut active = usize::MAX;

        while active > 0 && !runtime.threads.is_empty() && work_timer.elapsed_ms() < work_time {
            active = 0;
            let mut index = 0;
            // Threads started during the pass are appended and stepped in it
            while index < runtime.threads.len() {
                let mut thread = std::mem::take(&mut runtime.threads[index]);
                let result = if matches!(
                    thread.status,
                    ThreadStatus::Done | ThreadStatus::Yield | ThreadStatus::YieldOnce
                ) {
                    Ok(())
                } else {
                    self.step_thread(runtime, &mut thread)
                };
                thread.warp_timer = None;
                if thread.status == ThreadStatus::Running {
                    active += 1;
                }
                runtime.threads[index] = thread;
                result?;
                index += 1;
            }
        }

        let mut finished = Vec::new();
        runtime.threads.retain(|thread| {
            let done = thread.status.is_done() || (thread.is_stack_empty() && thread.pending.is_empty());
            if done {
                finished.push(thread.id);
            }
            !done
        });
        trace!(finished = finished.len(), remaining = runtime.threads.len(), "Tick complete");
        Ok(finished)
    }

    /// Step one thread until it yields, waits, finishes or hits a loop
    /// boundary
    pub fn step_thread(&mut self, runtime: &mut Runtime, thread: &mut Thread) -> Result<(), EngineError> {
        if !thread.pending.is_empty() {
            settle_pending(runtime, self, thread);
        }
        if thread.status != ThreadStatus::Running {
            return Ok(());
        }

        // Leftover exhausted-body markers from an asynchronous unwind
        if !self.pop_finished(runtime, thread, true) {
            return Ok(());
        }

        while let Some(current) = thread.peek_stack().cloned() {
            let warp_mode = thread.peek_frame().map_or(false, |f| f.warp_mode);
            if warp_mode && thread.warp_timer.is_none() {
                thread.warp_timer = Some(Timer::start());
            }

            execute(runtime, self, thread)?;
            thread.block_glow_in_frame = Some(current.clone());

            match thread.status {
                ThreadStatus::Running => {}
                ThreadStatus::Yield => {
                    // Warp mode runs through yields until its budget is spent
                    if warp_mode && self.warp_budget_left(thread) {
                        thread.status = ThreadStatus::Running;
                        continue;
                    }
                    return Ok(());
                }
                ThreadStatus::Awaiting | ThreadStatus::YieldOnce | ThreadStatus::Done => return Ok(()),
            }

            if thread.peek_stack() == Some(&current) {
                match runtime.blocks_for_thread(thread) {
                    Some(blocks) => thread.go_to_next_block(blocks),
                    None => {
                        self.retire_thread(thread);
                        return Ok(());
                    }
                }
            }

            if !self.pop_finished(runtime, thread, false) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Pop frames whose body is exhausted. Returns false when the thread
    /// should stop stepping for this tick.
    ///
    /// Reaching a loop frame ends the step (the loop runs again next tick)
    /// unless warp mode has budget left, or this is the start of the step.
    fn pop_finished(&mut self, runtime: &Runtime, thread: &mut Thread, at_step_start: bool) -> bool {
        while thread.peek_stack().is_none() {
            thread.pop_stack();
            let Some(frame) = thread.peek_frame() else {
                thread.status = ThreadStatus::Done;
                thread.request_script_glow_in_frame = false;
                return false;
            };

            if frame.is_loop {
                if at_step_start || (frame.warp_mode && self.warp_budget_left(thread)) {
                    return true;
                }
                return false;
            }
            if frame.waiting_reporter.is_some() {
                return false;
            }
            match runtime.blocks_for_thread(thread) {
                Some(blocks) => thread.go_to_next_block(blocks),
                None => {
                    self.retire_thread(thread);
                    return false;
                }
            }
        }
        true
    }
}

impl Sequencer for TickSequencer {
    fn step_to_branch(&mut self, blocks: &Blocks, thread: &mut Thread, branch_num: usize, is_loop: bool) {
        let branch: Option<BlockId> = thread
            .peek_stack()
            .and_then(|id| blocks.get_branch(id, branch_num.max(1)));
        if let Some(frame) = thread.peek_frame_mut() {
            frame.is_loop = is_loop;
        }
        thread.push_stack(branch);
    }

    fn step_to_procedure(&mut self, blocks: &Blocks, thread: &mut Thread, procedure_code: &str) {
        let Some(definition) = blocks.get_procedure_definition(procedure_code) else {
            debug!(procedure = procedure_code, "No definition for procedure");
            return;
        };

        let is_recursive = thread.is_recursive_call(blocks, procedure_code);
        thread.push_stack(definition);

        let warp_mode = thread.peek_frame().map_or(false, |f| f.warp_mode);
        if warp_mode && !self.warp_budget_left(thread) {
            thread.status = ThreadStatus::Yield;
        } else if blocks.get_procedure_warp(procedure_code) {
            if let Some(frame) = thread.peek_frame_mut() {
                frame.warp_mode = true;
            }
        } else if is_recursive {
            // Give other threads a turn between recursive calls
            thread.status = ThreadStatus::Yield;
        }
    }
}
