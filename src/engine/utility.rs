//! Capability handle passed to primitives
//!
//! A `BlockUtility` is built for one primitive invocation and bound to the
//! thread, the frame being evaluated and the scheduler. Every operation is a
//! thin delegation; the handle owns no state of its own.

use super::blocks::TargetId;
use super::frame::{ExecutionContext, FrameId};
use super::runtime::{BlockSource, Runtime};
use super::sequencer::Sequencer;
use super::thread::{Thread, ThreadId};
use super::types::{ThreadStatus, Value};
use std::collections::HashMap;
use tracing::debug;

pub struct BlockUtility<'a> {
    runtime: &'a mut Runtime,
    sequencer: &'a mut dyn Sequencer,
    thread: &'a mut Thread,
    frame: FrameId,
    source: BlockSource,
}

impl<'a> BlockUtility<'a> {
    pub fn new(
        runtime: &'a mut Runtime,
        sequencer: &'a mut dyn Sequencer,
        thread: &'a mut Thread,
        frame: FrameId,
        source: BlockSource,
    ) -> Self {
        Self {
            runtime,
            sequencer,
            thread,
            frame,
            source,
        }
    }

    /* ===================== Accessors ===================== */

    /// Scratch state of the frame this primitive runs in. `None` once the
    /// frame has been popped (e.g. after `stop_this_script`).
    pub fn execution_context(&mut self) -> Option<&mut ExecutionContext> {
        self.thread
            .frame_mut(self.frame)
            .map(|f| &mut f.execution_context)
    }

    pub fn thread(&self) -> &Thread {
        self.thread
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread.id
    }

    pub fn target(&self) -> Option<&TargetId> {
        self.thread.target.as_ref()
    }

    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    /// Milliseconds since the runtime was created
    pub fn current_msecs(&self) -> f64 {
        self.runtime.current_msecs()
    }

    /* ===================== Thread control ===================== */

    /// Pause after this tick; the same frame runs again next time
    pub fn yield_thread(&mut self) {
        self.thread.status = ThreadStatus::Yield;
    }

    /// Pause for exactly one tick
    pub fn yield_tick(&mut self) {
        self.thread.status = ThreadStatus::YieldOnce;
    }

    /// Enter branch `branch_num` of the current block
    pub fn start_branch(&mut self, branch_num: usize, is_loop: bool) {
        match self.runtime.blocks(&self.source) {
            Some(blocks) => self
                .sequencer
                .step_to_branch(blocks, self.thread, branch_num, is_loop),
            None => debug!(thread_id = %self.thread.id, "No blocks to branch into"),
        }
    }

    /// Enter the body of the procedure `procedure_code`
    pub fn start_procedure(&mut self, procedure_code: &str) {
        match self.runtime.blocks(&self.source) {
            Some(blocks) => self
                .sequencer
                .step_to_procedure(blocks, self.thread, procedure_code),
            None => debug!(thread_id = %self.thread.id, "No blocks to call into"),
        }
    }

    /// Halt every thread
    pub fn stop_all(&mut self) {
        self.runtime.stop_all();
        self.sequencer.retire_thread(self.thread);
    }

    /// Halt every other thread on this thread's target
    pub fn stop_other_target_threads(&mut self) {
        if let Some(target) = self.thread.target.clone() {
            self.runtime.stop_for_target(&target, Some(self.thread.id));
        }
    }

    /// Unwind to the enclosing procedure call, or finish the thread
    pub fn stop_this_script(&mut self) {
        match self.runtime.blocks(&self.source) {
            Some(blocks) => self.thread.stop_this_script(blocks),
            None => self.sequencer.retire_thread(self.thread),
        }
    }

    /* ===================== Procedures ===================== */

    pub fn get_procedure_param_names(&self, procedure_code: &str) -> Option<Vec<String>> {
        self.runtime
            .blocks(&self.source)
            .and_then(|blocks| blocks.get_procedure_param_names(procedure_code))
    }

    pub fn push_param(&mut self, name: impl Into<String>, value: Value) {
        self.thread.push_param(name, value);
    }

    pub fn get_param(&self, name: &str) -> Option<Value> {
        self.thread.get_param(name).cloned()
    }

    /* ===================== Runtime ===================== */

    /// Start threads for scripts under the `opcode` hat.
    ///
    /// The calling thread is out of the runtime's list while it steps, so a
    /// match on its own script is handled here: it restarts from its hat on
    /// the next tick, or carries on when the hat does not restart.
    pub fn start_hats(
        &mut self,
        opcode: &str,
        match_fields: Option<&HashMap<String, String>>,
        target: Option<&str>,
    ) -> Vec<ThreadId> {
        let Some(info) = self.runtime.hat_info(opcode) else {
            return Vec::new();
        };
        let mut scripts = self.runtime.hat_scripts(opcode, match_fields, target);

        let mut started = Vec::new();
        let own = scripts.iter().position(|(target_id, top)| {
            self.thread.target.as_deref() == Some(target_id.as_str()) && self.thread.top_block() == Some(top)
        });
        if let Some(index) = own.filter(|_| !self.thread.status.is_done()) {
            scripts.remove(index);
            if info.restart_existing_threads {
                debug!(thread_id = %self.thread.id, "Restarting calling thread");
                self.thread.restart();
                self.thread.status = ThreadStatus::YieldOnce;
                started.push(self.thread.id);
            }
        }

        started.extend(self.runtime.start_scripts(info, scripts));
        started
    }

    /// Query an IO device. Absent devices or functions answer nothing.
    pub fn io_query(&mut self, device: &str, function: &str, args: &[Value]) -> Option<Value> {
        self.runtime.io_query(device, function, args)
    }
}
