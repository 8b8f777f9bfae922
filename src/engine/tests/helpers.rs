//! Test helpers for engine tests
//!
//! Common utilities for building runtimes from JSON block fixtures

use crate::engine::stdlib::{self, devices::CLOCK_DEVICE, ClockDevice};
use crate::engine::{
    Arguments, Blocks, BlockUtility, EngineError, Reported, Runtime, Sequencer, Target, Thread,
    TickSequencer,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Target every fixture is loaded into
pub const TARGET: &str = "sprite";

/// Messages recorded by the `looks_say` test primitive
pub type Log = Rc<RefCell<Vec<String>>>;

/// Build a runtime with the core primitives, the clock and one target
/// holding `blocks_json`.
///
/// Also registers `looks_say`, a command that appends its MESSAGE argument
/// to the returned log.
pub fn build_runtime(blocks_json: &str) -> (Runtime, Log) {
    let blocks = Blocks::from_json(blocks_json).expect("Block fixture failed to parse");

    let mut runtime = Runtime::new();
    stdlib::register_core_primitives(&mut runtime);
    runtime.register_io_device(CLOCK_DEVICE, ClockDevice::new());
    runtime.add_target(Target::new(TARGET, blocks));

    let log = Log::default();
    let sink = log.clone();
    runtime.register_primitive("looks_say", move |args: &Arguments, _util: &mut BlockUtility<'_>| {
        sink.borrow_mut().push(args.string("MESSAGE"));
        Ok(Reported::none())
    });

    (runtime, log)
}

/// A thread on the fixture target, primed with `top` as its only frame
pub fn thread_on(top: &str) -> Thread {
    let mut thread = Thread::new(top.to_string());
    thread.target = Some(TARGET.to_string());
    thread.push_stack(top.to_string());
    thread
}

/// Execute the top frame of `thread` once
pub fn execute_once(runtime: &mut Runtime, thread: &mut Thread) -> Result<(), EngineError> {
    let mut sequencer = TickSequencer::default();
    crate::engine::execute(runtime, &mut sequencer, thread)
}

/// Tick until no threads remain. Returns the number of ticks taken.
pub fn run_until_done(runtime: &mut Runtime, sequencer: &mut TickSequencer, max_ticks: usize) -> usize {
    for tick in 0..max_ticks {
        if runtime.threads().is_empty() {
            return tick;
        }
        sequencer.step_threads(runtime).expect("Tick failed");
    }
    assert!(
        runtime.threads().is_empty(),
        "Threads still running after {} ticks",
        max_ticks
    );
    max_ticks
}

/// Start every green-flag script and run to completion
pub fn run_green_flag(runtime: &mut Runtime) -> usize {
    runtime.start_hats("event_whenflagclicked", None, None);
    let mut sequencer = TickSequencer::default();
    run_until_done(runtime, &mut sequencer, 100)
}

/// Sequencer that records what primitives ask of it, then defers to the
/// reference scheduler
#[derive(Default)]
pub struct RecordingSequencer {
    inner: TickSequencer,
    pub branches: Vec<(usize, bool)>,
    pub procedures: Vec<String>,
    pub retired: usize,
}

impl Sequencer for RecordingSequencer {
    fn step_to_branch(&mut self, blocks: &Blocks, thread: &mut Thread, branch_num: usize, is_loop: bool) {
        self.branches.push((branch_num, is_loop));
        self.inner.step_to_branch(blocks, thread, branch_num, is_loop);
    }

    fn step_to_procedure(&mut self, blocks: &Blocks, thread: &mut Thread, procedure_code: &str) {
        self.procedures.push(procedure_code.to_string());
        self.inner.step_to_procedure(blocks, thread, procedure_code);
    }

    fn retire_thread(&mut self, thread: &mut Thread) {
        self.retired += 1;
        thread.retire();
    }
}
