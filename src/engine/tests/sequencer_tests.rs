//! Tick scheduler tests

use super::helpers::*;
use crate::config::SequencerConfig;
use crate::engine::{
    Arguments, Blocks, BlockUtility, EngineError, Reported, Sequencer, Thread, ThreadStatus,
    TickSequencer, Value,
};

const SEEN: &str = "seen";

/// `test_yield_once` pauses for one tick the first time its frame runs
fn register_yield_once(runtime: &mut crate::engine::Runtime) {
    runtime.register_primitive("test_yield_once", |_args: &Arguments, util: &mut BlockUtility<'_>| {
        let first = util
            .execution_context()
            .map_or(false, |context| context.insert(SEEN.to_string(), Value::Bool(true)).is_none());
        if first {
            util.yield_tick();
        }
        Ok(Reported::none())
    });
}

#[test]
fn test_yield_once_resumes_next_tick() {
    let (mut runtime, log) = build_runtime(
        r#"{
            "pause": { "opcode": "test_yield_once", "next": "say", "topLevel": true },
            "say": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "resumed" } } }
        }"#,
    );
    register_yield_once(&mut runtime);
    let id = runtime.push_thread("pause", Some(TARGET.to_string()));
    let mut sequencer = TickSequencer::default();

    assert!(sequencer.step_threads(&mut runtime).unwrap().is_empty());
    assert_eq!(runtime.thread(id).unwrap().status, ThreadStatus::YieldOnce);
    assert!(log.borrow().is_empty());

    assert_eq!(sequencer.step_threads(&mut runtime).unwrap(), vec![id]);
    assert_eq!(*log.borrow(), vec!["resumed".to_string()]);
}

const LOOP_THREE: &str = r#"{
    "repeat": {
        "opcode": "control_repeat",
        "inputs": { "TIMES": { "block": "three" }, "SUBSTACK": { "block": "say" } },
        "topLevel": true
    },
    "three": { "opcode": "math_whole_number", "fields": { "NUM": { "value": 3 } } },
    "say": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "x" } } }
}"#;

#[test]
fn test_loop_iteration_ends_the_step() {
    let (mut runtime, log) = build_runtime(LOOP_THREE);
    let mut thread = thread_on("repeat");
    let mut sequencer = TickSequencer::default();

    sequencer.step_thread(&mut runtime, &mut thread).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(thread.status, ThreadStatus::Running);
    assert_eq!(thread.peek_stack().map(String::as_str), Some("repeat"));
    assert!(thread.peek_frame().unwrap().is_loop);

    sequencer.step_thread(&mut runtime, &mut thread).unwrap();
    assert_eq!(log.borrow().len(), 2);
}

const WARP_PROCEDURE: &str = r#"{
    "call": {
        "opcode": "procedures_callnoreturn",
        "mutation": { "proccode": "fast" },
        "topLevel": true
    },
    "def": {
        "opcode": "procedures_definition",
        "next": "repeat",
        "inputs": { "custom_block": { "block": "proto" } },
        "topLevel": true
    },
    "proto": {
        "opcode": "procedures_prototype",
        "mutation": { "proccode": "fast", "warp": true },
        "shadow": true
    },
    "repeat": {
        "opcode": "control_repeat",
        "inputs": { "TIMES": { "block": "three" }, "SUBSTACK": { "block": "say" } }
    },
    "three": { "opcode": "math_whole_number", "fields": { "NUM": { "value": 3 } } },
    "say": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "x" } } }
}"#;

#[test]
fn test_warp_procedure_runs_loop_in_one_step() {
    let (mut runtime, log) = build_runtime(WARP_PROCEDURE);
    let mut thread = thread_on("call");
    let mut sequencer = TickSequencer::default();

    sequencer.step_thread(&mut runtime, &mut thread).unwrap();
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(thread.status, ThreadStatus::Done);
    assert!(thread.is_stack_empty());
}

#[test]
fn test_exhausted_warp_budget_yields_on_call() {
    let blocks = Blocks::from_json(WARP_PROCEDURE).unwrap();
    let mut sequencer = TickSequencer::new(SequencerConfig {
        warp_time_ms: 0,
        ..SequencerConfig::default()
    });
    let mut thread = thread_on("call");
    thread.peek_frame_mut().unwrap().warp_mode = true;
    thread.warp_timer = Some(crate::engine::timer::Timer::start());
    std::thread::sleep(std::time::Duration::from_millis(2));

    sequencer.step_to_procedure(&blocks, &mut thread, "fast");
    assert_eq!(thread.status, ThreadStatus::Yield);
    assert_eq!(thread.peek_stack().map(String::as_str), Some("def"));
}

#[test]
fn test_warp_flag_enables_warp_mode() {
    let blocks = Blocks::from_json(WARP_PROCEDURE).unwrap();
    let mut sequencer = TickSequencer::default();
    let mut thread = thread_on("call");

    sequencer.step_to_procedure(&blocks, &mut thread, "fast");
    assert_eq!(thread.status, ThreadStatus::Running);
    assert!(thread.peek_frame().unwrap().warp_mode);
}

#[test]
fn test_recursive_call_yields() {
    let blocks = Blocks::from_json(
        r#"{
            "call": { "opcode": "procedures_callnoreturn", "mutation": { "proccode": "again" } },
            "def": {
                "opcode": "procedures_definition",
                "next": "call",
                "inputs": { "custom_block": { "block": "proto" } }
            },
            "proto": { "opcode": "procedures_prototype", "mutation": { "proccode": "again" } }
        }"#,
    )
    .unwrap();
    let mut sequencer = TickSequencer::default();

    // First call: nothing above it
    let mut thread = thread_on("call");
    sequencer.step_to_procedure(&blocks, &mut thread, "again");
    assert_eq!(thread.status, ThreadStatus::Running);
    assert_eq!(thread.peek_stack().map(String::as_str), Some("def"));

    // Inner call, with the outer call two frames up
    thread.push_stack("call".to_string());
    sequencer.step_to_procedure(&blocks, &mut thread, "again");
    assert_eq!(thread.status, ThreadStatus::Yield);
    assert_eq!(thread.stack_depth(), 4);
}

#[test]
fn test_step_threads_reports_and_removes_finished() {
    let (mut runtime, log) = build_runtime(
        r#"{
            "one": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "1" } }, "topLevel": true },
            "two": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "2" } }, "topLevel": true }
        }"#,
    );
    let first = runtime.push_thread("one", Some(TARGET.to_string()));
    let second = runtime.push_thread("two", Some(TARGET.to_string()));
    let mut sequencer = TickSequencer::default();

    let finished = sequencer.step_threads(&mut runtime).unwrap();
    assert_eq!(finished, vec![first, second]);
    assert!(runtime.threads().is_empty());
    assert_eq!(*log.borrow(), vec!["1".to_string(), "2".to_string()]);
}

#[test]
fn test_forever_loop_survives_the_tick() {
    let (mut runtime, log) = build_runtime(
        r#"{
            "loop": {
                "opcode": "control_forever",
                "inputs": { "SUBSTACK": { "block": "say" } },
                "topLevel": true
            },
            "say": { "opcode": "looks_say", "fields": { "MESSAGE": { "value": "x" } } }
        }"#,
    );
    runtime.push_thread("loop", Some(TARGET.to_string()));
    let mut sequencer = TickSequencer::default();

    for _ in 0..3 {
        assert!(sequencer.step_threads(&mut runtime).unwrap().is_empty());
    }
    assert_eq!(runtime.threads().len(), 1);
    assert!(log.borrow().len() >= 3);
}

#[test]
fn test_deleted_target_thread_is_retired_on_next_tick() {
    let (mut runtime, _log) = build_runtime(
        r#"{
            "loop": {
                "opcode": "control_forever",
                "inputs": { "SUBSTACK": { "block": "say" } },
                "topLevel": true
            },
            "say": { "opcode": "looks_say" }
        }"#,
    );
    let id = runtime.push_thread("loop", Some(TARGET.to_string()));
    let mut sequencer = TickSequencer::default();
    sequencer.step_threads(&mut runtime).unwrap();

    runtime.remove_target(TARGET);
    assert_eq!(sequencer.step_threads(&mut runtime).unwrap(), vec![id]);
}

#[test]
fn test_primitive_fault_surfaces_from_tick() {
    let (mut runtime, _log) = build_runtime(r#"{ "bad": { "opcode": "test_fault", "topLevel": true } }"#);
    runtime.register_primitive("test_fault", |_args: &Arguments, _util: &mut BlockUtility<'_>| {
        Err(EngineError::primitive("test_fault", "kaput"))
    });
    runtime.push_thread("bad", Some(TARGET.to_string()));
    let mut sequencer = TickSequencer::default();

    assert!(sequencer.step_threads(&mut runtime).is_err());
    // The faulting thread is put back in place
    assert_eq!(runtime.threads().len(), 1);
}

#[test]
fn test_default_retire_thread() {
    struct Minimal;
    impl Sequencer for Minimal {
        fn step_to_branch(&mut self, _: &Blocks, _: &mut Thread, _: usize, _: bool) {}
        fn step_to_procedure(&mut self, _: &Blocks, _: &mut Thread, _: &str) {}
    }

    let mut thread = thread_on("x");
    Minimal.retire_thread(&mut thread);
    assert_eq!(thread.status, ThreadStatus::Done);
    assert!(thread.is_stack_empty());
}
