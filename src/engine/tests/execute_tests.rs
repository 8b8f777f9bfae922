//! Single-step evaluation tests

use super::helpers::*;
use crate::engine::{Arguments, Block, BlockUtility, EngineError, Reported, ThreadStatus};
use std::cell::RefCell;
use std::rc::Rc;

const NESTED: &str = r#"{
    "say": {
        "opcode": "looks_say",
        "inputs": { "MESSAGE": { "block": "join", "shadow": null } },
        "topLevel": true
    },
    "join": {
        "opcode": "operator_join",
        "parent": "say",
        "inputs": {
            "STRING1": { "block": "t1", "shadow": "t1" },
            "STRING2": { "block": "add" }
        }
    },
    "t1": { "opcode": "text", "fields": { "TEXT": { "value": "a" } }, "shadow": true },
    "add": {
        "opcode": "operator_add",
        "inputs": {
            "NUM1": { "block": "n1", "shadow": "n1" },
            "NUM2": { "block": "n2", "shadow": "n2" }
        }
    },
    "n1": { "opcode": "math_number", "fields": { "NUM": { "value": 1 } }, "shadow": true },
    "n2": { "opcode": "math_number", "fields": { "NUM": { "value": "2" } }, "shadow": true }
}"#;

/// Registers `test_record`, which logs `describe(args)` and reports nothing
fn register_recorder(runtime: &mut crate::engine::Runtime, describe: fn(&Arguments) -> String) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    runtime.register_primitive("test_record", move |args: &Arguments, _util: &mut BlockUtility<'_>| {
        sink.borrow_mut().push(describe(args));
        Ok(Reported::none())
    });
    seen
}

#[test]
fn test_nested_inputs_evaluate_before_the_primitive() {
    let (mut runtime, log) = build_runtime(NESTED);
    let mut thread = thread_on("say");

    execute_once(&mut runtime, &mut thread).unwrap();

    assert_eq!(*log.borrow(), vec!["a3".to_string()]);
    assert_eq!(thread.stack_depth(), 1);
    assert_eq!(thread.status, ThreadStatus::Running);
    assert!(thread.request_script_glow_in_frame);

    // Cached input values are dropped once the primitive has run
    let frame = thread.peek_frame().unwrap();
    assert!(frame.reported.is_empty());
    assert!(frame.waiting_reporter.is_none());
}

#[test]
fn test_reexecution_derives_fresh_inputs() {
    let (mut runtime, log) = build_runtime(
        r#"{
            "say": {
                "opcode": "looks_say",
                "inputs": { "MESSAGE": { "block": "count" } },
                "topLevel": true
            },
            "count": { "opcode": "test_count", "parent": "say" }
        }"#,
    );
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    runtime.register_primitive("test_count", move |_args: &Arguments, _util: &mut BlockUtility<'_>| {
        *counter.borrow_mut() += 1;
        Ok(Reported::value(format!("call {}", counter.borrow())))
    });
    let mut thread = thread_on("say");

    execute_once(&mut runtime, &mut thread).unwrap();
    execute_once(&mut runtime, &mut thread).unwrap();

    assert_eq!(*calls.borrow(), 2);
    assert_eq!(*log.borrow(), vec!["call 1".to_string(), "call 2".to_string()]);
}

#[test]
fn test_variable_field_reads_as_its_id() {
    let (mut runtime, _log) = build_runtime(
        r#"{
            "v": {
                "opcode": "test_record",
                "fields": { "VARIABLE": { "value": "score", "id": "var-1" } }
            }
        }"#,
    );
    let seen = register_recorder(&mut runtime, |args| args.string("VARIABLE"));
    let mut thread = thread_on("v");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(*seen.borrow(), vec!["var-1".to_string()]);
}

#[test]
fn test_custom_block_input_is_not_an_argument() {
    let (mut runtime, _log) = build_runtime(
        r#"{
            "p": {
                "opcode": "test_record",
                "inputs": {
                    "custom_block": { "block": "lit" },
                    "X": { "block": "lit" }
                }
            },
            "lit": { "opcode": "text", "fields": { "TEXT": { "value": "x" } } }
        }"#,
    );
    let seen = register_recorder(&mut runtime, |args| {
        format!("{}:{}", args.contains("custom_block"), args.contains("X"))
    });
    let mut thread = thread_on("p");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(*seen.borrow(), vec!["false:true".to_string()]);
}

#[test]
fn test_mutation_is_attached_to_arguments() {
    let (mut runtime, _log) = build_runtime(
        r#"{
            "p": { "opcode": "test_record", "mutation": { "proccode": "go %s", "argumentids": ["a0"] } }
        }"#,
    );
    let seen = register_recorder(&mut runtime, |args| {
        args.mutation()
            .and_then(|m| m.proccode.clone())
            .unwrap_or_default()
    });
    let mut thread = thread_on("p");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(*seen.borrow(), vec!["go %s".to_string()]);
}

#[test]
fn test_unimplemented_opcode_is_skipped_with_glow() {
    let (mut runtime, _log) = build_runtime(
        r#"{
            "m": {
                "opcode": "pen_stamp",
                "fields": { "A": { "value": 1 }, "B": { "value": 2 } }
            }
        }"#,
    );
    let mut thread = thread_on("m");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(thread.status, ThreadStatus::Running);
    assert_eq!(thread.stack_depth(), 1);
    assert!(thread.request_script_glow_in_frame);
}

#[test]
fn test_block_without_opcode_is_skipped() {
    let (mut runtime, _log) = build_runtime(r#"{ "blank": { "opcode": null } }"#);
    let mut thread = thread_on("blank");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(thread.status, ThreadStatus::Running);
    assert_eq!(thread.stack_depth(), 1);
    assert!(!thread.request_script_glow_in_frame);
}

#[test]
fn test_deleted_target_retires_thread() {
    let (mut runtime, log) = build_runtime(NESTED);
    let mut thread = thread_on("say");
    runtime.remove_target(TARGET);

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(thread.status, ThreadStatus::Done);
    assert!(thread.is_stack_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_missing_block_retires_thread() {
    let (mut runtime, _log) = build_runtime(NESTED);
    let mut thread = thread_on("nowhere");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(thread.status, ThreadStatus::Done);
    assert!(thread.is_stack_empty());
}

#[test]
fn test_block_resolves_from_flyout() {
    let (mut runtime, log) = build_runtime("{}");
    runtime
        .flyout_blocks
        .insert("f", Block::new("looks_say").with_field("MESSAGE", "from flyout"));
    let mut thread = thread_on("f");

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(*log.borrow(), vec!["from flyout".to_string()]);
}

#[test]
fn test_monitor_threads_resolve_from_monitor_blocks() {
    let (mut runtime, _log) = build_runtime("{}");
    runtime.monitor_blocks.insert(
        "mon",
        Block::new("operator_add").with_input("NUM1", "n").with_input("NUM2", "n"),
    );
    runtime
        .monitor_blocks
        .insert("n", Block::new("math_number").with_field("NUM", 4.0));
    let mut thread = thread_on("mon");
    thread.update_monitor = true;

    execute_once(&mut runtime, &mut thread).unwrap();
    assert_eq!(
        runtime.take_events(),
        vec![crate::engine::RuntimeEvent::MonitorUpdate {
            block_id: "mon".to_string(),
            value: "8".to_string(),
        }]
    );
}

#[test]
fn test_synchronous_fault_propagates_through_inputs() {
    let (mut runtime, log) = build_runtime(
        r#"{
            "say": { "opcode": "looks_say", "inputs": { "MESSAGE": { "block": "bad" } } },
            "bad": { "opcode": "test_fault" }
        }"#,
    );
    runtime.register_primitive("test_fault", |_args: &Arguments, _util: &mut BlockUtility<'_>| {
        Err(EngineError::primitive("test_fault", "kaput"))
    });
    let mut thread = thread_on("say");

    let result = execute_once(&mut runtime, &mut thread);
    assert!(matches!(
        result,
        Err(EngineError::Primitive { ref opcode, .. }) if opcode == "test_fault"
    ));
    assert!(log.borrow().is_empty());
}
