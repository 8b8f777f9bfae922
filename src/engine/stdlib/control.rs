//! Control primitives: loops, conditionals, waits, stop

use crate::engine::errors::EngineError;
use crate::engine::promise::Reported;
use crate::engine::types::{Arguments, Value};
use crate::engine::utility::BlockUtility;

/// Execution-context key holding the iterations left in a `repeat`
const LOOP_COUNTER: &str = "loop_counter";
/// Execution-context key holding when a `wait` started (runtime msecs)
const TIMER_START: &str = "timer_start";

/// repeat (TIMES) { SUBSTACK }
pub fn repeat(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let times = args.number("TIMES").round();
    let Some(context) = util.execution_context() else {
        return Ok(Reported::none());
    };

    // Counted down on every re-entry of the loop frame
    let remaining = context.get(LOOP_COUNTER).map_or(times, Value::to_number) - 1.0;
    context.insert(LOOP_COUNTER.to_string(), Value::Number(remaining));

    if remaining >= 0.0 {
        util.start_branch(1, true);
    }
    Ok(Reported::none())
}

/// forever { SUBSTACK }
pub fn forever(_args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    util.start_branch(1, true);
    Ok(Reported::none())
}

/// if <CONDITION> then { SUBSTACK }
pub fn if_then(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    if args.get("CONDITION").map_or(false, Value::to_boolean) {
        util.start_branch(1, false);
    }
    Ok(Reported::none())
}

/// if <CONDITION> then { SUBSTACK } else { SUBSTACK2 }
pub fn if_else(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let branch = if args.get("CONDITION").map_or(false, Value::to_boolean) {
        1
    } else {
        2
    };
    util.start_branch(branch, false);
    Ok(Reported::none())
}

/// wait (DURATION) seconds
///
/// Yields until the duration has elapsed, re-entering the same frame each
/// tick.
pub fn wait(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let duration_ms = (args.number("DURATION") * 1000.0).max(0.0);
    let now = util.current_msecs();
    let Some(context) = util.execution_context() else {
        return Ok(Reported::none());
    };

    match context.get(TIMER_START).map(Value::to_number) {
        None => {
            context.insert(TIMER_START.to_string(), Value::Number(now));
            util.yield_thread();
        }
        Some(started) if now - started < duration_ms => util.yield_thread(),
        Some(_) => {}
    }
    Ok(Reported::none())
}

/// stop [all | this script | other scripts in sprite]
pub fn stop(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    match args.string("STOP_OPTION").as_str() {
        "all" => util.stop_all(),
        "this script" => util.stop_this_script(),
        "other scripts in sprite" | "other scripts in stage" => util.stop_other_target_threads(),
        _ => {}
    }
    Ok(Reported::none())
}
