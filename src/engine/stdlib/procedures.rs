//! Procedure primitives

use crate::engine::errors::EngineError;
use crate::engine::promise::Reported;
use crate::engine::types::{Arguments, Value};
use crate::engine::utility::BlockUtility;

/// Execution-context key marking a call whose body has been entered
const EXECUTED: &str = "executed";

/// The definition hat itself does nothing; its body follows it
pub fn definition(_args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::none())
}

/// Bind the call's arguments as parameters and enter the procedure body.
///
/// The call frame is stepped again when the body finishes; the `executed`
/// marker makes that second visit a no-op.
pub fn call_no_return(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let already_executed = util
        .execution_context()
        .map_or(true, |context| context.contains_key(EXECUTED));
    if already_executed {
        return Ok(Reported::none());
    }

    let Some(mutation) = args.mutation() else {
        return Ok(Reported::none());
    };
    let Some(procedure_code) = mutation.proccode.clone() else {
        return Ok(Reported::none());
    };

    let param_names = util
        .get_procedure_param_names(&procedure_code)
        .unwrap_or_default();
    for (index, name) in param_names.iter().enumerate() {
        // Inputs are keyed by argument id when the call declares ids
        let key = mutation.argument_ids.get(index).unwrap_or(name);
        if let Some(value) = args.get(key) {
            util.push_param(name.clone(), value.clone());
        }
    }

    if let Some(context) = util.execution_context() {
        context.insert(EXECUTED.to_string(), Value::Bool(true));
    }
    util.start_procedure(&procedure_code);
    Ok(Reported::none())
}

/// Value of the parameter named by the VALUE field
pub fn argument_reporter(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::Immediate(util.get_param(&args.string("VALUE"))))
}
