//! Event and sensing primitives

use crate::engine::errors::EngineError;
use crate::engine::promise::Reported;
use crate::engine::types::Arguments;
use crate::engine::utility::BlockUtility;
use std::collections::HashMap;

use super::devices::{CLOCK_DEVICE, PROJECT_TIMER, RESET_PROJECT_TIMER};

/// broadcast (BROADCAST_INPUT)
pub fn broadcast(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let mut fields = HashMap::new();
    fields.insert("BROADCAST_OPTION".to_string(), args.string("BROADCAST_INPUT"));
    util.start_hats("event_whenbroadcastreceived", Some(&fields), None);
    Ok(Reported::none())
}

/// when [timer] > (VALUE): edge-activated predicate
pub fn when_greater_than(args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    let threshold = args.number("VALUE");
    let current = match args.string("WHENGREATERTHANMENU").to_lowercase().as_str() {
        "timer" => util.io_query(CLOCK_DEVICE, PROJECT_TIMER, &[]),
        _ => None,
    };
    let fired = current.map_or(false, |v| v.to_number() > threshold);
    Ok(Reported::value(fired))
}

/// (timer)
pub fn timer(_args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::Immediate(util.io_query(CLOCK_DEVICE, PROJECT_TIMER, &[])))
}

/// reset timer
pub fn reset_timer(_args: &Arguments, util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    util.io_query(CLOCK_DEVICE, RESET_PROJECT_TIMER, &[]);
    Ok(Reported::none())
}
