//! Operator reporters

use crate::engine::errors::EngineError;
use crate::engine::promise::Reported;
use crate::engine::types::Arguments;
use crate::engine::utility::BlockUtility;
use std::cmp::Ordering;

pub fn add(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(args.number("NUM1") + args.number("NUM2")))
}

pub fn subtract(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(args.number("NUM1") - args.number("NUM2")))
}

pub fn multiply(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(args.number("NUM1") * args.number("NUM2")))
}

/// Division by zero gives an infinity, not an error
pub fn divide(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(args.number("NUM1") / args.number("NUM2")))
}

fn compare(args: &Arguments) -> Option<Ordering> {
    Some(args.get("OPERAND1")?.compare(args.get("OPERAND2")?))
}

pub fn lt(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(compare(args) == Some(Ordering::Less)))
}

pub fn equals(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(compare(args) == Some(Ordering::Equal)))
}

pub fn gt(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(compare(args) == Some(Ordering::Greater)))
}

pub fn join(args: &Arguments, _util: &mut BlockUtility<'_>) -> Result<Reported, EngineError> {
    Ok(Reported::value(format!(
        "{}{}",
        args.string("STRING1"),
        args.string("STRING2")
    )))
}
