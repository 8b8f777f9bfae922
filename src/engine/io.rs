//! IO devices queried by primitives

use super::types::Value;

/// A device registered with the runtime under a name (`clock`, `mouse`, ...)
pub trait IoDevice {
    /// Whether the device answers `function`
    fn has_function(&self, function: &str) -> bool;

    /// Invoke `function`. Only called when `has_function` is true.
    fn call(&mut self, function: &str, args: &[Value]) -> Option<Value>;
}
