//! Built-in IO devices

use crate::engine::io::IoDevice;
use crate::engine::timer::Timer;
use crate::engine::types::Value;

pub const CLOCK_DEVICE: &str = "clock";
pub const PROJECT_TIMER: &str = "projectTimer";
pub const RESET_PROJECT_TIMER: &str = "resetProjectTimer";

/// Project timer, in seconds since start or the last reset
#[derive(Debug, Clone, Default)]
pub struct ClockDevice {
    timer: Timer,
}

impl ClockDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IoDevice for ClockDevice {
    fn has_function(&self, function: &str) -> bool {
        matches!(function, PROJECT_TIMER | RESET_PROJECT_TIMER)
    }

    fn call(&mut self, function: &str, _args: &[Value]) -> Option<Value> {
        match function {
            PROJECT_TIMER => Some(Value::Number(self.timer.elapsed().as_secs_f64())),
            RESET_PROJECT_TIMER => {
                self.timer = Timer::start();
                None
            }
            _ => None,
        }
    }
}
