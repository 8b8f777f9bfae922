//! Core primitive implementations
//!
//! A small standard set, organised by category. Hosts add their own with
//! `Runtime::register_primitive`.

pub mod control;
pub mod devices;
pub mod events;
pub mod operators;
pub mod procedures;

use super::runtime::{HatInfo, Runtime};

pub use devices::ClockDevice;

/* ===================== Registration ===================== */

/// Register every core primitive and hat with the runtime
pub fn register_core_primitives(runtime: &mut Runtime) {
    runtime.register_primitive("control_repeat", control::repeat);
    runtime.register_primitive("control_forever", control::forever);
    runtime.register_primitive("control_if", control::if_then);
    runtime.register_primitive("control_if_else", control::if_else);
    runtime.register_primitive("control_wait", control::wait);
    runtime.register_primitive("control_stop", control::stop);

    runtime.register_primitive("procedures_definition", procedures::definition);
    runtime.register_primitive("procedures_callnoreturn", procedures::call_no_return);
    runtime.register_primitive("argument_reporter_string_number", procedures::argument_reporter);

    runtime.register_primitive("operator_add", operators::add);
    runtime.register_primitive("operator_subtract", operators::subtract);
    runtime.register_primitive("operator_multiply", operators::multiply);
    runtime.register_primitive("operator_divide", operators::divide);
    runtime.register_primitive("operator_lt", operators::lt);
    runtime.register_primitive("operator_equals", operators::equals);
    runtime.register_primitive("operator_gt", operators::gt);
    runtime.register_primitive("operator_join", operators::join);

    runtime.register_primitive("event_broadcast", events::broadcast);
    runtime.register_primitive("event_whengreaterthan", events::when_greater_than);
    runtime.register_primitive("sensing_timer", events::timer);
    runtime.register_primitive("sensing_resettimer", events::reset_timer);

    runtime.register_hat(
        "event_whenflagclicked",
        HatInfo {
            edge_activated: false,
            restart_existing_threads: true,
        },
    );
    runtime.register_hat(
        "event_whenbroadcastreceived",
        HatInfo {
            edge_activated: false,
            restart_existing_threads: true,
        },
    );
    runtime.register_hat(
        "event_whengreaterthan",
        HatInfo {
            edge_activated: true,
            restart_existing_threads: false,
        },
    );
}
