//! Tests for the engine
//!
//! Organized by feature area

mod execute_tests;
mod helpers;
mod sequencer_tests;
