pub mod cli;
pub mod config;
pub mod engine;

// Re-export main types
pub use config::Config;
pub use engine::{
    execute, Arguments, Block, BlockUtility, Blocks, EngineError, Project, Reported, Runtime,
    Sequencer, Thread, ThreadStatus, TickSequencer, Value,
};
