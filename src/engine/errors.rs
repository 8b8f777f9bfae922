//! Error types for the engine

use thiserror::Error;

/// Errors surfaced to the caller of the engine.
///
/// Structural absence, unresolvable opcodes and rejected asynchronous results
/// are not errors at this layer: they are logged and degrade to no-ops or
/// thread retirement. What does come back as an `EngineError` out of
/// `execute` is a synchronous primitive fault, left to the scheduler.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Primitive '{opcode}' failed: {message}")]
    Primitive { opcode: String, message: String },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Failed to decode blocks: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl EngineError {
    pub fn primitive(opcode: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Primitive {
            opcode: opcode.into(),
            message: message.into(),
        }
    }
}

/// Reason an asynchronous primitive result was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
