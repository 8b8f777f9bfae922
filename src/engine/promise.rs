//! Primitive results: immediate values or pending ones
//!
//! A primitive that finishes later hands back a `Promise` and keeps the
//! matching `Resolver`. The scheduler polls the promise between steps; the
//! thread stays `Awaiting` until it settles.

use super::errors::Rejection;
use super::types::Value;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// What a primitive produced
#[derive(Debug)]
pub enum Reported {
    /// Finished now, with or without a value
    Immediate(Option<Value>),
    /// Finishes later
    Pending(Promise),
}

impl Reported {
    /// Finished, no value (command blocks)
    pub fn none() -> Self {
        Reported::Immediate(None)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Reported::Immediate(Some(value.into()))
    }
}

impl From<Value> for Reported {
    fn from(value: Value) -> Self {
        Reported::Immediate(Some(value))
    }
}

impl From<Option<Value>> for Reported {
    fn from(value: Option<Value>) -> Self {
        Reported::Immediate(value)
    }
}

impl From<Promise> for Reported {
    fn from(promise: Promise) -> Self {
        Reported::Pending(promise)
    }
}

/// Outcome of a settled promise
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Fulfilled(Option<Value>),
    Rejected(Rejection),
}

type Outcome = Result<Option<Value>, Rejection>;

/// Receiving half: the eventual result of an asynchronous primitive
#[derive(Debug)]
pub struct Promise {
    rx: oneshot::Receiver<Outcome>,
}

/// Sending half: settles the matching `Promise`
#[derive(Debug)]
pub struct Resolver {
    tx: oneshot::Sender<Outcome>,
}

/// Create a connected resolver/promise pair
pub fn promise() -> (Resolver, Promise) {
    let (tx, rx) = oneshot::channel();
    (Resolver { tx }, Promise { rx })
}

impl Promise {
    /// A promise that is already fulfilled
    pub fn resolved(value: Option<Value>) -> Self {
        let (resolver, promise) = promise();
        resolver.resolve(value);
        promise
    }

    /// A promise that is already rejected
    pub fn rejected(reason: impl Into<String>) -> Self {
        let (resolver, promise) = promise();
        resolver.reject(reason);
        promise
    }

    /// Non-blocking check. `None` while still pending.
    ///
    /// A resolver dropped without settling counts as a rejection.
    pub fn try_settle(&mut self) -> Option<Settlement> {
        match self.rx.try_recv() {
            Ok(Ok(value)) => Some(Settlement::Fulfilled(value)),
            Ok(Err(rejection)) => Some(Settlement::Rejected(rejection)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                Some(Settlement::Rejected(Rejection::new("resolver dropped")))
            }
        }
    }
}

impl Resolver {
    pub fn resolve(self, value: Option<Value>) {
        // The receiver may be gone if the thread was retired; nothing to do then
        let _ = self.tx.send(Ok(value));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(Rejection::new(reason)));
    }
}
