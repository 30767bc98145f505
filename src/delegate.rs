//! The delegate: where emitted events go.
//!
//! The engine does not buffer. Every emission builds a [`StreamEvent`] and
//! hands it to the trace's delegate by move, synchronously, in sequence
//! order. Delegates must be cheap and non-blocking; batching, backpressure,
//! and transport live downstream.
//!
//! A delegate failure is fatal to its trace: the trace enters a broken state
//! in which all further emissions are suppressed and no outcome event is
//! produced, so consumers observe an unterminated prefix of the stream.

use crate::event::StreamEvent;
use core::fmt;

/// Error returned by a failing delegate.
#[derive(Debug, thiserror::Error)]
#[error("delegate failed: {message}")]
pub struct DelegateError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DelegateError {
    /// Creates an error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Consumer of emitted stream events.
///
/// Invoked once per event, in sequence order, on the emitting thread. The
/// event is consumed by move; implementations must not assume anything
/// outlives the call. Returning an error marks the trace broken.
///
/// Closures of type `FnMut(StreamEvent) -> Result<(), DelegateError>`
/// implement this trait.
pub trait Delegate {
    /// Consumes one emitted event.
    ///
    /// # Errors
    ///
    /// Any error breaks the emitting trace.
    fn deliver(&mut self, event: StreamEvent) -> Result<(), DelegateError>;
}

impl<F> Delegate for F
where
    F: FnMut(StreamEvent) -> Result<(), DelegateError>,
{
    fn deliver(&mut self, event: StreamEvent) -> Result<(), DelegateError> {
        self(event)
    }
}

/// Delegate that appends every event to a shared buffer.
///
/// Useful in tests and for hosts that flush a completed trace wholesale.
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CollectingDelegate {
    events: std::rc::Rc<std::cell::RefCell<Vec<StreamEvent>>>,
}

impl CollectingDelegate {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.borrow().clone()
    }

    /// Returns the number of events collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl fmt::Debug for CollectingDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectingDelegate")
            .field("len", &self.len())
            .finish()
    }
}

impl Delegate for CollectingDelegate {
    fn deliver(&mut self, event: StreamEvent) -> Result<(), DelegateError> {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}
