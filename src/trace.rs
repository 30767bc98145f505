//! Tail stream sessions.
//!
//! A [`StreamingTrace`] is the root span of one tail stream: it allocates
//! span ids, stamps every emission with the next sequence number, and hands
//! the finished [`StreamEvent`] to the delegate. The trace itself emits the
//! onset (first event), the terminal outcome (last event), dropped-range
//! notices, and any details the host attaches at the root.
//!
//! # Lifecycle
//!
//! ```ignore
//! let trace = StreamingTrace::create(&ids, onset, delegate, clock);
//! trace.set_event_info(trigger);            // emits the onset
//! let stage = trace.new_stage_span(tags);   // spans emit through the trace
//! // ...
//! trace.set_outcome(TraceOutcome::Ok);      // closes spans, emits the outcome
//! ```
//!
//! Dropping the trace while open closes it with an unknown outcome. A trace
//! whose trigger was never recorded closes silently: without an onset there
//! is nothing meaningful to report downstream.
//!
//! # Broken traces
//!
//! If the delegate fails, the trace is broken: every later emission is
//! suppressed and no outcome event is produced. Consumers observe a prefix
//! of the stream with no terminal event and must infer the loss.

use crate::clock::{Clock, Timestamp};
use crate::delegate::Delegate;
use crate::event::{
    Detail, Dropped, EventPayload, Onset, OutcomePayload, SpanRef, StreamEvent, Tags,
    TriggerInfo,
};
use crate::id::{IdFactory, TailId};
use crate::outcome::TraceOutcome;
use crate::span::{close_node, DetailSink, Span, SpanOptions, StageSpan};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

// =============================================================================
// Session internals
// =============================================================================

/// Macro-state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// Accepting emissions.
    Open,
    /// Terminated normally; every operation is a no-op.
    Closed,
    /// The delegate failed; emissions are suppressed and no outcome follows.
    Broken,
}

/// One live span registered with the trace.
pub(crate) struct SpanNode {
    /// Parent span id (0 when the parent is the trace itself).
    pub(crate) parent: u32,
    /// Tags captured at creation; included in the span's close event.
    pub(crate) tags: Tags,
    /// Options chosen at creation.
    pub(crate) options: SpanOptions,
    /// Whether the stage trigger has been recorded. Non-stage spans are
    /// created with this already set.
    pub(crate) trigger_recorded: bool,
    /// Live children, in creation order.
    pub(crate) children: Vec<u32>,
}

/// State shared between the trace handle and its span handles.
pub(crate) struct TraceInner {
    pub(crate) state: SessionState,
    pub(crate) id: TailId,
    pub(crate) onset: Onset,
    pub(crate) onset_emitted: bool,
    /// Taken out for the duration of each delivery; `None` also while the
    /// trace is broken or closed.
    pub(crate) delegate: Option<Box<dyn Delegate>>,
    pub(crate) clock: Rc<dyn Clock>,
    /// Last allocated span id; the first allocation returns 1.
    pub(crate) span_counter: u32,
    /// Next sequence number; the first emission gets 0.
    pub(crate) sequence_counter: u32,
    /// Live spans keyed by span id.
    pub(crate) nodes: BTreeMap<u32, SpanNode>,
    /// Live top-level spans, in creation order.
    pub(crate) stages: Vec<u32>,
}

impl TraceInner {
    pub(crate) fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Allocates the next span id. Overflow is fatal.
    pub(crate) fn next_span_id(&mut self) -> u32 {
        self.span_counter = self
            .span_counter
            .checked_add(1)
            .expect("span id counter overflow");
        self.span_counter
    }

    /// Allocates the next sequence number. Overflow is fatal.
    pub(crate) fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence_counter;
        self.sequence_counter = sequence
            .checked_add(1)
            .expect("sequence counter overflow");
        sequence
    }

    /// Builds an event stamped with the clock's current time.
    pub(crate) fn make_event(&mut self, span: SpanRef, payload: EventPayload) -> StreamEvent {
        let timestamp = self.clock.now();
        self.make_event_at(span, timestamp, payload)
    }

    /// Builds an event with an explicit timestamp.
    pub(crate) fn make_event_at(
        &mut self,
        span: SpanRef,
        timestamp: Timestamp,
        payload: EventPayload,
    ) -> StreamEvent {
        let sequence = self.next_sequence();
        StreamEvent::new(self.id.clone(), span, timestamp, sequence, payload)
    }
}

pub(crate) type SharedInner = Rc<RefCell<TraceInner>>;

/// Hands one event to the delegate.
///
/// The delegate is taken out of the shared state for the duration of the
/// call so the callback can re-enter the trace (e.g. to open a child span)
/// without aliasing. A failure breaks the trace and drops the delegate.
pub(crate) fn dispatch(shared: &SharedInner, event: StreamEvent) {
    let delegate = shared.borrow_mut().delegate.take();
    let Some(mut delegate) = delegate else { return };
    let result = delegate.deliver(event);
    let mut inner = shared.borrow_mut();
    match result {
        Ok(()) => inner.delegate = Some(delegate),
        Err(_) => inner.state = SessionState::Broken,
    }
}

/// Emits a payload under the root span. Requires the onset to be out.
fn emit_root(shared: &SharedInner, payload: EventPayload) {
    let event = {
        let mut inner = shared.borrow_mut();
        if !inner.is_open() {
            return;
        }
        debug_assert!(
            inner.onset_emitted,
            "the onset event info must be set before other events"
        );
        if !inner.onset_emitted {
            return;
        }
        inner.make_event(SpanRef::root(), payload)
    };
    dispatch(shared, event);
}

/// Closes the session with the given outcome.
///
/// Force-closes every live stage (children first) with the projected span
/// outcome, emits the terminal `Outcome` event, and releases the delegate.
pub(crate) fn set_trace_outcome(shared: &SharedInner, outcome: TraceOutcome) {
    {
        let mut inner = shared.borrow_mut();
        if !inner.is_open() {
            return;
        }
        if !inner.onset_emitted {
            // No trigger was ever recorded: the stream has no onset, so it
            // must not gain span-close or outcome events either.
            inner.state = SessionState::Closed;
            inner.nodes.clear();
            inner.stages.clear();
            inner.delegate = None;
            return;
        }
    }

    let projected = outcome.project();
    loop {
        let next = shared.borrow().stages.first().copied();
        let Some(stage) = next else { break };
        close_node(shared, stage, projected, None, Tags::new());
    }

    let event = {
        let mut inner = shared.borrow_mut();
        // The delegate may have failed mid-cascade.
        if !inner.is_open() {
            return;
        }
        debug_assert!(
            inner.stages.is_empty() && inner.nodes.is_empty(),
            "all spans must be closed before the outcome is emitted"
        );
        let payload = EventPayload::Outcome(OutcomePayload {
            outcome,
            cpu_time_ms: inner.clock.cpu_time().as_millis() as u64,
            wall_time_ms: inner.clock.wall_time().as_millis() as u64,
        });
        inner.state = SessionState::Closed;
        inner.make_event(SpanRef::root(), payload)
    };
    dispatch(shared, event);
    shared.borrow_mut().delegate = None;
}

// =============================================================================
// StreamingTrace
// =============================================================================

/// One tail stream session.
///
/// The trace owns the delegate and the registry of live spans; span handles
/// go through the trace, so once the trace closes every surviving handle is
/// inert. The trace and its spans are pinned to the creating thread.
pub struct StreamingTrace {
    shared: SharedInner,
}

impl StreamingTrace {
    /// Creates a new session.
    ///
    /// Allocates an id from the factory and stores the onset descriptor,
    /// delegate, and clock. Nothing is emitted until
    /// [`set_event_info`](Self::set_event_info) records the trigger.
    #[must_use]
    pub fn create(
        ids: &dyn IdFactory,
        onset: Onset,
        delegate: impl Delegate + 'static,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Rc::new(RefCell::new(TraceInner {
                state: SessionState::Open,
                id: ids.new_id(),
                onset,
                onset_emitted: false,
                delegate: Some(Box::new(delegate)),
                clock,
                span_counter: 0,
                sequence_counter: 0,
                nodes: BTreeMap::new(),
                stages: Vec::new(),
            })),
        }
    }

    /// Returns the session id, or `None` once the session is closed.
    #[must_use]
    pub fn id(&self) -> Option<TailId> {
        let inner = self.shared.borrow();
        inner.is_open().then(|| inner.id.clone())
    }

    /// Records the trigger and emits the onset event.
    ///
    /// Permitted exactly once, only while open, and before any other
    /// emission. A second call (or a call on a closed trace) is a contract
    /// violation: it aborts in debug builds and does nothing in release.
    pub fn set_event_info(&self, info: TriggerInfo) {
        let event = {
            let mut inner = self.shared.borrow_mut();
            match inner.state {
                SessionState::Open => {}
                SessionState::Broken => return,
                SessionState::Closed => {
                    debug_assert!(false, "the streaming trace is closed");
                    return;
                }
            }
            debug_assert!(
                inner.onset.trigger.is_none(),
                "the onset event info can only be set once"
            );
            if inner.onset.trigger.is_some() {
                return;
            }
            inner.onset.trigger = Some(info);
            inner.onset_emitted = true;
            let payload = EventPayload::Onset(inner.onset.clone());
            inner.make_event(SpanRef::root(), payload)
        };
        dispatch(&self.shared, event);
    }

    /// Explicitly closes the session with the given outcome.
    ///
    /// All live stage spans are implicitly closed first, in creation order,
    /// with the outcome projected onto the span vocabulary; each stage
    /// closes its own children first. No-op if the session is already
    /// closed. If the trigger was never recorded the session closes
    /// silently, emitting nothing.
    pub fn set_outcome(&self, outcome: TraceOutcome) {
        set_trace_outcome(&self.shared, outcome);
    }

    /// Notifies the stream that events in the sequence range `start..=end`
    /// were intentionally not delivered.
    ///
    /// Requires the onset to be out, `start <= end`, and both bounds within
    /// the sequences allocated so far.
    pub fn add_dropped(&self, start: u32, end: u32) {
        {
            let inner = self.shared.borrow();
            if !inner.is_open() {
                return;
            }
            let within = start <= end && end < inner.sequence_counter;
            debug_assert!(
                within,
                "dropped range must be ordered and within allocated sequences"
            );
            if !within {
                return;
            }
        }
        emit_root(&self.shared, EventPayload::Dropped(Dropped { start, end }));
    }

    /// Opens a new top-level stage span.
    ///
    /// Returns `None` if the session is closed. The stage is registered in
    /// the live list before this returns; nothing is emitted until the
    /// stage records its trigger.
    #[must_use]
    pub fn new_stage_span(&self, tags: Tags) -> Option<StageSpan> {
        let mut inner = self.shared.borrow_mut();
        if !inner.is_open() {
            return None;
        }
        debug_assert!(
            inner.onset_emitted,
            "the onset event info must be set before spans are opened"
        );
        let id = inner.next_span_id();
        inner.nodes.insert(
            id,
            SpanNode {
                parent: 0,
                tags,
                options: SpanOptions::NONE,
                trigger_recorded: false,
                children: Vec::new(),
            },
        );
        inner.stages.push(id);
        drop(inner);
        Some(StageSpan::new(Span::new(Rc::downgrade(&self.shared), id)))
    }
}

impl DetailSink for StreamingTrace {
    fn add_detail(&self, detail: Detail) {
        emit_root(&self.shared, detail.into());
    }
}

impl Drop for StreamingTrace {
    fn drop(&mut self) {
        set_trace_outcome(&self.shared, TraceOutcome::Unknown);
        debug_assert!(
            self.shared.borrow().stages.is_empty(),
            "all stage spans must be closed before the trace is destroyed"
        );
    }
}

impl core::fmt::Debug for StreamingTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.shared.borrow();
        f.debug_struct("StreamingTrace")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("live_spans", &inner.nodes.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
