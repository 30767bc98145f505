//! Spans: nested groupings of events within a tail stream.
//!
//! A [`Span`] handle is trace-scoped: it holds a weak reference to its trace
//! plus its span id, so a closed trace (or an already-closed span) makes the
//! handle inert rather than dangling. All emission goes through the trace,
//! which stamps sequence numbers and invokes the delegate.
//!
//! Every span ends with exactly one `span_close` event. Closing a span
//! (explicitly, by drop, or implicitly from a parent) first closes its live
//! children in creation order, so each child's terminal event precedes its
//! parent's. Dropping a span while the trace is open closes it with an
//! unknown outcome; dropping it after the trace closed is silent.
//!
//! [`StageSpan`] is the mandatory top-level span flavor: it records the
//! trigger that started the pipeline stage as its first event and is never
//! transactional.

use crate::event::{
    CloseInfo, Detail, DiagnosticChannelEvent, EventPayload, Exception, Log, Mark, Metric,
    SpanClose, SpanRef, Subrequest, SubrequestOutcome, Tags, TriggerInfo,
};
use crate::clock::Timestamp;
use crate::outcome::SpanOutcome;
use crate::trace::{dispatch, SharedInner, TraceInner};
use core::fmt;
use core::ops::{BitOr, Deref};
use std::cell::RefCell;
use std::rc::Weak;

// =============================================================================
// Options
// =============================================================================

/// Options chosen when a span is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanOptions {
    bits: u8,
}

impl SpanOptions {
    /// No options.
    pub const NONE: Self = Self { bits: 0 };

    /// The span is transactional: a terminal outcome of `canceled` or
    /// `exception` tells consumers to discard the span's events.
    pub const TRANSACTIONAL: Self = Self { bits: 1 };

    /// Returns true if all options in `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl BitOr for SpanOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

// =============================================================================
// Detail sink
// =============================================================================

/// Emission surface shared by the trace (root span) and every span.
///
/// All methods are no-ops once the target span or its trace is closed.
pub trait DetailSink {
    /// Emits one detail event in this context.
    fn add_detail(&self, detail: Detail);

    /// Emits a log line.
    fn add_log(&self, log: Log) {
        self.add_detail(Detail::Log(log));
    }

    /// Emits an exception.
    fn add_exception(&self, exception: Exception) {
        self.add_detail(Detail::Exception(exception));
    }

    /// Emits a diagnostics-channel message.
    fn add_diagnostic_channel_event(&self, event: DiagnosticChannelEvent) {
        self.add_detail(Detail::DiagnosticChannel(event));
    }

    /// Emits a performance mark.
    fn add_mark(&self, mark: Mark) {
        self.add_detail(Detail::Mark(mark));
    }

    /// Emits a batch of metric observations.
    fn add_metrics(&self, metrics: Vec<Metric>) {
        self.add_detail(Detail::Metrics(metrics));
    }

    /// Emits a subrequest start.
    fn add_subrequest(&self, subrequest: Subrequest) {
        self.add_detail(Detail::Subrequest(subrequest));
    }

    /// Emits a subrequest finish.
    fn add_subrequest_outcome(&self, outcome: SubrequestOutcome) {
        self.add_detail(Detail::SubrequestOutcome(outcome));
    }

    /// Emits free-form tags.
    fn add_custom(&self, tags: Tags) {
        self.add_detail(Detail::Custom(tags));
    }
}

// =============================================================================
// Close cascade
// =============================================================================

/// Closes a span node: children first (creation order), then the node
/// itself, emitting its single `span_close` event.
///
/// The node is unregistered before the delegate sees the close event, so a
/// re-entrant `set_outcome` from inside the callback observes an
/// already-terminal span and no-ops. If the trace is no longer open the node
/// is discarded without emission.
pub(crate) fn close_node(
    shared: &SharedInner,
    span_id: u32,
    outcome: SpanOutcome,
    info: Option<CloseInfo>,
    close_tags: Tags,
) {
    // Children may be added mid-cascade by delegate callbacks; rescan until
    // the list is stable.
    loop {
        let children = {
            let inner = shared.borrow();
            match inner.nodes.get(&span_id) {
                None => return,
                Some(node) if node.children.is_empty() => break,
                Some(node) => node.children.clone(),
            }
        };
        for child in children {
            close_node(shared, child, outcome, None, Tags::new());
        }
    }

    let event = {
        let mut inner = shared.borrow_mut();
        let Some(node) = inner.nodes.remove(&span_id) else {
            return;
        };
        if node.parent == 0 {
            inner.stages.retain(|id| *id != span_id);
        } else if let Some(parent) = inner.nodes.get_mut(&node.parent) {
            parent.children.retain(|id| *id != span_id);
        }
        if !inner.is_open() {
            return;
        }
        let span = SpanRef {
            id: span_id,
            parent: node.parent,
        };
        let mut tags = node.tags;
        tags.extend(close_tags);
        let close = SpanClose {
            outcome,
            transactional: node.options.contains(SpanOptions::TRANSACTIONAL),
            info,
            tags,
        };
        inner.make_event(span, EventPayload::SpanClose(close))
    };
    dispatch(shared, event);
}

/// Emits a detail payload in a span's context.
fn emit_on_span(shared: &SharedInner, span_id: u32, payload: EventPayload) {
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
        let span = {
            let Some(node) = inner.nodes.get(&span_id) else {
                return;
            };
            debug_assert!(
                node.trigger_recorded,
                "a stage span must record its event info before other events"
            );
            if !node.trigger_recorded {
                return;
            }
            SpanRef {
                id: span_id,
                parent: node.parent,
            }
        };
        inner.make_event(span, payload)
    };
    dispatch(shared, event);
}

// =============================================================================
// Span
// =============================================================================

/// A logical grouping of events within a tail stream.
///
/// Created by [`StreamingTrace::new_stage_span`](crate::trace::StreamingTrace::new_stage_span)
/// (as a [`StageSpan`]) or [`Span::new_child_span`]. Unrelated spans may
/// overlap freely in time; within a span, events and the terminal close
/// appear in emission order with the close strictly last.
pub struct Span {
    shared: Weak<RefCell<TraceInner>>,
    id: u32,
}

impl Span {
    pub(crate) fn new(shared: Weak<RefCell<TraceInner>>, id: u32) -> Self {
        Self { shared, id }
    }

    /// This span's id within its trace.
    #[must_use]
    pub fn span_id(&self) -> u32 {
        self.id
    }

    /// Returns true once this span is terminal (or its trace is gone).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.upgrade().map_or(true, |shared| {
            let inner = shared.borrow();
            !inner.is_open() || !inner.nodes.contains_key(&self.id)
        })
    }

    /// Closes this span with the given outcome.
    ///
    /// Live children are closed first, in creation order, with the same
    /// outcome (but without `info` or close tags). The emitted `span_close`
    /// carries the outcome, the creation tags followed by `tags`, and the
    /// transactional flag chosen at creation. No-op if already terminal.
    pub fn set_outcome(&self, outcome: SpanOutcome, info: Option<CloseInfo>, tags: Tags) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        close_node(&shared, self.id, outcome, info, tags);
    }

    /// Opens a child span.
    ///
    /// The child's parent is this span; its transactional flag comes from
    /// `options`. Returns `None` if this span (or the trace) is closed.
    #[must_use]
    pub fn new_child_span(&self, tags: Tags, options: SpanOptions) -> Option<Span> {
        let shared = self.shared.upgrade()?;
        let mut inner = shared.borrow_mut();
        if !inner.is_open() || !inner.nodes.contains_key(&self.id) {
            return None;
        }
        let id = inner.next_span_id();
        inner.nodes.insert(
            id,
            crate::trace::SpanNode {
                parent: self.id,
                tags,
                options,
                trigger_recorded: true,
                children: Vec::new(),
            },
        );
        if let Some(parent) = inner.nodes.get_mut(&self.id) {
            parent.children.push(id);
        }
        drop(inner);
        Some(Span::new(Weak::clone(&self.shared), id))
    }
}

impl DetailSink for Span {
    fn add_detail(&self, detail: Detail) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        emit_on_span(&shared, self.id, detail.into());
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        close_node(&shared, self.id, SpanOutcome::Unknown, None, Tags::new());
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// StageSpan
// =============================================================================

/// A top-level span representing one pipeline stage.
///
/// Every top-level span under a trace is a stage span. A stage must record
/// its trigger via [`set_event_info`](Self::set_event_info) before emitting
/// anything else, and is always non-transactional. All other span
/// operations are available through deref.
pub struct StageSpan {
    span: Span,
}

impl StageSpan {
    pub(crate) fn new(span: Span) -> Self {
        Self { span }
    }

    /// Records the trigger that started this stage, emitting an
    /// `event_info` event stamped with the given timestamp.
    ///
    /// Must be the first emission on the stage and can only happen once; a
    /// second call aborts in debug builds and does nothing in release.
    pub fn set_event_info(&self, timestamp: Timestamp, info: TriggerInfo) {
        let Some(shared) = self.span.shared.upgrade() else {
            return;
        };
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
            let span = {
                let Some(node) = inner.nodes.get_mut(&self.span.id) else {
                    return;
                };
                debug_assert!(
                    !node.trigger_recorded,
                    "the stage event info can only be set once"
                );
                if node.trigger_recorded {
                    return;
                }
                node.trigger_recorded = true;
                SpanRef {
                    id: self.span.id,
                    parent: node.parent,
                }
            };
            inner.make_event_at(span, timestamp, EventPayload::Trigger(info))
        };
        dispatch(&shared, event);
    }
}

impl Deref for StageSpan {
    type Target = Span;

    fn deref(&self) -> &Span {
        &self.span
    }
}

impl fmt::Debug for StageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSpan")
            .field("id", &self.span.id)
            .field("closed", &self.span.is_closed())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::delegate::CollectingDelegate;
    use crate::event::{EventKind, FetchInfo, HttpMethod, Onset, StreamEvent, Tag};
    use crate::id::SequentialIdFactory;
    use crate::outcome::TraceOutcome;
    use crate::trace::StreamingTrace;
    use std::rc::Rc;

    fn fetch_trigger() -> TriggerInfo {
        TriggerInfo::Fetch(FetchInfo::new(HttpMethod::Get, "http://example.com"))
    }

    fn open_trace() -> (StreamingTrace, CollectingDelegate, Rc<ManualClock>) {
        let ids = SequentialIdFactory::new("tail");
        let clock = Rc::new(ManualClock::new(Timestamp::from_millis(1_000)));
        let delegate = CollectingDelegate::new();
        let trace =
            StreamingTrace::create(&ids, Onset::new(), delegate.clone(), Rc::clone(&clock) as Rc<dyn Clock>);
        trace.set_event_info(fetch_trigger());
        (trace, delegate, clock)
    }

    fn close_of(event: &StreamEvent) -> &SpanClose {
        match &event.event {
            EventPayload::SpanClose(close) => close,
            other => panic!("expected a span_close payload, got {other:?}"),
        }
    }

    #[test]
    fn options_compose() {
        assert!(!SpanOptions::NONE.contains(SpanOptions::TRANSACTIONAL));
        assert!(SpanOptions::TRANSACTIONAL.contains(SpanOptions::TRANSACTIONAL));
        let combined = SpanOptions::NONE | SpanOptions::TRANSACTIONAL;
        assert!(combined.contains(SpanOptions::TRANSACTIONAL));
        assert_eq!(SpanOptions::default(), SpanOptions::NONE);
    }

    #[test]
    fn stage_trigger_is_emitted_under_the_stage() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());

        let events = delegate.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), EventKind::Trigger);
        assert_eq!(events[1].span, SpanRef { id: 1, parent: 0 });
    }

    #[test]
    fn stage_close_includes_creation_and_close_tags() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace
            .new_stage_span(vec![Tag::new("stage", "main")])
            .expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        stage.set_outcome(SpanOutcome::Ok, None, vec![Tag::new("result", "fresh")]);

        let events = delegate.events();
        let close = close_of(&events[2]);
        assert_eq!(close.outcome, SpanOutcome::Ok);
        assert!(!close.transactional);
        assert_eq!(close.tags.len(), 2);
        assert_eq!(close.tags[0].key, "stage");
        assert_eq!(close.tags[1].key, "result");
    }

    #[test]
    fn set_outcome_is_terminal_and_idempotent() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        stage.set_outcome(SpanOutcome::Ok, None, Tags::new());
        stage.set_outcome(SpanOutcome::Exception, None, Tags::new());
        stage.add_mark(Mark::new("late"));

        let events = delegate.events();
        assert_eq!(events.len(), 3);
        assert_eq!(close_of(&events[2]).outcome, SpanOutcome::Ok);
        assert!(stage.is_closed());
    }

    #[test]
    fn children_close_before_their_parent() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        let a = stage
            .new_child_span(Tags::new(), SpanOptions::NONE)
            .expect("stage is live");
        let b = a
            .new_child_span(Tags::new(), SpanOptions::NONE)
            .expect("a is live");
        stage.set_outcome(SpanOutcome::Canceled, None, Tags::new());

        let events = delegate.events();
        // onset, trigger, close(b), close(a), close(stage)
        assert_eq!(events.len(), 5);
        assert_eq!(events[2].span.id, b.span_id());
        assert_eq!(events[3].span.id, a.span_id());
        assert_eq!(events[4].span.id, stage.span_id());
        for event in &events[2..] {
            assert_eq!(close_of(event).outcome, SpanOutcome::Canceled);
        }
        assert!(a.is_closed());
        assert!(b.is_closed());
    }

    #[test]
    fn dropping_a_span_closes_it_with_unknown() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        drop(stage);

        let events = delegate.events();
        assert_eq!(events.len(), 3);
        assert_eq!(close_of(&events[2]).outcome, SpanOutcome::Unknown);
        drop(trace);
    }

    #[test]
    fn dropping_after_trace_close_is_silent() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        trace.set_outcome(TraceOutcome::Ok);

        let before = delegate.len();
        drop(stage);
        assert_eq!(delegate.len(), before);
    }

    #[test]
    fn transactional_flag_rides_the_close_event() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        let child = stage
            .new_child_span(Tags::new(), SpanOptions::TRANSACTIONAL)
            .expect("stage is live");
        child.set_outcome(SpanOutcome::Exception, None, Tags::new());
        stage.set_outcome(SpanOutcome::Ok, None, Tags::new());

        let events = delegate.events();
        let child_close = close_of(&events[2]);
        assert!(child_close.transactional);
        assert_eq!(child_close.outcome, SpanOutcome::Exception);
        let stage_close = close_of(&events[3]);
        assert!(!stage_close.transactional);
        assert_eq!(stage_close.outcome, SpanOutcome::Ok);
    }

    #[test]
    fn closed_span_refuses_children_and_details() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        stage.set_outcome(SpanOutcome::Ok, None, Tags::new());

        assert!(stage
            .new_child_span(Tags::new(), SpanOptions::NONE)
            .is_none());
        let before = delegate.len();
        stage.add_log(Log::new(clock.now(), crate::event::LogLevel::Info, "x"));
        assert_eq!(delegate.len(), before);
    }

    #[test]
    fn close_info_is_carried() {
        let (trace, delegate, clock) = open_trace();
        let stage = trace.new_stage_span(Tags::new()).expect("open trace");
        stage.set_event_info(clock.now(), fetch_trigger());
        stage.set_outcome(
            SpanOutcome::Ok,
            Some(CloseInfo::FetchResponse(crate::event::FetchResponseInfo {
                status_code: 200,
            })),
            Tags::new(),
        );

        let events = delegate.events();
        let close = close_of(&events[2]);
        assert!(matches!(
            close.info,
            Some(CloseInfo::FetchResponse(crate::event::FetchResponseInfo {
                status_code: 200
            }))
        ));
    }
}
