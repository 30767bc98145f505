#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use std::rc::Rc;
use std::sync::Once;
use tailstream::{
    Clock, CollectingDelegate, EventPayload, FetchInfo, HttpMethod, ManualClock, Onset,
    SequentialIdFactory, SpanClose, StreamEvent, StreamingTrace, Timestamp, TriggerInfo,
};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// A fetch trigger pointing at a fixed example URL.
pub fn fetch_trigger() -> TriggerInfo {
    TriggerInfo::Fetch(FetchInfo::new(HttpMethod::Get, "http://example.com"))
}

/// An open trace plus the collaborators the tests poke at.
pub struct TraceFixture {
    pub trace: StreamingTrace,
    pub delegate: CollectingDelegate,
    pub clock: Rc<ManualClock>,
}

/// Creates a trace with deterministic ids, a manual clock starting at 1000ms,
/// and the onset already emitted with a fetch trigger.
pub fn open_trace() -> TraceFixture {
    init_test_logging();
    let ids = SequentialIdFactory::new("tail");
    let clock = Rc::new(ManualClock::new(Timestamp::from_millis(1_000)));
    let delegate = CollectingDelegate::new();
    let trace = StreamingTrace::create(
        &ids,
        Onset::new(),
        delegate.clone(),
        Rc::clone(&clock) as Rc<dyn Clock>,
    );
    trace.set_event_info(fetch_trigger());
    TraceFixture {
        trace,
        delegate,
        clock,
    }
}

/// Extracts the `span_close` payload of an event, or panics.
pub fn close_of(event: &StreamEvent) -> &SpanClose {
    match &event.event {
        EventPayload::SpanClose(close) => close,
        other => panic!("expected a span_close payload, got {other:?}"),
    }
}

/// Asserts that sequences form exactly `0..len`.
pub fn assert_contiguous_sequences(events: &[StreamEvent]) {
    for (index, event) in events.iter().enumerate() {
        assert_eq!(
            event.sequence, index as u32,
            "event {index} has sequence {}",
            event.sequence
        );
    }
}
