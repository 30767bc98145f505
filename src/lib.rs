//! Tailstream: a streaming trace engine for server-side workloads.
//!
//! # Overview
//!
//! Tailstream records the execution of a workload invocation (a request
//! handler, an alarm, a scheduled job) as one strictly ordered stream of
//! typed events, grouped into hierarchical, optionally transactional spans.
//! Each event is handed to a pluggable delegate the moment it is produced;
//! the engine never buffers. Transport, batching, and aggregation live
//! downstream of the delegate.
//!
//! # Core guarantees
//!
//! - **Total order**: every event carries a per-trace sequence number;
//!   sequences are strictly increasing from 0.
//! - **Bracketed streams**: the first event of a trace is always the onset,
//!   and a cleanly closed trace ends with exactly one outcome event.
//! - **Child-first closure**: closing a span (explicitly, by drop, or
//!   implicitly from a parent) closes its live children first, in creation
//!   order, so every child's terminal event precedes its parent's.
//! - **One terminal per span**: a span emits at most one `span_close`.
//! - **Inert handles**: span handles go through their trace; once the trace
//!   closes, surviving handles do nothing.
//! - **Round-trippable events**: encoding an event to the external JSON
//!   form and decoding it back reproduces the event.
//!
//! # Module structure
//!
//! - [`id`]: opaque tail ids and the pluggable id factory
//! - [`clock`]: timestamps and the pluggable time source
//! - [`outcome`]: trace and span outcome vocabularies and their projection
//! - [`event`]: the event model (the closed payload sum)
//! - [`wire`]: the external encoded form
//! - [`delegate`]: the downstream sink contract
//! - [`trace`]: the trace session (root span)
//! - [`span`]: nested spans and stage spans
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use tailstream::{
//!     Clock, CollectingDelegate, DetailSink, EventKind, FetchInfo, HttpMethod, Log,
//!     LogLevel, ManualClock, Onset, SequentialIdFactory, SpanOutcome, StreamEvent,
//!     StreamingTrace, Timestamp, TraceOutcome, TriggerInfo,
//! };
//!
//! let ids = SequentialIdFactory::new("tail");
//! let clock = Rc::new(ManualClock::new(Timestamp::from_millis(1_000)));
//! let delegate = CollectingDelegate::new();
//!
//! let trace = StreamingTrace::create(&ids, Onset::new(), delegate.clone(), clock.clone());
//! trace.set_event_info(TriggerInfo::Fetch(FetchInfo::new(
//!     HttpMethod::Get,
//!     "http://example.com",
//! )));
//!
//! let stage = trace.new_stage_span(Vec::new()).expect("trace is open");
//! stage.set_event_info(
//!     clock.now(),
//!     TriggerInfo::Fetch(FetchInfo::new(HttpMethod::Get, "http://example.com")),
//! );
//! stage.add_log(Log::new(clock.now(), LogLevel::Info, "handling request"));
//! stage.set_outcome(SpanOutcome::Ok, None, Vec::new());
//! trace.set_outcome(TraceOutcome::Ok);
//!
//! let events = delegate.events();
//! assert_eq!(events.len(), 5);
//! assert_eq!(events.first().map(StreamEvent::kind), Some(EventKind::Onset));
//! assert_eq!(events.last().map(StreamEvent::kind), Some(EventKind::Outcome));
//! ```
//!
//! # Threading
//!
//! The engine is a single-threaded cooperative producer: a trace and all its
//! spans are pinned to the creating thread, and the delegate runs
//! synchronously on that thread. There is no internal locking.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod clock;
pub mod delegate;
pub mod event;
pub mod id;
pub mod outcome;
pub mod span;
pub mod trace;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use delegate::{CollectingDelegate, Delegate, DelegateError};
pub use event::{
    AlarmInfo, CloseInfo, Detail, DiagnosticChannelEvent, Dropped, EmailInfo, EventKind,
    EventPayload, Exception, ExecutionModel, FetchHeader, FetchInfo, FetchResponseInfo,
    HttpMethod, JsRpcInfo, Log, LogLevel, Mark, Metric, MetricKind, Onset, OutcomePayload,
    QueueInfo, ScheduledInfo, SpanClose, SpanRef, StreamEvent, Subrequest, SubrequestOutcome,
    Tag, TagValue, Tags, TriggerInfo,
};
pub use id::{IdFactory, SequentialIdFactory, TailId, UuidIdFactory};
pub use outcome::{SpanOutcome, TraceOutcome};
pub use span::{DetailSink, Span, SpanOptions, StageSpan};
pub use trace::StreamingTrace;
pub use wire::{decode, encode, WireError};
