//! The event model for tail streams.
//!
//! Everything a trace emits is a [`StreamEvent`]: the session id, the span
//! the event occurred in, a timestamp, the per-trace sequence number, and a
//! payload drawn from the closed [`EventPayload`] sum. The serde derives on
//! these types define the external encoded form directly, so encoding then
//! decoding an event reproduces it with full fidelity.
//!
//! # Payload taxonomy
//!
//! | Kind | Emitted by | Meaning |
//! |------|-----------|---------|
//! | `onset` | trace | First event: session metadata plus the trigger |
//! | `outcome` | trace | Last event: terminal disposition and durations |
//! | `dropped` | trace | A sequence range was intentionally not delivered |
//! | `span_close` | span | A span's single terminal event |
//! | `event_info` | stage span | The trigger that started a pipeline stage |
//! | everything else | span or trace | Detail events within a span |

use crate::clock::Timestamp;
use crate::id::TailId;
use crate::outcome::{SpanOutcome, TraceOutcome};
use core::fmt;
use serde::{Deserialize, Serialize};

// =============================================================================
// Span reference
// =============================================================================

/// The span an event occurred in.
///
/// Span id 0 is the root span, i.e. the trace itself; a parent of 0 marks a
/// top-level (stage) span.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct SpanRef {
    /// The span's id, unique within the trace.
    pub id: u32,
    /// The parent span's id (0 when the parent is the trace itself).
    pub parent: u32,
}

impl SpanRef {
    /// The root span: the trace itself.
    #[must_use]
    pub const fn root() -> Self {
        Self { id: 0, parent: 0 }
    }

    /// Returns true if this is the root span.
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.id == 0
    }
}

// =============================================================================
// Stream event
// =============================================================================

/// One event in a tail stream.
///
/// Events are totally ordered by `sequence` within a trace, regardless of
/// which span they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// The tail stream session id shared by all events in the trace.
    pub id: TailId,
    /// The span this event occurred in.
    pub span: SpanRef,
    /// Wall-clock time of the emission.
    #[serde(rename = "timestamp_ms_since_epoch")]
    pub timestamp: Timestamp,
    /// Per-trace monotonic sequence number, starting at 0.
    pub sequence: u32,
    /// The payload.
    pub event: EventPayload,
}

impl StreamEvent {
    /// Creates a new stream event.
    #[must_use]
    pub fn new(
        id: TailId,
        span: SpanRef,
        timestamp: Timestamp,
        sequence: u32,
        event: EventPayload,
    ) -> Self {
        Self {
            id,
            span,
            timestamp,
            sequence,
            event,
        }
    }

    /// Returns the kind of this event's payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

// =============================================================================
// Payload
// =============================================================================

/// The closed sum of event payloads.
///
/// New payload kinds are added by extending this enum; matches over it are
/// exhaustive so omissions surface at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// Session metadata; always the first event of a trace.
    Onset(Onset),
    /// Terminal disposition; always the last event of a trace.
    Outcome(OutcomePayload),
    /// A range of sequence numbers was intentionally not delivered.
    Dropped(Dropped),
    /// A span's terminal event.
    SpanClose(SpanClose),
    /// The trigger that started a pipeline stage.
    #[serde(rename = "event_info")]
    Trigger(TriggerInfo),
    /// A console or structured log line.
    Log(Log),
    /// An uncaught or reported exception.
    Exception(Exception),
    /// A diagnostics-channel message.
    DiagnosticChannel(DiagnosticChannelEvent),
    /// A user performance mark.
    Mark(Mark),
    /// A batch of metric observations.
    Metrics(Vec<Metric>),
    /// An outbound subrequest was started.
    Subrequest(Subrequest),
    /// An outbound subrequest finished.
    SubrequestOutcome(SubrequestOutcome),
    /// Free-form tags attached by the workload.
    Custom(Tags),
}

impl EventPayload {
    /// Returns the kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Onset(_) => EventKind::Onset,
            Self::Outcome(_) => EventKind::Outcome,
            Self::Dropped(_) => EventKind::Dropped,
            Self::SpanClose(_) => EventKind::SpanClose,
            Self::Trigger(_) => EventKind::Trigger,
            Self::Log(_) => EventKind::Log,
            Self::Exception(_) => EventKind::Exception,
            Self::DiagnosticChannel(_) => EventKind::DiagnosticChannel,
            Self::Mark(_) => EventKind::Mark,
            Self::Metrics(_) => EventKind::Metrics,
            Self::Subrequest(_) => EventKind::Subrequest,
            Self::SubrequestOutcome(_) => EventKind::SubrequestOutcome,
            Self::Custom(_) => EventKind::Custom,
        }
    }
}

impl From<Detail> for EventPayload {
    fn from(detail: Detail) -> Self {
        match detail {
            Detail::Log(log) => Self::Log(log),
            Detail::Exception(exception) => Self::Exception(exception),
            Detail::DiagnosticChannel(event) => Self::DiagnosticChannel(event),
            Detail::Mark(mark) => Self::Mark(mark),
            Detail::Metrics(metrics) => Self::Metrics(metrics),
            Detail::Subrequest(subrequest) => Self::Subrequest(subrequest),
            Detail::SubrequestOutcome(outcome) => Self::SubrequestOutcome(outcome),
            Detail::Custom(tags) => Self::Custom(tags),
        }
    }
}

/// The kind of an event payload, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Session metadata.
    Onset,
    /// Terminal disposition.
    Outcome,
    /// Dropped sequence range.
    Dropped,
    /// Span terminal event.
    SpanClose,
    /// Stage trigger.
    Trigger,
    /// Log line.
    Log,
    /// Exception.
    Exception,
    /// Diagnostics-channel message.
    DiagnosticChannel,
    /// Performance mark.
    Mark,
    /// Metric batch.
    Metrics,
    /// Subrequest start.
    Subrequest,
    /// Subrequest finish.
    SubrequestOutcome,
    /// Custom tags.
    Custom,
}

impl EventKind {
    /// Canonical list of all event kinds.
    pub const ALL: [Self; 13] = [
        Self::Onset,
        Self::Outcome,
        Self::Dropped,
        Self::SpanClose,
        Self::Trigger,
        Self::Log,
        Self::Exception,
        Self::DiagnosticChannel,
        Self::Mark,
        Self::Metrics,
        Self::Subrequest,
        Self::SubrequestOutcome,
        Self::Custom,
    ];

    /// Stable, grep-friendly name matching the wire encoding.
    #[must_use]
    pub const fn stable_name(self) -> &'static str {
        match self {
            Self::Onset => "onset",
            Self::Outcome => "outcome",
            Self::Dropped => "dropped",
            Self::SpanClose => "span_close",
            Self::Trigger => "event_info",
            Self::Log => "log",
            Self::Exception => "exception",
            Self::DiagnosticChannel => "diagnostic_channel",
            Self::Mark => "mark",
            Self::Metrics => "metrics",
            Self::Subrequest => "subrequest",
            Self::SubrequestOutcome => "subrequest_outcome",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stable_name())
    }
}

/// Detail events a workload can attach to a span (or to the trace itself,
/// under the root span).
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    /// A log line.
    Log(Log),
    /// An exception.
    Exception(Exception),
    /// A diagnostics-channel message.
    DiagnosticChannel(DiagnosticChannelEvent),
    /// A performance mark.
    Mark(Mark),
    /// A metric batch.
    Metrics(Vec<Metric>),
    /// A subrequest start.
    Subrequest(Subrequest),
    /// A subrequest finish.
    SubrequestOutcome(SubrequestOutcome),
    /// Custom tags.
    Custom(Tags),
}

// =============================================================================
// Onset
// =============================================================================

/// How the traced workload executes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Ordinary stateless invocations.
    #[default]
    Stateless,
    /// A durable, stateful instance.
    Durable,
    /// A workflow execution.
    Workflow,
}

/// Metadata describing the onset of a trace session.
///
/// Captured at trace creation and extended exactly once with the triggering
/// [`TriggerInfo`] before the onset event is emitted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Onset {
    /// Account or tenant owning the workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Stable identifier of the deployed workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    /// Name of the script being traced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
    /// Version label of the script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_version: Option<String>,
    /// Dispatch namespace, if the workload runs in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_namespace: Option<String>,
    /// Free-form tags attached to the script deployment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script_tags: Vec<String>,
    /// Entrypoint export handling the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// Execution model of the workload.
    #[serde(default)]
    pub execution_model: ExecutionModel,
    /// The trigger that started the session, attached via the trace's
    /// `set_event_info`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerInfo>,
}

impl Onset {
    /// Creates an empty onset descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owning account or tenant.
    #[must_use]
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Sets the script name.
    #[must_use]
    pub fn with_script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = Some(name.into());
        self
    }

    /// Sets the script version label.
    #[must_use]
    pub fn with_script_version(mut self, version: impl Into<String>) -> Self {
        self.script_version = Some(version.into());
        self
    }

    /// Sets the entrypoint export.
    #[must_use]
    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Sets the execution model.
    #[must_use]
    pub fn with_execution_model(mut self, model: ExecutionModel) -> Self {
        self.execution_model = model;
        self
    }
}

// =============================================================================
// Outcome / Dropped / SpanClose
// =============================================================================

/// Terminal payload of a trace: disposition plus accumulated durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomePayload {
    /// How the session ended.
    pub outcome: TraceOutcome,
    /// CPU time consumed, in milliseconds.
    pub cpu_time_ms: u64,
    /// Wall time elapsed, in milliseconds.
    pub wall_time_ms: u64,
}

/// Marks a sequence range that was intentionally not delivered.
///
/// `start <= end`, and both bounds lie within the sequences the trace has
/// allocated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropped {
    /// First dropped sequence number.
    pub start: u32,
    /// Last dropped sequence number.
    pub end: u32,
}

/// A span's terminal event.
///
/// Carries the outcome, the span's creation tags plus any close-time tags,
/// and the transactional flag chosen at span creation. A transactional close
/// with a `canceled` or `exception` outcome tells consumers to discard every
/// event bearing this span's id (and any descendant span ids).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanClose {
    /// The span's terminal disposition.
    pub outcome: SpanOutcome,
    /// Whether the span was opened transactional.
    #[serde(default)]
    pub transactional: bool,
    /// Optional close detail, e.g. the response of a fetch stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<CloseInfo>,
    /// The span's tags: creation tags followed by close-time tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Tags,
}

/// Additional detail attached to a span close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseInfo {
    /// The response that concluded a fetch stage.
    FetchResponse(FetchResponseInfo),
    /// Free-form close detail.
    Custom(Tags),
}

/// Response metadata for a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponseInfo {
    /// HTTP status code of the response.
    pub status_code: u16,
}

// =============================================================================
// Trigger info
// =============================================================================

/// HTTP method of a fetch trigger or subrequest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        };
        f.write_str(name)
    }
}

/// One header captured with a fetch trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl FetchHeader {
    /// Creates a header pair.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An incoming HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchInfo {
    /// Request method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Serialized request metadata (the `cf` object), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_json: Option<String>,
    /// Captured request headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<FetchHeader>,
}

impl FetchInfo {
    /// Creates fetch info for a method and URL.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            cf_json: None,
            headers: Vec::new(),
        }
    }
}

/// A JS RPC method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsRpcInfo {
    /// Name of the invoked method.
    pub method: String,
}

/// A cron-scheduled invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInfo {
    /// Scheduled time, in milliseconds since the Unix epoch.
    pub scheduled_time: f64,
    /// The cron expression that fired.
    pub cron: String,
}

/// An alarm invocation on a durable instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmInfo {
    /// The time the alarm was scheduled for.
    pub scheduled_time: Timestamp,
}

/// A queue batch delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Name of the queue.
    pub queue_name: String,
    /// Number of messages in the batch.
    pub batch_size: u32,
}

/// An inbound email delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailInfo {
    /// Envelope sender.
    pub mail_from: String,
    /// Envelope recipient.
    pub rcpt_to: String,
    /// Size of the raw message in bytes.
    pub raw_size: u32,
}

/// The event that triggered a trace session or pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerInfo {
    /// An incoming HTTP request.
    Fetch(FetchInfo),
    /// A JS RPC invocation.
    JsRpc(JsRpcInfo),
    /// A cron-scheduled invocation.
    Scheduled(ScheduledInfo),
    /// An alarm on a durable instance.
    Alarm(AlarmInfo),
    /// A queue batch delivery.
    Queue(QueueInfo),
    /// An inbound email.
    Email(EmailInfo),
    /// A host-defined trigger.
    Custom(Tags),
}

// =============================================================================
// Detail records
// =============================================================================

/// Severity of a log line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Informational.
    Info,
    /// Plain console output.
    Log,
    /// Something looks wrong.
    Warn,
    /// Something is wrong.
    Error,
}

/// A log line produced by the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// When the line was produced.
    pub timestamp: Timestamp,
    /// Severity.
    pub level: LogLevel,
    /// The message text.
    pub message: String,
}

impl Log {
    /// Creates a log line.
    #[must_use]
    pub fn new(timestamp: Timestamp, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }
}

/// An exception reported by the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    /// When the exception was captured.
    pub timestamp: Timestamp,
    /// Exception type name.
    pub name: String,
    /// Exception message.
    pub message: String,
    /// Stack trace, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Exception {
    /// Creates an exception record.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// A message published on a diagnostics channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticChannelEvent {
    /// When the message was published.
    pub timestamp: Timestamp,
    /// Channel name.
    pub channel: String,
    /// Serialized message payload.
    pub payload: Vec<u8>,
}

/// A user performance mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    /// Mark name.
    pub name: String,
}

impl Mark {
    /// Creates a mark.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// What a metric observation measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// A monotonically accumulating count.
    Counter,
    /// A point-in-time level.
    Gauge,
}

/// One metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Counter or gauge.
    pub kind: MetricKind,
    /// Metric name.
    pub name: String,
    /// Observed value.
    pub value: f64,
}

impl Metric {
    /// Creates a counter observation.
    #[must_use]
    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self {
            kind: MetricKind::Counter,
            name: name.into(),
            value,
        }
    }

    /// Creates a gauge observation.
    #[must_use]
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            kind: MetricKind::Gauge,
            name: name.into(),
            value,
        }
    }
}

/// An outbound subrequest was started.
///
/// The id correlates with a later [`SubrequestOutcome`] in the same span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subrequest {
    /// Correlation id, unique within the span.
    pub id: u32,
    /// What the subrequest is, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<TriggerInfo>,
}

/// An outbound subrequest finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubrequestOutcome {
    /// Correlation id matching the earlier [`Subrequest`].
    pub id: u32,
    /// How the subrequest ended.
    pub outcome: SpanOutcome,
}

// =============================================================================
// Tags
// =============================================================================

/// A list of metadata tags.
pub type Tags = Vec<Tag>;

/// One metadata tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: TagValue,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The value of a metadata tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagValue {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Opaque binary value.
    Data(Vec<u8>),
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> StreamEvent {
        StreamEvent::new(
            TailId::from_string("tail-0"),
            SpanRef { id: 1, parent: 0 },
            Timestamp::from_millis(1_000),
            2,
            EventPayload::Log(Log::new(
                Timestamp::from_millis(1_000),
                LogLevel::Info,
                "hello",
            )),
        )
    }

    #[test]
    fn payload_kind_covers_every_variant() {
        let payloads = [
            EventPayload::Onset(Onset::new()),
            EventPayload::Outcome(OutcomePayload {
                outcome: TraceOutcome::Ok,
                cpu_time_ms: 0,
                wall_time_ms: 0,
            }),
            EventPayload::Dropped(Dropped { start: 0, end: 1 }),
            EventPayload::SpanClose(SpanClose {
                outcome: SpanOutcome::Ok,
                transactional: false,
                info: None,
                tags: Vec::new(),
            }),
            EventPayload::Trigger(TriggerInfo::JsRpc(JsRpcInfo {
                method: "m".into(),
            })),
            EventPayload::Log(Log::new(Timestamp::UNIX_EPOCH, LogLevel::Log, "x")),
            EventPayload::Exception(Exception::new(Timestamp::UNIX_EPOCH, "E", "m")),
            EventPayload::DiagnosticChannel(DiagnosticChannelEvent {
                timestamp: Timestamp::UNIX_EPOCH,
                channel: "c".into(),
                payload: vec![1],
            }),
            EventPayload::Mark(Mark::new("m")),
            EventPayload::Metrics(vec![Metric::counter("n", 1.0)]),
            EventPayload::Subrequest(Subrequest { id: 1, info: None }),
            EventPayload::SubrequestOutcome(SubrequestOutcome {
                id: 1,
                outcome: SpanOutcome::Ok,
            }),
            EventPayload::Custom(vec![Tag::new("k", "v")]),
        ];
        let kinds: Vec<_> = payloads.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());
    }

    #[test]
    fn wire_shape_matches_the_documented_layout() {
        let value = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "tail-0",
                "span": {"id": 1, "parent": 0},
                "timestamp_ms_since_epoch": 1000,
                "sequence": 2,
                "event": {
                    "log": {
                        "timestamp": 1000,
                        "level": "info",
                        "message": "hello",
                    }
                }
            })
        );
    }

    #[test]
    fn trigger_encodes_under_event_info() {
        let event = StreamEvent::new(
            TailId::from_string("t"),
            SpanRef { id: 1, parent: 0 },
            Timestamp::UNIX_EPOCH,
            1,
            EventPayload::Trigger(TriggerInfo::Fetch(FetchInfo::new(
                HttpMethod::Get,
                "http://example.com",
            ))),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value["event"],
            json!({
                "event_info": {
                    "fetch": {"method": "GET", "url": "http://example.com"}
                }
            })
        );
    }

    #[test]
    fn transactional_flag_travels_with_span_close() {
        let close = EventPayload::SpanClose(SpanClose {
            outcome: SpanOutcome::Exception,
            transactional: true,
            info: None,
            tags: Vec::new(),
        });
        let value = serde_json::to_value(&close).unwrap();
        assert_eq!(
            value,
            json!({"span_close": {"outcome": "exception", "transactional": true}})
        );
    }

    #[test]
    fn clone_is_deep() {
        let original = sample_event();
        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.sequence = 99;
        if let EventPayload::Log(log) = &mut copy.event {
            log.message.push_str(" world");
        }
        assert_eq!(original.sequence, 2);
        if let EventPayload::Log(log) = &original.event {
            assert_eq!(log.message, "hello");
        } else {
            panic!("expected log payload");
        }
    }

    #[test]
    fn onset_builder_fills_fields() {
        let onset = Onset::new()
            .with_owner_id("acct")
            .with_script_name("worker")
            .with_script_version("v7")
            .with_entrypoint("default")
            .with_execution_model(ExecutionModel::Durable);
        assert_eq!(onset.owner_id.as_deref(), Some("acct"));
        assert_eq!(onset.script_name.as_deref(), Some("worker"));
        assert_eq!(onset.script_version.as_deref(), Some("v7"));
        assert_eq!(onset.entrypoint.as_deref(), Some("default"));
        assert_eq!(onset.execution_model, ExecutionModel::Durable);
        assert!(onset.trigger.is_none());
    }

    #[test]
    fn empty_onset_encodes_compactly() {
        let value = serde_json::to_value(Onset::new()).unwrap();
        assert_eq!(value, json!({"execution_model": "stateless"}));
    }

    #[test]
    fn kind_names_are_unique() {
        let mut names: Vec<_> = EventKind::ALL.iter().map(|k| k.stable_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());
    }
}
