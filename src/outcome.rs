//! Terminal dispositions for traces and spans.
//!
//! A trace closes with a [`TraceOutcome`], the full vocabulary of ways a
//! workload invocation can end. Spans close with the narrower
//! [`SpanOutcome`]. When a trace outcome implicitly closes the spans beneath
//! it, the trace outcome is projected onto the span vocabulary: every
//! resource-limit and infrastructure failure collapses to `Exception`, the
//! two disconnect flavors collapse to `Canceled`.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Terminal disposition of a whole trace session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The session ended without a known disposition.
    Unknown,
    /// The workload completed normally.
    Ok,
    /// The workload was canceled.
    Canceled,
    /// The client went away before the response finished streaming.
    ResponseStreamDisconnected,
    /// The invocation was shed before running.
    LoadShed,
    /// The workload exceeded its CPU allotment.
    ExceededCpu,
    /// An operator kill switch stopped the workload.
    KillSwitch,
    /// The hosting daemon went down mid-invocation.
    DaemonDown,
    /// The requested script does not exist.
    ScriptNotFound,
    /// The workload exceeded its memory allotment.
    ExceededMemory,
    /// The workload raised an uncaught exception.
    Exception,
}

impl TraceOutcome {
    /// Canonical list of all trace outcomes.
    pub const ALL: [Self; 11] = [
        Self::Unknown,
        Self::Ok,
        Self::Canceled,
        Self::ResponseStreamDisconnected,
        Self::LoadShed,
        Self::ExceededCpu,
        Self::KillSwitch,
        Self::DaemonDown,
        Self::ScriptNotFound,
        Self::ExceededMemory,
        Self::Exception,
    ];

    /// Stable, grep-friendly name matching the wire encoding.
    #[must_use]
    pub const fn stable_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ok => "ok",
            Self::Canceled => "canceled",
            Self::ResponseStreamDisconnected => "response_stream_disconnected",
            Self::LoadShed => "load_shed",
            Self::ExceededCpu => "exceeded_cpu",
            Self::KillSwitch => "kill_switch",
            Self::DaemonDown => "daemon_down",
            Self::ScriptNotFound => "script_not_found",
            Self::ExceededMemory => "exceeded_memory",
            Self::Exception => "exception",
        }
    }

    /// Projects this trace outcome onto the span outcome vocabulary.
    ///
    /// Used when closing a trace implicitly closes the spans beneath it.
    #[must_use]
    pub const fn project(self) -> SpanOutcome {
        match self {
            Self::Unknown => SpanOutcome::Unknown,
            Self::Ok => SpanOutcome::Ok,
            Self::Canceled | Self::ResponseStreamDisconnected => SpanOutcome::Canceled,
            Self::LoadShed
            | Self::ExceededCpu
            | Self::KillSwitch
            | Self::DaemonDown
            | Self::ScriptNotFound
            | Self::ExceededMemory
            | Self::Exception => SpanOutcome::Exception,
        }
    }
}

impl fmt::Display for TraceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stable_name())
    }
}

/// Terminal disposition of a single span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanOutcome {
    /// The span was closed without a known disposition.
    Unknown,
    /// The grouped work completed normally.
    Ok,
    /// The grouped work was canceled.
    Canceled,
    /// The grouped work failed.
    Exception,
}

impl SpanOutcome {
    /// Canonical list of all span outcomes.
    pub const ALL: [Self; 4] = [Self::Unknown, Self::Ok, Self::Canceled, Self::Exception];

    /// Stable, grep-friendly name matching the wire encoding.
    #[must_use]
    pub const fn stable_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Ok => "ok",
            Self::Canceled => "canceled",
            Self::Exception => "exception",
        }
    }

    /// Returns true if a transactional span closing with this outcome tells
    /// consumers to discard the span's events.
    #[must_use]
    pub const fn invalidates_transaction(self) -> bool {
        matches!(self, Self::Canceled | Self::Exception)
    }
}

impl fmt::Display for SpanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stable_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_matches_the_outcome_taxonomy() {
        assert_eq!(TraceOutcome::Ok.project(), SpanOutcome::Ok);
        assert_eq!(TraceOutcome::Unknown.project(), SpanOutcome::Unknown);
        assert_eq!(TraceOutcome::Canceled.project(), SpanOutcome::Canceled);
        assert_eq!(
            TraceOutcome::ResponseStreamDisconnected.project(),
            SpanOutcome::Canceled
        );
        for outcome in [
            TraceOutcome::LoadShed,
            TraceOutcome::ExceededCpu,
            TraceOutcome::KillSwitch,
            TraceOutcome::DaemonDown,
            TraceOutcome::ScriptNotFound,
            TraceOutcome::ExceededMemory,
            TraceOutcome::Exception,
        ] {
            assert_eq!(outcome.project(), SpanOutcome::Exception, "{outcome}");
        }
    }

    #[test]
    fn stable_names_are_unique() {
        let mut names: Vec<_> = TraceOutcome::ALL
            .iter()
            .map(|o| o.stable_name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TraceOutcome::ALL.len());
    }

    #[test]
    fn wire_names_match_stable_names() {
        for outcome in TraceOutcome::ALL {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{}\"", outcome.stable_name()));
        }
        for outcome in SpanOutcome::ALL {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{}\"", outcome.stable_name()));
        }
    }

    #[test]
    fn transaction_invalidation_only_on_failure() {
        assert!(!SpanOutcome::Ok.invalidates_transaction());
        assert!(!SpanOutcome::Unknown.invalidates_transaction());
        assert!(SpanOutcome::Canceled.invalidates_transaction());
        assert!(SpanOutcome::Exception.invalidates_transaction());
    }
}
