use serde::Serialize;

use tierguard_core::DomainError;

use crate::events::AccessEvent;
use crate::rules::RuleVerdict;

/// Terminal outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    Deny,
    /// Input was malformed or missing; never treated as allowed.
    Indeterminate,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Deny => "DENY",
            Verdict::Indeterminate => "INDETERMINATE",
        }
    }

    pub fn is_allow(self) -> bool {
        self == Verdict::Allow
    }
}

impl core::fmt::Display for Verdict {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated stage of a decision (input validation or a business rule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub stage: &'static str,
    pub passed: bool,
    pub reasons: Vec<String>,

    /// Structured payload of a structural error, when the stage hit one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl TraceStep {
    pub(crate) fn from_verdict(verdict: &RuleVerdict) -> Self {
        Self {
            stage: verdict.rule(),
            passed: verdict.passed(),
            reasons: verdict.reasons(),
            error: None,
        }
    }

    pub(crate) fn ok(stage: &'static str) -> Self {
        Self {
            stage,
            passed: true,
            reasons: Vec::new(),
            error: None,
        }
    }

    /// A collaborator could not supply a required record.
    pub(crate) fn unresolved(stage: &'static str, reason: String) -> Self {
        Self {
            stage,
            passed: false,
            reasons: vec![reason],
            error: None,
        }
    }

    pub(crate) fn structural(stage: &'static str, error: &DomainError) -> Self {
        Self {
            stage,
            passed: false,
            reasons: vec![error.to_string()],
            error: Some(serde_json::json!({
                "kind": error.kind(),
                "details": error.details(),
            })),
        }
    }
}

/// Outcome handed back to the caller.
///
/// `events` is non-empty only for an allowed, state-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    verdict: Verdict,
    reasons: Vec<String>,
    events: Vec<AccessEvent>,
    trace: Vec<TraceStep>,
}

impl Decision {
    pub(crate) fn allow(events: Vec<AccessEvent>, trace: Vec<TraceStep>) -> Self {
        Self {
            verdict: Verdict::Allow,
            reasons: Vec::new(),
            events,
            trace,
        }
    }

    pub(crate) fn deny(reasons: Vec<String>, trace: Vec<TraceStep>) -> Self {
        Self {
            verdict: Verdict::Deny,
            reasons,
            events: Vec::new(),
            trace,
        }
    }

    pub(crate) fn indeterminate(reasons: Vec<String>, trace: Vec<TraceStep>) -> Self {
        Self {
            verdict: Verdict::Indeterminate,
            reasons,
            events: Vec::new(),
            trace,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict.is_allow()
    }

    /// Reasons of every failing stage, in evaluation order.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.reasons.iter().any(|r| r == reason)
    }

    pub fn events(&self) -> &[AccessEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<AccessEvent> {
        self.events
    }

    pub fn trace(&self) -> &[TraceStep] {
        &self.trace
    }
}
