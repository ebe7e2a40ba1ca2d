//! Server replies and submission reports.
//!
//! A buffered reply is one JSON object. Only `message` and `detail` are
//! needed to render it; a MediCheck backend additionally reports where the
//! summary stopped in its guardrail → validation → policy flow, which
//! [`ValidationReply::verdict`] turns into a [`Verdict`].

use crate::config::ResponseMode;
use crate::error::ValidateError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use tracing::{debug, warn};

/// A buffered reply from `POST /api/validate-summary`.
///
/// Every field is read leniently: a `null` or oddly-shaped value never
/// fails the whole reply. Only a body that is not JSON at all is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReply {
    /// Pre-formatted text to display on success.
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Error text on a failing status. Non-string details (FastAPI's
    /// validation error list) are flattened to text.
    #[serde(default, deserialize_with = "lenient_detail", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Passed the guardrail (the document is an insurance summary).
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub insurance_summary: Option<bool>,

    /// Passed field validation.
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub valid_summary: Option<bool>,

    /// Approved by the policy check.
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,

    /// Dotted paths of required fields that were missing.
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,

    /// Suggestions for fixing a failed validation.
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// Policy criteria that failed.
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub rejection_reason: Vec<String>,

    /// Any other fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ValidationReply {
    /// Parse a reply body.
    ///
    /// A blank body, or JSON that is not an object, is an empty reply.
    /// Only a body that does not parse as JSON is an `InvalidResponse`.
    pub fn from_body(body: &[u8]) -> Result<Self, ValidateError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ValidateError::InvalidResponse {
                detail: e.to_string(),
            })?;
        Ok(Self::from_value(value))
    }

    /// Build a reply from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            debug!("Reply is JSON but not an object; treating it as empty");
            return Self::default();
        }
        // Every field deserializer accepts any JSON value, so this only
        // fails if serde_json itself misbehaves.
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Could not read reply fields: {}", e);
            Self::default()
        })
    }

    /// The message to display, if present and non-empty.
    pub fn display_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// Classify the reply, or `None` when it carries no verdict flags.
    ///
    /// Flags are checked in flow order; a missing flag counts as `false`.
    pub fn verdict(&self) -> Option<Verdict> {
        if self.insurance_summary.is_none() && self.valid_summary.is_none() && self.approved.is_none()
        {
            return None;
        }
        let verdict = if !self.insurance_summary.unwrap_or(false) {
            Verdict::NotInsuranceSummary
        } else if !self.valid_summary.unwrap_or(false) {
            Verdict::ValidationFailed {
                missing: group_missing_fields(&self.missing_fields),
                suggestions: self.suggestions.clone(),
            }
        } else if !self.approved.unwrap_or(false) {
            Verdict::PolicyRejected {
                reasons: self.rejection_reason.clone(),
            }
        } else {
            Verdict::Approved
        };
        Some(verdict)
    }
}

/// Outcome of the backend's guardrail → validation → policy flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Rejected by the guardrail: not an insurance clinical summary.
    NotInsuranceSummary,
    /// Required fields are missing.
    ValidationFailed {
        missing: Vec<MissingSection>,
        suggestions: Vec<String>,
    },
    /// Complete, but the policy check failed.
    PolicyRejected { reasons: Vec<String> },
    /// Approved.
    Approved,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }

    /// Heading used by [`to_markdown`](Self::to_markdown) when the caller
    /// passes no message.
    ///
    /// For library callers that classify replies themselves; the buffered
    /// endpoint rejects a reply without `message` before looking at flags.
    pub fn default_message(&self) -> &'static str {
        match self {
            Verdict::NotInsuranceSummary => "Rejected by guardrails.",
            Verdict::ValidationFailed { .. } => "Validation failed.",
            Verdict::PolicyRejected { .. } => "Policy rejection.",
            Verdict::Approved => "Approved.",
        }
    }

    /// Markdown report of the verdict, headed by `message` (or the default).
    pub fn to_markdown(&self, message: Option<&str>) -> String {
        let message = message.filter(|m| !m.is_empty()).unwrap_or(self.default_message());
        let mark = if self.is_approved() { "✅" } else { "❌" };
        let mut out = format!("**{mark} {message}**\n");

        match self {
            Verdict::ValidationFailed {
                missing,
                suggestions,
            } => {
                if !missing.is_empty() {
                    out.push_str("\n**Missing Fields:**\n");
                    for section in missing {
                        let _ = write!(out, "\n**{}**\n\n", section.section);
                        for field in &section.fields {
                            match field {
                                Some(f) => {
                                    let _ = writeln!(out, "- {f}");
                                }
                                None => out.push_str("- (entire section missing)\n"),
                            }
                        }
                    }
                }
                if !suggestions.is_empty() {
                    out.push_str("\n**Suggestions:**\n\n");
                    for s in suggestions {
                        let _ = writeln!(out, "- {s}");
                    }
                }
            }
            Verdict::PolicyRejected { reasons } if !reasons.is_empty() => {
                out.push_str("\n**Rejection Reasons:**\n\n");
                for r in reasons {
                    let _ = writeln!(out, "- {r}");
                }
            }
            _ => {}
        }
        out
    }
}

/// Missing fields that share a top-level section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSection {
    pub section: String,
    /// Remaining dotted path per field; `None` when the whole section is missing.
    pub fields: Vec<Option<String>>,
}

/// Group dotted field paths by their first segment, in first-seen order.
///
/// `hpi.vitals.heart_rate` lands in section `hpi` as `vitals.heart_rate`;
/// a bare `hpi` means the whole section is missing.
pub fn group_missing_fields(fields: &[String]) -> Vec<MissingSection> {
    let mut grouped: Vec<MissingSection> = Vec::new();
    for field in fields {
        let (section, rest) = match field.split_once('.') {
            Some((s, r)) => (s, Some(r.to_string())),
            None => (field.as_str(), None),
        };
        match grouped.iter_mut().find(|g| g.section == section) {
            Some(group) => group.fields.push(rest),
            None => grouped.push(MissingSection {
                section: section.to_string(),
                fields: vec![rest],
            }),
        }
    }
    grouped
}

// ── Lenient field readers ────────────────────────────────────────────────

/// Text of a scalar value; `null` is absent, other values are stringified.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(value_to_text))
}

/// Like [`lenient_text`], but a list of `{"msg": ...}` entries (FastAPI's
/// 422 body) becomes its messages joined with `; `.
fn lenient_detail<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    if let Some(Value::Array(items)) = &value {
        let msgs: Vec<&str> = items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .collect();
        if !msgs.is_empty() && msgs.len() == items.len() {
            return Ok(Some(msgs.join("; ")));
        }
    }
    Ok(value.and_then(value_to_text))
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| v.as_bool()))
}

/// A list of strings; `null` is empty and a lone scalar is a one-item list.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items.into_iter().filter_map(value_to_text).collect(),
        Some(other) => value_to_text(other).into_iter().collect(),
        None => Vec::new(),
    })
}

/// What a finished submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    /// Endpoint style that served the submission.
    pub mode: ResponseMode,
    /// Raw reply text: the buffered `message`, or the full streamed document.
    pub raw: String,
    /// `raw` rendered in the configured format, as last shown in the view.
    pub rendered: String,
    /// Parsed buffered reply; `None` for streamed submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ValidationReply>,
    /// Number of body chunks received (1 for buffered replies).
    pub chunks: usize,
    /// Wall-clock time from request to last byte.
    pub duration_ms: u64,
}
