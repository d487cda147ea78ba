//! Shared types for the lead intelligence pipeline.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Inbound message ─────────────────────────────────────────────────

/// A short message record supplied by an email source.
///
/// Read-only to the pipeline: analyzers borrow it and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Human-readable sender name ("John Smith").
    pub sender_name: String,
    /// Sender address.
    pub sender_email: String,
    pub subject: String,
    /// Leading part of the body, as shown in an inbox preview.
    pub body_snippet: String,
    /// Display-only receive time ("10:30 AM", "Yesterday").
    #[serde(default)]
    pub display_time: String,
    /// Source-side lead flag.
    #[serde(default)]
    pub is_lead_hint: bool,
}

impl Message {
    /// Reject records missing the text fields analysis depends on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sender_name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "sender_name",
            });
        }
        if self.sender_email.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "sender_email",
            });
        }
        if !self.sender_email.contains('@') {
            return Err(ValidationError::InvalidEmail(self.sender_email.clone()));
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "subject" });
        }
        Ok(())
    }

    /// Lower-cased `subject + " " + body` that keyword matching runs over.
    pub fn analysis_text(&self) -> String {
        format!("{} {}", self.subject, self.body_snippet).to_lowercase()
    }

    /// First whitespace-separated token of the sender name.
    pub fn first_name(&self) -> &str {
        self.sender_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.sender_name)
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Topical bucket. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sales,
    Partnership,
    Support,
    Meeting,
    Feedback,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Partnership => "partnership",
            Self::Support => "support",
            Self::Meeting => "meeting",
            Self::Feedback => "feedback",
            Self::General => "general",
        }
    }

    /// Parse a remote label; anything unrecognized becomes `General`.
    pub fn coerce(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sales" => Self::Sales,
            "partnership" => Self::Partnership,
            "support" => Self::Support,
            "meeting" => Self::Meeting,
            "feedback" => Self::Feedback,
            _ => Self::General,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    /// Parse a remote label; anything unrecognized becomes `Neutral`.
    pub fn coerce(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a remote label; anything unrecognized becomes `Low`.
    pub fn coerce(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedValue {
    High,
    Medium,
    Low,
    Unknown,
}

impl EstimatedValue {
    /// Parse a remote label; anything unrecognized becomes `Unknown`.
    pub fn coerce(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

/// Detected monetary intent. Only the remote analyzer produces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueOpportunity {
    pub has_opportunity: bool,
    /// Evidence phrases, in the order the model reported them.
    pub signals: Vec<String>,
    pub estimated_value: EstimatedValue,
    /// Free-form size estimate ("$5k-10k", "enterprise", "unknown").
    pub deal_size: String,
}

/// Lead classification verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_hot_lead: bool,
    /// 0..=100
    pub confidence: u8,
    /// 1..=5, 5 being most urgent.
    pub priority: u8,
    pub category: Category,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    /// 0..=100 conversion likelihood. Remote only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_opportunity: Option<RevenueOpportunity>,
}

impl Classification {
    pub const MAX_CONFIDENCE: u8 = 100;
    pub const MIN_PRIORITY: u8 = 1;
    pub const MAX_PRIORITY: u8 = 5;

    /// Priority 4 and above counts as high priority.
    pub fn is_high_priority(&self) -> bool {
        self.priority >= 4
    }
}

/// Clamp a loosely typed score into `min..=max`.
pub(crate) fn clamp_score(value: f64, min: u8, max: u8) -> u8 {
    if value.is_nan() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as u8
}

// ── Response draft ──────────────────────────────────────────────────

/// A drafted reply for the user to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDraft {
    pub reply_subject: String,
    pub reply_body: String,
    /// Short tone label ("professional", "supportive").
    pub tone: String,
    /// 0..=100
    pub confidence: u8,
}

// ── Follow-up advice ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpAdvice {
    /// 1..=7
    pub follow_up_days: u8,
    pub reason: String,
    pub should_follow_up: bool,
}

impl FollowUpAdvice {
    pub const MIN_DAYS: u8 = 1;
    pub const MAX_DAYS: u8 = 7;

    /// When to follow up on a message received at `received_at`.
    pub fn due_date(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        received_at + Duration::days(i64::from(self.follow_up_days))
    }
}

// ── Process result ──────────────────────────────────────────────────

/// Full verdict for one message. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub classification: Classification,
    pub response: ResponseDraft,
    pub summary: String,
    pub follow_up: FollowUpAdvice,
}

/// Local classification plus its suggested reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAnalysis {
    pub classification: Classification,
    pub suggested_response: ResponseDraft,
}

/// Aggregate counts over a batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub hot_leads: usize,
    /// Messages with priority >= 4.
    pub high_priority: usize,
    /// Rounded mean confidence; 0 for an empty batch.
    pub avg_confidence: u8,
    /// Messages with high urgency.
    pub urgent: usize,
    pub categories: BTreeMap<Category, usize>,
}

// ── Analyzer capability ─────────────────────────────────────────────

/// One source of analysis results.
///
/// `None` means the source could not produce that result this time; the
/// caller substitutes a local value. Implementations never return errors.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short name for logging ("remote", "heuristic").
    fn name(&self) -> &str;

    async fn classify(&self, message: &Message) -> Option<Classification>;

    async fn draft_response(&self, message: &Message) -> Option<ResponseDraft>;

    async fn summarize(&self, message: &Message) -> Option<String>;

    async fn suggest_follow_up(
        &self,
        message: &Message,
        classification: &Classification,
    ) -> Option<FollowUpAdvice>;
}

/// Supplies messages to analyze.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Source name, for logging.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Message>, crate::error::SourceError>;
}
