//! Remote analyzer: LLM-backed classification, drafting, summary and
//! follow-up advice.
//!
//! Each operation issues exactly one completion request and is isolated from
//! the others. Transport failures and undecodable output are logged and
//! reported as `None`; nothing propagates past this module.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AnalysisError, LlmError};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::parse::{extract_json_object, strip_code_fences};
use crate::pipeline::prompts;
use crate::pipeline::types::{
    Analyzer, Category, Classification, EstimatedValue, FollowUpAdvice, Message, ResponseDraft,
    RevenueOpportunity, Sentiment, Urgency, clamp_score,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tone reported for remotely drafted replies.
const REMOTE_DRAFT_TONE: &str = "professional";

/// Confidence reported for remotely drafted replies.
const REMOTE_DRAFT_CONFIDENCE: u8 = 95;

/// The four remote operations, for logging and generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Classify,
    DraftResponse,
    Summarize,
    FollowUp,
}

impl Operation {
    fn label(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::DraftResponse => "draft_response",
            Self::Summarize => "summarize",
            Self::FollowUp => "follow_up",
        }
    }

    /// (temperature, max output tokens). Classification uses provider defaults.
    fn generation_params(&self) -> (Option<f32>, Option<u32>) {
        match self {
            Self::Classify => (None, None),
            Self::DraftResponse => (Some(0.7), Some(500)),
            Self::Summarize => (Some(0.5), Some(150)),
            Self::FollowUp => (Some(0.7), Some(200)),
        }
    }
}

/// LLM-backed analyzer.
pub struct RemoteAnalyzer {
    llm: Arc<dyn LlmProvider>,
    request_timeout: Duration,
}

impl RemoteAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Issue one completion and return the raw generated text.
    async fn generate(&self, op: Operation, prompt: String) -> Result<String, AnalysisError> {
        let (temperature, max_tokens) = op.generation_params();
        let mut request = CompletionRequest::new(vec![ChatMessage::user(prompt)]);
        if let Some(t) = temperature {
            request = request.with_temperature(t);
        }
        if let Some(m) = max_tokens {
            request = request.with_max_tokens(m);
        }

        let response = tokio::time::timeout(self.request_timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.model_name().to_string(),
                timeout: self.request_timeout,
            })??;

        debug!(
            operation = op.label(),
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %self.llm.estimate_cost(&response),
            "Remote completion finished"
        );

        Ok(response.content)
    }

    async fn try_classify(&self, message: &Message) -> Result<Classification, AnalysisError> {
        let raw = self
            .generate(Operation::Classify, prompts::classify_prompt(message))
            .await?;
        parse_classification(&raw)
    }

    async fn try_draft_response(&self, message: &Message) -> Result<ResponseDraft, AnalysisError> {
        let raw = self
            .generate(
                Operation::DraftResponse,
                prompts::draft_response_prompt(message),
            )
            .await?;
        let body = parse_prose(&raw)?;
        Ok(ResponseDraft {
            reply_subject: format!("Re: {}", message.subject),
            reply_body: body,
            tone: REMOTE_DRAFT_TONE.to_string(),
            confidence: REMOTE_DRAFT_CONFIDENCE,
        })
    }

    async fn try_summarize(&self, message: &Message) -> Result<String, AnalysisError> {
        let raw = self
            .generate(Operation::Summarize, prompts::summarize_prompt(message))
            .await?;
        parse_prose(&raw)
    }

    async fn try_suggest_follow_up(
        &self,
        message: &Message,
        classification: &Classification,
    ) -> Result<FollowUpAdvice, AnalysisError> {
        let raw = self
            .generate(
                Operation::FollowUp,
                prompts::follow_up_prompt(message, classification),
            )
            .await?;
        parse_follow_up(&raw)
    }
}

/// Log a failed operation and turn it into an absent result.
fn settle<T>(op: Operation, message: &Message, result: Result<T, AnalysisError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                operation = op.label(),
                sender = %message.sender_email,
                error = %e,
                "Remote analysis failed, result absent"
            );
            None
        }
    }
}

#[async_trait]
impl Analyzer for RemoteAnalyzer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn classify(&self, message: &Message) -> Option<Classification> {
        settle(Operation::Classify, message, self.try_classify(message).await)
    }

    async fn draft_response(&self, message: &Message) -> Option<ResponseDraft> {
        settle(
            Operation::DraftResponse,
            message,
            self.try_draft_response(message).await,
        )
    }

    async fn summarize(&self, message: &Message) -> Option<String> {
        settle(Operation::Summarize, message, self.try_summarize(message).await)
    }

    async fn suggest_follow_up(
        &self,
        message: &Message,
        classification: &Classification,
    ) -> Option<FollowUpAdvice> {
        settle(
            Operation::FollowUp,
            message,
            self.try_suggest_follow_up(message, classification).await,
        )
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Classification as the model emits it. Enum labels stay strings so
/// unknown values can be coerced instead of failing the decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    #[serde(alias = "is_hot_lead")]
    is_hot_lead: bool,
    confidence: f64,
    priority: f64,
    category: String,
    sentiment: String,
    urgency: String,
    #[serde(default, alias = "lead_score")]
    lead_score: Option<f64>,
    #[serde(default, alias = "revenue_opportunity")]
    revenue_opportunity: Option<RawRevenueOpportunity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRevenueOpportunity {
    #[serde(default, alias = "has_opportunity")]
    has_opportunity: bool,
    #[serde(default)]
    signals: Vec<String>,
    #[serde(default, alias = "estimated_value")]
    estimated_value: String,
    #[serde(default, alias = "deal_size")]
    deal_size: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFollowUp {
    #[serde(alias = "follow_up_days")]
    follow_up_days: f64,
    #[serde(default)]
    reason: String,
    #[serde(alias = "should_follow_up")]
    should_follow_up: bool,
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AnalysisError> {
    let json = extract_json_object(raw);
    serde_json::from_str(&json).map_err(|e| AnalysisError::Malformed(format!("JSON decode: {e}")))
}

/// Decode a classification, clamping scores and coercing enum labels.
fn parse_classification(raw: &str) -> Result<Classification, AnalysisError> {
    let r: RawClassification = decode(raw)?;

    let revenue_opportunity = r.revenue_opportunity.map(|o| RevenueOpportunity {
        has_opportunity: o.has_opportunity,
        signals: o.signals,
        estimated_value: EstimatedValue::coerce(&o.estimated_value),
        deal_size: if o.deal_size.trim().is_empty() {
            "unknown".to_string()
        } else {
            o.deal_size
        },
    });

    Ok(Classification {
        is_hot_lead: r.is_hot_lead,
        confidence: clamp_score(r.confidence, 0, Classification::MAX_CONFIDENCE),
        priority: clamp_score(
            r.priority,
            Classification::MIN_PRIORITY,
            Classification::MAX_PRIORITY,
        ),
        category: Category::coerce(&r.category),
        sentiment: Sentiment::coerce(&r.sentiment),
        urgency: Urgency::coerce(&r.urgency),
        lead_score: r.lead_score.map(|s| clamp_score(s, 0, 100)),
        revenue_opportunity,
    })
}

fn parse_follow_up(raw: &str) -> Result<FollowUpAdvice, AnalysisError> {
    let r: RawFollowUp = decode(raw)?;
    Ok(FollowUpAdvice {
        follow_up_days: clamp_score(
            r.follow_up_days,
            FollowUpAdvice::MIN_DAYS,
            FollowUpAdvice::MAX_DAYS,
        ),
        reason: r.reason.trim().to_string(),
        should_follow_up: r.should_follow_up,
    })
}

/// Prose output only needs to be non-empty once fences are gone.
fn parse_prose(raw: &str) -> Result<String, AnalysisError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(AnalysisError::Malformed("empty text".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use crate::llm::provider::{CompletionResponse, FinishReason};

    fn message() -> Message {
        Message {
            sender_name: "John Smith".into(),
            sender_email: "john@acmecorp.com".into(),
            subject: "Partnership Opportunity - Demo Request".into(),
            body_snippet: "Would love to schedule a 30-minute demo. Are you available this week?"
                .into(),
            display_time: "10:30 AM".into(),
            is_lead_hint: true,
        }
    }

    /// Mock LLM that returns a fixed response and records requests.
    struct MockLlm {
        response: Result<String, ()>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlm {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock-remote"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match &self.response {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                    finish_reason: FinishReason::Stop,
                    response_id: None,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock-remote".into(),
                    reason: "503 Service Unavailable".into(),
                }),
            }
        }
    }

    /// Never answers within any reasonable timeout.
    struct HangingLlm;

    #[async_trait]
    impl LlmProvider for HangingLlm {
        fn model_name(&self) -> &str {
            "hanging"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("request should have timed out")
        }
    }

    // ── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_full_classification() {
        let raw = r#"{
            "isHotLead": true, "priority": 4, "category": "sales",
            "sentiment": "positive", "confidence": 88, "urgency": "medium",
            "leadScore": 75,
            "revenueOpportunity": {
                "hasOpportunity": true,
                "signals": ["pricing inquiry", "team of 50"],
                "estimatedValue": "high",
                "dealSize": "$5k-10k"
            }
        }"#;
        let c = parse_classification(raw).unwrap();
        assert!(c.is_hot_lead);
        assert_eq!(c.priority, 4);
        assert_eq!(c.category, Category::Sales);
        assert_eq!(c.sentiment, Sentiment::Positive);
        assert_eq!(c.confidence, 88);
        assert_eq!(c.urgency, Urgency::Medium);
        assert_eq!(c.lead_score, Some(75));
        let opp = c.revenue_opportunity.unwrap();
        assert_eq!(opp.signals, vec!["pricing inquiry", "team of 50"]);
        assert_eq!(opp.estimated_value, EstimatedValue::High);
        assert_eq!(opp.deal_size, "$5k-10k");
    }

    #[test]
    fn parse_classification_clamps_and_coerces() {
        let raw = r#"{"isHotLead": false, "priority": 9, "category": "recruiting",
            "sentiment": "furious", "confidence": 250, "urgency": "critical",
            "leadScore": -10,
            "revenueOpportunity": {"estimatedValue": "massive"}}"#;
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.priority, 5);
        assert_eq!(c.confidence, 100);
        assert_eq!(c.category, Category::General);
        assert_eq!(c.sentiment, Sentiment::Neutral);
        assert_eq!(c.urgency, Urgency::Low);
        assert_eq!(c.lead_score, Some(0));
        let opp = c.revenue_opportunity.unwrap();
        assert!(!opp.has_opportunity);
        assert_eq!(opp.estimated_value, EstimatedValue::Unknown);
        assert_eq!(opp.deal_size, "unknown");
    }

    #[test]
    fn parse_classification_in_code_fence() {
        let raw = "```json\n{\"isHotLead\": true, \"priority\": 3, \"category\": \"meeting\", \
                   \"sentiment\": \"neutral\", \"confidence\": 70, \"urgency\": \"low\"}\n```";
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.category, Category::Meeting);
        assert!(c.lead_score.is_none());
        assert!(c.revenue_opportunity.is_none());
    }

    #[test]
    fn parse_classification_accepts_snake_case() {
        let raw = r#"{"is_hot_lead": true, "priority": 2, "category": "support",
            "sentiment": "negative", "confidence": 40, "urgency": "high", "lead_score": 10}"#;
        let c = parse_classification(raw).unwrap();
        assert!(c.is_hot_lead);
        assert_eq!(c.category, Category::Support);
        assert_eq!(c.lead_score, Some(10));
    }

    #[test]
    fn parse_classification_missing_field_is_malformed() {
        let raw = r#"{"isHotLead": true, "priority": 3}"#;
        assert!(matches!(
            parse_classification(raw),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn parse_classification_prose_is_malformed() {
        assert!(parse_classification("This looks like a hot lead to me!").is_err());
    }

    #[test]
    fn parse_follow_up_clamps_days() {
        let raw = r#"{"followUpDays": 14, "reason": " Busy exec ", "shouldFollowUp": true}"#;
        let advice = parse_follow_up(raw).unwrap();
        assert_eq!(advice.follow_up_days, 7);
        assert_eq!(advice.reason, "Busy exec");
        assert!(advice.should_follow_up);

        let advice =
            parse_follow_up(r#"{"followUpDays": 0, "shouldFollowUp": false}"#).unwrap();
        assert_eq!(advice.follow_up_days, 1);
        assert!(advice.reason.is_empty());
    }

    #[test]
    fn parse_prose_rejects_blank() {
        assert!(parse_prose("   ").is_err());
        assert!(parse_prose("```\n```").is_err());
        assert_eq!(parse_prose("```\nHello\n```").unwrap(), "Hello");
    }

    // ── Operations with mock LLM ────────────────────────────────────

    #[tokio::test]
    async fn classify_success() {
        let llm = MockLlm::ok(
            r#"{"isHotLead": true, "priority": 5, "category": "partnership", "sentiment": "positive", "confidence": 92, "urgency": "high"}"#,
        );
        let remote = RemoteAnalyzer::new(llm.clone());
        let c = Analyzer::classify(&remote, &message()).await.unwrap();
        assert_eq!(c.category, Category::Partnership);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].temperature.is_none());
        assert!(requests[0].messages[0].content.contains("john@acmecorp.com"));
    }

    #[tokio::test]
    async fn transport_failure_is_absent() {
        let remote = RemoteAnalyzer::new(MockLlm::failing());
        let msg = message();
        assert!(Analyzer::classify(&remote, &msg).await.is_none());
        assert!(Analyzer::summarize(&remote, &msg).await.is_none());
        assert!(Analyzer::draft_response(&remote, &msg).await.is_none());
    }

    #[tokio::test]
    async fn malformed_output_is_absent() {
        let remote = RemoteAnalyzer::new(MockLlm::ok("Sure! It's a hot lead."));
        assert!(Analyzer::classify(&remote, &message()).await.is_none());
    }

    #[tokio::test]
    async fn draft_response_wraps_body() {
        let llm = MockLlm::ok("Hi John,\n\nThanks for reaching out. Tuesday works.\n");
        let remote = RemoteAnalyzer::new(llm.clone());
        let draft = Analyzer::draft_response(&remote, &message()).await.unwrap();
        assert_eq!(draft.reply_subject, "Re: Partnership Opportunity - Demo Request");
        assert_eq!(draft.reply_body, "Hi John,\n\nThanks for reaching out. Tuesday works.");
        assert_eq!(draft.tone, "professional");
        assert_eq!(draft.confidence, 95);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].max_tokens, Some(500));
    }

    #[tokio::test]
    async fn summarize_uses_summary_parameters() {
        let llm = MockLlm::ok("John wants a demo this week.");
        let remote = RemoteAnalyzer::new(llm.clone());
        let summary = Analyzer::summarize(&remote, &message()).await.unwrap();
        assert_eq!(summary, "John wants a demo this week.");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, Some(0.5));
        assert_eq!(requests[0].max_tokens, Some(150));
    }

    #[tokio::test]
    async fn empty_summary_is_absent() {
        let remote = RemoteAnalyzer::new(MockLlm::ok("  \n"));
        assert!(Analyzer::summarize(&remote, &message()).await.is_none());
    }

    #[tokio::test]
    async fn follow_up_prompt_carries_classification() {
        let llm =
            MockLlm::ok(r#"{"followUpDays": 2, "reason": "Hot lead", "shouldFollowUp": true}"#);
        let remote = RemoteAnalyzer::new(llm.clone());
        let msg = message();
        let classification =
            crate::pipeline::heuristics::HeuristicAnalyzer::new().classify_message(&msg);
        let advice = Analyzer::suggest_follow_up(&remote, &msg, &classification)
            .await
            .unwrap();
        assert_eq!(advice.follow_up_days, 2);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, Some(200));
        assert!(
            requests[0].messages[0]
                .content
                .contains(&format!("Priority: {}/5", classification.priority))
        );
    }

    #[tokio::test]
    async fn slow_provider_times_out_to_absent() {
        let remote = RemoteAnalyzer::new(Arc::new(HangingLlm))
            .with_request_timeout(Duration::from_millis(50));
        assert!(Analyzer::summarize(&remote, &message()).await.is_none());
    }
}
