//! End-to-end pipeline tests against the public API with a scripted LLM.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use lead_intel::error::LlmError;
use lead_intel::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use lead_intel::pipeline::heuristics::summarize_classifications;
use lead_intel::pipeline::{
    Category, HeuristicAnalyzer, JsonFileSource, Message, MessageSource, Orchestrator,
    RemoteAnalyzer, Sentiment, Urgency, rank_by_priority,
};

/// Answers each operation by recognizing its prompt. An operation mapped to
/// `None` fails at the transport level.
#[derive(Default)]
struct RoutedLlm {
    classify: Option<String>,
    draft: Option<String>,
    summary: Option<String>,
    follow_up: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RoutedLlm {
    fn answer_for(&self, prompt: &str) -> Option<String> {
        if prompt.starts_with("Analyze this email") {
            self.classify.clone()
        } else if prompt.starts_with("Generate a professional email response") {
            self.draft.clone()
        } else if prompt.starts_with("Summarize this email") {
            self.summary.clone()
        } else if prompt.starts_with("Based on this email") {
            self.follow_up.clone()
        } else {
            None
        }
    }
}

#[async_trait]
impl LlmProvider for RoutedLlm {
    fn model_name(&self) -> &str {
        "routed-mock"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());

        match self.answer_for(&prompt) {
            Some(content) => Ok(CompletionResponse {
                content,
                input_tokens: 120,
                output_tokens: 40,
                finish_reason: FinishReason::Stop,
                response_id: None,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "routed-mock".into(),
                reason: "connection refused".into(),
            }),
        }
    }
}

fn demo_request() -> Message {
    Message {
        sender_name: "John Smith".into(),
        sender_email: "john@acmecorp.com".into(),
        subject: "Partnership Opportunity - Demo Request".into(),
        body_snippet: "Hi, I'm the CTO at Acme Corp. We're interested in your product and would love to schedule a 30-minute demo. Are you available this week?".into(),
        display_time: "10:30 AM".into(),
        is_lead_hint: true,
    }
}

fn orchestrator_with(llm: Arc<RoutedLlm>) -> Orchestrator {
    Orchestrator::new(Arc::new(RemoteAnalyzer::new(llm)))
}

const CLASSIFICATION_JSON: &str = r#"```json
{"isHotLead": true, "priority": 5, "category": "partnership", "sentiment": "positive",
 "confidence": 92, "urgency": "high", "leadScore": 88,
 "revenueOpportunity": {"hasOpportunity": true, "signals": ["demo request"],
   "estimatedValue": "high", "dealSize": "enterprise"}}
```"#;

#[tokio::test]
async fn remote_answers_flow_through() {
    let llm = Arc::new(RoutedLlm {
        classify: Some(CLASSIFICATION_JSON.into()),
        draft: Some("Hi John,\n\nThanks for reaching out. Does Thursday at 2pm work?".into()),
        summary: Some("Acme's CTO wants a 30-minute demo this week.".into()),
        follow_up: Some(
            r#"{"followUpDays": 1, "reason": "Hot lead", "shouldFollowUp": true}"#.into(),
        ),
        ..Default::default()
    });
    let result = orchestrator_with(llm.clone())
        .process(&demo_request())
        .await
        .unwrap();

    assert!(result.classification.is_hot_lead);
    assert_eq!(result.classification.priority, 5);
    assert_eq!(result.classification.category, Category::Partnership);
    assert_eq!(result.classification.lead_score, Some(88));
    let opportunity = result.classification.revenue_opportunity.unwrap();
    assert_eq!(opportunity.deal_size, "enterprise");

    assert_eq!(result.response.reply_subject, "Re: Partnership Opportunity - Demo Request");
    assert!(result.response.reply_body.contains("Thursday at 2pm"));
    assert_eq!(result.summary, "Acme's CTO wants a 30-minute demo this week.");
    assert_eq!(result.follow_up.follow_up_days, 1);

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 4);
    // Follow-up prompt sees the remote classification.
    let follow_up = prompts
        .iter()
        .find(|p| p.starts_with("Based on this email"))
        .unwrap();
    assert!(follow_up.contains("Priority: 5/5"));
    assert!(follow_up.contains("Category: partnership"));
}

#[tokio::test]
async fn unreachable_remote_degrades_to_local() {
    let llm = Arc::new(RoutedLlm::default());
    let msg = demo_request();
    let result = orchestrator_with(llm).process(&msg).await.unwrap();

    let local = HeuristicAnalyzer::new();
    let classification = local.classify_message(&msg);
    assert_eq!(result.classification, classification);
    assert_eq!(result.response, local.draft_response(&msg));
    assert_eq!(result.summary, local.summarize(&msg));
    assert_eq!(result.follow_up, local.suggest_follow_up(&classification));
}

#[tokio::test]
async fn malformed_classification_only_affects_classification() {
    let llm = Arc::new(RoutedLlm {
        classify: Some("I think this is probably a lead!".into()),
        draft: Some("Happy to set up a demo.".into()),
        summary: Some("Demo request from Acme.".into()),
        follow_up: Some(r#"{"followUpDays": 12, "reason": "", "shouldFollowUp": true}"#.into()),
        ..Default::default()
    });
    let msg = demo_request();
    let result = orchestrator_with(llm).process(&msg).await.unwrap();

    assert_eq!(
        result.classification,
        HeuristicAnalyzer::new().classify_message(&msg)
    );
    assert_eq!(result.response.reply_body, "Happy to set up a demo.");
    assert_eq!(result.summary, "Demo request from Acme.");
    // Out-of-range day count is clamped.
    assert_eq!(result.follow_up.follow_up_days, 7);
}

#[tokio::test]
async fn unknown_labels_are_coerced() {
    let llm = Arc::new(RoutedLlm {
        classify: Some(
            r#"{"isHotLead": false, "priority": 0, "category": "spam", "sentiment": "ecstatic",
                "confidence": 140, "urgency": "whenever"}"#
                .into(),
        ),
        ..Default::default()
    });
    let result = orchestrator_with(llm)
        .process(&demo_request())
        .await
        .unwrap();

    let c = result.classification;
    assert_eq!(c.category, Category::General);
    assert_eq!(c.sentiment, Sentiment::Neutral);
    assert_eq!(c.urgency, Urgency::Low);
    assert_eq!(c.priority, 1);
    assert_eq!(c.confidence, 100);
    assert!(c.lead_score.is_none());
}

#[tokio::test]
async fn json_file_batch_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
  {{"sender_name": "Sarah Chen", "sender_email": "sarah@techstartup.io",
    "subject": "Interested in your services",
    "body_snippet": "We need a solution for our team of 50. Can we set up a call to discuss pricing? Budget is approved."}},
  {{"sender_name": "", "sender_email": "ghost@example.com",
    "subject": "Hello", "body_snippet": "..."}},
  {{"sender_name": "Lisa Park", "sender_email": "lisa@customer.com",
    "subject": "Thank you!", "body_snippet": "Just wanted to say thanks for the great service."}}
]"#
    )
    .unwrap();

    let messages = JsonFileSource::new(file.path()).fetch().await.unwrap();
    assert_eq!(messages.len(), 3);

    let orchestrator = Orchestrator::local_only().with_batch_concurrency(2);
    let outcomes = orchestrator.process_batch(&messages).await;
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[1].is_err());

    let mut results: Vec<_> = outcomes.into_iter().filter_map(Result::ok).collect();
    // Input order before ranking.
    assert!(results[0].summary.starts_with("Sarah Chen"));
    assert!(results[1].summary.starts_with("Lisa Park"));

    let classifications: Vec<_> = results.iter().map(|r| r.classification.clone()).collect();
    let summary = summarize_classifications(&classifications);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.hot_leads, 1);
    assert_eq!(summary.categories.get(&Category::Sales), Some(&1));
    assert_eq!(summary.categories.get(&Category::General), Some(&1));

    results.reverse();
    rank_by_priority(&mut results);
    assert!(results[0].classification.is_hot_lead);
    assert!(results[0].summary.starts_with("Sarah Chen"));
}
