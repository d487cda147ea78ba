//! Local keyword-table analyzer.
//!
//! Deterministic and I/O free. Every verdict is a function of the lower-cased
//! `subject + body` text and the fixed tables below. Matching is plain
//! substring containment, so overlapping tables (e.g. "demo" is both a
//! hot-lead and a sales keyword) score in both.
//!
//! Category choice and reply template dispatch are ordered tables: the first
//! entry wins a tie (category) or the first matching rule wins (templates).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::pipeline::types::{
    Analyzer, BatchSummary, Category, Classification, FollowUpAdvice, LocalAnalysis, Message,
    ResponseDraft, Sentiment, Urgency,
};

/// Commercial-intent keywords. Two distinct hits make a hot lead.
const HOT_LEAD_KEYWORDS: &[&str] = &[
    "demo",
    "meeting",
    "call",
    "discuss",
    "interested",
    "pricing",
    "partnership",
    "opportunity",
    "proposal",
    "budget",
    "purchase",
    "buy",
    "invest",
    "contract",
    "deal",
    "schedule",
    "available",
    "urgent",
    "asap",
    "important",
    "priority",
    "deadline",
];

/// Category keyword sets in tie-break order.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Sales,
        &["demo", "pricing", "purchase", "buy", "quote", "proposal"],
    ),
    (
        Category::Partnership,
        &["partnership", "collaborate", "together", "joint", "alliance"],
    ),
    (
        Category::Support,
        &["help", "issue", "problem", "bug", "error", "not working"],
    ),
    (
        Category::Meeting,
        &["meeting", "call", "schedule", "available", "calendar"],
    ),
    (
        Category::Feedback,
        &["feedback", "review", "opinion", "thoughts", "suggestion"],
    ),
];

/// (terms, boost). Each group adds its boost at most once.
const PRIORITY_BOOSTS: &[(&[&str], u8)] = &[
    (&["urgent", "asap"], 2),
    (&["important", "priority"], 1),
    (&["demo", "meeting"], 1),
    (&["pricing", "purchase"], 1),
];

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "excellent",
    "love",
    "interested",
    "excited",
    "looking forward",
];

const NEGATIVE_WORDS: &[&str] = &["issue", "problem", "disappointed", "concern", "unhappy"];

/// Checked in order; `High` short-circuits.
const URGENCY_TRIGGERS: &[(Urgency, &[&str])] = &[
    (Urgency::High, &["urgent", "asap", "immediately"]),
    (Urgency::Medium, &["soon", "this week"]),
];

/// How many characters of the body the local summary keeps.
const SUMMARY_BODY_CHARS: usize = 100;

// ── Reply templates ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ReplyTemplate {
    tone: &'static str,
    confidence: u8,
    /// Body after the greeting line.
    body: &'static str,
}

const MEETING_TEMPLATE: ReplyTemplate = ReplyTemplate {
    tone: "professional",
    confidence: 95,
    body: "\
Thank you for reaching out! I'd be happy to schedule a meeting with you.

I have the following times available this week:
• Tuesday, 2:00 PM - 2:30 PM
• Wednesday, 10:00 AM - 10:30 AM
• Thursday, 3:00 PM - 3:30 PM

Please let me know which time works best for you, and I'll send over a calendar invite with a video meeting link.

Looking forward to connecting!

Best regards,
[Your Name]",
};

const SALES_TEMPLATE: ReplyTemplate = ReplyTemplate {
    tone: "sales",
    confidence: 90,
    body: "\
Thank you for your interest in our services!

I'd be happy to discuss pricing options that fit your needs. Our plans are flexible and scale with your team size.

Could we schedule a quick 15-minute call to understand your requirements better? This will help me provide you with the most accurate pricing and recommendations.

I'm available:
• This week: Tuesday-Thursday afternoons
• Next week: Monday-Friday mornings

What works best for you?

Best regards,
[Your Name]",
};

const PARTNERSHIP_TEMPLATE: ReplyTemplate = ReplyTemplate {
    tone: "collaborative",
    confidence: 88,
    body: "\
Thank you for reaching out about a potential partnership opportunity!

We're always interested in exploring collaborations that create mutual value. I'd love to learn more about what you have in mind.

Would you be available for a brief introductory call next week? I'd like to understand:
• Your partnership vision
• How our organizations might complement each other
• Potential next steps

Please share your availability, and I'll coordinate accordingly.

Looking forward to the conversation!

Best regards,
[Your Name]",
};

const SUPPORT_TEMPLATE: ReplyTemplate = ReplyTemplate {
    tone: "supportive",
    confidence: 85,
    body: "\
Thank you for contacting us. I'm sorry to hear you're experiencing an issue.

I'd like to help resolve this as quickly as possible. To better assist you, could you please provide:
• A brief description of what you're trying to do
• What's happening instead
• Any error messages you're seeing

Once I have these details, I'll investigate and get back to you with a solution.

Thank you for your patience!

Best regards,
[Your Name]
Support Team",
};

const GENERAL_TEMPLATE: ReplyTemplate = ReplyTemplate {
    tone: "friendly",
    confidence: 75,
    body: "\
Thank you for your email!

I appreciate you taking the time to reach out. I'd be happy to help with your inquiry.

Could you provide a bit more detail about what you're looking for? This will help me give you the most relevant information.

I look forward to hearing from you!

Best regards,
[Your Name]",
};

/// First matching rule picks the template; `GENERAL_TEMPLATE` otherwise.
const REPLY_RULES: &[(&[&str], ReplyTemplate)] = &[
    (&["demo", "meeting"], MEETING_TEMPLATE),
    (&["pricing", "quote"], SALES_TEMPLATE),
    (&["partnership", "collaborate"], PARTNERSHIP_TEMPLATE),
    (&["help", "issue"], SUPPORT_TEMPLATE),
];

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

fn count_matches(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| text.contains(*t)).count()
}

// ── Analyzer ────────────────────────────────────────────────────────

/// Keyword-table analyzer. Stateless; cheap to construct and copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classify already lower-cased analysis text.
    ///
    /// Callers holding a [`Message`] should use [`Self::classify_message`],
    /// which builds the text. Raw text is lower-cased here as well, so mixed
    /// case input gives the same verdict.
    pub fn classify(&self, text: &str) -> Classification {
        let text = text.to_lowercase();
        let hits = count_matches(&text, HOT_LEAD_KEYWORDS);

        Classification {
            is_hot_lead: hits >= 2,
            confidence: confidence_for(hits),
            priority: priority_for(&text),
            category: category_for(&text),
            sentiment: sentiment_for(&text),
            urgency: urgency_for(&text),
            lead_score: None,
            revenue_opportunity: None,
        }
    }

    pub fn classify_message(&self, message: &Message) -> Classification {
        self.classify(&message.analysis_text())
    }

    /// Pick a reply template by the first matching rule.
    pub fn draft_response(&self, message: &Message) -> ResponseDraft {
        let text = message.analysis_text();
        let template = REPLY_RULES
            .iter()
            .find(|(terms, _)| contains_any(&text, terms))
            .map(|(_, template)| *template)
            .unwrap_or(GENERAL_TEMPLATE);

        ResponseDraft {
            reply_subject: format!("Re: {}", message.subject),
            reply_body: format!("Hi {},\n\n{}", message.first_name(), template.body),
            tone: template.tone.to_string(),
            confidence: template.confidence,
        }
    }

    /// Classification plus the suggested reply in one pass.
    pub fn analyze(&self, message: &Message) -> LocalAnalysis {
        LocalAnalysis {
            classification: self.classify_message(message),
            suggested_response: self.draft_response(message),
        }
    }

    /// One-line synopsis from sender, subject and the start of the body.
    pub fn summarize(&self, message: &Message) -> String {
        let body: String = message.body_snippet.chars().take(SUMMARY_BODY_CHARS).collect();
        format!(
            "{} is reaching out regarding \"{}\". {}...",
            message.sender_name, message.subject, body
        )
    }

    /// Follow-up timing from the classification's priority.
    pub fn suggest_follow_up(&self, classification: &Classification) -> FollowUpAdvice {
        let priority = classification.priority;
        let (follow_up_days, reason) = if priority >= 4 {
            (2, "High priority lead - follow up soon")
        } else if priority >= 3 {
            (3, "Standard follow-up timing")
        } else {
            (5, "Standard follow-up timing")
        };

        FollowUpAdvice {
            follow_up_days,
            reason: reason.to_string(),
            should_follow_up: classification.is_hot_lead || priority >= 3,
        }
    }

    /// Aggregate counts over a batch. An empty batch reports a mean
    /// confidence of 0.
    pub fn summarize_batch(&self, messages: &[Message]) -> BatchSummary {
        let classifications: Vec<Classification> =
            messages.iter().map(|m| self.classify_message(m)).collect();
        summarize_classifications(&classifications)
    }
}

/// Fold already computed classifications into a [`BatchSummary`].
pub fn summarize_classifications(classifications: &[Classification]) -> BatchSummary {
    let total = classifications.len();
    if total == 0 {
        return BatchSummary::default();
    }

    let mut categories = BTreeMap::new();
    let mut confidence_sum = 0usize;
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };

    for c in classifications {
        if c.is_hot_lead {
            summary.hot_leads += 1;
        }
        if c.is_high_priority() {
            summary.high_priority += 1;
        }
        if c.urgency == Urgency::High {
            summary.urgent += 1;
        }
        confidence_sum += usize::from(c.confidence);
        *categories.entry(c.category).or_insert(0) += 1;
    }

    // Half-up rounding of the mean.
    summary.avg_confidence = ((confidence_sum * 2 + total) / (total * 2)) as u8;
    summary.categories = categories;
    summary
}

fn confidence_for(hits: usize) -> u8 {
    (20 + 20 * hits).min(usize::from(Classification::MAX_CONFIDENCE)) as u8
}

fn priority_for(text: &str) -> u8 {
    let boost: u8 = PRIORITY_BOOSTS
        .iter()
        .filter(|(terms, _)| contains_any(text, terms))
        .map(|(_, boost)| *boost)
        .sum();
    (Classification::MIN_PRIORITY + boost).min(Classification::MAX_PRIORITY)
}

fn category_for(text: &str) -> Category {
    let mut best = Category::General;
    let mut best_count = 0;
    for (category, terms) in CATEGORY_KEYWORDS {
        let count = count_matches(text, terms);
        // Strictly greater keeps the earlier category on a tie.
        if count > best_count {
            best = *category;
            best_count = count;
        }
    }
    best
}

fn sentiment_for(text: &str) -> Sentiment {
    let positive = count_matches(text, POSITIVE_WORDS);
    let negative = count_matches(text, NEGATIVE_WORDS);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

fn urgency_for(text: &str) -> Urgency {
    URGENCY_TRIGGERS
        .iter()
        .find(|(_, terms)| contains_any(text, terms))
        .map(|(urgency, _)| *urgency)
        .unwrap_or(Urgency::Low)
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(&self, message: &Message) -> Option<Classification> {
        Some(self.classify_message(message))
    }

    async fn draft_response(&self, message: &Message) -> Option<ResponseDraft> {
        Some(HeuristicAnalyzer::draft_response(self, message))
    }

    async fn summarize(&self, message: &Message) -> Option<String> {
        Some(HeuristicAnalyzer::summarize(self, message))
    }

    async fn suggest_follow_up(
        &self,
        _message: &Message,
        classification: &Classification,
    ) -> Option<FollowUpAdvice> {
        Some(HeuristicAnalyzer::suggest_follow_up(self, classification))
    }
}
