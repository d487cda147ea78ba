//! Instruction prompts for the remote analyzer.
//!
//! Every prompt is a pure function of the message (and, for follow-up, the
//! resolved classification), so the same input always renders the same text.

use super::types::{Classification, Message};

/// Shared header identifying the message being analyzed.
fn message_block(message: &Message) -> String {
    format!(
        "From: {} ({})\nSubject: {}\nContent: {}",
        message.sender_name, message.sender_email, message.subject, message.body_snippet
    )
}

/// Classification prompt. The model must answer with a single JSON object.
pub fn classify_prompt(message: &Message) -> String {
    format!(
        "\
Analyze this email and provide insights in JSON format:

{block}

Please provide:
1. isHotLead (boolean) - Is this a potential sales lead?
2. priority (1-5) - How urgent/important is this email?
3. category (string) - sales, partnership, support, meeting, feedback, or general
4. sentiment (string) - positive, neutral, or negative
5. confidence (0-100) - Your confidence in the hot lead classification
6. urgency (string) - high, medium, or low
7. leadScore (0-100) - Overall lead quality score based on conversion likelihood
8. revenueOpportunity (object) - {{
     hasOpportunity: boolean,
     signals: array of strings (e.g., \"budget mentioned\", \"pricing inquiry\"),
     estimatedValue: string (\"high\", \"medium\", \"low\", or \"unknown\"),
     dealSize: string (e.g., \"$5k-10k\", \"enterprise\", \"unknown\")
   }}

Return ONLY valid JSON, no markdown or code blocks.",
        block = message_block(message)
    )
}

/// Reply drafting prompt. The model answers with the reply body only.
pub fn draft_response_prompt(message: &Message) -> String {
    format!(
        "\
Generate a professional email response for this email:

{block}

Generate a response that:
1. Is professional and friendly
2. Addresses the sender's needs
3. Suggests next steps (meeting, call, etc.)
4. Is concise (under 200 words)

Return ONLY the email body text, no subject line or formatting.",
        block = message_block(message)
    )
}

/// Summary prompt. The model answers with 2-3 sentences of prose.
pub fn summarize_prompt(message: &Message) -> String {
    format!(
        "\
Summarize this email in 2-3 concise sentences. Focus on the key points and any action items.

{block}

Provide a clear, actionable summary.",
        block = message_block(message)
    )
}

/// Follow-up timing prompt, grounded in the resolved classification.
pub fn follow_up_prompt(message: &Message, classification: &Classification) -> String {
    format!(
        "\
Based on this email, suggest when to follow up if there's no response.

From: {sender}
Subject: {subject}
Content: {body}
Priority: {priority}/5
Urgency: {urgency}
Category: {category}

Provide:
1. followUpDays (number) - How many days to wait before following up (1-7)
2. reason (string) - Brief reason for this timing
3. shouldFollowUp (boolean) - Whether a follow-up is recommended

Return ONLY valid JSON, no markdown.",
        sender = message.sender_name,
        subject = message.subject,
        body = message.body_snippet,
        priority = classification.priority,
        urgency = classification.urgency.as_str(),
        category = classification.category.as_str(),
    )
}
