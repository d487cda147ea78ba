use std::borrow::Borrow;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use lead_intel::config::IntelConfig;
use lead_intel::error::ValidationError;
use lead_intel::pipeline::heuristics::summarize_classifications;
use lead_intel::pipeline::{
    BatchSummary, Category, JsonFileSource, MeetingSlot, Message, MessageSource, Orchestrator,
    ProcessResult, rank_by_priority, suggest_meeting_slots,
};

#[derive(Serialize)]
struct Report {
    summary: BatchSummary,
    results: Vec<ReportEntry>,
    invalid: Vec<InvalidEntry>,
}

#[derive(Serialize)]
struct ReportEntry {
    sender_name: String,
    sender_email: String,
    subject: String,
    #[serde(flatten)]
    result: ProcessResult,
    follow_up_due: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_slots: Option<Vec<MeetingSlot>>,
}

impl Borrow<ProcessResult> for ReportEntry {
    fn borrow(&self) -> &ProcessResult {
        &self.result
    }
}

#[derive(Serialize)]
struct InvalidEntry {
    index: usize,
    sender_email: String,
    error: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: lead-intel <messages.json>");
        eprintln!("  GEMINI_API_KEY enables remote analysis; without it every result is local.");
        std::process::exit(2);
    };

    let config = IntelConfig::from_env().context("invalid configuration")?;
    let orchestrator =
        Orchestrator::from_config(&config).context("failed to set up the analyzer")?;

    let source = JsonFileSource::new(&path);
    let messages = source
        .fetch()
        .await
        .with_context(|| format!("failed to load messages from {path}"))?;
    tracing::info!(source = source.name(), count = messages.len(), "Messages loaded");

    let outcomes = orchestrator.process_batch(&messages).await;
    let report = build_report(&messages, outcomes, Local::now());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Pair outcomes with their messages, rank the valid ones and attach
/// follow-up due dates and meeting slots, all relative to one `now`.
fn build_report(
    messages: &[Message],
    outcomes: Vec<Result<ProcessResult, ValidationError>>,
    now: DateTime<Local>,
) -> Report {
    let today = now.date_naive();
    let now = now.with_timezone(&Utc);

    let mut results = Vec::new();
    let mut invalid = Vec::new();
    for (index, (message, outcome)) in messages.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(result) => {
                let meeting_slots = (result.classification.category == Category::Meeting)
                    .then(|| suggest_meeting_slots(today));
                results.push(ReportEntry {
                    sender_name: message.sender_name.clone(),
                    sender_email: message.sender_email.clone(),
                    subject: message.subject.clone(),
                    follow_up_due: result.follow_up.due_date(now),
                    meeting_slots,
                    result,
                });
            }
            Err(e) => invalid.push(InvalidEntry {
                index,
                sender_email: message.sender_email.clone(),
                error: e.to_string(),
            }),
        }
    }

    rank_by_priority(&mut results);

    let classifications: Vec<_> = results
        .iter()
        .map(|entry| entry.result.classification.clone())
        .collect();
    Report {
        summary: summarize_classifications(&classifications),
        results,
        invalid,
    }
}

/// Logs go to stderr so the JSON report on stdout stays clean. With
/// `LEAD_INTEL_LOG_DIR` set they go to a daily file instead.
fn init_tracing() -> Option<WorkerGuard> {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var("LEAD_INTEL_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lead-intel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
