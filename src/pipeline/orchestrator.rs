//! Orchestrator: reconciles remote and local analysis into one complete
//! result per message.
//!
//! Flow:
//! 1. Validate the message
//! 2. Classification: remote, else heuristic
//! 3. Fan out summary, draft reply and follow-up advice concurrently
//! 4. Substitute the local equivalent for every absent branch
//!
//! A valid message always yields a fully populated `ProcessResult`.

use std::borrow::Borrow;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::task::JoinError;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::IntelConfig;
use crate::error::ValidationError;
use crate::llm::create_provider;
use crate::pipeline::heuristics::HeuristicAnalyzer;
use crate::pipeline::remote::RemoteAnalyzer;
use crate::pipeline::types::{Analyzer, Classification, Message, ProcessResult};

/// Default number of messages processed at once by `process_batch`.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Combines an optional remote analyzer with the local heuristic engine.
pub struct Orchestrator {
    remote: Option<Arc<dyn Analyzer>>,
    local: HeuristicAnalyzer,
    batch_concurrency: usize,
}

impl Orchestrator {
    /// Orchestrator that tries `remote` first for every result.
    pub fn new(remote: Arc<dyn Analyzer>) -> Self {
        Self {
            remote: Some(remote),
            local: HeuristicAnalyzer::new(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Orchestrator with no remote path; every result is computed locally.
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: HeuristicAnalyzer::new(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Build from runtime configuration: remote when a backend is
    /// configured, local-only otherwise.
    pub fn from_config(config: &IntelConfig) -> crate::error::Result<Self> {
        let orchestrator = match &config.llm {
            Some(llm_config) => {
                let llm = create_provider(llm_config)?;
                info!(model = llm.model_name(), "Remote analysis enabled");
                let remote = RemoteAnalyzer::new(llm).with_request_timeout(config.request_timeout);
                Self::new(Arc::new(remote))
            }
            None => {
                info!("Remote analysis disabled, using heuristics only");
                Self::local_only()
            }
        };
        Ok(orchestrator.with_batch_concurrency(config.batch_concurrency))
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    /// Whether a remote analyzer is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Analyze one message.
    ///
    /// Fails only when the message itself is invalid. Remote failures of any
    /// kind are replaced by local results.
    pub async fn process(&self, message: &Message) -> Result<ProcessResult, ValidationError> {
        message.validate()?;

        let request_id = Uuid::new_v4();
        let span = info_span!("process", %request_id, sender = %message.sender_email);
        let result = self.process_valid(message).instrument(span).await;
        Ok(result)
    }

    async fn process_valid(&self, message: &Message) -> ProcessResult {
        let analyzer = self.remote.as_ref().map_or(self.local.name(), |r| r.name());
        info!(subject = %message.subject, analyzer, "Processing message");

        let Some(remote) = self.remote.clone() else {
            return self.process_local(message);
        };

        // Step 1: classification must resolve before the follow-up prompt.
        let classification = match remote.classify(message).await {
            Some(c) => c,
            None => {
                debug!("Remote classification absent, using heuristic");
                self.local.classify_message(message)
            }
        };

        // Step 2: three independent branches. Each resolves to a value
        // (remote or local) inside its own task before the join.
        let local = self.local;

        let summary_task = {
            let remote = Arc::clone(&remote);
            let message = message.clone();
            tokio::spawn(
                async move {
                    match remote.summarize(&message).await {
                        Some(s) => s,
                        None => {
                            debug!("Remote summary absent, using local summary");
                            local.summarize(&message)
                        }
                    }
                }
                .in_current_span(),
            )
        };

        let response_task = {
            let remote = Arc::clone(&remote);
            let message = message.clone();
            tokio::spawn(
                async move {
                    match remote.draft_response(&message).await {
                        Some(r) => r,
                        None => {
                            debug!("Remote draft absent, using template reply");
                            local.draft_response(&message)
                        }
                    }
                }
                .in_current_span(),
            )
        };

        let follow_up_task = {
            let remote = Arc::clone(&remote);
            let message = message.clone();
            let classification = classification.clone();
            tokio::spawn(
                async move {
                    match remote.suggest_follow_up(&message, &classification).await {
                        Some(f) => f,
                        None => {
                            debug!("Remote follow-up absent, using priority rule");
                            local.suggest_follow_up(&classification)
                        }
                    }
                }
                .in_current_span(),
            )
        };

        let (summary, response, follow_up) =
            tokio::join!(summary_task, response_task, follow_up_task);

        // Step 3: a branch that died is treated like an absent result.
        let result = ProcessResult {
            summary: summary.unwrap_or_else(|e| {
                log_dead_branch("summary", &e);
                generic_summary(message)
            }),
            response: response.unwrap_or_else(|e| {
                log_dead_branch("response", &e);
                self.local.draft_response(message)
            }),
            follow_up: follow_up.unwrap_or_else(|e| {
                log_dead_branch("follow_up", &e);
                self.local.suggest_follow_up(&classification)
            }),
            classification,
        };

        info!(
            hot_lead = result.classification.is_hot_lead,
            priority = result.classification.priority,
            category = %result.classification.category,
            "Message processed"
        );
        result
    }

    fn process_local(&self, message: &Message) -> ProcessResult {
        let classification = self.local.classify_message(message);
        ProcessResult {
            response: self.local.draft_response(message),
            summary: self.local.summarize(message),
            follow_up: self.local.suggest_follow_up(&classification),
            classification,
        }
    }

    /// Process many messages with bounded concurrency.
    ///
    /// Output order matches input order, one entry per message; invalid
    /// messages are logged and reported as errors in their slot.
    pub async fn process_batch(
        &self,
        messages: &[Message],
    ) -> Vec<Result<ProcessResult, ValidationError>> {
        let count = messages.len();
        info!(count, "Processing message batch");

        let results: Vec<_> = stream::iter(messages)
            .map(|message| async move {
                let result = self.process(message).await;
                if let Err(e) = &result {
                    warn!(
                        sender = %message.sender_email,
                        error = %e,
                        "Invalid message in batch"
                    );
                }
                result
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        info!(
            processed = results.iter().filter(|r| r.is_ok()).count(),
            total = count,
            "Batch processing complete"
        );
        results
    }
}

fn log_dead_branch(branch: &'static str, error: &JoinError) {
    warn!(branch, error = %error, "Analysis branch died, using fallback");
}

/// Last-resort summary built only from sender and subject.
fn generic_summary(message: &Message) -> String {
    format!(
        "{} is reaching out regarding \"{}\".",
        message.sender_name, message.subject
    )
}

/// Order results for a priority queue: hot leads first, then by priority,
/// then by confidence. Ties keep their input order.
///
/// Works on anything that borrows as a `ProcessResult`, so callers can rank
/// their own records without unpacking them.
pub fn rank_by_priority<T: Borrow<ProcessResult>>(items: &mut [T]) {
    items.sort_by(|a, b| {
        let key = |c: &Classification| (c.is_hot_lead, c.priority, c.confidence);
        key(&b.borrow().classification).cmp(&key(&a.borrow().classification))
    });
}
