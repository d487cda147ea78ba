//! Lead intelligence pipeline.
//!
//! Every message flows through:
//! 1. `Message::validate()`: reject structurally invalid records
//! 2. `Analyzer::classify()`: remote first, `HeuristicAnalyzer` on absence
//! 3. Concurrent summary / reply draft / follow-up, each with a local fallback
//!
//! **No error path after validation.** Remote failures degrade to local
//! results; the caller always receives a complete `ProcessResult`.

pub mod heuristics;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod remote;
pub mod schedule;
pub mod source;
pub mod types;

pub use heuristics::HeuristicAnalyzer;
pub use orchestrator::{Orchestrator, rank_by_priority};
pub use remote::RemoteAnalyzer;
pub use schedule::{MeetingSlot, suggest_meeting_slots};
pub use source::JsonFileSource;
pub use types::*;
