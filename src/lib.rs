//! lead-intel: lead classification and reply drafting for inbound email.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
