//! Message sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::pipeline::types::{Message, MessageSource};

/// Reads a JSON array of messages from a file on every fetch.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl MessageSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch(&self) -> Result<Vec<Message>, SourceError> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Read {
                path: path.clone(),
                source,
            })?;

        let messages: Vec<Message> =
            serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
                path: path.clone(),
                source,
            })?;

        debug!(%path, count = messages.len(), "Loaded messages");
        Ok(messages)
    }
}
