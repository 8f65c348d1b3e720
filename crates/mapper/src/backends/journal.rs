//! JournalBackend - appends every request as one JSON line

use std::path::{Path, PathBuf};

use contracts::{ContractError, KeyframeEntry, MappingBackend};
use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

#[derive(Serialize)]
struct JournalLine<'a> {
    kind: &'a str,
    video_idx: Option<u64>,
    timestamp: Option<f64>,
}

/// Backend writing a JSONL journal of the mapper session
pub struct JournalBackend {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl JournalBackend {
    /// Create (or truncate) the journal file, creating parent directories
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = File::create(&path).await?;
        debug!(path = %path.display(), "Journal opened");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&mut self, line: JournalLine<'_>) -> Result<(), ContractError> {
        let mut bytes = serde_json::to_vec(&line)
            .map_err(|e| ContractError::codec(format!("journal encode: {e}")))?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.lines += 1;
        Ok(())
    }
}

impl MappingBackend for JournalBackend {
    fn name(&self) -> &str {
        "journal"
    }

    async fn map_keyframe(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        self.append(JournalLine {
            kind: "map",
            video_idx: Some(entry.video_index),
            timestamp: Some(entry.timestamp),
        })
        .await
    }

    async fn gap_track(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        self.append(JournalLine {
            kind: "gap",
            video_idx: Some(entry.video_index),
            timestamp: Some(entry.timestamp),
        })
        .await
    }

    #[instrument(name = "journal_finish", skip(self), fields(path = %self.path.display()))]
    async fn finish(&mut self) -> Result<(), ContractError> {
        self.append(JournalLine {
            kind: "shutdown",
            video_idx: None,
            timestamp: None,
        })
        .await?;
        self.writer.flush().await?;
        debug!(lines = self.lines, "Journal flushed");
        Ok(())
    }
}
