use std::{
    io::{ErrorKind, SeekFrom},
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::Mutex,
};
use tracing::warn;
use uuid::Uuid;

use stove_common::{CycleError, HistoryRecord};

use crate::adapters::HistoryStore;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(rename = "_id")]
    id: Uuid,
    #[serde(flatten)]
    record: HistoryRecord,
}

const TAIL_CHUNK_BYTES: u64 = 64 * 1024;

// One JSON document per line, appended in date order. Reads walk back from the
// end of the file and stop at the first record older than the requested date.
#[derive(Clone)]
pub struct JsonlHistoryStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl JsonlHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            lock: Arc::new(Mutex::new(())),
        }
    }
}

fn persistence(err: impl std::fmt::Display) -> CycleError {
    CycleError::Persistence(err.to_string())
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn insert(&self, record: &HistoryRecord) -> Result<(), CycleError> {
        let stored = StoredRecord {
            id: Uuid::new_v4(),
            record: record.clone(),
        };
        let mut line = serde_json::to_vec(&stored).map_err(persistence)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(persistence)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await
            .map_err(persistence)?;
        file.write_all(&line).await.map_err(persistence)?;
        file.flush().await.map_err(persistence)?;
        Ok(())
    }

    async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<HistoryRecord>, CycleError> {
        let _guard = self.lock.lock().await;
        let mut file = match tokio::fs::File::open(self.path.as_path()).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(persistence(err)),
        };

        let mut end = file.metadata().await.map_err(persistence)?.len();
        let mut carry: Vec<u8> = Vec::new();
        let mut records = Vec::new();

        'chunks: while end > 0 {
            let start = end.saturating_sub(TAIL_CHUNK_BYTES);
            let mut chunk = vec![0u8; (end - start) as usize];
            file.seek(SeekFrom::Start(start)).await.map_err(persistence)?;
            file.read_exact(&mut chunk).await.map_err(persistence)?;
            chunk.extend_from_slice(&carry);
            end = start;

            // Bytes before the first newline may belong to a line that starts
            // in the previous chunk.
            let split = if start == 0 {
                Some(0)
            } else {
                chunk.iter().position(|byte| *byte == b'\n').map(|index| index + 1)
            };
            let Some(split) = split else {
                carry = chunk;
                continue;
            };
            let complete = chunk.split_off(split);
            chunk.pop();
            carry = chunk;

            for line in complete.split(|byte| *byte == b'\n').rev() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<StoredRecord>(line) {
                    Ok(stored) if stored.record.sample.date >= since => records.push(stored.record),
                    Ok(_) => break 'chunks,
                    // A torn trailing write must not hide the rest of the log.
                    Err(err) => warn!("skipping unreadable history line: {err}"),
                }
            }
        }

        records.reverse();
        records.sort_by_key(|record| record.sample.date);
        Ok(records)
    }
}
