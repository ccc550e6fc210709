use std::path::Path;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::KbFuzzError;
use crate::models::OutcomeRecord;

/// Append-only ledger of outcome records. Appends are serialized through a
/// mutex so concurrent workers never interleave. Optionally mirrored to a
/// JSONL journal as records arrive.
pub struct Ledger {
    records: Mutex<Vec<OutcomeRecord>>,
    journal: Option<Mutex<tokio::fs::File>>,
}

impl Ledger {
    pub fn in_memory() -> Self {
        Self { records: Mutex::new(Vec::new()), journal: None }
    }

    /// Start a fresh journal at `path`, truncating any previous run's file.
    pub async fn with_journal(path: &Path) -> Result<Self, KbFuzzError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true).write(true).truncate(true).open(path).await?;
        Ok(Self { records: Mutex::new(Vec::new()), journal: Some(Mutex::new(file)) })
    }

    pub async fn append(&self, record: OutcomeRecord) {
        let mut records = self.records.lock().await;
        if let Some(journal) = &self.journal {
            if let Err(e) = write_line(journal, &record).await {
                warn!(test = %record.test_name, error = %e, "Failed to journal outcome record");
            }
        }
        records.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Copy of the ledger in append order.
    pub async fn snapshot(&self) -> Vec<OutcomeRecord> {
        self.records.lock().await.clone()
    }
}

async fn write_line(journal: &Mutex<tokio::fs::File>, record: &OutcomeRecord) -> Result<(), KbFuzzError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = journal.lock().await;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::outcome::sample_record;
    use crate::models::{BugType, Category, HttpStatus};

    #[tokio::test]
    async fn test_append_preserves_order() {
        let ledger = Ledger::in_memory();
        for name in ["a", "b", "c"] {
            ledger.append(sample_record(name, Category::Xss, Some(HttpStatus::Code(200)), Some(200), BugType::None)).await;
        }
        let names: Vec<String> = ledger.snapshot().await.into_iter().map(|r| r.test_name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_all_land() {
        let ledger = Arc::new(Ledger::in_memory());
        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.append(sample_record(&format!("t{}", i), Category::Idor, None, None, BugType::None)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(ledger.len().await, 32);
    }

    #[tokio::test]
    async fn test_journal_mirrors_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("api_ledger.jsonl");
        let ledger = Ledger::with_journal(&path).await.unwrap();
        ledger.append(sample_record("one", Category::Boundary, Some(HttpStatus::Code(500)), None, BugType::ServerError)).await;
        ledger.append(sample_record("two", Category::Boundary, Some(HttpStatus::Code(200)), Some(200), BugType::None)).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: OutcomeRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.test_name, "one");
        assert!(first.is_bug);
    }

    #[tokio::test]
    async fn test_journal_truncated_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_ledger.jsonl");
        std::fs::write(&path, "stale\n").unwrap();
        let ledger = Ledger::with_journal(&path).await.unwrap();
        assert!(ledger.is_empty().await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
