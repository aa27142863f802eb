// ============================================================
// Layer 4 — JSONL Comment Loader
// ============================================================
// Reads labelled comments from a line-delimited JSON file.
// Each line is one record: {"free_text": "...", "label_id": N}
//
// Lines are parsed independently. A line that fails to parse,
// or whose label id falls outside the configured label set, is
// skipped and counted — one bad record never aborts a run.
// A missing file does: that is a fatal DataError::FileNotFound.

use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::data::DataError;
use crate::domain::comment::CommentRecord;
use crate::domain::labels::LabelMap;
use crate::domain::traits::CommentSource;

/// Progress log cadence while reading large files
const PROGRESS_EVERY: usize = 10_000;

/// Loads labelled comment records from a JSONL file.
/// Implements the CommentSource trait from Layer 3.
pub struct JsonlLoader {
    /// Path to the .jsonl data file
    path: PathBuf,

    /// Size of the configured label set — records outside it are skipped
    num_labels: usize,
}

impl JsonlLoader {
    /// Create a new JsonlLoader for the given file and label set size
    pub fn new(path: impl Into<PathBuf>, num_labels: usize) -> Self {
        Self {
            path: path.into(),
            num_labels,
        }
    }
}

impl CommentSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<CommentRecord>> {
        // Resolve to an absolute path up front so error messages and
        // logs always name the real location
        if !self.path.exists() {
            return Err(DataError::FileNotFound(self.path.clone()).into());
        }
        let abs = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());

        tracing::info!("Loading data from: {}", abs.display());

        let file = File::open(&abs)?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line_num = idx + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<CommentRecord>(line) {
                Ok(record) if record.has_valid_label(self.num_labels) => {
                    records.push(record);
                    if records.len() % PROGRESS_EVERY == 0 {
                        tracing::info!("Loaded {} samples...", records.len());
                    }
                }
                Ok(record) => {
                    skipped += 1;
                    tracing::warn!(
                        "Skipping line {line_num}: label_id {} outside 0..{}",
                        record.label_id,
                        self.num_labels,
                    );
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping line {line_num}: invalid JSON - {e}");
                }
            }
        }

        tracing::info!(
            "Loaded {} samples total ({} skipped)",
            records.len(),
            skipped,
        );
        Ok(records)
    }
}

/// Split records into the parallel (texts, labels) sequences the
/// rest of the pipeline works with. Output lengths always match.
pub fn into_texts_and_labels(records: Vec<CommentRecord>) -> (Vec<String>, Vec<usize>) {
    let mut texts = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());
    for record in records {
        texts.push(record.free_text);
        labels.push(record.label_id);
    }
    (texts, labels)
}

/// Log the per-label count and percentage summary of a label column.
pub fn log_label_distribution(labels: &[usize], registry: &LabelMap) {
    let mut counts = vec![0usize; registry.num_labels()];
    for &label in labels {
        if label < counts.len() {
            counts[label] += 1;
        }
    }

    let total = labels.len().max(1);
    tracing::info!("Label distribution:");
    for (id, name) in registry.iter() {
        let count = counts.get(id).copied().unwrap_or(0);
        tracing::info!(
            "  {name} ({id}): {count} samples ({:.2}%)",
            count as f64 / total as f64 * 100.0,
        );
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_loads_valid_records() {
        let file = write_jsonl(&[
            r#"{"free_text": "have a nice day", "label_id": 0}"#,
            r#"{"free_text": "buy cheap pills now", "label_id": 3}"#,
        ]);

        let loader = JsonlLoader::new(file.path(), 4);
        let records = loader.load_all().unwrap();
        let (texts, labels) = into_texts_and_labels(records);

        assert_eq!(texts.len(), labels.len());
        assert_eq!(texts, vec!["have a nice day", "buy cheap pills now"]);
        assert_eq!(labels, vec![0, 3]);
    }

    #[test]
    fn test_skips_malformed_lines() {
        let file = write_jsonl(&[
            r#"{"free_text": "fine", "label_id": 1}"#,
            r#"{"free_text": "missing label"}"#,
            "not json at all",
            "",
            r#"{"free_text": "also fine", "label_id": 2}"#,
        ]);

        let loader = JsonlLoader::new(file.path(), 4);
        let records = loader.load_all().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_skips_out_of_range_labels() {
        let file = write_jsonl(&[
            r#"{"free_text": "ok", "label_id": 0}"#,
            r#"{"free_text": "bad label", "label_id": 7}"#,
        ]);

        let loader = JsonlLoader::new(file.path(), 4);
        let records = loader.load_all().unwrap();

        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.has_valid_label(4)));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let loader = JsonlLoader::new("/definitely/not/here.jsonl", 4);
        let err = loader.load_all().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::FileNotFound(_))
        ));
    }
}
