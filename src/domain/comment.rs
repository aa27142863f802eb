// ============================================================
// Layer 3 — Comment Domain Type
// ============================================================
// Represents a single labelled comment as found in the JSONL
// training data: the raw text plus its moderation category id.

use serde::{Deserialize, Serialize};

/// One labelled comment from the training data.
///
/// `label_id` indexes into the label registry
/// (0 = normal, 1 = offensive, 2 = hateful, 3 = spam by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    /// The raw comment text, exactly as written by the user
    pub free_text: String,

    /// Moderation category id — must be a key of the label registry
    pub label_id: usize,
}

impl CommentRecord {
    /// Create a new CommentRecord.
    /// Uses impl Into<String> so callers can pass &str or String.
    pub fn new(free_text: impl Into<String>, label_id: usize) -> Self {
        Self {
            free_text: free_text.into(),
            label_id,
        }
    }

    /// Returns true when the label id falls inside a registry of
    /// `num_labels` contiguous classes.
    pub fn has_valid_label(&self, num_labels: usize) -> bool {
        self.label_id < num_labels
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_jsonl_record() {
        let record: CommentRecord =
            serde_json::from_str(r#"{"free_text": "hello there", "label_id": 0}"#).unwrap();
        assert_eq!(record.free_text, "hello there");
        assert_eq!(record.label_id, 0);
    }

    #[test]
    fn test_label_validation() {
        assert!(CommentRecord::new("ok", 3).has_valid_label(4));
        assert!(!CommentRecord::new("bad", 4).has_valid_label(4));
    }
}
