// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers. Higher layers program against these
// traits instead of concrete types, so the data format and the
// model backend can change without touching the callers.

use anyhow::Result;

use crate::domain::comment::CommentRecord;
use crate::ml::predictor::{PredictError, Prediction};

// ─── CommentSource ────────────────────────────────────────────────────────────
/// Any component that can load labelled comment records.
///
/// Implementations:
///   - JsonlLoader → reads line-delimited JSON from a file
pub trait CommentSource {
    /// Load all parseable records from this source.
    /// Per-record failures are skipped by the implementation,
    /// not surfaced here.
    fn load_all(&self) -> Result<Vec<CommentRecord>>;
}

// ─── CommentClassifier ────────────────────────────────────────────────────────
/// Any component that can assign a moderation label to a comment.
///
/// This is the narrow contract the serving layer calls through —
/// it never sees the model, tokenizer, or label registry directly.
pub trait CommentClassifier {
    /// Classify one comment, returning the predicted class id,
    /// its human-readable name, and the model's confidence.
    fn classify(&self, text: &str) -> Result<Prediction, PredictError>;
}
