// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw JSONL file to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   comments.jsonl
//       │
//       ▼
//   JsonlLoader       → parses records, skips malformed lines
//       │
//       ▼
//   stratified_split  → train / validation / test, class-balanced
//       │
//       ▼
//   TextEncoder       → token ids + attention mask, fixed length
//       │
//       ▼
//   CommentDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   CommentBatcher    → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.

use std::path::PathBuf;
use thiserror::Error;

/// Loads labelled comments from a JSONL file
pub mod loader;

/// Stratified train/validation/test partitioning
pub mod splitter;

/// Wraps the subword tokenizer into fixed-shape encodings
pub mod encoder;

/// Implements Burn's Dataset trait for encoded comments
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

// ─── Data Errors ──────────────────────────────────────────────────────────────
/// Fatal data-pipeline failures. Per-record problems (a malformed
/// line, an out-of-range label) are absorbed and counted by the
/// loader instead — only conditions that leave the run unusable
/// surface through this type.
#[derive(Debug, Error)]
pub enum DataError {
    /// The input data file does not exist at load time
    #[error("data file not found: '{0}'")]
    FileNotFound(PathBuf),

    /// A class has too few members to appear in every split
    #[error(
        "cannot stratify: label {label} has only {count} sample(s), \
         too few to cover train, validation and test"
    )]
    Stratification { label: usize, count: usize },
}
