// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by training and inference:
//
//   checkpoint.rs      — Saving and loading model weights.
//                        Step checkpoints during training (pruned
//                        to a small retention window), the final
//                        exported model, and the architecture
//                        config JSON inference needs to rebuild
//                        the model.
//
//   tokenizer_store.rs — Tokenizer persistence. Builds a
//                        vocabulary from the training corpus if
//                        none exists, loads a previously saved
//                        one, or fetches the pretrained fallback
//                        at inference time. Ensures the same
//                        vocabulary is used for training and
//                        inference.
//
//   metrics.rs         — Accuracy and F1 computation, the
//                        per-class classification report, and
//                        the evaluation-history CSV logger.

/// Model checkpoint saving, pruning, export and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Accuracy / F1 evaluation and the metrics CSV logger
pub mod metrics;
