// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load JSONL records          (Layer 4 - data)
//   Step 2: Log label distribution      (Layer 4 - data)
//   Step 3: Build / load tokenizer      (Layer 6 - infra)
//   Step 4: Stratified 3-way split      (Layer 4 - data)
//   Step 5: Encode the splits           (Layer 4 - data)
//   Step 6: Save config + label map     (Layer 6 - infra)
//   Step 7: Run the fine-tuning loop    (Layer 5 - ml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::CommentDataset,
    encoder::TextEncoder,
    loader::{self, JsonlLoader},
    splitter::stratified_split,
};
use crate::domain::labels::LabelMap;
use crate::domain::traits::CommentSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{trainer::run_training, DeviceKind};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:     String,
    pub output_dir:    String,
    pub model_name:    String,
    pub max_length:    usize,
    pub batch_size:    usize,
    pub num_epochs:    usize,
    pub learning_rate: f64,
    pub warmup_steps:  usize,
    pub weight_decay:  f64,
    pub test_size:     f64,
    pub val_size:      f64,
    pub eval_steps:    usize,
    pub seed:          u64,
    pub device:        DeviceKind,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    pub dropout:       f64,
    pub vocab_size:    usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:     "./data_comment_moderation.jsonl".to_string(),
            output_dir:    "./model_storage".to_string(),
            model_name:    "vinai/phobert-base".to_string(),
            max_length:    256,
            batch_size:    16,
            num_epochs:    5,
            learning_rate: 2e-5,
            warmup_steps:  500,
            weight_decay:  0.01,
            test_size:     0.2,
            val_size:      0.1,
            eval_steps:    500,
            seed:          42,
            device:        DeviceKind::Auto,
            d_model:       256,
            num_heads:     8,
            num_layers:    6,
            d_ff:          1024,
            dropout:       0.1,
            vocab_size:    30522,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        let labels = LabelMap::default();

        // ── Step 1: Load labelled comments ────────────────────────────────────
        // One JSON record per line; malformed lines are skipped and
        // counted, a missing file aborts the run
        let jsonl = JsonlLoader::new(&cfg.data_path, labels.num_labels());
        let records = jsonl.load_all()?;
        let (texts, label_ids) = loader::into_texts_and_labels(records);

        // ── Step 2: Label distribution summary ────────────────────────────────
        loader::log_label_distribution(&label_ids, &labels);

        // ── Step 3: Build / load tokenizer ────────────────────────────────────
        // If a tokenizer was already built and saved, load it.
        // Otherwise build a fresh vocabulary over the full corpus.
        let tok_store = TokenizerStore::new(&cfg.output_dir);
        let tokenizer = tok_store.load_or_build(&texts, cfg.vocab_size)?;

        // ── Step 4: Stratified train/validation/test split ────────────────────
        // Test fraction first, then validation from the remainder;
        // class proportions are preserved in every subset
        let splits = stratified_split(texts, label_ids, cfg.test_size, cfg.val_size, cfg.seed)?;
        tracing::info!("Train samples: {}", splits.train.len());
        tracing::info!("Validation samples: {}", splits.val.len());
        tracing::info!("Test samples: {}", splits.test.len());

        // ── Step 5: Encode the splits ─────────────────────────────────────────
        // The same TextEncoder configuration is reused verbatim at
        // inference time, so encodings always agree between paths
        let encoder = TextEncoder::new(tokenizer, cfg.max_length);
        let train_dataset = CommentDataset::from_split(&splits.train, &encoder)?;
        let val_dataset   = CommentDataset::from_split(&splits.val, &encoder)?;
        let test_dataset  = CommentDataset::from_split(&splits.test, &encoder)?;

        // ── Step 6: Persist config and label registry ─────────────────────────
        // Inference rebuilds the model architecture from the config
        // and decodes class indices through the label map side-car
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir);
        ckpt_manager.save_config(cfg)?;
        labels.save(Path::new(&cfg.output_dir))?;

        // ── Step 7: Run the fine-tuning loop (Layer 5) ────────────────────────
        run_training(cfg, train_dataset, val_dataset, test_dataset, ckpt_manager, &labels)?;

        Ok(())
    }
}
