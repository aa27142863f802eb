// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder
// (MessagePack + gzip, type-safe against architecture mismatch).
//
// Directory layout under the output directory:
//   model_storage/
//     checkpoints/
//       checkpoint_step_500.mpk.gz   ← rolling step checkpoints,
//       checkpoint_step_1000.mpk.gz    pruned to the most recent 3
//       ...
//     model.mpk.gz                   ← the exported best model
//     train_config.json              ← architecture + hyperparams
//
// The architecture config is saved separately: inference has to
// rebuild the exact model shape (d_model, num_layers, ...) before
// the weights can be loaded into it.
//
// The final export is written under a temporary name and renamed
// into place, so an interrupted export never leaves a truncated
// model.mpk.gz behind.

use anyhow::{Context, Result};
use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::TextClassifier;

/// How many rolling step checkpoints are kept on disk
pub const KEEP_CHECKPOINTS: usize = 3;

const CHECKPOINT_SUBDIR: &str = "checkpoints";
const FINAL_MODEL_STEM:  &str = "model";
const EXPORT_TMP_STEM:   &str = "model-export-tmp";
const CONFIG_FILE:       &str = "train_config.json";

/// Manages step checkpoints, the final model export, and the
/// architecture config, all rooted at the output directory.
pub struct CheckpointManager {
    root:        PathBuf,
    ckpt_dir:    PathBuf,
    keep_limit:  usize,
    saved_steps: VecDeque<usize>,
    best_step:   Option<usize>,
}

impl CheckpointManager {
    /// Create a new CheckpointManager rooted at `dir`.
    /// Creates the directory tree if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let root = dir.into();
        let ckpt_dir = root.join(CHECKPOINT_SUBDIR);
        fs::create_dir_all(&ckpt_dir).ok();
        Self {
            root,
            ckpt_dir,
            keep_limit: KEEP_CHECKPOINTS,
            saved_steps: VecDeque::new(),
            best_step: None,
        }
    }

    /// Record which step currently holds the best metric. Its
    /// checkpoint file is exempt from pruning so the final export
    /// can always restore it, however long ago it was saved.
    pub fn mark_best(&mut self, step: usize) {
        self.best_step = Some(step);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save a rolling checkpoint for the given optimiser step and
    /// drop the oldest one once the retention window is full.
    pub fn save_step<B: AutodiffBackend>(
        &mut self,
        model: &TextClassifier<B>,
        step:  usize,
    ) -> Result<()> {
        let path = self.ckpt_dir.join(format!("checkpoint_step_{step}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        self.saved_steps.push_back(step);
        prune_old_checkpoints(
            &self.ckpt_dir,
            &mut self.saved_steps,
            self.keep_limit,
            self.best_step,
        );

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    /// Load the checkpoint saved at `step` into the given model.
    /// The model must have the architecture the checkpoint was
    /// saved with, or loading fails.
    pub fn load_step<B: Backend>(
        &self,
        model:  TextClassifier<B>,
        step:   usize,
        device: &B::Device,
    ) -> Result<TextClassifier<B>> {
        let path = self.ckpt_dir.join(format!("checkpoint_step_{step}"));

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'", path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Export the final (best) model into the output directory.
    /// The record is written under a temporary name first and then
    /// renamed onto `model.mpk.gz`.
    pub fn export_model<B: Backend>(&self, model: &TextClassifier<B>) -> Result<()> {
        let tmp_stem = self.root.join(EXPORT_TMP_STEM);

        CompactRecorder::new()
            .record(model.clone().into_record(), tmp_stem.clone())
            .with_context(|| {
                format!("Failed to export model to '{}'", tmp_stem.display())
            })?;

        // CompactRecorder appends the .mpk.gz extension itself
        let tmp_file   = self.root.join(format!("{EXPORT_TMP_STEM}.mpk.gz"));
        let final_file = self.root.join(format!("{FINAL_MODEL_STEM}.mpk.gz"));
        fs::rename(&tmp_file, &final_file).with_context(|| {
            format!("Failed to finalise model export at '{}'", final_file.display())
        })?;

        tracing::info!("Exported model to '{}'", final_file.display());
        Ok(())
    }

    /// Load the exported model for inference.
    pub fn load_exported<B: Backend>(
        &self,
        model:  TextClassifier<B>,
        device: &B::Device,
    ) -> Result<TextClassifier<B>> {
        let path = self.root.join(FINAL_MODEL_STEM);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load model from '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    /// Must happen before training so a crashed run still leaves
    /// the architecture readable next to its checkpoints.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.root.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    /// Called at inference time to rebuild the model architecture.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.root.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'classify'.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }
}

/// Drop checkpoint files beyond the retention window, oldest first.
/// The best step's file is left on disk even when it ages out of
/// the window.
fn prune_old_checkpoints(
    dir:   &Path,
    steps: &mut VecDeque<usize>,
    keep:  usize,
    best:  Option<usize>,
) {
    while steps.len() > keep {
        // Non-empty by the loop condition
        let oldest = steps.pop_front().unwrap();
        if Some(oldest) == best {
            tracing::debug!("Keeping best checkpoint: step {oldest}");
            continue;
        }
        let file = dir.join(format!("checkpoint_step_{oldest}.mpk.gz"));
        if let Err(e) = fs::remove_file(&file) {
            tracing::warn!("Could not remove old checkpoint '{}': {e}", file.display());
        } else {
            tracing::debug!("Pruned checkpoint: step {oldest}");
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn fake_checkpoint(dir: &Path, step: usize) {
        fs::write(dir.join(format!("checkpoint_step_{step}.mpk.gz")), b"x").unwrap();
    }

    #[test]
    fn test_retention_window_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut steps = VecDeque::new();

        for step in [500, 1000, 1500, 2000, 2500] {
            fake_checkpoint(dir.path(), step);
            steps.push_back(step);
            prune_old_checkpoints(dir.path(), &mut steps, 3, None);
        }

        assert_eq!(steps, VecDeque::from([1500, 2000, 2500]));
        assert!(!dir.path().join("checkpoint_step_500.mpk.gz").exists());
        assert!(!dir.path().join("checkpoint_step_1000.mpk.gz").exists());
        assert!(dir.path().join("checkpoint_step_1500.mpk.gz").exists());
        assert!(dir.path().join("checkpoint_step_2500.mpk.gz").exists());
    }

    #[test]
    fn test_under_limit_prunes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut steps = VecDeque::from([500, 1000]);
        fake_checkpoint(dir.path(), 500);
        fake_checkpoint(dir.path(), 1000);

        prune_old_checkpoints(dir.path(), &mut steps, 3, None);

        assert_eq!(steps.len(), 2);
        assert!(dir.path().join("checkpoint_step_500.mpk.gz").exists());
    }

    #[test]
    fn test_best_checkpoint_survives_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let mut steps = VecDeque::new();

        for step in [500, 1000, 1500, 2000, 2500] {
            fake_checkpoint(dir.path(), step);
            steps.push_back(step);
            prune_old_checkpoints(dir.path(), &mut steps, 3, Some(500));
        }

        // Aged out of the window but kept on disk
        assert!(dir.path().join("checkpoint_step_500.mpk.gz").exists());
        assert!(!dir.path().join("checkpoint_step_1000.mpk.gz").exists());
        assert!(dir.path().join("checkpoint_step_2500.mpk.gz").exists());
    }
}
