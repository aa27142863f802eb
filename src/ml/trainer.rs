// ============================================================
// Layer 5 — Fine-tuning Loop
// ============================================================
// Step-based training with periodic validation rounds:
//
//   Initialized → Training → Evaluating ⇄ (loop)
//       → Stopped{EarlyStop | EpochsExhausted} → best model
//
// Every `eval_steps` optimiser steps the model is evaluated on
// the validation set. Weighted-F1 is the model-selection metric:
// the checkpoint with the highest weighted-F1 seen so far is the
// one exported at the end, not the last one. Three evaluation
// rounds without improvement stop the run early.
//
// Key Burn 0.20 insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns model on MyInnerBackend (Wgpu)
//   - Validation batcher must also use MyInnerBackend
//   - argmax(1) returns [batch,1] so we flatten before reading
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::Result;
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{CommentBatch, CommentBatcher},
    dataset::CommentDataset,
};
use crate::domain::labels::LabelMap;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{self, EvalRecord, MetricsLogger};
use crate::ml::model::{TextClassifier, TextClassifierConfig};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Stop after this many evaluation rounds without improvement
const EARLY_STOPPING_PATIENCE: usize = 3;

/// Log the running training loss every this many steps
const LOG_STEPS: usize = 100;

/// Why the training loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The tracked metric stopped improving
    EarlyStop,
    /// All configured epochs completed
    EpochsExhausted,
}

/// Summary of a finished training run
#[derive(Debug, Clone, Copy)]
pub struct TrainOutcome {
    pub best_step:       usize,
    pub best_f1_weighted: f64,
    pub stop:            StopReason,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: CommentDataset,
    val_dataset:   CommentDataset,
    test_dataset:  CommentDataset,
    ckpt_manager:  CheckpointManager,
    labels:        &LabelMap,
) -> Result<TrainOutcome> {
    let device = cfg.device.resolve();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, train_dataset, val_dataset, test_dataset, ckpt_manager, labels, device)
}

fn train_loop(
    cfg:              &TrainConfig,
    train_dataset:    CommentDataset,
    val_dataset:      CommentDataset,
    test_dataset:     CommentDataset,
    mut ckpt_manager: CheckpointManager,
    labels:           &LabelMap,
    device:           burn::backend::wgpu::WgpuDevice,
) -> Result<TrainOutcome> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TextClassifierConfig::new(
        cfg.vocab_size, cfg.max_length, cfg.d_model,
        cfg.num_heads, cfg.num_layers, cfg.d_ff, cfg.dropout,
        labels.num_labels(),
    );
    let mut model: TextClassifier<MyBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} classes",
        cfg.num_layers, cfg.d_model, labels.num_labels(),
    );

    // ── Adam optimiser with L2 weight decay ───────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)));
    let mut optim = optim_cfg.init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = CommentBatcher::<MyBackend>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation / test loaders (InnerBackend — no autodiff overhead) ───────
    let val_batcher = CommentBatcher::<MyInnerBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let test_batcher = CommentBatcher::<MyInnerBackend>::new(device.clone());
    let test_loader  = DataLoaderBuilder::new(test_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(test_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.root())?;

    // ── Step loop with periodic evaluation rounds ─────────────────────────────
    let mut global_step   = 0usize;
    let mut log_loss_sum  = 0.0f64;
    let mut log_batches   = 0usize;
    let mut eval_loss_sum = 0.0f64;
    let mut eval_batches  = 0usize;

    let mut best_step    = 0usize;
    let mut best_f1      = f64::NEG_INFINITY;
    let mut stale_rounds = 0usize;
    let mut stop_reason  = StopReason::EpochsExhausted;

    'training: for epoch in 1..=cfg.num_epochs {
        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            log_loss_sum  += loss_val;
            log_batches   += 1;
            eval_loss_sum += loss_val;
            eval_batches  += 1;

            // Backward pass + Adam update with warmed-up learning rate
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            let lr    = warmup_lr(cfg.learning_rate, global_step, cfg.warmup_steps);
            model = optim.step(lr, model, grads);
            global_step += 1;

            if global_step % LOG_STEPS == 0 {
                tracing::info!(
                    "epoch {:>2}/{} | step {:>6} | train_loss={:.4}",
                    epoch, cfg.num_epochs, global_step,
                    log_loss_sum / log_batches as f64,
                );
                log_loss_sum = 0.0;
                log_batches  = 0;
            }

            // ── Evaluation round ──────────────────────────────────────────────
            if global_step % cfg.eval_steps == 0 {
                let train_loss = eval_loss_sum / eval_batches.max(1) as f64;
                eval_loss_sum = 0.0;
                eval_batches  = 0;

                let record = evaluation_round(
                    &model, &val_loader, global_step, train_loss,
                    &metrics_logger, &mut ckpt_manager,
                )?;

                if record.is_improvement(best_f1) {
                    best_f1   = record.f1_weighted;
                    best_step = global_step;
                    stale_rounds = 0;
                    ckpt_manager.mark_best(global_step);
                } else {
                    stale_rounds += 1;
                    tracing::info!(
                        "No improvement for {stale_rounds} evaluation round(s) \
                         (best f1_weighted={best_f1:.4} @ step {best_step})",
                    );
                }

                if stale_rounds >= EARLY_STOPPING_PATIENCE {
                    stop_reason = StopReason::EarlyStop;
                    break 'training;
                }
            }
        }
    }

    // A run shorter than eval_steps (or one ending mid-interval) still
    // needs a final round so a best checkpoint exists to export
    if stop_reason == StopReason::EpochsExhausted && global_step % cfg.eval_steps != 0 {
        let train_loss = eval_loss_sum / eval_batches.max(1) as f64;
        let record = evaluation_round(
            &model, &val_loader, global_step, train_loss,
            &metrics_logger, &mut ckpt_manager,
        )?;
        if record.is_improvement(best_f1) {
            best_f1   = record.f1_weighted;
            best_step = global_step;
            ckpt_manager.mark_best(global_step);
        }
    }

    match stop_reason {
        StopReason::EarlyStop => tracing::info!(
            "Early stopping at step {global_step}: no improvement for \
             {EARLY_STOPPING_PATIENCE} evaluation rounds",
        ),
        StopReason::EpochsExhausted => tracing::info!(
            "All {} epochs completed at step {global_step}", cfg.num_epochs,
        ),
    }

    // ── Restore the best checkpoint — it becomes the final model ──────────────
    tracing::info!("Best checkpoint: step {best_step} (f1_weighted={best_f1:.4})");
    let best_model =
        ckpt_manager.load_step::<MyBackend>(model_cfg.init(&device), best_step, &device)?;

    // ── Final test-set evaluation ─────────────────────────────────────────────
    tracing::info!("Evaluating on test set...");
    let test_model = best_model.valid();
    let (test_loss, preds, targets) = run_validation(&test_model, &test_loader)?;
    let test_metrics = metrics::compute_metrics(&preds, &targets);
    tracing::info!(
        "Test results: loss={:.4} accuracy={:.4} f1_macro={:.4} f1_weighted={:.4}",
        test_loss, test_metrics.accuracy, test_metrics.f1_macro, test_metrics.f1_weighted,
    );
    tracing::info!(
        "\nClassification Report:\n{}",
        metrics::classification_report(&preds, &targets, labels),
    );

    // ── Export the best model as the final artifact ───────────────────────────
    ckpt_manager.export_model(&best_model)?;
    tracing::info!("Training complete!");

    Ok(TrainOutcome {
        best_step,
        best_f1_weighted: best_f1,
        stop: stop_reason,
    })
}

/// Validate, log, and checkpoint the current model state.
fn evaluation_round(
    model:          &TextClassifier<MyBackend>,
    val_loader:     &Arc<dyn DataLoader<MyInnerBackend, CommentBatch<MyInnerBackend>>>,
    step:           usize,
    train_loss:     f64,
    metrics_logger: &MetricsLogger,
    ckpt_manager:   &mut CheckpointManager,
) -> Result<EvalRecord> {
    // model.valid() → TextClassifier<MyInnerBackend>
    // dropout disabled for deterministic evaluation
    let model_valid = model.valid();
    let (val_loss, preds, targets) = run_validation(&model_valid, val_loader)?;

    let eval   = metrics::compute_metrics(&preds, &targets);
    let record = EvalRecord::new(step, train_loss, val_loss, eval);
    metrics_logger.log(&record)?;

    tracing::info!(
        "eval @ step {:>6} | train_loss={:.4} val_loss={:.4} | \
         accuracy={:.4} f1_macro={:.4} f1_weighted={:.4}",
        step, train_loss, val_loss, eval.accuracy, eval.f1_macro, eval.f1_weighted,
    );

    ckpt_manager.save_step(model, step)?;
    Ok(record)
}

/// Average loss plus flat predicted/true label columns over a loader.
fn run_validation(
    model:  &TextClassifier<MyInnerBackend>,
    loader: &Arc<dyn DataLoader<MyInnerBackend, CommentBatch<MyInnerBackend>>>,
) -> Result<(f64, Vec<usize>, Vec<usize>)> {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut preds    = Vec::new();
    let mut targets  = Vec::new();

    for batch in loader.iter() {
        let labels = batch.labels.clone();
        let logits = model.forward(batch.input_ids, batch.attention_mask);

        let ce = burn::nn::loss::CrossEntropyLossConfig::new()
            .init(&logits.device());
        let loss: f64 = ce
            .forward(logits.clone(), labels.clone())
            .into_scalar()
            .elem::<f64>();
        loss_sum += loss;
        batches  += 1;

        // argmax(1) returns shape [batch, 1] — flatten to [batch]
        let pred = logits.argmax(1).flatten::<1>(0, 1);
        let pred_vec: Vec<i32> = pred
            .into_data()
            .to_vec::<i32>()
            .map_err(|e| anyhow::anyhow!("Cannot read predictions: {e:?}"))?;
        let label_vec: Vec<i32> = labels
            .into_data()
            .to_vec::<i32>()
            .map_err(|e| anyhow::anyhow!("Cannot read labels: {e:?}"))?;

        preds.extend(pred_vec.into_iter().map(|x| x as usize));
        targets.extend(label_vec.into_iter().map(|x| x as usize));
    }

    let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    Ok((avg_loss, preds, targets))
}

/// Linear learning-rate warmup from zero over `warmup_steps`,
/// constant at `base` afterwards.
fn warmup_lr(base: f64, step: usize, warmup_steps: usize) -> f64 {
    if warmup_steps == 0 || step >= warmup_steps {
        base
    } else {
        base * (step + 1) as f64 / warmup_steps as f64
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_ramps_linearly() {
        let base = 2e-5;
        assert!((warmup_lr(base, 0, 500) - base / 500.0).abs() < 1e-12);
        assert!((warmup_lr(base, 249, 500) - base * 0.5).abs() < 1e-12);
        assert!((warmup_lr(base, 499, 500) - base).abs() < 1e-12);
    }

    #[test]
    fn test_warmup_is_constant_after_ramp() {
        let base = 2e-5;
        assert_eq!(warmup_lr(base, 500, 500), base);
        assert_eq!(warmup_lr(base, 10_000, 500), base);
    }

    #[test]
    fn test_zero_warmup_is_identity() {
        assert_eq!(warmup_lr(3e-4, 0, 0), 3e-4);
    }
}
