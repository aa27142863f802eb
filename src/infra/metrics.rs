// ============================================================
// Layer 6 — Metrics Evaluator and Logger
// ============================================================
// Computes the classification metrics used for model selection
// (accuracy, macro-F1, weighted-F1) and writes one CSV row per
// evaluation round so a training run leaves a readable history.
//
// F1 conventions:
//   - per-class F1 is 2·P·R/(P+R), with 0 whenever a denominator
//     is 0 (zero-division-safe)
//   - macro-F1 averages classes that appear in the targets or in
//     the predictions, each with equal weight
//   - weighted-F1 weights each class's F1 by its target support
//
// Output file: <output_dir>/metrics.csv
//
// Example CSV output:
//   step,train_loss,val_loss,accuracy,f1_macro,f1_weighted
//   500,1.204500,1.089200,0.423000,0.318000,0.402000
//   1000,0.890100,0.854300,0.584000,0.472000,0.561000

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

use crate::domain::labels::LabelMap;

// ─── Metric computation ───────────────────────────────────────────────────────

/// The evaluation summary for one prediction/target pairing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub accuracy:    f64,
    pub f1_macro:    f64,
    pub f1_weighted: f64,
}

/// Per-class precision/recall/F1 with its target support
#[derive(Debug, Clone, Copy)]
struct ClassScores {
    precision: f64,
    recall:    f64,
    f1:        f64,
    support:   usize,
    predicted: usize,
}

/// Count-based scores for every class id up to the largest seen.
fn per_class_scores(predictions: &[usize], targets: &[usize]) -> Vec<ClassScores> {
    debug_assert_eq!(predictions.len(), targets.len());

    let num_classes = predictions
        .iter()
        .chain(targets.iter())
        .max()
        .map_or(0, |&m| m + 1);

    let mut tp = vec![0usize; num_classes];
    let mut fp = vec![0usize; num_classes];
    let mut fn_ = vec![0usize; num_classes];

    for (&pred, &truth) in predictions.iter().zip(targets.iter()) {
        if pred == truth {
            tp[pred] += 1;
        } else {
            fp[pred] += 1;
            fn_[truth] += 1;
        }
    }

    (0..num_classes)
        .map(|c| {
            let support   = tp[c] + fn_[c];
            let predicted = tp[c] + fp[c];
            let precision = safe_div(tp[c] as f64, predicted as f64);
            let recall    = safe_div(tp[c] as f64, support as f64);
            let f1        = safe_div(2.0 * precision * recall, precision + recall);
            ClassScores { precision, recall, f1, support, predicted }
        })
        .collect()
}

fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Accuracy, macro-F1 and weighted-F1 over equal-length
/// prediction and target columns.
pub fn compute_metrics(predictions: &[usize], targets: &[usize]) -> EvalMetrics {
    let total = targets.len();
    if total == 0 {
        return EvalMetrics { accuracy: 0.0, f1_macro: 0.0, f1_weighted: 0.0 };
    }

    let correct = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(p, t)| p == t)
        .count();

    let scores = per_class_scores(predictions, targets);

    // Classes that never occur in either column carry no signal and
    // are excluded from the macro average
    let present: Vec<&ClassScores> = scores
        .iter()
        .filter(|s| s.support > 0 || s.predicted > 0)
        .collect();

    let f1_macro = if present.is_empty() {
        0.0
    } else {
        present.iter().map(|s| s.f1).sum::<f64>() / present.len() as f64
    };

    let f1_weighted = scores
        .iter()
        .map(|s| s.f1 * s.support as f64)
        .sum::<f64>()
        / total as f64;

    EvalMetrics {
        accuracy: correct as f64 / total as f64,
        f1_macro,
        f1_weighted,
    }
}

/// Render a per-class report with 4-digit precision, one row per
/// registry label plus an accuracy footer.
pub fn classification_report(
    predictions: &[usize],
    targets:     &[usize],
    registry:    &LabelMap,
) -> String {
    let scores  = per_class_scores(predictions, targets);
    let metrics = compute_metrics(predictions, targets);

    let mut out = String::new();
    out.push_str(&format!(
        "{:>12}  {:>9}  {:>9}  {:>9}  {:>8}\n",
        "", "precision", "recall", "f1-score", "support",
    ));

    for (id, name) in registry.iter() {
        let s = scores.get(id).copied().unwrap_or(ClassScores {
            precision: 0.0,
            recall:    0.0,
            f1:        0.0,
            support:   0,
            predicted: 0,
        });
        out.push_str(&format!(
            "{name:>12}  {:>9.4}  {:>9.4}  {:>9.4}  {:>8}\n",
            s.precision, s.recall, s.f1, s.support,
        ));
    }

    out.push_str(&format!(
        "\n{:>12}  {:>9}  {:>9}  {:>9.4}  {:>8}\n",
        "accuracy", "", "", metrics.accuracy, targets.len(),
    ));
    out
}

// ─── Evaluation history CSV ───────────────────────────────────────────────────

/// One row of metrics data for a single evaluation round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Global optimiser step at which this evaluation ran
    pub step: usize,

    /// Average training loss since the previous evaluation round
    pub train_loss: f64,

    /// Average cross-entropy loss on the validation set
    pub val_loss: f64,

    /// Validation accuracy in [0.0, 1.0]
    pub accuracy: f64,

    /// Validation macro-F1
    pub f1_macro: f64,

    /// Validation weighted-F1 — the model-selection criterion
    pub f1_weighted: f64,
}

impl EvalRecord {
    pub fn new(step: usize, train_loss: f64, val_loss: f64, metrics: EvalMetrics) -> Self {
        Self {
            step,
            train_loss,
            val_loss,
            accuracy:    metrics.accuracy,
            f1_macro:    metrics.f1_macro,
            f1_weighted: metrics.f1_weighted,
        }
    }

    /// True when this round beats the previous best weighted-F1
    pub fn is_improvement(&self, best_f1_weighted: f64) -> bool {
        self.f1_weighted > best_f1_weighted
    }
}

/// Appends evaluation rounds to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Write the header only if the file is new, so reruns append
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,train_loss,val_loss,accuracy,f1_macro,f1_weighted")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one evaluation round as a new CSV row.
    pub fn log(&self, r: &EvalRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            r.step, r.train_loss, r.val_loss, r.accuracy, r.f1_macro, r.f1_weighted,
        )?;

        tracing::debug!(
            "Logged step {} metrics: val_loss={:.4}, f1_weighted={:.4}",
            r.step, r.val_loss, r.f1_weighted,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_metrics_match_hand_computed_values() {
        // class 0: P=1, R=2/3, F1=0.8  class 1: P=0.5, R=1, F1=2/3
        let m = compute_metrics(&[0, 1, 1, 0], &[0, 1, 0, 0]);

        assert!(close(m.accuracy, 0.75));
        assert!(close(m.f1_macro, 11.0 / 15.0));
        assert!(close(m.f1_weighted, 23.0 / 30.0));
    }

    #[test]
    fn test_perfect_predictions() {
        let m = compute_metrics(&[0, 1, 2, 3], &[0, 1, 2, 3]);
        assert!(close(m.accuracy, 1.0));
        assert!(close(m.f1_macro, 1.0));
        assert!(close(m.f1_weighted, 1.0));
    }

    #[test]
    fn test_zero_division_is_safe() {
        // Class 1 is predicted but never true; class 0 is true but
        // never predicted — every denominator edge case at once
        let m = compute_metrics(&[1, 1], &[0, 0]);
        assert!(close(m.accuracy, 0.0));
        assert!(close(m.f1_macro, 0.0));
        assert!(close(m.f1_weighted, 0.0));
    }

    #[test]
    fn test_empty_input() {
        let m = compute_metrics(&[], &[]);
        assert!(close(m.accuracy, 0.0));
    }

    #[test]
    fn test_report_names_every_label() {
        let registry = crate::domain::labels::LabelMap::default();
        let report = classification_report(&[0, 1, 2, 0], &[0, 1, 2, 3], &registry);

        for name in ["normal", "offensive", "hateful", "spam", "accuracy"] {
            assert!(report.contains(name), "missing '{name}' in:\n{report}");
        }
    }

    #[test]
    fn test_is_improvement() {
        let metrics = EvalMetrics { accuracy: 0.8, f1_macro: 0.7, f1_weighted: 0.75 };
        let r = EvalRecord::new(500, 1.2, 1.1, metrics);
        assert!(r.is_improvement(0.70));
        assert!(!r.is_improvement(0.80));
        assert!(!r.is_improvement(0.75));
    }

    #[test]
    fn test_logger_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();

        let metrics = EvalMetrics { accuracy: 0.5, f1_macro: 0.4, f1_weighted: 0.45 };
        logger.log(&EvalRecord::new(500, 1.0, 0.9, metrics)).unwrap();
        logger.log(&EvalRecord::new(1000, 0.8, 0.7, metrics)).unwrap();

        let contents = std::fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("step,"));
        assert!(lines[1].starts_with("500,"));
        assert!(lines[2].starts_with("1000,"));
    }
}
