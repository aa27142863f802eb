// ============================================================
// Layer 5 — Inference Predictor
// ============================================================
// Loads the exported model, tokenizer and label registry once,
// then maps comment text → (label id, label name, confidence).
//
// The predictor is an explicit owned object: construction either
// succeeds with everything loaded, or the caller gets an error.
// An `unloaded()` predictor exists for degraded setups — every
// predict call on it fails with ModelNotLoaded rather than
// touching a half-initialised model.
//
// `predict` takes &self and mutates nothing, so one loaded
// predictor can be shared by reference across concurrent
// read-only callers.

use anyhow::Result;
use burn::prelude::*;
use thiserror::Error;
use tokenizers::Tokenizer;

use crate::data::encoder::TextEncoder;
use crate::domain::labels::LabelMap;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{TextClassifier, TextClassifierConfig};
use crate::ml::DeviceKind;

type InferBackend = burn::backend::Wgpu;

/// One classification result
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label_id:   usize,
    pub label_name: String,
    /// The model's probability for the predicted class, in [0, 1]
    pub confidence: f32,
}

/// Errors surfaced by `predict`. Input problems and configuration
/// problems are distinct variants so callers can map them to
/// different responses.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The text is empty or whitespace-only — never sent to the model
    #[error("input text is empty")]
    EmptyInput,

    /// `predict` was called on a predictor that never finished loading
    #[error("model is not loaded — train first or point at a valid model directory")]
    ModelNotLoaded,

    /// The tokenizer rejected the input
    #[error("tokenisation failed: {0}")]
    Tokenize(String),

    /// The model forward pass failed
    #[error("inference failed: {0}")]
    Inference(String),
}

// ─── The scoring seam ─────────────────────────────────────────────────────────
/// The model side of the predictor: encoded input → probability
/// distribution over classes. The predictor owns everything else
/// (validation, encoding, label decoding), so tests can swap in a
/// fixed-output scorer without a trained model.
pub trait ClassScorer {
    fn class_probabilities(
        &self,
        input_ids:      &[u32],
        attention_mask: &[u32],
    ) -> Result<Vec<f32>, PredictError>;
}

/// The real scorer: runs the fine-tuned transformer and softmaxes
/// its logits.
pub struct ModelScorer {
    model:  TextClassifier<InferBackend>,
    device: burn::backend::wgpu::WgpuDevice,
}

impl ModelScorer {
    pub fn new(model: TextClassifier<InferBackend>, device: burn::backend::wgpu::WgpuDevice) -> Self {
        Self { model, device }
    }
}

impl ClassScorer for ModelScorer {
    fn class_probabilities(
        &self,
        input_ids:      &[u32],
        attention_mask: &[u32],
    ) -> Result<Vec<f32>, PredictError> {
        let input_flat: Vec<i32> = input_ids.iter().map(|&x| x as i32).collect();
        let mask_flat:  Vec<i32> = attention_mask.iter().map(|&x| x as i32).collect();

        // [seq_len] → [1, seq_len]
        let input = Tensor::<InferBackend, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device,
        ).unsqueeze::<2>();
        let mask = Tensor::<InferBackend, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device,
        ).unsqueeze::<2>();

        let logits = self.model.forward(input, mask); // [1, num_labels]
        let probs  = burn::tensor::activation::softmax(logits, 1);

        probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PredictError::Inference(format!("{e:?}")))
    }
}

// ─── Predictor ────────────────────────────────────────────────────────────────
struct LoadedPredictor<S> {
    scorer:  S,
    encoder: TextEncoder,
    labels:  LabelMap,
}

/// Classifies comments through a loaded scorer. Generic over the
/// scorer so the decision logic is testable with a stub model.
pub struct Predictor<S = ModelScorer> {
    inner: Option<LoadedPredictor<S>>,
}

impl Predictor<ModelScorer> {
    /// Build a fully loaded predictor from an artifact directory.
    /// Any missing or corrupt artifact fails construction — a
    /// predictor is never silently left half-loaded.
    pub fn from_artifacts(
        ckpt_manager: &CheckpointManager,
        tokenizer:    Tokenizer,
        device_kind:  DeviceKind,
    ) -> Result<Self> {
        let device = device_kind.resolve();
        let cfg    = ckpt_manager.load_config()?;
        let labels = LabelMap::load_or_default(ckpt_manager.root());

        let model_cfg = TextClassifierConfig::new(
            cfg.vocab_size, cfg.max_length, cfg.d_model,
            cfg.num_heads, cfg.num_layers, cfg.d_ff, 0.0,
            labels.num_labels(),
        );
        let model: TextClassifier<InferBackend> = model_cfg.init(&device);
        let model = ckpt_manager.load_exported(model, &device)?;
        tracing::info!(
            "Model loaded from '{}' on device {:?}",
            ckpt_manager.root().display(),
            device,
        );

        let encoder = TextEncoder::new(tokenizer, cfg.max_length);
        Ok(Self::new(ModelScorer::new(model, device), encoder, labels))
    }
}

impl<S: ClassScorer> Predictor<S> {
    pub fn new(scorer: S, encoder: TextEncoder, labels: LabelMap) -> Self {
        Self {
            inner: Some(LoadedPredictor { scorer, encoder, labels }),
        }
    }

    /// A predictor with nothing behind it. Every `predict` call
    /// fails with ModelNotLoaded.
    pub fn unloaded() -> Self {
        Self { inner: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_some()
    }

    /// Classify one comment.
    ///
    /// The top class is the argmax of the probability distribution;
    /// on an exact tie the lowest class index wins. A predicted
    /// index missing from the label registry yields the name
    /// "unknown" rather than an error.
    pub fn predict(&self, text: &str) -> Result<Prediction, PredictError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PredictError::EmptyInput);
        }

        let loaded = self.inner.as_ref().ok_or(PredictError::ModelNotLoaded)?;

        let encoded = loaded
            .encoder
            .encode(trimmed)
            .map_err(|e| PredictError::Tokenize(e.to_string()))?;

        let probs = loaded
            .scorer
            .class_probabilities(&encoded.input_ids, &encoded.attention_mask)?;
        if probs.is_empty() {
            return Err(PredictError::Inference("empty class distribution".into()));
        }

        // argmax with first-index-wins tie breaking
        let mut label_id   = 0usize;
        let mut confidence = probs[0];
        for (i, &p) in probs.iter().enumerate().skip(1) {
            if p > confidence {
                label_id   = i;
                confidence = p;
            }
        }

        let label_name = loaded.labels.name_or_unknown(label_id);

        tracing::debug!(
            "predict: label={label_id} ({label_name}) confidence={confidence:.4}",
        );

        Ok(Prediction {
            label_id,
            label_name,
            confidence,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    /// A scorer that always returns the same distribution.
    struct StubScorer {
        probs: Vec<f32>,
    }

    impl ClassScorer for StubScorer {
        fn class_probabilities(
            &self,
            _input_ids:      &[u32],
            _attention_mask: &[u32],
        ) -> Result<Vec<f32>, PredictError> {
            Ok(self.probs.clone())
        }
    }

    fn test_encoder() -> TextEncoder {
        let dir = tempfile::tempdir().unwrap();
        let corpus: Vec<String> = ["some text to classify", "another comment"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let store = TokenizerStore::new(dir.path().to_str().unwrap());
        let tokenizer = store.load_or_build(&corpus, 1000).unwrap();
        TextEncoder::new(tokenizer, 32)
    }

    fn stub_predictor(probs: Vec<f32>) -> Predictor<StubScorer> {
        Predictor::new(StubScorer { probs }, test_encoder(), LabelMap::default())
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let predictor = stub_predictor(vec![1.0, 0.0, 0.0, 0.0]);
        assert!(matches!(predictor.predict(""), Err(PredictError::EmptyInput)));
        assert!(matches!(predictor.predict("   "), Err(PredictError::EmptyInput)));
    }

    #[test]
    fn test_unloaded_predictor_is_rejected() {
        let predictor = Predictor::<StubScorer>::unloaded();
        assert!(!predictor.is_loaded());
        assert!(matches!(
            predictor.predict("some text"),
            Err(PredictError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_predicts_top_class_with_confidence() {
        let predictor = stub_predictor(vec![0.05, 0.05, 0.87, 0.03]);
        let p = predictor.predict("some text").unwrap();

        assert_eq!(p.label_id, 2);
        assert_eq!(p.label_name, "hateful");
        assert!((p.confidence - 0.87).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_class_id_gets_sentinel_name() {
        // Six outputs against a four-entry registry
        let predictor = stub_predictor(vec![0.0, 0.1, 0.0, 0.1, 0.0, 0.8]);
        let p = predictor.predict("some text").unwrap();

        assert_eq!(p.label_id, 5);
        assert_eq!(p.label_name, "unknown");
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let predictor = stub_predictor(vec![0.4, 0.4, 0.1, 0.1]);
        let p = predictor.predict("some text").unwrap();
        assert_eq!(p.label_id, 0);
        assert_eq!(p.label_name, "normal");
    }
}
