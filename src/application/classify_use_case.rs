// ============================================================
// Layer 2 — Classify Use Case
// ============================================================
// Assembles the inference path: resolve the tokenizer, rebuild
// the model from its saved config, load the exported weights and
// label registry, and expose the narrow classify(text) contract.
//
// Everything is loaded exactly once, in the constructor. A failed
// load fails construction — callers never hold a half-initialised
// classifier.

use anyhow::Result;

use crate::domain::traits::CommentClassifier;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::predictor::{ModelScorer, PredictError, Prediction, Predictor};
use crate::ml::DeviceKind;

pub struct ClassifyUseCase {
    predictor: Predictor<ModelScorer>,
}

impl ClassifyUseCase {
    /// Load all artifacts from `model_dir`. The tokenizer falls
    /// back to the pretrained `model_name` when the directory
    /// carries no tokenizer.json of its own.
    pub fn new(model_dir: String, model_name: String, device: DeviceKind) -> Result<Self> {
        let tok_store = TokenizerStore::new(&model_dir);
        let tokenizer = tok_store.load_or_fetch(&model_name)?;

        let ckpt_manager = CheckpointManager::new(&model_dir);
        let predictor = Predictor::from_artifacts(&ckpt_manager, tokenizer, device)?;

        Ok(Self { predictor })
    }
}

impl CommentClassifier for ClassifyUseCase {
    fn classify(&self, text: &str) -> Result<Prediction, PredictError> {
        self.predictor.predict(text)
    }
}
