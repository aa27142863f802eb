use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::TextEncoder;
use crate::data::splitter::SplitPart;

/// One fully tokenised and padded training sample.
/// Sequence format: [CLS] comment [SEP] [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

pub struct CommentDataset {
    samples: Vec<CommentSample>,
}

impl CommentDataset {
    pub fn new(samples: Vec<CommentSample>) -> Self {
        Self { samples }
    }

    /// Encode one split's texts into model-ready samples.
    pub fn from_split(part: &SplitPart, encoder: &TextEncoder) -> Result<Self> {
        let mut samples = Vec::with_capacity(part.len());
        for (text, &label) in part.texts.iter().zip(part.labels.iter()) {
            let enc = encoder.encode(text)?;
            samples.push(CommentSample {
                input_ids:      enc.input_ids,
                attention_mask: enc.attention_mask,
                label,
            });
        }
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// True labels in dataset order — used for test-set reporting.
    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

impl Dataset<CommentSample> for CommentDataset {
    fn get(&self, index: usize) -> Option<CommentSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: usize) -> CommentSample {
        CommentSample {
            input_ids:      vec![101, 7, 102, 0],
            attention_mask: vec![1, 1, 1, 0],
            label,
        }
    }

    #[test]
    fn test_dataset_get_and_len() {
        let dataset = CommentDataset::new(vec![sample(0), sample(2)]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(1).unwrap().label, 2);
        assert!(dataset.get(2).is_none());
        assert_eq!(dataset.labels(), vec![0, 2]);
    }
}
