// ============================================================
// Layer 4 — Comment Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<CommentSample>
// into device-ready tensors.
//
// Input:  Vec of N CommentSamples, each with sequences of length S
// Output: CommentBatch with tensors of shape [N, S] (+ labels [N])
//
// All sequences are already padded to the same length by the
// TextEncoder, so batching is a flatten-and-reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::CommentSample;

// ─── CommentBatch ─────────────────────────────────────────────────────────────
/// A batch of comments ready for the model forward pass.
/// All tensors have batch_size as their first dimension.
///
/// B is the Burn Backend (e.g. Wgpu, NdArray) —
/// generic so the same batcher works on any device.
#[derive(Debug, Clone)]
pub struct CommentBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Attention masks — shape: [batch_size, seq_len]
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Ground truth class ids — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── CommentBatcher ───────────────────────────────────────────────────────────
/// The batcher struct — holds the target device so tensors
/// are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct CommentBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> CommentBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, CommentSample, CommentBatch<B>> for CommentBatcher<B> {
    /// Convert a Vec of CommentSamples into a single CommentBatch.
    fn batch(&self, items: Vec<CommentSample>, _device: &B::Device) -> CommentBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len = items[0].input_ids.len();

        // Flatten Vec<Vec<u32>> to Vec<i32> (Burn uses i32 for Int tensors)
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        // Class ids are scalar values per sample, not sequences
        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device,
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device,
        ).reshape([batch_size, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(
            labels.as_slice(), &self.device,
        );

        CommentBatch {
            input_ids,
            attention_mask,
            labels,
        }
    }
}
