// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one
// (and the tensor batching code in the data layer).
//
// What's in this layer:
//
//   model.rs     — The transformer text classifier:
//                  token + positional embeddings, stacked
//                  self-attention encoder blocks, masked mean
//                  pooling, and a linear classification head
//
//   trainer.rs   — The fine-tuning loop: step-based validation,
//                  weighted-F1 checkpoint selection, early
//                  stopping, and final test-set reporting
//
//   predictor.rs — The inference engine: loads the exported
//                  artifacts once and maps text → (label id,
//                  label name, confidence)
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use serde::{Deserialize, Serialize};

/// Transformer encoder classifier architecture
pub mod model;

/// Fine-tuning loop with validation, early stopping, checkpointing
pub mod trainer;

/// Inference engine — loads artifacts and classifies comments
pub mod predictor;

// ─── Device selection ─────────────────────────────────────────────────────────
/// Compute device choice, resolved to a concrete backend device
/// exactly once at construction time — the rest of the code only
/// ever sees the resolved device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Whatever the WGPU backend considers the best available device
    Auto,
    /// Force CPU execution
    Cpu,
    /// A specific discrete GPU by index
    Gpu(usize),
}

impl DeviceKind {
    /// Resolve the selection to a concrete WGPU device handle.
    pub fn resolve(&self) -> burn::backend::wgpu::WgpuDevice {
        use burn::backend::wgpu::WgpuDevice;
        match self {
            DeviceKind::Auto   => WgpuDevice::default(),
            DeviceKind::Cpu    => WgpuDevice::Cpu,
            DeviceKind::Gpu(i) => WgpuDevice::DiscreteGpu(*i),
        }
    }
}

impl Default for DeviceKind {
    fn default() -> Self {
        DeviceKind::Auto
    }
}
