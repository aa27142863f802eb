// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `classify`
// and all their configurable flags.
//
// clap's derive macros generate help text, error messages for
// missing args, and type conversion (string → usize, f64, etc.).

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::DeviceKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the comment classifier on labelled JSONL data
    Train(TrainArgs),

    /// Classify a single comment using a trained model
    Classify(ClassifyArgs),
}

/// Compute device selection, resolved once at startup.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DeviceArg {
    /// Let the backend pick the best available device
    Auto,
    /// Force CPU execution
    Cpu,
    /// First discrete GPU
    Gpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Auto => DeviceKind::Auto,
            DeviceArg::Cpu  => DeviceKind::Cpu,
            DeviceArg::Gpu  => DeviceKind::Gpu(0),
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the labelled JSONL data file
    /// (one {"free_text": ..., "label_id": ...} object per line)
    #[arg(long)]
    pub data_path: String,

    /// Directory to save the trained model, tokenizer and label map
    #[arg(long, default_value = "./model_storage")]
    pub output_dir: String,

    /// Pretrained model identifier — pins the tokenizer vocabulary
    #[arg(long, default_value = "vinai/phobert-base")]
    pub model_name: String,

    /// Maximum number of tokens per encoded comment
    /// Format: [CLS] comment [SEP] + padding
    #[arg(long, default_value_t = 256)]
    pub max_length: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 5)]
    pub num_epochs: usize,

    /// Peak learning rate after warmup
    #[arg(long, default_value_t = 2e-5)]
    pub learning_rate: f64,

    /// Steps of linear learning-rate warmup from zero
    #[arg(long, default_value_t = 500)]
    pub warmup_steps: usize,

    /// L2 weight decay applied by the optimiser
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Fraction of the data held out as the test set
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Fraction of the remaining data held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_size: f64,

    /// Run a validation round every this many optimiser steps
    #[arg(long, default_value_t = 500)]
    pub eval_steps: usize,

    /// Seed for the stratified split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Hidden dimension of the transformer encoder
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// Number of attention heads — d_model must be divisible by this
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Number of stacked encoder layers
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Dropout probability during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Maximum tokenizer vocabulary size
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:     a.data_path,
            output_dir:    a.output_dir,
            model_name:    a.model_name,
            max_length:    a.max_length,
            batch_size:    a.batch_size,
            num_epochs:    a.num_epochs,
            learning_rate: a.learning_rate,
            warmup_steps:  a.warmup_steps,
            weight_decay:  a.weight_decay,
            test_size:     a.test_size,
            val_size:      a.val_size,
            eval_steps:    a.eval_steps,
            seed:          a.seed,
            device:        a.device.into(),
            d_model:       a.d_model,
            num_heads:     a.num_heads,
            num_layers:    a.num_layers,
            d_ff:          a.d_ff,
            dropout:       a.dropout,
            vocab_size:    a.vocab_size,
        }
    }
}

/// All arguments for the `classify` command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// The comment text to classify
    #[arg(long)]
    pub text: String,

    /// Directory where the trained model was saved
    #[arg(long, default_value = "./model_storage")]
    pub model_dir: String,

    /// Fallback pretrained identifier used to fetch the tokenizer
    /// when tokenizer.json is missing from --model-dir
    #[arg(long, default_value = "vinai/phobert-base")]
    pub model_name: String,

    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,
}
