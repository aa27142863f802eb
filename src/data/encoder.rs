// ============================================================
// Layer 4 — Text Encoder (Tokenization Adapter)
// ============================================================
// Wraps the subword tokenizer and produces the fixed-shape
// numeric view the model consumes:
//
//   [CLS] comment tokens [SEP] [PAD] [PAD] ...
//    └─────────── exactly max_length ids ───────────┘
//
// plus an attention mask with 1 for real tokens, 0 for padding.
//
// Both training and inference build their encodings through this
// one type, with the same special ids, the same padding side
// (right) and the same truncation side (right / tail) — encoding
// the same text with the same max_length is always byte-identical
// between the two paths.

use anyhow::Result;
use tokenizers::Tokenizer;

/// Fixed-shape encoding of one comment.
/// Both vectors have length exactly `max_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

/// Turns raw text into fixed-shape (input_ids, attention_mask) pairs.
pub struct TextEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
    cls_id:     u32,
    sep_id:     u32,
    pad_id:     u32,
}

impl TextEncoder {
    /// Wrap a tokenizer with a fixed maximum sequence length.
    /// Special token ids are resolved from the vocabulary once here,
    /// with the BERT-convention ids as fallback.
    pub fn new(tokenizer: Tokenizer, max_length: usize) -> Self {
        debug_assert!(max_length >= 2, "max_length must fit [CLS] and [SEP]");

        let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
        let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        Self {
            tokenizer,
            max_length,
            cls_id,
            sep_id,
            pad_id,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Encode one comment into exactly `max_length` token ids.
    ///
    /// Sequences longer than max_length are truncated from the tail
    /// (the head of the comment is kept, the final id is always
    /// [SEP]); shorter ones are padded on the right.
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        // [CLS] + comment ids, truncated so [SEP] always fits
        let mut input_ids = vec![self.cls_id];
        input_ids.extend_from_slice(enc.get_ids());
        input_ids.truncate(self.max_length - 1);
        input_ids.push(self.sep_id);

        // Attention mask: 1 for real tokens, 0 for padding
        let seq_len = input_ids.len();
        let mut attention_mask = vec![1u32; seq_len];

        while input_ids.len() < self.max_length {
            input_ids.push(self.pad_id);
            attention_mask.push(0);
        }

        Ok(EncodedText {
            input_ids,
            attention_mask,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn test_encoder(max_length: usize) -> TextEncoder {
        let dir = tempfile::tempdir().unwrap();
        let corpus: Vec<String> = [
            "you are such a nice person",
            "this is spam buy now",
            "what a hateful thing to say",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let store = TokenizerStore::new(dir.path().to_str().unwrap());
        let tokenizer = store.load_or_build(&corpus, 1000).unwrap();
        TextEncoder::new(tokenizer, max_length)
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = test_encoder(32);
        let a = encoder.encode("you are such a nice person").unwrap();
        let b = encoder.encode("you are such a nice person").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_shape_is_fixed() {
        let encoder = test_encoder(32);
        for text in ["nice", "this is spam buy now buy now buy now"] {
            let enc = encoder.encode(text).unwrap();
            assert_eq!(enc.input_ids.len(), 32);
            assert_eq!(enc.attention_mask.len(), 32);
        }
    }

    #[test]
    fn test_short_text_is_right_padded() {
        let encoder = test_encoder(16);
        let enc = encoder.encode("nice person").unwrap();

        let real: usize = enc.attention_mask.iter().sum::<u32>() as usize;
        assert!(real < 16);
        // Mask is a prefix of ones followed by zeros
        assert!(enc.attention_mask[..real].iter().all(|&m| m == 1));
        assert!(enc.attention_mask[real..].iter().all(|&m| m == 0));
        // Padded tail uses the [PAD] id
        assert!(enc.input_ids[real..].iter().all(|&id| id == enc.input_ids[15]));
    }

    #[test]
    fn test_long_text_is_tail_truncated() {
        let encoder = test_encoder(8);
        let long = "nice person spam now hateful thing say person nice spam".repeat(4);
        let enc = encoder.encode(&long).unwrap();

        assert_eq!(enc.input_ids.len(), 8);
        // No padding at all — every position is a real token
        assert!(enc.attention_mask.iter().all(|&m| m == 1));
    }
}
