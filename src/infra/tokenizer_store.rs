// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Manages tokenizer building, saving, and loading.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. The workable approach is to build the
// tokenizer JSON manually and load it back, bypassing the trainer
// type mismatch entirely.
//
// Three entry points:
//   load_or_build — training: reuse a saved tokenizer.json or
//                   build a fresh vocabulary from the corpus
//   load          — strict load from the model directory
//   load_or_fetch — inference: load from the model directory,
//                   falling back to downloading the pretrained
//                   identifier's tokenizer when the file is gone

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Special tokens reserve the BERT-convention ids
const SPECIAL_TOKENS: [(&str, usize); 5] = [
    ("[PAD]",  0),
    ("[UNK]",  1),
    ("[CLS]",  101),
    ("[SEP]",  102),
    ("[MASK]", 103),
];
const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Load an existing tokenizer or build a new one from texts
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        let tok_path = self.dir.join(TOKENIZER_FILE);
        if tok_path.exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load a previously saved tokenizer from its JSON file
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }

    /// Load the saved tokenizer, or fetch the pretrained fallback
    /// when the model directory carries no tokenizer.json.
    /// The fallback is logged so a stripped-down artifact directory
    /// is visible to operators.
    pub fn load_or_fetch(&self, fallback_model: &str) -> Result<Tokenizer> {
        let tok_path = self.dir.join(TOKENIZER_FILE);
        if tok_path.exists() {
            return self.load();
        }

        tracing::warn!(
            "No {TOKENIZER_FILE} in '{}' — fetching pretrained tokenizer '{}'",
            self.dir.display(),
            fallback_model,
        );
        Tokenizer::from_pretrained(fallback_model, None)
            .map_err(|e| anyhow::anyhow!(
                "Cannot fetch pretrained tokenizer '{fallback_model}': {e}"
            ))
    }

    /// Build a word-level vocabulary from the comment corpus and
    /// write a valid tokenizer JSON directly.
    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir).ok();

        // ── Step 1: Count word frequencies across the corpus ──────────────────
        use std::collections::HashMap;
        let mut freq: HashMap<String, usize> = HashMap::new();

        for text in texts {
            for word in text.split_whitespace() {
                // Lowercase and strip edge punctuation, matching the
                // BertNormalizer configured below
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Most frequent words first, capped so special tokens still fit
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let max_words = vocab_size.saturating_sub(SPECIAL_TOKENS.len());
        words.truncate(max_words);

        // ── Step 2: Build the vocab JSON object ───────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (token, id) in SPECIAL_TOKENS {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }

        let mut next_id = FIRST_WORD_ID;
        for (word, _) in &words {
            if !vocab.contains_key(word) {
                vocab.insert(word.clone(), serde_json::json!(next_id));
                next_id += 1;
            }
        }

        // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────
        // This format is what Tokenizer::from_file() expects
        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .map(|(token, id)| serde_json::json!({
                "id": id, "content": token,
                "single_word": false, "lstrip": false, "rstrip": false,
                "normalized": false, "special": true,
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let tok_path = self.dir.join(TOKENIZER_FILE);
        std::fs::write(
            &tok_path,
            serde_json::to_string_pretty(&tokenizer_json)?,
        ).with_context(|| "Cannot write tokenizer JSON")?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            next_id,
            tok_path.display(),
        );

        // Load back as a proper Tokenizer instance
        Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        ["nice day today", "spam spam buy now", "such a hateful remark"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_build_assigns_special_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_str().unwrap());

        let tokenizer = store.load_or_build(&corpus(), 1000).unwrap();

        assert_eq!(tokenizer.token_to_id("[PAD]"), Some(0));
        assert_eq!(tokenizer.token_to_id("[UNK]"), Some(1));
        assert_eq!(tokenizer.token_to_id("[CLS]"), Some(101));
        assert_eq!(tokenizer.token_to_id("[SEP]"), Some(102));
        // Corpus words land after the reserved range
        assert!(tokenizer.token_to_id("spam").unwrap() >= 104);
    }

    #[test]
    fn test_build_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_str().unwrap());

        let built = store.load_or_build(&corpus(), 1000).unwrap();
        // Second call must load the saved file, not rebuild
        let loaded = store.load_or_build(&corpus(), 1000).unwrap();

        let a = built.encode("spam buy now", false).unwrap();
        let b = loaded.encode("spam buy now", false).unwrap();
        assert_eq!(a.get_ids(), b.get_ids());
    }

    #[test]
    fn test_strict_load_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().to_str().unwrap());
        assert!(store.load().is_err());
    }
}
