// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Wraps the pretrained `tokenizer.json` shipped with every
// Hugging Face model so training, evaluation and prediction all
// tokenise identically:
//
//   encode()        — special tokens added, truncated to max_len
//                     (pair training pads per batch later)
//   encode_padded() — additionally padded to exactly max_len
//                     with the tokenizer's pad id, mask 0
//
// The same tokenizer.json is copied into every saved artifact.
//
// Reference: Hugging Face tokenizers (Rust) documentation

use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

use crate::data::dataset::EncodedText;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    tokenizer: Tokenizer,
    max_len:   usize,
    pad_id:    u32,
}

impl TokenizerStore {
    /// Load a tokenizer.json and configure truncation at `max_len`.
    pub fn from_file(path: &Path, max_len: usize) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Self::new(tokenizer, max_len)
    }

    pub fn new(mut tokenizer: Tokenizer, max_len: usize) -> Result<Self> {
        if max_len == 0 {
            anyhow::bail!("max_len must be at least 1");
        }
        // Padding is done here, not by the tokenizer, so the batcher
        // controls the final shape.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;

        let pad_id = tokenizer
            .token_to_id("[PAD]")
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);

        Ok(Self { tokenizer, max_len, pad_id })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Tokenise with special tokens, truncated but not padded.
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(EncodedText {
            ids:  enc.get_ids().to_vec(),
            mask: enc.get_attention_mask().to_vec(),
        })
    }

    /// Tokenise and pad to exactly `max_len`.
    pub fn encode_padded(&self, text: &str) -> Result<EncodedText> {
        let mut enc = self.encode(text)?;
        enc.ids.resize(self.max_len, self.pad_id);
        enc.mask.resize(self.max_len, 0);
        Ok(enc)
    }

    pub fn encode_all(&self, texts: &[String]) -> Result<Vec<EncodedText>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    /// Write tokenizer.json into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(TOKENIZER_FILE);
        self.tokenizer
            .save(&path, true)
            .map_err(|e| anyhow!("Cannot save tokenizer to '{}': {}", path.display(), e))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

/// A tiny word-level BERT-style tokenizer for tests: lower-cases,
/// splits on whitespace and wraps input in [CLS] … [SEP].
#[cfg(test)]
pub fn test_tokenizer() -> Tokenizer {
    use std::str::FromStr;

    let words = [
        "the", "a", "space", "nasa", "mars", "mission", "hockey", "team", "game",
        "won", "graphics", "card", "gpu", "god", "church", "car", "engine",
    ];
    let mut vocab = serde_json::json!({
        "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3, "[MASK]": 4,
    });
    for (i, w) in words.iter().enumerate() {
        vocab[*w] = serde_json::json!(5 + i);
    }

    let special = |id: u32, content: &str| serde_json::json!({
        "id": id, "content": content, "single_word": false, "lstrip": false,
        "rstrip": false, "normalized": false, "special": true
    });

    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(0, "[PAD]"), special(1, "[UNK]"), special(2, "[CLS]"),
            special(3, "[SEP]"), special(4, "[MASK]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    });

    Tokenizer::from_str(&tokenizer_json.to_string()).expect("valid test tokenizer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_adds_special_tokens() {
        let store = TokenizerStore::new(test_tokenizer(), 16).unwrap();
        let enc   = store.encode("NASA mission to Mars").unwrap();
        // [CLS] nasa mission [UNK] mars [SEP]
        assert_eq!(enc.ids, vec![2, 8, 10, 1, 9, 3]);
        assert_eq!(enc.real_tokens(), 6);
        assert_eq!(store.pad_id(), 0);
    }

    #[test]
    fn test_truncation_keeps_special_tokens() {
        let store = TokenizerStore::new(test_tokenizer(), 4).unwrap();
        let enc   = store.encode("the hockey team won the game").unwrap();
        assert_eq!(enc.len(), 4);
        assert_eq!(enc.ids.first(), Some(&2));
        assert_eq!(enc.ids.last(), Some(&3));
    }

    #[test]
    fn test_padded_encoding_has_fixed_length() {
        let store = TokenizerStore::new(test_tokenizer(), 8).unwrap();
        let enc   = store.encode_padded("graphics card").unwrap();
        assert_eq!(enc.len(), 8);
        assert_eq!(enc.mask, vec![1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(&enc.ids[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_save_and_reload() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(test_tokenizer(), 8).unwrap();
        store.save(dir.path()).unwrap();

        let reloaded = TokenizerStore::from_file(&dir.path().join(TOKENIZER_FILE), 8).unwrap();
        assert_eq!(
            reloaded.encode("space gpu").unwrap(),
            store.encode("space gpu").unwrap()
        );
    }
}
