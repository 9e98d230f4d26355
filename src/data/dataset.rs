use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// Token ids plus attention mask for one text, as produced by the
/// tokenizer (already truncated; padded only when asked to be).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedText {
    pub ids:  Vec<u32>,
    pub mask: Vec<u32>,
}

impl EncodedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of real (non-padding) tokens
    pub fn real_tokens(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 1).count()
    }
}

/// One tokenised, fixed-length document with its topic label.
/// Sequence format: [CLS] text [SEP] [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

impl ClassificationSample {
    pub fn new(encoded: EncodedText, label: usize) -> Self {
        Self {
            input_ids:      encoded.ids,
            attention_mask: encoded.mask,
            label,
        }
    }
}

pub struct ClassificationDataset {
    samples: Vec<ClassificationSample>,
}

impl ClassificationDataset {
    pub fn new(samples: Vec<ClassificationSample>) -> Self { Self { samples } }

    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

impl Dataset<ClassificationSample> for ClassificationDataset {
    fn get(&self, index: usize) -> Option<ClassificationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Both sides of a contrastive pair, tokenised but unpadded.
/// The batcher pads each side to the longest sequence in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSample {
    pub left:  Vec<u32>,
    pub right: Vec<u32>,
    pub label: f32,
}

pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    pub fn new(samples: Vec<PairSample>) -> Self { Self { samples } }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
