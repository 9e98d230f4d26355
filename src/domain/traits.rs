// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so the hub
// download and the local raw-corpus reader are interchangeable,
// and so are the two kinds of trained classifier.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::document::Corpus;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the full labelled corpus.
///
/// Implementations:
///   - HubCorpusSource     → Hugging Face Hub dataset repo
///   - NewsgroupsDirSource → local `20news-bydate` directory
pub trait CorpusSource {
    fn load(&self) -> Result<Corpus>;
}

// ─── TextClassifier ───────────────────────────────────────────────────────────
/// Anything that maps raw texts to topic label ids.
///
/// Implementations:
///   - ClassifierInferencer → fine-tuned BERT sequence classifier
///   - ProbeInferencer      → sentence encoder + linear probe
pub trait TextClassifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<usize>>;

    /// Class names indexed by label id
    fn label_names(&self) -> &[String];
}
