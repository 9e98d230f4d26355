// ============================================================
// Layer 4 — Dataset Preparation
// ============================================================
// The shared front half of both pipelines:
//
//   load corpus → shuffle → stratified 80/20 split → subsets
//
// The split covers the whole corpus; only afterwards are the
// train and test sets cut down to the configured subset sizes.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::{HubCorpusSource, NewsgroupsDirSource, DEFAULT_DATASET_REPO};
use crate::data::splitter::{class_counts, shuffle_seeded, stratified_split, take_subset};
use crate::domain::document::Document;
use crate::domain::traits::CorpusSource;

/// Where the corpus comes from and how it is split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Hugging Face Hub dataset repo (used when `corpus_dir` is None)
    pub dataset_repo:  String,
    /// Local raw `20news-bydate` directory
    pub corpus_dir:    Option<String>,
    pub test_fraction: f64,
    pub seed:          u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dataset_repo:  DEFAULT_DATASET_REPO.to_string(),
            corpus_dir:    None,
            test_fraction: 0.2,
            seed:          42,
        }
    }
}

impl CorpusConfig {
    pub fn source(&self) -> Box<dyn CorpusSource> {
        match &self.corpus_dir {
            Some(dir) => Box::new(NewsgroupsDirSource::new(dir)),
            None      => Box::new(HubCorpusSource::new(self.dataset_repo.clone())),
        }
    }
}

/// Train/test subsets actually used by a pipeline.
#[derive(Debug, Clone)]
pub struct PreparedSplits {
    pub train:       Vec<Document>,
    pub test:        Vec<Document>,
    pub label_names: Vec<String>,
}

impl PreparedSplits {
    pub fn num_classes(&self) -> usize {
        self.label_names.len()
    }
}

/// Load, shuffle, split and subset the corpus.
pub fn prepare_splits(
    source:     &dyn CorpusSource,
    cfg:        &CorpusConfig,
    train_size: usize,
    test_size:  usize,
) -> Result<PreparedSplits> {
    let corpus = source.load()?;
    if corpus.is_empty() {
        bail!("The corpus is empty; nothing to train on");
    }

    println!("Total documents: {}", corpus.len());
    println!("Number of classes: {}", corpus.num_classes());
    println!(
        "Classes: {:?}...",
        corpus.label_names.iter().take(5).collect::<Vec<_>>()
    );

    let label_names = corpus.label_names.clone();
    let documents   = shuffle_seeded(corpus.documents, cfg.seed);

    let (train, test) = stratified_split(documents, cfg.test_fraction, cfg.seed, |d| d.label);
    println!("Train size: {}, Test size: {}", train.len(), test.len());
    tracing::debug!("Test documents per class: {:?}", class_counts(&test, |d| d.label));

    let train = take_subset(&train, train_size);
    let test  = take_subset(&test, test_size);
    tracing::info!("Using subsets: {} train, {} test", train.len(), test.len());

    Ok(PreparedSplits { train, test, label_names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Corpus;

    struct FixedSource(Vec<usize>);

    impl CorpusSource for FixedSource {
        fn load(&self) -> Result<Corpus> {
            let docs = self
                .0
                .iter()
                .enumerate()
                .map(|(i, &l)| Document::new(format!("d{i}"), format!("text {i}"), l))
                .collect();
            Ok(Corpus::new(docs, vec!["a".into(), "b".into(), "c".into()]))
        }
    }

    #[test]
    fn test_subsets_respect_limits() {
        let labels: Vec<usize> = (0..300).map(|i| i % 3).collect();
        let splits = prepare_splits(&FixedSource(labels), &CorpusConfig::default(), 100, 40).unwrap();
        assert_eq!(splits.train.len(), 100);
        assert_eq!(splits.test.len(), 40);
        assert_eq!(splits.num_classes(), 3);
    }

    #[test]
    fn test_small_corpus_keeps_everything() {
        let labels: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let splits = prepare_splits(&FixedSource(labels), &CorpusConfig::default(), 1000, 400).unwrap();
        assert_eq!(splits.train.len() + splits.test.len(), 30);
        assert_eq!(splits.test.len(), 6);
    }

    #[test]
    fn test_train_and_test_are_disjoint() {
        let labels: Vec<usize> = (0..90).map(|i| i % 3).collect();
        let splits = prepare_splits(&FixedSource(labels), &CorpusConfig::default(), 90, 90).unwrap();
        for d in &splits.test {
            assert!(!splits.train.iter().any(|t| t.source == d.source));
        }
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        assert!(prepare_splits(&FixedSource(Vec::new()), &CorpusConfig::default(), 10, 10).is_err());
    }
}
