// ============================================================
// Layer 4 — Contrastive Pair Sampler
// ============================================================
// Builds the training signal for the embedding model by drawing
// document pairs with rejection sampling:
//
//   for each round:
//     draw two distinct documents until their labels match
//       → PairExample(label = 1.0)
//     draw two distinct documents until their labels differ
//       → PairExample(label = 0.0)
//
// So `rounds` rounds give 2 * rounds examples, alternating
// positive / negative. Pairs may repeat; there is no coverage
// guarantee.
//
// Redraws are capped at `max_attempts` per pair, and requests
// that can never succeed (no class with two documents, or only
// one class present) fail up front instead of spinning forever.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use std::collections::HashMap;

use crate::domain::document::Document;
use crate::domain::pair::{PairExample, PairKind};

pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

pub struct PairSampler {
    rng:          StdRng,
    max_attempts: usize,
}

impl PairSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng:          StdRng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draw `rounds` positive/negative pairs from `docs`.
    pub fn sample(&mut self, docs: &[Document], rounds: usize) -> Result<Vec<PairExample>> {
        let labels: Vec<usize> = docs.iter().map(|d| d.label).collect();
        let mut pairs = Vec::with_capacity(rounds * 2);

        for _ in 0..rounds {
            for kind in [PairKind::SameClass, PairKind::DifferentClass] {
                let (a, b) = self.draw_indices(&labels, kind)?;
                pairs.push(PairExample::new(docs[a].text.clone(), docs[b].text.clone(), kind));
            }
        }

        tracing::debug!("Sampled {} pairs from {} documents", pairs.len(), docs.len());
        Ok(pairs)
    }

    /// Two distinct indices whose labels satisfy `kind`.
    pub fn draw_indices(&mut self, labels: &[usize], kind: PairKind) -> Result<(usize, usize)> {
        if labels.len() < 2 {
            bail!("Need at least two documents to draw a pair, got {}", labels.len());
        }
        if !is_satisfiable(labels, kind) {
            bail!("No {:?} pair exists among {} documents", kind, labels.len());
        }

        for _ in 0..self.max_attempts {
            let picked = index::sample(&mut self.rng, labels.len(), 2);
            let (a, b) = (picked.index(0), picked.index(1));
            if kind.accepts(labels[a], labels[b]) {
                return Ok((a, b));
            }
        }

        bail!("No {:?} pair found after {} attempts", kind, self.max_attempts)
    }
}

fn is_satisfiable(labels: &[usize], kind: PairKind) -> bool {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    match kind {
        PairKind::SameClass      => counts.values().any(|&c| c >= 2),
        PairKind::DifferentClass => counts.len() >= 2,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn docs(labels: &[usize]) -> Vec<Document> {
        labels
            .iter()
            .enumerate()
            .map(|(i, &l)| Document::new(format!("doc{i}"), format!("text {i}"), l))
            .collect()
    }

    #[test]
    fn test_pair_labels_respect_kind() {
        let labels: Vec<usize> = (0..60).map(|i| i % 7).collect();
        let mut sampler = PairSampler::new(42);
        for _ in 0..500 {
            let (a, b) = sampler.draw_indices(&labels, PairKind::SameClass).unwrap();
            assert_ne!(a, b);
            assert_eq!(labels[a], labels[b]);

            let (a, b) = sampler.draw_indices(&labels, PairKind::DifferentClass).unwrap();
            assert_ne!(labels[a], labels[b]);
        }
    }

    #[test]
    fn test_sample_alternates_and_counts() {
        let corpus = docs(&[0, 0, 1, 1, 2, 2, 2]);
        let pairs  = PairSampler::new(1).sample(&corpus, 25).unwrap();
        assert_eq!(pairs.len(), 50);
        for (i, p) in pairs.iter().enumerate() {
            assert_eq!(p.is_positive(), i % 2 == 0);
        }
    }

    #[test]
    fn test_sampled_texts_match_labels() {
        let corpus = docs(&[3, 5, 3, 5, 9, 9, 3]);
        let label_of = |text: &str| {
            corpus.iter().find(|d| d.text == text).map(|d| d.label).unwrap()
        };
        for p in PairSampler::new(9).sample(&corpus, 40).unwrap() {
            let same = label_of(&p.text_a) == label_of(&p.text_b);
            assert_eq!(same, p.is_positive());
        }
    }

    #[test]
    fn test_single_class_cannot_make_negative_pairs() {
        let mut sampler = PairSampler::new(0);
        assert!(sampler.draw_indices(&[4, 4, 4], PairKind::DifferentClass).is_err());
        assert!(sampler.draw_indices(&[4, 4, 4], PairKind::SameClass).is_ok());
    }

    #[test]
    fn test_all_unique_labels_cannot_make_positive_pairs() {
        let mut sampler = PairSampler::new(0);
        assert!(sampler.draw_indices(&[0, 1, 2, 3], PairKind::SameClass).is_err());
    }

    #[test]
    fn test_too_few_documents() {
        let mut sampler = PairSampler::new(0);
        assert!(sampler.draw_indices(&[1], PairKind::SameClass).is_err());
        assert!(sampler.draw_indices(&[], PairKind::DifferentClass).is_err());
    }

    #[test]
    fn test_attempt_cap_is_enforced() {
        // Only one same-class pair among many documents; with a single
        // attempt the sampler will almost surely give up.
        let mut labels: Vec<usize> = (0..2000).collect();
        labels.push(0);
        let mut sampler = PairSampler::new(5).with_max_attempts(1);
        let outcomes: Vec<bool> = (0..20)
            .map(|_| sampler.draw_indices(&labels, PairKind::SameClass).is_ok())
            .collect();
        assert!(outcomes.iter().any(|ok| !ok));
    }
}
