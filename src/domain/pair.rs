// ============================================================
// Layer 3 — PairExample Domain Type
// ============================================================
// The training signal for contrastive fine-tuning: two texts
// and a target cosine similarity.
//
//   label = 1.0  → both documents share a topic
//   label = 0.0  → the documents come from different topics
//
// The embedding model is trained so that cos(u, v) moves
// towards the label.

use serde::{Deserialize, Serialize};

/// Target similarity for a same-class pair.
pub const SAME_CLASS: f32 = 1.0;
/// Target similarity for a different-class pair.
pub const DIFFERENT_CLASS: f32 = 0.0;

/// Whether a pair should share a label or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    SameClass,
    DifferentClass,
}

impl PairKind {
    /// Does a draw of (left, right) labels satisfy this kind?
    pub fn accepts(self, left: usize, right: usize) -> bool {
        match self {
            PairKind::SameClass      => left == right,
            PairKind::DifferentClass => left != right,
        }
    }

    pub fn target(self) -> f32 {
        match self {
            PairKind::SameClass      => SAME_CLASS,
            PairKind::DifferentClass => DIFFERENT_CLASS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairExample {
    pub text_a: String,
    pub text_b: String,
    pub label:  f32,
}

impl PairExample {
    pub fn new(text_a: impl Into<String>, text_b: impl Into<String>, kind: PairKind) -> Self {
        Self {
            text_a: text_a.into(),
            text_b: text_b.into(),
            label:  kind.target(),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.label == SAME_CLASS
    }
}
