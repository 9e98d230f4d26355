// ============================================================
// Layer 3 — Document Domain Types
// ============================================================
// A Document is one newsgroup message with its integer topic
// label. A Corpus owns every document together with the
// human-readable class names, indexed by label id.
//
// Label ids follow the alphabetical order of the newsgroup
// names, which is the order the public dataset uses.

use serde::{Deserialize, Serialize};

/// The twenty newsgroups, in label-id order.
pub const NEWSGROUP_CATEGORIES: [&str; 20] = [
    "alt.atheism",
    "comp.graphics",
    "comp.os.ms-windows.misc",
    "comp.sys.ibm.pc.hardware",
    "comp.sys.mac.hardware",
    "comp.windows.x",
    "misc.forsale",
    "rec.autos",
    "rec.motorcycles",
    "rec.sport.baseball",
    "rec.sport.hockey",
    "sci.crypt",
    "sci.electronics",
    "sci.med",
    "sci.space",
    "soc.religion.christian",
    "talk.politics.guns",
    "talk.politics.mideast",
    "talk.politics.misc",
    "talk.religion.misc",
];

/// A raw labelled document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the text came from (file path or dataset row),
    /// kept for traceability in logs
    pub source: String,

    /// Message body after metadata stripping
    pub text: String,

    /// Topic class id, an index into `Corpus::label_names`
    pub label: usize,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>, label: usize) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
            label,
        }
    }
}

/// Every loaded document plus the class names.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub documents:   Vec<Document>,
    pub label_names: Vec<String>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>, label_names: Vec<String>) -> Self {
        Self { documents, label_names }
    }

    pub fn num_classes(&self) -> usize {
        self.label_names.len()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Name of a class, falling back to the numeric id for labels
    /// outside the known range.
    pub fn label_name(&self, label: usize) -> String {
        label_name(&self.label_names, label)
    }
}

/// Look up a class name by id in a plain name table.
pub fn label_name(names: &[String], label: usize) -> String {
    names
        .get(label)
        .cloned()
        .unwrap_or_else(|| format!("class_{label}"))
}

/// The canonical class-name table as owned strings.
pub fn default_label_names() -> Vec<String> {
    NEWSGROUP_CATEGORIES.iter().map(|s| s.to_string()).collect()
}
