// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Reloads a saved artifact directory of either kind and maps
// free text to newsgroup names.

use anyhow::{bail, Result};

use crate::domain::{document::label_name, traits::TextClassifier};
use crate::infra::artifact::ArtifactStore;
use crate::ml::{inferencer::load_text_classifier, Device, InferBackend};

pub struct PredictUseCase {
    classifier: Box<dyn TextClassifier>,
}

impl PredictUseCase {
    /// Load the model saved in `model_dir` on the inference backend.
    pub fn open(model_dir: &str) -> Result<Self> {
        let store      = ArtifactStore::open(model_dir)?;
        let classifier = load_text_classifier::<InferBackend>(&store, Device::default())?;
        Ok(Self::from_classifier(classifier))
    }

    pub fn from_classifier(classifier: Box<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    /// Returns (text, predicted category) per input text.
    pub fn predict(&self, texts: &[String]) -> Result<Vec<(String, String)>> {
        if texts.is_empty() {
            bail!("Nothing to classify; pass at least one --text");
        }
        let labels = self.classifier.predict(texts)?;
        Ok(texts
            .iter()
            .zip(labels)
            .map(|(t, l)| (t.clone(), label_name(self.classifier.label_names(), l)))
            .collect())
    }
}
