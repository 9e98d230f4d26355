// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Saves and restores a finished fine-tuning run.
//
// Directory layout:
//   <output_dir>/
//     artifact.json    ← manifest: kind, base model, labels,
//                        encoder config, sequence length and
//                        the training configuration
//     model.mpk        ← fine-tuned classifier or encoder
//     probe.mpk        ← linear probe (embedding runs only)
//     tokenizer.json   ← tokenizer used for training
//     metrics.csv      ← per-epoch training metrics
//     report.json      ← test-set classification report
//
// Module records go through Burn's CompactRecorder; loading a
// record into a module with a different architecture fails.
// Records are stored at half precision, so predictions from a
// reloaded model may drift slightly for inputs near a class
// boundary.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::ml::bert::BertConfig;

pub const MANIFEST_FILE: &str = "artifact.json";
pub const MODEL_RECORD:  &str = "model";
pub const PROBE_RECORD:  &str = "probe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// BERT encoder + pooler + classification head
    Classifier,
    /// Sentence encoder + linear probe
    Embedding,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Classifier => write!(f, "classifier"),
            ArtifactKind::Embedding  => write!(f, "embedding"),
        }
    }
}

/// Everything needed to rebuild a saved model before loading its
/// weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub kind:        ArtifactKind,
    pub base_model:  String,
    pub label_names: Vec<String>,
    pub bert:        BertConfig,
    pub max_seq_len: usize,
    /// Application-level configuration of the run that produced it
    pub training:    serde_json::Value,
}

impl ArtifactManifest {
    pub fn num_labels(&self) -> usize {
        self.label_names.len()
    }
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open `dir` for writing, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing artifact directory for reading.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.join(MANIFEST_FILE).is_file() {
            bail!(
                "'{}' is not a saved model directory (no {}). Train a model first.",
                dir.display(),
                MANIFEST_FILE
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_manifest(&self, manifest: &ArtifactManifest) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(manifest)?)
            .with_context(|| format!("Cannot write manifest to '{}'", path.display()))?;
        tracing::debug!("Saved manifest to '{}'", path.display());
        Ok(())
    }

    pub fn load_manifest(&self) -> Result<ArtifactManifest> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read manifest '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid manifest '{}'", path.display()))
    }

    /// Record `module` under `name` (the recorder adds the extension).
    pub fn save_module<B: Backend, M: Module<B>>(&self, name: &str, module: &M) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(module.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save '{}'", path.display()))?;
        tracing::debug!("Saved module record '{}'", path.display());
        Ok(())
    }

    /// Load the record `name` into an already-built `module`.
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        name:   &str,
        module: M,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load '{}'", path.display()))?;
        Ok(module.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::bert::tests::tiny_config;
    use crate::ml::classifier::{BertClassifier, BertClassifierConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn manifest() -> ArtifactManifest {
        ArtifactManifest {
            kind:        ArtifactKind::Classifier,
            base_model:  "bert-base-uncased".into(),
            label_names: vec!["alt.atheism".into(), "sci.space".into(), "rec.autos".into()],
            bert:        tiny_config(),
            max_seq_len: 8,
            training:    serde_json::json!({ "epochs": 3 }),
        }
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(dir.path()).unwrap();
        store.save_manifest(&manifest()).unwrap();

        let back = ArtifactStore::open(dir.path()).unwrap().load_manifest().unwrap();
        assert_eq!(back.kind, ArtifactKind::Classifier);
        assert_eq!(back.num_labels(), 3);
        assert_eq!(back.bert.hidden_size, 16);
        assert_eq!(back.training["epochs"], 3);
    }

    #[test]
    fn test_open_requires_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ArtifactStore::open(dir.path()).is_err());
    }

    #[test]
    fn test_module_round_trip_preserves_outputs() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::create(dir.path()).unwrap();

        let cfg = BertClassifierConfig::new(tiny_config(), 3);
        let model: BertClassifier<TestBackend> = cfg.init(&device);
        store.save_module::<TestBackend, _>(MODEL_RECORD, &model).unwrap();
        assert!(fs::read_dir(dir.path()).unwrap().next().is_some());

        let fresh: BertClassifier<TestBackend> = cfg.init(&device);
        let loaded = store.load_module::<TestBackend, _>(MODEL_RECORD, fresh, &device).unwrap();

        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 6, 3]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::ones([1, 4], &device);
        let before: Vec<f32> = model.forward(ids.clone(), mask.clone()).into_data().iter::<f32>().collect();
        let after:  Vec<f32> = loaded.forward(ids, mask).into_data().iter::<f32>().collect();
        // CompactRecorder stores half precision
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_loading_missing_record_fails() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::create(dir.path()).unwrap();
        let model: BertClassifier<TestBackend> =
            BertClassifierConfig::new(tiny_config(), 3).init(&device);
        assert!(store.load_module::<TestBackend, _>(PROBE_RECORD, model, &device).is_err());
    }
}
