// ============================================================
// Layer 5 — Inferencers
// ============================================================
// Rebuild a saved model from its artifact directory and classify
// free text with it. Both implement the domain TextClassifier
// trait so the predict use case does not care which pipeline
// produced the artifact.
//
//   ClassifierInferencer: text → BERT classifier → argmax
//   ProbeInferencer:      text → sentence encoder → probe → argmax

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::batcher::pad_sequences;
use crate::domain::traits::TextClassifier;
use crate::infra::{
    artifact::{ArtifactKind, ArtifactManifest, ArtifactStore, MODEL_RECORD, PROBE_RECORD},
    tokenizer_store::{TokenizerStore, TOKENIZER_FILE},
};
use crate::ml::classifier::{BertClassifier, BertClassifierConfig};
use crate::ml::contrastive::embed_texts;
use crate::ml::probe::{LinearProbe, ProbeConfig};
use crate::ml::sentence::{SentenceEncoder, SentenceEncoderConfig};

const PREDICT_BATCH_SIZE: usize = 8;
pub const EMBED_BATCH_SIZE: usize = 32;

fn expect_kind(manifest: &ArtifactManifest, kind: ArtifactKind) -> Result<()> {
    if manifest.kind != kind {
        bail!("Expected a {kind} artifact but found a {} artifact", manifest.kind);
    }
    Ok(())
}

// ─── ClassifierInferencer ─────────────────────────────────────────────────────
pub struct ClassifierInferencer<B: Backend> {
    model:       BertClassifier<B>,
    tokenizer:   TokenizerStore,
    label_names: Vec<String>,
    device:      B::Device,
}

impl<B: Backend> ClassifierInferencer<B> {
    pub fn new(
        model:       BertClassifier<B>,
        tokenizer:   TokenizerStore,
        label_names: Vec<String>,
        device:      B::Device,
    ) -> Self {
        Self { model, tokenizer, label_names, device }
    }

    pub fn from_artifact(store: &ArtifactStore, device: B::Device) -> Result<Self> {
        let manifest = store.load_manifest()?;
        expect_kind(&manifest, ArtifactKind::Classifier)?;

        let model: BertClassifier<B> =
            BertClassifierConfig::new(manifest.bert.clone(), manifest.num_labels()).init(&device);
        let model = store.load_module::<B, _>(MODEL_RECORD, model, &device)?;
        let tokenizer = TokenizerStore::from_file(&store.dir().join(TOKENIZER_FILE), manifest.max_seq_len)?;

        tracing::info!("Loaded classifier from '{}'", store.dir().display());
        Ok(Self::new(model, tokenizer, manifest.label_names, device))
    }
}

impl<B: Backend> TextClassifier for ClassifierInferencer<B> {
    fn predict(&self, texts: &[String]) -> Result<Vec<usize>> {
        let encoded = self.tokenizer.encode_all(texts)?;
        let mut predictions = Vec::with_capacity(texts.len());

        for chunk in encoded.chunks(PREDICT_BATCH_SIZE) {
            let seqs: Vec<&[u32]> = chunk.iter().map(|e| e.ids.as_slice()).collect();
            let (ids, mask) = pad_sequences::<B>(&seqs, self.tokenizer.pad_id(), &self.device);
            predictions.extend(self.model.predict(ids, mask));
        }
        Ok(predictions)
    }

    fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

// ─── ProbeInferencer ──────────────────────────────────────────────────────────
pub struct ProbeInferencer<B: Backend> {
    encoder:     SentenceEncoder<B>,
    probe:       LinearProbe<B>,
    tokenizer:   TokenizerStore,
    label_names: Vec<String>,
    device:      B::Device,
}

impl<B: Backend> ProbeInferencer<B> {
    pub fn new(
        encoder:     SentenceEncoder<B>,
        probe:       LinearProbe<B>,
        tokenizer:   TokenizerStore,
        label_names: Vec<String>,
        device:      B::Device,
    ) -> Self {
        Self { encoder, probe, tokenizer, label_names, device }
    }

    pub fn from_artifact(store: &ArtifactStore, device: B::Device) -> Result<Self> {
        let manifest = store.load_manifest()?;
        expect_kind(&manifest, ArtifactKind::Embedding)?;

        let encoder: SentenceEncoder<B> =
            SentenceEncoderConfig::new(manifest.bert.clone()).init(&device);
        let encoder = store.load_module::<B, _>(MODEL_RECORD, encoder, &device)?;

        let probe: LinearProbe<B> =
            ProbeConfig::new(manifest.bert.hidden_size, manifest.num_labels()).init(&device);
        let probe = store.load_module::<B, _>(PROBE_RECORD, probe, &device)?;

        let tokenizer = TokenizerStore::from_file(&store.dir().join(TOKENIZER_FILE), manifest.max_seq_len)?;

        tracing::info!("Loaded sentence encoder and probe from '{}'", store.dir().display());
        Ok(Self::new(encoder, probe, tokenizer, manifest.label_names, device))
    }
}

impl<B: Backend> TextClassifier for ProbeInferencer<B> {
    fn predict(&self, texts: &[String]) -> Result<Vec<usize>> {
        let encoded    = self.tokenizer.encode_all(texts)?;
        let embeddings = embed_texts(
            &self.encoder,
            &encoded,
            self.tokenizer.pad_id(),
            EMBED_BATCH_SIZE,
            &self.device,
        );
        self.probe.predict(&embeddings, &self.device)
    }

    fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// Load whichever kind of model `store` holds.
pub fn load_text_classifier<B: Backend>(
    store:  &ArtifactStore,
    device: B::Device,
) -> Result<Box<dyn TextClassifier>> {
    let manifest = store.load_manifest()?;
    Ok(match manifest.kind {
        ArtifactKind::Classifier => Box::new(ClassifierInferencer::<B>::from_artifact(store, device)?),
        ArtifactKind::Embedding  => Box::new(ProbeInferencer::<B>::from_artifact(store, device)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::test_tokenizer;
    use crate::ml::bert::tests::tiny_config;
    use crate::ml::probe::features_tensor;
    use burn::backend::NdArray;
    use burn::nn::{Initializer, Linear, LinearConfig};

    type TestBackend = NdArray;

    fn labels() -> Vec<String> {
        vec!["comp.graphics".into(), "rec.sport.hockey".into(), "sci.space".into()]
    }

    fn texts() -> Vec<String> {
        vec![
            "NASA launched a new space mission to Mars.".into(),
            "The hockey team won the championship game.".into(),
            "New graphics card released with improved performance.".into(),
        ]
    }

    fn manifest(kind: ArtifactKind) -> ArtifactManifest {
        ArtifactManifest {
            kind,
            base_model:  "test".into(),
            label_names: labels(),
            bert:        tiny_config(),
            max_seq_len: 12,
            training:    serde_json::Value::Null,
        }
    }

    fn assert_close(before: &[f32], after: &[f32]) {
        assert_eq!(before.len(), after.len());
        // CompactRecorder stores half precision
        for (a, b) in before.iter().zip(after) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    fn wide_head(inputs: usize, outputs: usize, device: &<TestBackend as Backend>::Device) -> Linear<TestBackend> {
        LinearConfig::new(inputs, outputs)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 1.0 })
            .init(device)
    }

    fn classifier_logits(inferencer: &ClassifierInferencer<TestBackend>) -> Vec<f32> {
        let encoded = inferencer.tokenizer.encode_all(&texts()).unwrap();
        let seqs: Vec<&[u32]> = encoded.iter().map(|e| e.ids.as_slice()).collect();
        let (ids, mask) = pad_sequences::<TestBackend>(&seqs, inferencer.tokenizer.pad_id(), &inferencer.device);
        inferencer.model.forward(ids, mask).into_data().iter::<f32>().collect()
    }

    fn probe_embeddings(encoder: &SentenceEncoder<TestBackend>, device: &<TestBackend as Backend>::Device) -> Vec<Vec<f32>> {
        let tokenizer = TokenizerStore::new(test_tokenizer(), 12).unwrap();
        let encoded   = tokenizer.encode_all(&texts()).unwrap();
        embed_texts(encoder, &encoded, tokenizer.pad_id(), EMBED_BATCH_SIZE, device)
    }

    #[test]
    fn test_classifier_artifact_round_trip() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::create(dir.path()).unwrap();

        let mut model: BertClassifier<TestBackend> =
            BertClassifierConfig::new(tiny_config(), 3).init(&device);
        model.classifier = wide_head(16, 3, &device);
        store.save_manifest(&manifest(ArtifactKind::Classifier)).unwrap();
        store.save_module::<TestBackend, _>(MODEL_RECORD, &model).unwrap();
        let tokenizer = TokenizerStore::new(test_tokenizer(), 12).unwrap();
        tokenizer.save(dir.path()).unwrap();

        let in_memory = ClassifierInferencer::new(model, tokenizer, labels(), device.clone());
        let loaded    = ClassifierInferencer::<TestBackend>::from_artifact(&store, device.clone()).unwrap();
        assert_close(&classifier_logits(&in_memory), &classifier_logits(&loaded));

        let expected = in_memory.predict(&texts()).unwrap();
        assert_eq!(loaded.predict(&texts()).unwrap(), expected);

        let boxed = load_text_classifier::<TestBackend>(&store, device).unwrap();
        assert_eq!(boxed.predict(&texts()).unwrap(), expected);
        assert_eq!(boxed.label_names(), labels().as_slice());
    }

    #[test]
    fn test_embedding_artifact_round_trip() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::create(dir.path()).unwrap();

        let encoder: SentenceEncoder<TestBackend> =
            SentenceEncoderConfig::new(tiny_config()).init(&device);
        let probe = LinearProbe { linear: wide_head(16, 3, &device) };
        store.save_manifest(&manifest(ArtifactKind::Embedding)).unwrap();
        store.save_module::<TestBackend, _>(MODEL_RECORD, &encoder).unwrap();
        store.save_module::<TestBackend, _>(PROBE_RECORD, &probe).unwrap();
        TokenizerStore::new(test_tokenizer(), 12).unwrap().save(dir.path()).unwrap();

        let in_memory = ProbeInferencer::new(
            encoder,
            probe,
            TokenizerStore::new(test_tokenizer(), 12).unwrap(),
            labels(),
            device.clone(),
        );
        let loaded = ProbeInferencer::<TestBackend>::from_artifact(&store, device.clone()).unwrap();

        let before = probe_embeddings(&in_memory.encoder, &device);
        let after  = probe_embeddings(&loaded.encoder, &device);
        for (b, a) in before.iter().zip(&after) {
            assert_close(b, a);
        }

        // A freshly initialised encoder must not reproduce the saved one
        let fresh: SentenceEncoder<TestBackend> =
            SentenceEncoderConfig::new(tiny_config()).init(&device);
        let unrelated = probe_embeddings(&fresh, &device);
        let gap = unrelated
            .iter()
            .flatten()
            .zip(after.iter().flatten())
            .map(|(u, a)| (u - a).abs())
            .fold(0.0f32, f32::max);
        assert!(gap > 1e-2, "reloaded encoder matches a random one");

        let features = features_tensor::<TestBackend>(&before, &device).unwrap();
        let logits_before: Vec<f32> =
            in_memory.probe.forward(features.clone()).into_data().iter::<f32>().collect();
        let logits_after: Vec<f32> =
            loaded.probe.forward(features).into_data().iter::<f32>().collect();
        assert!(logits_before.iter().any(|l| l.abs() > 1e-3));
        assert_close(&logits_before, &logits_after);

        assert_eq!(loaded.predict(&texts()).unwrap(), in_memory.predict(&texts()).unwrap());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::create(dir.path()).unwrap();
        store.save_manifest(&manifest(ArtifactKind::Embedding)).unwrap();
        assert!(ClassifierInferencer::<TestBackend>::from_artifact(&store, device).is_err());
    }
}
