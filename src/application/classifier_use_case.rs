// ============================================================
// Layer 2 — ClassifierUseCase (Pipeline A)
// ============================================================
// Orchestrates BERT sequence-classification fine-tuning:
//
//   Step 1: Load, shuffle, split, subset    (Layer 4 - data)
//   Step 2: Fetch pretrained files          (Layer 5 - ml)
//   Step 3: Build classifier from weights   (Layer 5 - ml)
//   Step 4: Tokenise + pad to max_seq_len   (Layer 6 - infra)
//   Step 5: Fine-tune                       (Layer 5 - ml)
//   Step 6: Evaluate on the test subset     (Layer 5 / 6)
//   Step 7: Save the artifact directory     (Layer 6 - infra)
//
// Steps 4–7 live in `run_classifier`, generic over the backend,
// so they run unchanged on NdArray in tests.

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::{ClassificationDataset, ClassificationSample},
    prepare::{prepare_splits, CorpusConfig, PreparedSplits},
};
use crate::domain::document::Document;
use crate::infra::{
    artifact::{ArtifactKind, ArtifactManifest, ArtifactStore, MODEL_RECORD},
    metrics::MetricsLogger,
    report::ClassificationReport,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    bert::BertConfig,
    classifier::{BertClassifier, BertClassifierConfig},
    pretrained::{load_bert, load_pooler, read_bert_config, PretrainedFiles},
    trainer::{evaluate_classifier, train_classifier, FineTuneConfig},
    Device, TrainBackend,
};

// ─── Configuration ───────────────────────────────────────────────────────────
// Serialisable so it is recorded in the artifact manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub corpus:        CorpusConfig,
    pub model_name:    String,
    pub output_dir:    String,
    pub train_size:    usize,
    pub test_size:     usize,
    pub max_seq_len:   usize,
    pub batch_size:    usize,
    pub epochs:        usize,
    pub learning_rate: f64,
    pub warmup_steps:  usize,
    pub weight_decay:  f64,
    pub max_grad_norm: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            corpus:        CorpusConfig::default(),
            model_name:    "bert-base-uncased".to_string(),
            output_dir:    "./bert_20newsgroups_model".to_string(),
            train_size:    1000,
            test_size:     400,
            max_seq_len:   512,
            batch_size:    8,
            epochs:        3,
            learning_rate: 2e-5,
            warmup_steps:  0,
            weight_decay:  0.01,
            max_grad_norm: 1.0,
        }
    }
}

impl ClassifierConfig {
    fn fine_tune(&self) -> FineTuneConfig {
        FineTuneConfig::new(self.epochs, self.batch_size, self.learning_rate)
            .with_warmup_steps(self.warmup_steps)
            .with_weight_decay(self.weight_decay)
            .with_max_grad_norm(self.max_grad_norm)
            .with_seed(self.corpus.seed)
    }
}

// ─── ClassifierUseCase ───────────────────────────────────────────────────────
pub struct ClassifierUseCase {
    config: ClassifierConfig,
}

impl ClassifierUseCase {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Execute the full pipeline end to end.
    pub fn execute(&self) -> Result<ClassificationReport> {
        let cfg = &self.config;

        // ── Step 1: Dataset ──────────────────────────────────────────────────
        println!("Loading 20newsgroups dataset");
        let source = cfg.corpus.source();
        let splits = prepare_splits(source.as_ref(), &cfg.corpus, cfg.train_size, cfg.test_size)?;

        // ── Step 2: Pretrained files ─────────────────────────────────────────
        let files    = PretrainedFiles::fetch(&cfg.model_name)?;
        let bert_cfg = read_bert_config(&files.config)?;
        let max_len  = clamp_seq_len(cfg.max_seq_len, bert_cfg.max_position_embeddings);
        let tokenizer = TokenizerStore::from_file(&files.tokenizer, max_len)?;

        // ── Step 3: Model ────────────────────────────────────────────────────
        let device = Device::default();
        println!("Using device: {:?}", device);
        let bert   = load_bert::<TrainBackend>(&bert_cfg, &files.weights, &device)?;
        let pooler = load_pooler::<TrainBackend>(&bert_cfg, &files.weights, &device)?;
        let model  = BertClassifierConfig::new(bert_cfg.clone(), splits.num_classes())
            .init_with(bert, pooler, &device);

        // ── Steps 4–7 ────────────────────────────────────────────────────────
        run_classifier(cfg, splits, &bert_cfg, model, tokenizer, &device)
    }
}

/// Sequence length the model can actually accept.
pub(crate) fn clamp_seq_len(requested: usize, max_positions: usize) -> usize {
    if requested > max_positions {
        tracing::warn!(
            "max_seq_len {} exceeds the model's {} positions; using {}",
            requested, max_positions, max_positions
        );
        max_positions
    } else {
        requested
    }
}

fn encode_documents(docs: &[Document], tokenizer: &TokenizerStore) -> Result<ClassificationDataset> {
    let mut truncated = 0usize;
    let samples = docs
        .iter()
        .map(|d| {
            let enc = tokenizer.encode_padded(&d.text)?;
            if enc.real_tokens() == tokenizer.max_len() {
                truncated += 1;
            }
            Ok(ClassificationSample::new(enc, d.label))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!("{} of {} documents fill the whole sequence", truncated, docs.len());
    Ok(ClassificationDataset::new(samples))
}

/// Fine-tune, evaluate and save. Returns the test-set report.
pub fn run_classifier<B: AutodiffBackend>(
    cfg:       &ClassifierConfig,
    splits:    PreparedSplits,
    bert_cfg:  &BertConfig,
    model:     BertClassifier<B>,
    tokenizer: TokenizerStore,
    device:    &B::Device,
) -> Result<ClassificationReport> {
    let output_dir = PathBuf::from(&cfg.output_dir);
    let store      = ArtifactStore::create(&output_dir)?;
    let metrics    = MetricsLogger::new(&output_dir)?;

    // ── Step 4: Tokenise ─────────────────────────────────────────────────────
    let train_dataset = encode_documents(&splits.train, &tokenizer)?;
    let test_dataset  = encode_documents(&splits.test, &tokenizer)?;
    tracing::info!("Tokenised {} train / {} test documents", splits.train.len(), splits.test.len());

    // ── Step 5: Fine-tune ────────────────────────────────────────────────────
    println!("\nTraining BERT Model");
    let model = train_classifier(&cfg.fine_tune(), model, train_dataset, device, &metrics)?;

    // ── Step 6: Evaluate (inner backend, dropout off) ────────────────────────
    println!("\nTesting BERT Model");
    let model = model.valid();
    let (predictions, truths) = evaluate_classifier(&model, test_dataset, cfg.batch_size, device);
    let report = ClassificationReport::compute(&truths, &predictions, &splits.label_names)?;

    println!("\nTest Accuracy: {:.4}", report.accuracy);
    println!("\nClassification Report:");
    println!("{report}");

    // ── Step 7: Save ─────────────────────────────────────────────────────────
    store.save_manifest(&ArtifactManifest {
        kind:        ArtifactKind::Classifier,
        base_model:  cfg.model_name.clone(),
        label_names: splits.label_names.clone(),
        bert:        bert_cfg.clone(),
        max_seq_len: tokenizer.max_len(),
        training:    serde_json::to_value(cfg)?,
    })?;
    store.save_module::<B::InnerBackend, _>(MODEL_RECORD, &model)?;
    tokenizer.save(store.dir())?;
    report.save(store.dir())?;

    println!("\nModel saved to '{}'", output_dir.display());
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infra::{artifact::MANIFEST_FILE, tokenizer_store::test_tokenizer};
    use crate::ml::bert::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};

    type TrainBackend = Autodiff<NdArray>;

    pub(crate) fn tiny_splits() -> PreparedSplits {
        let doc = |text: &str, label| Document::new("test", text, label);
        PreparedSplits {
            train: vec![
                doc("nasa space mission mars", 2),
                doc("the hockey team won", 1),
                doc("graphics card gpu", 0),
                doc("space mars nasa", 2),
                doc("hockey game won", 1),
                doc("gpu graphics", 0),
            ],
            test: vec![
                doc("mars space", 2),
                doc("the hockey game", 1),
                doc("mars nasa mission", 2),
            ],
            label_names: vec!["comp.graphics".into(), "rec.sport.hockey".into(), "sci.space".into()],
        }
    }

    #[test]
    fn test_clamp_seq_len() {
        assert_eq!(clamp_seq_len(512, 512), 512);
        assert_eq!(clamp_seq_len(600, 512), 512);
        assert_eq!(clamp_seq_len(128, 512), 128);
    }

    #[test]
    fn test_run_classifier_writes_artifact() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let cfg = ClassifierConfig {
            output_dir: dir.path().to_string_lossy().to_string(),
            max_seq_len: 8,
            batch_size: 2,
            epochs: 1,
            learning_rate: 1e-3,
            ..ClassifierConfig::default()
        };

        let model: BertClassifier<TrainBackend> =
            BertClassifierConfig::new(tiny_config(), 3).init(&device);
        let tokenizer = TokenizerStore::new(test_tokenizer(), cfg.max_seq_len).unwrap();

        let report = run_classifier(&cfg, tiny_splits(), &tiny_config(), model, tokenizer, &device).unwrap();
        // only labels present in the test subset are reported
        assert_eq!(report.labels(), vec![1, 2]);
        assert_eq!(report.total, 3);

        let manifest = ArtifactStore::open(dir.path()).unwrap().load_manifest().unwrap();
        assert_eq!(manifest.kind, ArtifactKind::Classifier);
        assert_eq!(manifest.max_seq_len, 8);
        assert_eq!(manifest.training["epochs"], 1);
        for file in [MANIFEST_FILE, "tokenizer.json", "metrics.csv", "report.json"] {
            assert!(dir.path().join(file).is_file(), "{file}");
        }
    }
}
