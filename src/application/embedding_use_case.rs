// ============================================================
// Layer 2 — EmbeddingUseCase (Pipeline B)
// ============================================================
// Orchestrates sentence-embedding fine-tuning plus a linear probe:
//
//   Step 1: Load, shuffle, split, subset        (Layer 4 - data)
//   Step 2: Fetch + import the pretrained model (Layer 5 - ml)
//   Step 3: Sample same/different-topic pairs   (Layer 4 - data)
//   Step 4: Contrastive fine-tuning             (Layer 5 - ml)
//   Step 5: Embed train and test subsets        (Layer 5 - ml)
//   Step 6: Fit the probe, evaluate             (Layer 5 / 6)
//   Step 7: Save the artifact directory         (Layer 6 - infra)
//   Step 8: Classify the example sentences      (Layer 5 - ml)

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::{PairDataset, PairSample},
    pairs::{PairSampler, DEFAULT_MAX_ATTEMPTS},
    prepare::{prepare_splits, CorpusConfig, PreparedSplits},
};
use crate::domain::{
    document::{label_name, Document},
    pair::PairExample,
    traits::TextClassifier,
};
use crate::infra::{
    artifact::{ArtifactKind, ArtifactManifest, ArtifactStore, MODEL_RECORD, PROBE_RECORD},
    metrics::MetricsLogger,
    report::ClassificationReport,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    bert::BertConfig,
    contrastive::{embed_texts, fine_tune_encoder},
    inferencer::ProbeInferencer,
    pretrained::{load_bert, read_bert_config, PretrainedFiles},
    probe::{fit_probe, ProbeConfig},
    sentence::{SentenceEncoder, SentenceEncoderConfig},
    trainer::FineTuneConfig,
    Device, TrainBackend,
};

use super::classifier_use_case::clamp_seq_len;

pub fn default_example_sentences() -> Vec<String> {
    vec![
        "NASA launched a new space mission to Mars.".to_string(),
        "The hockey team won the championship game.".to_string(),
        "New graphics card released with improved performance.".to_string(),
    ]
}

// ─── Configuration ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub corpus:            CorpusConfig,
    pub model_name:        String,
    pub output_dir:        String,
    pub train_size:        usize,
    pub test_size:         usize,
    /// Rounds of (same-class, different-class) pairs
    pub num_pairs:         usize,
    pub max_pair_attempts: usize,
    pub max_seq_len:       usize,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub learning_rate:     f64,
    pub warmup_steps:      usize,
    pub weight_decay:      f64,
    pub max_grad_norm:     f64,
    pub embed_batch_size:  usize,
    /// Inverse L2 regularisation strength of the probe
    pub probe_c:           f64,
    pub probe_max_iter:    usize,
    pub probe_tolerance:   f64,
    pub example_sentences: Vec<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            corpus:            CorpusConfig::default(),
            model_name:        "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            output_dir:        "./sbert_20newsgroups_model".to_string(),
            train_size:        2000,
            test_size:         400,
            num_pairs:         1000,
            max_pair_attempts: DEFAULT_MAX_ATTEMPTS,
            max_seq_len:       256,
            batch_size:        16,
            epochs:            1,
            learning_rate:     2e-5,
            warmup_steps:      100,
            weight_decay:      0.01,
            max_grad_norm:     1.0,
            embed_batch_size:  32,
            probe_c:           1.0,
            probe_max_iter:    1000,
            probe_tolerance:   1e-4,
            example_sentences: default_example_sentences(),
        }
    }
}

impl EmbeddingConfig {
    fn fine_tune(&self) -> FineTuneConfig {
        FineTuneConfig::new(self.epochs, self.batch_size, self.learning_rate)
            .with_warmup_steps(self.warmup_steps)
            .with_weight_decay(self.weight_decay)
            .with_max_grad_norm(self.max_grad_norm)
            .with_seed(self.corpus.seed)
    }

    fn probe(&self, embedding_dim: usize, num_classes: usize) -> ProbeConfig {
        ProbeConfig::new(embedding_dim, num_classes)
            .with_inverse_regularization(self.probe_c)
            .with_max_iter(self.probe_max_iter)
            .with_tolerance(self.probe_tolerance)
    }
}

/// What a finished embedding run reports back.
#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    pub report:   ClassificationReport,
    /// (sentence, predicted category) for each example sentence
    pub examples: Vec<(String, String)>,
}

// ─── EmbeddingUseCase ────────────────────────────────────────────────────────
pub struct EmbeddingUseCase {
    config: EmbeddingConfig,
}

impl EmbeddingUseCase {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EmbeddingOutcome> {
        let cfg = &self.config;

        // ── Step 1: Dataset ──────────────────────────────────────────────────
        println!("Loading 20newsgroups dataset");
        let source = cfg.corpus.source();
        let splits = prepare_splits(source.as_ref(), &cfg.corpus, cfg.train_size, cfg.test_size)?;

        // ── Step 2: Pretrained sentence encoder ──────────────────────────────
        let files    = PretrainedFiles::fetch(&cfg.model_name)?;
        let bert_cfg = read_bert_config(&files.config)?;
        let max_len  = clamp_seq_len(cfg.max_seq_len, bert_cfg.max_position_embeddings);
        let tokenizer = TokenizerStore::from_file(&files.tokenizer, max_len)?;

        let device  = Device::default();
        println!("Using device: {:?}", device);
        let bert    = load_bert::<TrainBackend>(&bert_cfg, &files.weights, &device)?;
        let encoder = SentenceEncoderConfig::new(bert_cfg.clone()).init_with(bert);

        run_embedding(cfg, splits, &bert_cfg, encoder, tokenizer, &device)
    }
}

fn encode_pairs(pairs: &[PairExample], tokenizer: &TokenizerStore) -> Result<PairDataset> {
    let samples = pairs
        .iter()
        .map(|p| {
            Ok(PairSample {
                left:  tokenizer.encode(&p.text_a)?.ids,
                right: tokenizer.encode(&p.text_b)?.ids,
                label: p.label,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(PairDataset::new(samples))
}

fn texts(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.text.clone()).collect()
}

fn labels(docs: &[Document]) -> Vec<usize> {
    docs.iter().map(|d| d.label).collect()
}

/// Steps 3–8, generic over the training backend.
pub fn run_embedding<B: AutodiffBackend>(
    cfg:       &EmbeddingConfig,
    splits:    PreparedSplits,
    bert_cfg:  &BertConfig,
    encoder:   SentenceEncoder<B>,
    tokenizer: TokenizerStore,
    device:    &B::Device,
) -> Result<EmbeddingOutcome> {
    let output_dir = PathBuf::from(&cfg.output_dir);
    let store      = ArtifactStore::create(&output_dir)?;
    let metrics    = MetricsLogger::new(&output_dir)?;

    // ── Step 3: Pairs ────────────────────────────────────────────────────────
    println!("\n=== Creating training pairs for fine-tuning ===");
    let pairs = PairSampler::new(cfg.corpus.seed)
        .with_max_attempts(cfg.max_pair_attempts)
        .sample(&splits.train, cfg.num_pairs)?;
    tracing::info!(
        "Created {} training pairs ({} same-topic)",
        pairs.len(),
        pairs.iter().filter(|p| p.is_positive()).count()
    );
    let pair_dataset = encode_pairs(&pairs, &tokenizer)?;

    // ── Step 4: Contrastive fine-tuning ──────────────────────────────────────
    println!("\nFine-tuning SBERT Model");
    let encoder = fine_tune_encoder(
        &cfg.fine_tune(),
        encoder,
        pair_dataset,
        tokenizer.pad_id(),
        device,
        &metrics,
    )?;
    println!("Fine-tuning completed!");

    // ── Step 5: Embeddings (inner backend, dropout off) ──────────────────────
    println!("\nGenerating embeddings for classification");
    let encoder = encoder.valid();

    println!("Encoding training texts...");
    let train_encoded = tokenizer.encode_all(&texts(&splits.train))?;
    let train_emb = embed_texts(&encoder, &train_encoded, tokenizer.pad_id(), cfg.embed_batch_size, device);

    println!("Encoding test texts...");
    let test_encoded = tokenizer.encode_all(&texts(&splits.test))?;
    let test_emb = embed_texts(&encoder, &test_encoded, tokenizer.pad_id(), cfg.embed_batch_size, device);

    let dim = bert_cfg.hidden_size;
    println!("Train embeddings shape: ({}, {})", train_emb.len(), dim);
    println!("Test embeddings shape: ({}, {})", test_emb.len(), dim);

    // ── Step 6: Probe + evaluation ───────────────────────────────────────────
    println!("\nTraining Logistic Regression Classifier");
    let probe_cfg = cfg.probe(dim, splits.num_classes());
    let probe = fit_probe::<B>(&probe_cfg, &train_emb, &labels(&splits.train), device)?;

    println!("\nTesting SBERT Model");
    let predictions = probe.predict(&test_emb, device)?;
    let report = ClassificationReport::compute(&labels(&splits.test), &predictions, &splits.label_names)?;

    println!("\nTest Accuracy: {:.4}", report.accuracy);
    println!("\nClassification Report:");
    println!("{report}");

    // ── Step 7: Save ─────────────────────────────────────────────────────────
    store.save_manifest(&ArtifactManifest {
        kind:        ArtifactKind::Embedding,
        base_model:  cfg.model_name.clone(),
        label_names: splits.label_names.clone(),
        bert:        bert_cfg.clone(),
        max_seq_len: tokenizer.max_len(),
        training:    serde_json::to_value(cfg)?,
    })?;
    store.save_module::<B::InnerBackend, _>(MODEL_RECORD, &encoder)?;
    store.save_module::<B::InnerBackend, _>(PROBE_RECORD, &probe)?;
    tokenizer.save(store.dir())?;
    report.save(store.dir())?;
    println!("\nSentence-BERT model saved to '{}'", output_dir.display());

    // ── Step 8: Example sentences ────────────────────────────────────────────
    println!("\n=== Testing with example sentences ===");
    let inferencer = ProbeInferencer::new(
        encoder,
        probe,
        tokenizer,
        splits.label_names,
        device.clone(),
    );
    let predicted = inferencer.predict(&cfg.example_sentences)?;
    let examples: Vec<(String, String)> = cfg
        .example_sentences
        .iter()
        .zip(predicted)
        .map(|(text, label)| (text.clone(), label_name(inferencer.label_names(), label)))
        .collect();
    for (text, category) in &examples {
        println!("Text: {text}");
        println!("Predicted category: {category}\n");
    }

    Ok(EmbeddingOutcome { report, examples })
}
