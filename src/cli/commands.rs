// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `classifier`, `embedding` and
// `predict`, and all their configurable flags. Every default is
// the value the reference training runs used.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    classifier_use_case::ClassifierConfig,
    embedding_use_case::{default_example_sentences, EmbeddingConfig},
};
use crate::data::{loader::DEFAULT_DATASET_REPO, pairs::DEFAULT_MAX_ATTEMPTS, prepare::CorpusConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a BERT sequence classifier (Pipeline A)
    Classifier(ClassifierArgs),

    /// Fine-tune a sentence encoder on topic pairs, then fit a linear probe (Pipeline B)
    Embedding(EmbeddingArgs),

    /// Classify text with a saved model directory
    Predict(PredictArgs),
}

/// Where the corpus comes from and how it is split
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Hugging Face Hub dataset repo with train.jsonl / test.jsonl
    #[arg(long, default_value = DEFAULT_DATASET_REPO)]
    pub dataset_repo: String,

    /// Read a local raw 20news-bydate directory instead of the Hub copy
    #[arg(long)]
    pub corpus_dir: Option<String>,

    /// Fraction of the corpus held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for shuffling, splitting, pair sampling and batching
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<CorpusArgs> for CorpusConfig {
    fn from(a: CorpusArgs) -> Self {
        CorpusConfig {
            dataset_repo:  a.dataset_repo,
            corpus_dir:    a.corpus_dir,
            test_fraction: a.test_fraction,
            seed:          a.seed,
        }
    }
}

/// All arguments for the `classifier` command.
#[derive(Args, Debug)]
pub struct ClassifierArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Pretrained model id on the Hub, or a local directory
    #[arg(long, default_value = "bert-base-uncased")]
    pub model: String,

    /// Where the fine-tuned model, tokenizer and reports are written
    #[arg(long, default_value = "./bert_20newsgroups_model")]
    pub output_dir: String,

    /// Number of training documents used after the split
    #[arg(long, default_value_t = 1000)]
    pub train_size: usize,

    /// Number of test documents used after the split
    #[arg(long, default_value_t = 400)]
    pub test_size: usize,

    /// Tokens per input; longer texts are truncated, shorter padded
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Peak AdamW learning rate
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Linear warmup steps before the linear decay
    #[arg(long, default_value_t = 0)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Gradient norm clipping threshold
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,
}

/// Convert CLI ClassifierArgs into the application-layer config.
/// The application layer never sees clap types.
impl From<ClassifierArgs> for ClassifierConfig {
    fn from(a: ClassifierArgs) -> Self {
        ClassifierConfig {
            corpus:        a.corpus.into(),
            model_name:    a.model,
            output_dir:    a.output_dir,
            train_size:    a.train_size,
            test_size:     a.test_size,
            max_seq_len:   a.max_seq_len,
            batch_size:    a.batch_size,
            epochs:        a.epochs,
            learning_rate: a.lr,
            warmup_steps:  a.warmup_steps,
            weight_decay:  a.weight_decay,
            max_grad_norm: a.max_grad_norm,
        }
    }
}

/// All arguments for the `embedding` command.
#[derive(Args, Debug)]
pub struct EmbeddingArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Pretrained sentence-embedding model id on the Hub, or a local directory
    #[arg(long, default_value = "sentence-transformers/all-MiniLM-L6-v2")]
    pub model: String,

    #[arg(long, default_value = "./sbert_20newsgroups_model")]
    pub output_dir: String,

    #[arg(long, default_value_t = 2000)]
    pub train_size: usize,

    #[arg(long, default_value_t = 400)]
    pub test_size: usize,

    /// Sampling rounds; each adds one same-topic and one different-topic pair
    #[arg(long, default_value_t = 1000)]
    pub num_pairs: usize,

    /// Redraw limit per pair before sampling gives up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_pair_attempts: usize,

    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 100)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Batch size when embedding the train/test subsets
    #[arg(long, default_value_t = 32)]
    pub embed_batch_size: usize,

    /// Inverse L2 regularisation strength of the probe
    #[arg(long, default_value_t = 1.0)]
    pub probe_c: f64,

    #[arg(long, default_value_t = 1000)]
    pub probe_max_iter: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub probe_tolerance: f64,

    /// Sentence to classify after training (repeatable; replaces the built-in examples)
    #[arg(long = "example")]
    pub examples: Vec<String>,
}

impl From<EmbeddingArgs> for EmbeddingConfig {
    fn from(a: EmbeddingArgs) -> Self {
        let example_sentences = if a.examples.is_empty() {
            default_example_sentences()
        } else {
            a.examples
        };
        EmbeddingConfig {
            corpus:            a.corpus.into(),
            model_name:        a.model,
            output_dir:        a.output_dir,
            train_size:        a.train_size,
            test_size:         a.test_size,
            num_pairs:         a.num_pairs,
            max_pair_attempts: a.max_pair_attempts,
            max_seq_len:       a.max_seq_len,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            learning_rate:     a.lr,
            warmup_steps:      a.warmup_steps,
            weight_decay:      a.weight_decay,
            max_grad_norm:     a.max_grad_norm,
            embed_batch_size:  a.embed_batch_size,
            probe_c:           a.probe_c,
            probe_max_iter:    a.probe_max_iter,
            probe_tolerance:   a.probe_tolerance,
            example_sentences,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory written by `classifier` or `embedding`
    #[arg(long)]
    pub model_dir: String,

    /// Text to classify (repeatable)
    #[arg(long = "text", required = true)]
    pub texts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_classifier_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["newsgroups-finetune", "classifier"]).unwrap();
        let Commands::Classifier(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: ClassifierConfig = args.into();
        let expected = ClassifierConfig::default();
        assert_eq!(cfg.train_size, expected.train_size);
        assert_eq!(cfg.max_seq_len, expected.max_seq_len);
        assert_eq!(cfg.learning_rate, expected.learning_rate);
        assert_eq!(cfg.output_dir, expected.output_dir);
        assert_eq!(cfg.corpus.seed, 42);
        assert!(cfg.corpus.corpus_dir.is_none());
    }

    #[test]
    fn test_embedding_examples_override() {
        let cli = Cli::try_parse_from([
            "newsgroups-finetune", "embedding", "--example", "a car engine", "--num-pairs", "10",
        ])
        .unwrap();
        let Commands::Embedding(args) = cli.command else { panic!("wrong subcommand") };
        let cfg: EmbeddingConfig = args.into();
        assert_eq!(cfg.example_sentences, vec!["a car engine".to_string()]);
        assert_eq!(cfg.num_pairs, 10);
        assert_eq!(cfg.warmup_steps, 100);
    }

    #[test]
    fn test_predict_requires_text() {
        assert!(Cli::try_parse_from(["newsgroups-finetune", "predict", "--model-dir", "m"]).is_err());
        let cli = Cli::try_parse_from([
            "newsgroups-finetune", "predict", "--model-dir", "m", "--text", "a", "--text", "b",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("wrong subcommand") };
        assert_eq!(args.texts.len(), 2);
    }
}
