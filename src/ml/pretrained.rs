// ============================================================
// Layer 5 — Pretrained Checkpoint Import
// ============================================================
// Resolves a model id to the three files a fine-tuning run needs
// and imports the PyTorch weights into the burn modules:
//
//   config.json        → BertConfig
//   tokenizer.json     → tokenizers::Tokenizer (infra)
//   pytorch_model.bin  → BertModelRecord (+ BertPoolerRecord)
//
// The model id is either a local directory holding those files
// or a Hugging Face Hub repo (downloaded into the HF cache).
//
// Hugging Face key                               burn key
//   bert.embeddings.LayerNorm.{gamma,weight}  →  embeddings.layer_norm.weight
//   encoder.layer.N.attention.self.query      →  layers.N.attention.query
//   encoder.layer.N.attention.output.dense    →  layers.N.attention.output
//   encoder.layer.N.attention.output.LayerNorm→  layers.N.attention_norm
//   encoder.layer.N.intermediate.dense        →  layers.N.intermediate
//   encoder.layer.N.output.dense              →  layers.N.output
//   encoder.layer.N.output.LayerNorm          →  layers.N.output_norm
//   pooler.dense                              →  dense (pooler record)
//
// Linear weights are transposed and LayerNorm weight/bias renamed
// to gamma/beta by burn-import itself.

use anyhow::{bail, Context, Result};
use burn::{
    module::Module,
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ml::bert::{BertConfig, BertModel, BertModelRecord};
use crate::ml::classifier::{BertPooler, BertPoolerConfig, BertPoolerRecord};

pub const CONFIG_FILE:    &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE:   &str = "pytorch_model.bin";

const ENCODER_KEY_REMAP: [(&str, &str); 10] = [
    (r"^bert\.", ""),
    (r"\.gamma$", ".weight"),
    (r"\.beta$", ".bias"),
    (r"^embeddings\.LayerNorm", "embeddings.layer_norm"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)", "layers.$1.attention.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm", "layers.$1.attention_norm"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense", "layers.$1.attention.output"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense", "layers.$1.intermediate"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm", "layers.$1.output_norm"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense", "layers.$1.output"),
];

const POOLER_KEY_REMAP: [(&str, &str); 1] = [(r"^(bert\.)?pooler\.dense", "dense")];

/// Local paths of a pretrained model's files.
#[derive(Debug, Clone)]
pub struct PretrainedFiles {
    pub config:    PathBuf,
    pub tokenizer: PathBuf,
    pub weights:   PathBuf,
}

impl PretrainedFiles {
    pub fn fetch(model_id: &str) -> Result<Self> {
        let local = Path::new(model_id);
        if local.is_dir() {
            tracing::info!("Using local pretrained model at '{}'", local.display());
            let files = Self {
                config:    local.join(CONFIG_FILE),
                tokenizer: local.join(TOKENIZER_FILE),
                weights:   local.join(WEIGHTS_FILE),
            };
            for path in [&files.config, &files.tokenizer, &files.weights] {
                if !path.exists() {
                    bail!("Pretrained model directory is missing '{}'", path.display());
                }
            }
            return Ok(files);
        }

        tracing::info!("Fetching '{}' from the Hugging Face Hub", model_id);
        let api  = Api::new().context("Cannot initialise the Hugging Face Hub client")?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            "main".to_string(),
        ));
        let get = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Cannot download '{file}' from '{model_id}'"))
        };

        Ok(Self {
            config:    get(CONFIG_FILE)?,
            tokenizer: get(TOKENIZER_FILE)?,
            weights:   get(WEIGHTS_FILE)?,
        })
    }
}

// ─── config.json ─────────────────────────────────────────────────────────────
// Only the fields the encoder needs; defaults follow BERT-base.
#[derive(Debug, Deserialize)]
struct HfBertConfig {
    vocab_size:              usize,
    hidden_size:             usize,
    num_hidden_layers:       usize,
    num_attention_heads:     usize,
    intermediate_size:       usize,
    #[serde(default = "default_max_positions")]
    max_position_embeddings: usize,
    #[serde(default = "default_type_vocab")]
    type_vocab_size:         usize,
    #[serde(default = "default_layer_norm_eps")]
    layer_norm_eps:          f64,
    #[serde(default = "default_dropout")]
    hidden_dropout_prob:     f64,
    #[serde(default = "default_dropout")]
    attention_probs_dropout_prob: f64,
    #[serde(default)]
    hidden_act:              Option<String>,
}

fn default_max_positions() -> usize { 512 }
fn default_type_vocab() -> usize { 2 }
fn default_layer_norm_eps() -> f64 { 1e-12 }
fn default_dropout() -> f64 { 0.1 }

impl From<HfBertConfig> for BertConfig {
    fn from(c: HfBertConfig) -> Self {
        BertConfig::new(
            c.vocab_size,
            c.hidden_size,
            c.num_hidden_layers,
            c.num_attention_heads,
            c.intermediate_size,
            c.max_position_embeddings,
        )
        .with_type_vocab_size(c.type_vocab_size)
        .with_layer_norm_eps(c.layer_norm_eps)
        .with_hidden_dropout_prob(c.hidden_dropout_prob)
        .with_attention_probs_dropout_prob(c.attention_probs_dropout_prob)
    }
}

pub fn read_bert_config(path: &Path) -> Result<BertConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
    parse_bert_config(&json)
        .with_context(|| format!("Invalid model config '{}'", path.display()))
}

fn parse_bert_config(json: &str) -> Result<BertConfig> {
    let hf: HfBertConfig = serde_json::from_str(json)?;
    if let Some(act) = hf.hidden_act.as_deref() {
        if act != "gelu" {
            tracing::warn!("Checkpoint uses activation '{}'; the encoder always applies GELU", act);
        }
    }
    if hf.hidden_size % hf.num_attention_heads != 0 {
        bail!(
            "hidden_size {} is not divisible by num_attention_heads {}",
            hf.hidden_size, hf.num_attention_heads
        );
    }
    Ok(hf.into())
}

fn load_args(weights: &Path, remap: &[(&str, &str)]) -> LoadArgs {
    remap
        .iter()
        .fold(LoadArgs::new(weights.to_path_buf()), |args, (pattern, replacement)| {
            args.with_key_remap(pattern, replacement)
        })
}

/// Build the encoder from `config` and fill it with pretrained weights.
pub fn load_bert<B: Backend>(
    config:  &BertConfig,
    weights: &Path,
    device:  &B::Device,
) -> Result<BertModel<B>> {
    let record: BertModelRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(load_args(weights, &ENCODER_KEY_REMAP), device)
        .with_context(|| format!("Cannot import encoder weights from '{}'", weights.display()))?;

    tracing::info!(
        "Imported {} encoder layers (hidden={}) from '{}'",
        config.num_hidden_layers,
        config.hidden_size,
        weights.display()
    );
    Ok(config.init::<B>(device).load_record(record))
}

/// Load the pretrained pooler (`tanh(dense(h_CLS))`).
pub fn load_pooler<B: Backend>(
    config:  &BertConfig,
    weights: &Path,
    device:  &B::Device,
) -> Result<BertPooler<B>> {
    let record: BertPoolerRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(load_args(weights, &POOLER_KEY_REMAP), device)
        .with_context(|| format!("Cannot import pooler weights from '{}'", weights.display()))?;

    Ok(BertPoolerConfig::new(config.hidden_size)
        .init::<B>(device)
        .load_record(record))
}
