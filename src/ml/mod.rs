// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific code: model
// architectures, training loops and inference.
//
// What's in this layer:
//
//   bert.rs        — BERT encoder (embeddings, post-LN layers)
//   classifier.rs  — pooler + dropout + linear head
//   sentence.rs    — mean-pooled, L2-normalised sentence encoder
//                    and the cosine similarity loss
//   probe.rs       — multinomial logistic regression on
//                    frozen embeddings
//   schedule.rs    — AdamW settings and linear warmup schedule
//   pretrained.rs  — Hugging Face checkpoint download / import
//   trainer.rs     — classifier fine-tuning + evaluation
//   contrastive.rs — pair fine-tuning + batched embedding
//   inferencer.rs  — rebuild a saved artifact and predict
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT
//            Reimers & Gurevych (2019) Sentence-BERT

pub mod bert;
pub mod classifier;
pub mod sentence;
pub mod probe;
pub mod schedule;
pub mod pretrained;
pub mod trainer;
pub mod contrastive;
pub mod inferencer;

/// Backend used for fine-tuning (gradients enabled)
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend used for evaluation and prediction
pub type InferBackend = burn::backend::Wgpu;

pub type Device = burn::backend::wgpu::WgpuDevice;
