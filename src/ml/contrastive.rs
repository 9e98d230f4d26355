// ============================================================
// Layer 5 — Contrastive Fine-Tuning
// ============================================================
// Fine-tunes a SentenceEncoder on labelled text pairs with the
// cosine similarity loss (target 1.0 for same-topic pairs, 0.0
// for different-topic pairs), then embeds arbitrary texts with
// the tuned encoder.
//
//   pair batch → encode both sides → MSE(cos(u, v), label)
//              → backward → clip → AdamW step (warmup schedule)

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{pad_sequences, PairBatcher},
    dataset::{EncodedText, PairDataset},
};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::schedule::{adamw_config, LinearWarmupSchedule};
use crate::ml::sentence::SentenceEncoder;
use crate::ml::trainer::FineTuneConfig;

pub fn fine_tune_encoder<B: AutodiffBackend>(
    cfg:     &FineTuneConfig,
    model:   SentenceEncoder<B>,
    dataset: PairDataset,
    pad_id:  u32,
    device:  &B::Device,
    metrics: &MetricsLogger,
) -> Result<SentenceEncoder<B>> {
    let n_pairs = dataset.len();
    if n_pairs == 0 {
        bail!("No training pairs to fine-tune on");
    }
    if cfg.batch_size == 0 {
        bail!("batch_size must be at least 1");
    }

    let batcher = PairBatcher::<B>::new(device.clone(), pad_id);
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    let total_steps  = cfg.steps_per_epoch(n_pairs) * cfg.epochs;
    let mut schedule = LinearWarmupSchedule::new(cfg.learning_rate, cfg.warmup_steps, total_steps);
    let mut optim    = adamw_config(cfg.weight_decay, cfg.max_grad_norm).init();
    let mut model    = model;

    tracing::info!(
        "Fine-tuning sentence encoder: {} pairs, {} epochs, {} steps ({} warmup)",
        n_pairs, cfg.epochs, total_steps, cfg.warmup_steps
    );

    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let loss = model.forward_pair_loss(
                batch.left_ids,
                batch.left_mask,
                batch.right_ids,
                batch.right_mask,
                batch.labels,
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;
            tracing::debug!("step {} loss={:.4}", schedule.steps_taken() + 1, loss_val);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.next_lr(), model, grads);
        }

        let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        println!("Epoch {:>2}/{} | cosine_loss={:.4}", epoch, cfg.epochs, avg_loss);
        metrics.log(&EpochMetrics::new(epoch, avg_loss, None))?;
    }

    tracing::info!("Sentence encoder fine-tuning complete, metrics in '{}'", metrics.csv_path().display());
    Ok(model)
}

/// Embed pre-tokenised texts in batches. Returns one row per text.
pub fn embed_texts<B: Backend>(
    model:      &SentenceEncoder<B>,
    encoded:    &[EncodedText],
    pad_id:     u32,
    batch_size: usize,
    device:     &B::Device,
) -> Vec<Vec<f32>> {
    let mut rows = Vec::with_capacity(encoded.len());

    for chunk in encoded.chunks(batch_size.max(1)) {
        let seqs: Vec<&[u32]> = chunk.iter().map(|e| e.ids.as_slice()).collect();
        let (ids, mask) = pad_sequences::<B>(&seqs, pad_id, device);

        let embeddings = model.forward(ids, mask);
        let [_, dim]   = embeddings.dims();
        let flat: Vec<f32> = embeddings.into_data().iter::<f32>().collect();
        rows.extend(flat.chunks(dim).map(|r| r.to_vec()));
    }

    rows
}
