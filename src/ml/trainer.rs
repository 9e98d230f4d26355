// ============================================================
// Layer 5 — Classifier Training Loop
// ============================================================
// Fine-tunes a BertClassifier with Burn's DataLoader and AdamW,
// then evaluates it on the held-out subset.
//
// Per batch:
//   forward → cross-entropy → backward → clip → AdamW step
//   (learning rate taken from the linear schedule each step)
//
// Per epoch: mean train loss and train accuracy are printed and
// appended to metrics.csv. There is no validation-driven control
// flow; the run always completes `epochs` passes.
//
// Key Burn insight:
//   - Training uses an AutodiffBackend for gradients
//   - model.valid() returns the model on the inner backend, with
//     dropout disabled, for evaluation
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::ClassificationBatcher,
    dataset::ClassificationDataset,
};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::classifier::BertClassifier;
use crate::ml::schedule::{adamw_config, LinearWarmupSchedule};

/// Optimisation settings shared by both fine-tuning loops.
#[derive(Config, Debug)]
pub struct FineTuneConfig {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    #[config(default = 0)]
    pub warmup_steps:  usize,
    #[config(default = 0.01)]
    pub weight_decay:  f64,
    #[config(default = 1.0)]
    pub max_grad_norm: f64,
    #[config(default = 42)]
    pub seed:          u64,
}

impl FineTuneConfig {
    /// Optimiser steps in one pass over `n` samples.
    pub fn steps_per_epoch(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size.max(1))
    }
}

pub fn train_classifier<B: AutodiffBackend>(
    cfg:     &FineTuneConfig,
    model:   BertClassifier<B>,
    dataset: ClassificationDataset,
    device:  &B::Device,
    metrics: &MetricsLogger,
) -> Result<BertClassifier<B>> {
    let n_samples = dataset.len();
    if n_samples == 0 {
        bail!("Training set is empty");
    }
    if cfg.batch_size == 0 {
        bail!("batch_size must be at least 1");
    }

    // ── Training data loader (shuffled every epoch) ──────────────────────────
    let batcher = ClassificationBatcher::<B>::new(device.clone());
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    // ── AdamW + linear schedule ───────────────────────────────────────────────
    let total_steps  = cfg.steps_per_epoch(n_samples) * cfg.epochs;
    let mut schedule = LinearWarmupSchedule::new(cfg.learning_rate, cfg.warmup_steps, total_steps);
    let mut optim    = adamw_config(cfg.weight_decay, cfg.max_grad_norm).init();
    let mut model    = model;

    tracing::info!(
        "Fine-tuning classifier: {} samples, {} epochs, {} steps",
        n_samples, cfg.epochs, total_steps
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;

        for batch in loader.iter() {
            let (loss, logits) = model.forward_loss(
                batch.input_ids,
                batch.attention_mask,
                batch.labels.clone(),
            );

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            // argmax(1) returns shape [batch, 1]; flatten to [batch]
            let batch_correct: i64 = logits
                .argmax(1)
                .flatten::<1>(0, 1)
                .equal(batch.labels)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();
            correct += batch_correct as usize;

            // Backward pass + clipped AdamW update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.next_lr(), model, grads);
        }

        let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let accuracy = correct as f64 / n_samples as f64;

        println!(
            "Epoch {:>2}/{} | train_loss={:.4} | train_acc={:.1}%",
            epoch, cfg.epochs, avg_loss, accuracy * 100.0,
        );
        metrics.log(&EpochMetrics::new(epoch, avg_loss, Some(accuracy)))?;
    }

    tracing::info!("Classifier fine-tuning complete, metrics in '{}'", metrics.csv_path().display());
    Ok(model)
}

/// Run `model` over `dataset` in order. Returns (predictions, ground truth).
pub fn evaluate_classifier<B: Backend>(
    model:      &BertClassifier<B>,
    dataset:    ClassificationDataset,
    batch_size: usize,
    device:     &B::Device,
) -> (Vec<usize>, Vec<usize>) {
    let batcher = ClassificationBatcher::<B>::new(device.clone());
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size.max(1))
        .build(dataset);

    let mut predictions = Vec::new();
    let mut truths      = Vec::new();

    for batch in loader.iter() {
        predictions.extend(model.predict(batch.input_ids, batch.attention_mask));
        truths.extend(batch.labels.into_data().iter::<i64>().map(|v| v as usize));
    }

    (predictions, truths)
}
