// ============================================================
// Layer 5 — Optimiser and Learning-Rate Schedule
// ============================================================
// Both fine-tuning loops use AdamW with gradient clipping and a
// linear warmup / linear decay schedule stepped once per batch:
//
//   lr(t) = base · t / warmup                       t < warmup
//   lr(t) = base · (total − t) / (total − warmup)   otherwise
//
// clamped at 0 once t reaches total.
//
// Reference: Loshchilov & Hutter (2019) Decoupled Weight Decay
//            Burn Book §5 (Optimizers)

use burn::{grad_clipping::GradientClippingConfig, optim::AdamWConfig};

/// AdamW with decoupled weight decay and per-parameter norm clipping.
pub fn adamw_config(weight_decay: f64, max_grad_norm: f64) -> AdamWConfig {
    AdamWConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(weight_decay as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(max_grad_norm as f32)))
}

#[derive(Debug, Clone)]
pub struct LinearWarmupSchedule {
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
    step:         usize,
}

impl LinearWarmupSchedule {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { base_lr, warmup_steps, total_steps, step: 0 }
    }

    /// Learning rate at step `t` without advancing the schedule.
    pub fn lr_at(&self, t: usize) -> f64 {
        if t < self.warmup_steps {
            return self.base_lr * t as f64 / self.warmup_steps as f64;
        }
        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1);
        let remaining   = self.total_steps.saturating_sub(t);
        self.base_lr * remaining as f64 / decay_steps as f64
    }

    /// Rate for the current step, then advance.
    pub fn next_lr(&mut self) -> f64 {
        let lr = self.lr_at(self.step);
        self.step += 1;
        lr
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }
}
