// ============================================================
// Layer 5 — Linear Probe
// ============================================================
// Multinomial logistic regression on frozen sentence embeddings.
//
//   logits = X · W + b
//   loss   = CE(logits, y) + ‖W‖² / (2 · C · n)
//
// C is the inverse regularisation strength. The bias is not
// penalised. Weights start at zero and are fitted full-batch
// with Adam until the loss changes by less than `tolerance`
// between iterations or `max_iter` is reached.

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    nn::{loss::CrossEntropyLossConfig, Initializer, Linear, LinearConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::ml::classifier::argmax_labels;

#[derive(Config, Debug)]
pub struct ProbeConfig {
    pub embedding_dim: usize,
    pub num_classes:   usize,
    #[config(default = 1.0)]
    pub inverse_regularization: f64,
    #[config(default = 1000)]
    pub max_iter:      usize,
    #[config(default = 1e-4)]
    pub tolerance:     f64,
    #[config(default = 0.05)]
    pub learning_rate: f64,
}

impl ProbeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearProbe<B> {
        LinearProbe {
            linear: LinearConfig::new(self.embedding_dim, self.num_classes)
                .with_initializer(Initializer::Zeros)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LinearProbe<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> LinearProbe<B> {
    /// features: [n, embedding_dim] → logits [n, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(features)
    }

    pub fn predict(&self, features: &[Vec<f32>], device: &B::Device) -> Result<Vec<usize>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        Ok(argmax_labels(self.forward(features_tensor(features, device)?)))
    }
}

/// Stack equal-length feature rows into an [n, d] tensor.
pub fn features_tensor<B: Backend>(features: &[Vec<f32>], device: &B::Device) -> Result<Tensor<B, 2>> {
    let dim = features.first().map(|f| f.len()).unwrap_or(0);
    if features.iter().any(|f| f.len() != dim) {
        bail!("Feature rows have inconsistent lengths (expected {dim})");
    }
    let flat: Vec<f32> = features.iter().flatten().copied().collect();
    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([features.len(), dim]))
}

/// Fit a probe on (features, labels). Returns the model on the
/// inference backend.
pub fn fit_probe<B: AutodiffBackend>(
    cfg:      &ProbeConfig,
    features: &[Vec<f32>],
    labels:   &[usize],
    device:   &B::Device,
) -> Result<LinearProbe<B::InnerBackend>> {
    if features.is_empty() {
        bail!("Cannot fit a probe on an empty training set");
    }
    if features.len() != labels.len() {
        bail!("Got {} feature rows but {} labels", features.len(), labels.len());
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= cfg.num_classes) {
        bail!("Label {bad} is out of range for {} classes", cfg.num_classes);
    }

    let n = features.len();
    let x = features_tensor::<B>(features, device)?;
    let label_ints: Vec<i32> = labels.iter().map(|&l| l as i32).collect();
    let y = Tensor::<B, 1, Int>::from_ints(label_ints.as_slice(), device);

    let penalty = 1.0 / (2.0 * cfg.inverse_regularization * n as f64);
    let ce      = CrossEntropyLossConfig::new().init(device);

    let mut probe: LinearProbe<B> = cfg.init(device);
    let mut optim     = AdamConfig::new().init();
    let mut prev_loss = f64::INFINITY;

    for iter in 1..=cfg.max_iter {
        let logits = probe.forward(x.clone());
        let weight = probe.linear.weight.val();
        let loss   = ce.forward(logits, y.clone()) + weight.powf_scalar(2.0).sum().mul_scalar(penalty);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &probe);
        probe = optim.step(cfg.learning_rate, probe, grads);

        if (prev_loss - loss_val).abs() < cfg.tolerance {
            tracing::debug!("Probe converged after {} iterations (loss={:.6})", iter, loss_val);
            break;
        }
        if iter == cfg.max_iter {
            tracing::warn!("Probe stopped at max_iter={} before converging (loss={:.6})", iter, loss_val);
        }
        prev_loss = loss_val;
    }

    Ok(probe.valid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TrainBackend = Autodiff<NdArray>;

    fn separable() -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels   = Vec::new();
        for i in 0..10 {
            let jitter = i as f32 * 0.01;
            features.push(vec![1.0 + jitter, 0.0, 0.0]);
            labels.push(0);
            features.push(vec![0.0, 1.0 - jitter, 0.0]);
            labels.push(1);
            features.push(vec![0.0, 0.0, 1.0 + jitter]);
            labels.push(2);
        }
        (features, labels)
    }

    #[test]
    fn test_probe_learns_separable_classes() {
        let device = Default::default();
        let (features, labels) = separable();
        let cfg   = ProbeConfig::new(3, 3).with_max_iter(300);
        let probe = fit_probe::<TrainBackend>(&cfg, &features, &labels, &device).unwrap();

        let preds = probe.predict(&features, &device).unwrap();
        assert_eq!(preds, labels);
    }

    #[test]
    fn test_zero_initialised_probe_is_uniform() {
        let device = Default::default();
        let probe: LinearProbe<NdArray> = ProbeConfig::new(4, 5).init(&device);
        let logits = probe.forward(Tensor::ones([2, 4], &device));
        let values: Vec<f32> = logits.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rejects_mismatched_inputs() {
        let device = Default::default();
        let cfg = ProbeConfig::new(2, 2);
        assert!(fit_probe::<TrainBackend>(&cfg, &[], &[], &device).is_err());
        assert!(fit_probe::<TrainBackend>(&cfg, &[vec![1.0, 0.0]], &[0, 1], &device).is_err());
        assert!(fit_probe::<TrainBackend>(&cfg, &[vec![1.0, 0.0]], &[7], &device).is_err());
    }

    #[test]
    fn test_features_tensor_shape_checks() {
        let device = Default::default();
        let t = features_tensor::<NdArray>(&[vec![1.0, 2.0], vec![3.0, 4.0]], &device).unwrap();
        assert_eq!(t.dims(), [2, 2]);
        assert!(features_tensor::<NdArray>(&[vec![1.0], vec![1.0, 2.0]], &device).is_err());
    }
}
