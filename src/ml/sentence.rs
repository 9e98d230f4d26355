// ============================================================
// Layer 5 — Sentence Encoder
// ============================================================
// Turns a BERT encoder into a sentence-embedding model:
//
//   hidden   = BERT(input_ids)                 [batch, seq, d]
//   mean     = Σ_t mask_t · hidden_t / Σ_t mask_t
//   embedding = mean / ‖mean‖₂                 [batch, d]
//
// Fine-tuning uses the cosine similarity loss:
//   loss = mean( (cos(u_i, v_i) − label_i)² )

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};

use crate::ml::bert::{BertConfig, BertModel};

#[derive(Config, Debug)]
pub struct SentenceEncoderConfig {
    pub bert: BertConfig,
    #[config(default = true)]
    pub normalize: bool,
}

impl SentenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentenceEncoder<B> {
        self.init_with(self.bert.init(device))
    }

    pub fn init_with<B: Backend>(&self, bert: BertModel<B>) -> SentenceEncoder<B> {
        SentenceEncoder { bert, normalize: self.normalize }
    }
}

#[derive(Module, Debug)]
pub struct SentenceEncoder<B: Backend> {
    pub bert:      BertModel<B>,
    pub normalize: bool,
}

impl<B: Backend> SentenceEncoder<B> {
    /// input_ids, attention_mask: [batch, seq_len] → embeddings [batch, hidden]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let hidden  = self.bert.forward(input_ids, attention_mask.clone());
        let pooled  = mean_pool(hidden, attention_mask);
        if self.normalize {
            l2_normalize(pooled)
        } else {
            pooled
        }
    }

    /// Cosine similarity loss for a batch of pairs.
    pub fn forward_pair_loss(
        &self,
        left_ids:   Tensor<B, 2, Int>,
        left_mask:  Tensor<B, 2, Int>,
        right_ids:  Tensor<B, 2, Int>,
        right_mask: Tensor<B, 2, Int>,
        labels:     Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        let u = self.forward(left_ids, left_mask);
        let v = self.forward(right_ids, right_mask);
        cosine_similarity_loss(u, v, labels)
    }
}

/// Attention-masked mean over the sequence dimension.
pub fn mean_pool<B: Backend>(hidden: Tensor<B, 3>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch_size, _, hidden_size] = hidden.dims();
    let mask = attention_mask.float().unsqueeze_dim::<3>(2); // [batch, seq, 1]

    let summed = (hidden * mask.clone())
        .sum_dim(1)
        .reshape([batch_size, hidden_size]);
    let counts = mask
        .sum_dim(1)
        .reshape([batch_size, 1])
        .clamp_min(1e-9);

    summed / counts
}

/// Scale every row to unit L2 norm.
pub fn l2_normalize<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = x.clone().powf_scalar(2.0).sum_dim(1).sqrt().clamp_min(1e-12);
    x / norm
}

/// Row-wise cosine similarity of two [batch, d] tensors → [batch].
pub fn cosine_similarity<B: Backend>(u: Tensor<B, 2>, v: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch_size, _] = u.dims();
    let dot    = (u.clone() * v.clone()).sum_dim(1);
    let norm_u = u.powf_scalar(2.0).sum_dim(1).sqrt();
    let norm_v = v.powf_scalar(2.0).sum_dim(1).sqrt();
    (dot / (norm_u * norm_v).clamp_min(1e-8)).reshape([batch_size])
}

pub fn cosine_similarity_loss<B: Backend>(
    u:      Tensor<B, 2>,
    v:      Tensor<B, 2>,
    labels: Tensor<B, 1>,
) -> Tensor<B, 1> {
    MseLoss::new().forward(cosine_similarity(u, v), labels, Reduction::Mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::bert::tests::tiny_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn to_vec(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let device = Default::default();
        let hidden = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 2.0], [3.0, 4.0], [100.0, 100.0]]],
            &device,
        );
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 0]], &device);
        assert_eq!(to_vec(mean_pool(hidden, mask)), vec![2.0, 3.0]);
    }

    #[test]
    fn test_l2_normalize_rows() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::from_floats([[3.0, 4.0], [0.0, 2.0]], &device);
        let out = to_vec(l2_normalize(x));
        let expected = [0.6, 0.8, 0.0, 1.0];
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cosine_loss_zero_for_perfect_targets() {
        let device = Default::default();
        let u = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 1.0]], &device);
        let v = Tensor::<TestBackend, 2>::from_floats([[2.0, 0.0], [1.0, 0.0]], &device);
        let labels = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let loss = cosine_similarity_loss(u, v, labels).into_scalar().elem::<f32>();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_loss_penalises_wrong_targets() {
        let device = Default::default();
        let u = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        let v = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        let labels = Tensor::<TestBackend, 1>::from_floats([0.0], &device);
        let loss = cosine_similarity_loss(u, v, labels).into_scalar().elem::<f32>();
        assert!((loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_encoder_embeddings_are_unit_length() {
        let device = Default::default();
        let model: SentenceEncoder<TestBackend> =
            SentenceEncoderConfig::new(tiny_config()).init(&device);
        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 0], [2, 6, 7, 3]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 0], [1, 1, 1, 1]], &device);

        let emb = model.forward(ids, mask);
        assert_eq!(emb.dims(), [2, 16]);
        let norms: Vec<f32> = emb.powf_scalar(2.0).sum_dim(1).sqrt().into_data().iter::<f32>().collect();
        assert!(norms.iter().all(|n| (n - 1.0).abs() < 1e-4));
    }
}
