// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait for the two kinds of samples.
//
// ClassificationBatcher
//   Samples are pre-padded to the same length, so batching is a
//   flatten + reshape:
//     [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// PairBatcher
//   Pair sides are stored unpadded. Each side of the batch is
//   padded to its own longest sequence, and the attention mask
//   marks the real tokens:
//     left:  [N, S_left]    right: [N, S_right]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{ClassificationSample, PairSample};

// ─── ClassificationBatch ──────────────────────────────────────────────────────
/// A batch of labelled documents ready for the classifier.
#[derive(Debug, Clone)]
pub struct ClassificationBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Topic labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ClassificationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClassificationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ClassificationSample, ClassificationBatch<B>> for ClassificationBatcher<B> {
    fn batch(&self, items: Vec<ClassificationSample>) -> ClassificationBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len    = items[0].input_ids.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ClassificationBatch { input_ids, attention_mask, labels }
    }
}

// ─── PairBatch ────────────────────────────────────────────────────────────────
/// A batch of contrastive pairs; both sides padded independently.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub left_ids:   Tensor<B, 2, Int>,
    pub left_mask:  Tensor<B, 2, Int>,
    pub right_ids:  Tensor<B, 2, Int>,
    pub right_mask: Tensor<B, 2, Int>,
    /// Target cosine similarity per pair — shape: [batch_size]
    pub labels:     Tensor<B, 1>,
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

impl<B: Backend> Batcher<PairSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairSample>) -> PairBatch<B> {
        let lefts: Vec<&[u32]>  = items.iter().map(|s| s.left.as_slice()).collect();
        let rights: Vec<&[u32]> = items.iter().map(|s| s.right.as_slice()).collect();

        let (left_ids, left_mask)   = pad_sequences::<B>(&lefts, self.pad_id, &self.device);
        let (right_ids, right_mask) = pad_sequences::<B>(&rights, self.pad_id, &self.device);

        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();
        let labels = Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device);

        PairBatch { left_ids, left_mask, right_ids, right_mask, labels }
    }
}

/// Pad variable-length sequences to the longest one and build the
/// matching attention mask. Returns ([N, S] ids, [N, S] mask).
pub fn pad_sequences<B: Backend>(
    sequences: &[&[u32]],
    pad_id:    u32,
    device:    &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let batch_size = sequences.len();
    // Never build a zero-width tensor; an empty text still gets one pad slot
    let seq_len    = sequences.iter().map(|s| s.len()).max().unwrap_or(0).max(1);

    let mut ids  = Vec::with_capacity(batch_size * seq_len);
    let mut mask = Vec::with_capacity(batch_size * seq_len);

    for seq in sequences {
        for pos in 0..seq_len {
            match seq.get(pos) {
                Some(&tok) => { ids.push(tok as i32);    mask.push(1); }
                None       => { ids.push(pad_id as i32); mask.push(0); }
            }
        }
    }

    let ids  = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([batch_size, seq_len]);
    let mask = Tensor::<B, 1, Int>::from_ints(mask.as_slice(), device).reshape([batch_size, seq_len]);
    (ids, mask)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_classification_batch_shapes() {
        let device  = Default::default();
        let batcher = ClassificationBatcher::<TestBackend>::new(device);
        let items = vec![
            ClassificationSample { input_ids: vec![101, 5, 102, 0], attention_mask: vec![1, 1, 1, 0], label: 3 },
            ClassificationSample { input_ids: vec![101, 6, 7, 102], attention_mask: vec![1, 1, 1, 1], label: 11 },
        ];
        let batch = batcher.batch(items);
        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![3, 11]);
    }

    #[test]
    fn test_pair_batch_pads_each_side() {
        let device  = Default::default();
        let batcher = PairBatcher::<TestBackend>::new(device, 0);
        let items = vec![
            PairSample { left: vec![101, 9, 102],          right: vec![101, 102],    label: 1.0 },
            PairSample { left: vec![101, 102],             right: vec![101, 4, 102], label: 0.0 },
        ];
        let batch = batcher.batch(items);
        assert_eq!(batch.left_ids.dims(), [2, 3]);
        assert_eq!(batch.right_ids.dims(), [2, 3]);

        let mask: Vec<i64> = batch.left_mask.into_data().iter::<i64>().collect();
        assert_eq!(mask, vec![1, 1, 1, 1, 1, 0]);
        let labels: Vec<f32> = batch.labels.into_data().iter::<f32>().collect();
        assert_eq!(labels, vec![1.0, 0.0]);
    }

    #[test]
    fn test_pad_sequences_empty_text() {
        let device = Default::default();
        let (ids, mask) = pad_sequences::<TestBackend>(&[&[]], 0, &device);
        assert_eq!(ids.dims(), [1, 1]);
        let mask: Vec<i64> = mask.into_data().iter::<i64>().collect();
        assert_eq!(mask, vec![0]);
    }
}
