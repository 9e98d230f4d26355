// ============================================================
// Layer 5 — Sequence Classification Head
// ============================================================
// BERT encoder + pooler + dropout + linear head:
//
//   h_CLS  = hidden[:, 0, :]            (first token)
//   pooled = tanh(W_p · h_CLS + b_p)    (pretrained pooler)
//   logits = W_c · dropout(pooled) + b_c
//
// The encoder and pooler come from the pretrained checkpoint;
// the head starts from N(0, 0.02) and is learned from scratch.

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Initializer, Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::bert::{BertConfig, BertModel};

#[derive(Config, Debug)]
pub struct BertClassifierConfig {
    pub bert:       BertConfig,
    pub num_labels: usize,
}

impl BertClassifierConfig {
    /// Fresh model: random encoder, pooler and head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertClassifier<B> {
        let bert   = self.bert.init(device);
        let pooler = BertPoolerConfig::new(self.bert.hidden_size).init(device);
        self.init_with(bert, pooler, device)
    }

    /// Wrap an already-built (typically pretrained) encoder and pooler
    /// with a new classification head.
    pub fn init_with<B: Backend>(
        &self,
        bert:   BertModel<B>,
        pooler: BertPooler<B>,
        device: &B::Device,
    ) -> BertClassifier<B> {
        let classifier = LinearConfig::new(self.bert.hidden_size, self.num_labels)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 0.02 })
            .init(device);
        BertClassifier {
            bert,
            pooler,
            dropout: DropoutConfig::new(self.bert.hidden_dropout_prob).init(),
            classifier,
        }
    }
}

#[derive(Config, Debug)]
pub struct BertPoolerConfig {
    pub hidden_size: usize,
}

impl BertPoolerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertPooler<B> {
        BertPooler {
            dense: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BertPooler<B: Backend> {
    pub dense: Linear<B>,
}

impl<B: Backend> BertPooler<B> {
    /// hidden: [batch, seq_len, hidden] → [batch, hidden]
    pub fn forward(&self, hidden: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, _, hidden_size] = hidden.dims();
        let cls = hidden
            .slice([0..batch_size, 0..1, 0..hidden_size])
            .reshape([batch_size, hidden_size]);
        self.dense.forward(cls).tanh()
    }
}

#[derive(Module, Debug)]
pub struct BertClassifier<B: Backend> {
    pub bert:       BertModel<B>,
    pub pooler:     BertPooler<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> BertClassifier<B> {
    /// input_ids, attention_mask: [batch, seq_len] → logits [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let hidden = self.bert.forward(input_ids, attention_mask);
        let pooled = self.pooler.forward(hidden);
        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Cross-entropy loss plus the logits it was computed from.
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), labels);
        (loss, logits)
    }

    /// Arg-max label per row.
    pub fn predict(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Vec<usize> {
        argmax_labels(self.forward(input_ids, attention_mask))
    }
}

/// Row-wise arg-max of a [batch, classes] tensor as plain label ids.
pub fn argmax_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    // argmax(1) returns [batch, 1]; flatten to [batch]
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .iter::<i64>()
        .map(|v| v as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::bert::tests::tiny_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_logits_shape_and_predictions() {
        let device = Default::default();
        let model: BertClassifier<TestBackend> =
            BertClassifierConfig::new(tiny_config(), 5).init(&device);

        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3], [2, 8, 3]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::ones([2, 3], &device);

        let logits = model.forward(ids.clone(), mask.clone());
        assert_eq!(logits.dims(), [2, 5]);

        let preds = model.predict(ids, mask);
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|&p| p < 5));
    }

    #[test]
    fn test_argmax_labels() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.9, 0.0], [2.0, -1.0, 0.5]], &device);
        assert_eq!(argmax_labels(logits), vec![1, 0]);
    }
}
