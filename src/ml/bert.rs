// ============================================================
// Layer 5 — BERT Encoder
// ============================================================
// A post-LayerNorm transformer encoder with the BERT layout, so
// pretrained Hugging Face checkpoints can be imported directly
// (see pretrained.rs for the key mapping):
//
//   token + position + token-type embeddings → LayerNorm → dropout
//   N × [ self-attention → add & norm → GELU FFN → add & norm ]
//
// Padding positions are excluded from attention through the
// attention mask (1 = real token, 0 = padding).
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct BertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
    #[config(default = 0.1)]
    pub hidden_dropout_prob:     f64,
    #[config(default = 0.1)]
    pub attention_probs_dropout_prob: f64,
}

impl BertConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertModel<B> {
        let embeddings = BertEmbeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.hidden_dropout_prob).init(),
        };
        let layers = (0..self.num_hidden_layers)
            .map(|_| self.build_layer(device))
            .collect();
        BertModel { embeddings, layers }
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let attention = MultiHeadAttentionConfig::new(self.hidden_size, self.num_attention_heads)
            .with_dropout(self.attention_probs_dropout_prob)
            .init(device);
        BertLayer {
            attention,
            attention_norm: self.layer_norm(device),
            intermediate:   LinearConfig::new(self.hidden_size, self.intermediate_size).init(device),
            output:         LinearConfig::new(self.intermediate_size, self.hidden_size).init(device),
            output_norm:    self.layer_norm(device),
            dropout:        DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }
}

#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    /// input_ids: [batch, seq_len] → [batch, seq_len, hidden]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // Single-segment inputs: every token is type 0
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_types);

        self.dropout.forward(self.layer_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub attention:      MultiHeadAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub intermediate:   Linear<B>,
    pub output:         Linear<B>,
    pub output_norm:    LayerNorm<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> BertLayer<B> {
    /// pad_mask: [batch, seq_len], true where the token is padding
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .attention
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.attention_norm.forward(x + self.dropout.forward(attn));

        let ffn = self.output.forward(gelu(self.intermediate.forward(x.clone())));
        self.output_norm.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub layers:     Vec<BertLayer<B>>,
}

impl<B: Backend> BertModel<B> {
    /// input_ids, attention_mask: [batch, seq_len] → hidden states [batch, seq_len, hidden]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.embeddings.forward(input_ids);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        x
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// A few-kilobyte encoder for tests
    pub(crate) fn tiny_config() -> BertConfig {
        BertConfig::new(32, 16, 2, 2, 32, 16)
    }

    #[test]
    fn test_hidden_state_shape() {
        let device = Default::default();
        let model: BertModel<TestBackend> = tiny_config().init(&device);

        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 6, 3], [2, 7, 3, 0]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 1], [1, 1, 1, 0]], &device);

        let hidden = model.forward(ids, mask);
        assert_eq!(hidden.dims(), [2, 4, 16]);
    }

    #[test]
    fn test_padding_does_not_leak_into_real_tokens() {
        let device = Default::default();
        let model: BertModel<TestBackend> = tiny_config().init(&device);

        // Same real tokens, different padding contents
        let ids_a  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 0]], &device);
        let ids_b  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 9]], &device);
        let mask   = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 0]], &device);

        let a = model.forward(ids_a, mask.clone()).slice([0..1, 0..3, 0..16]);
        let b = model.forward(ids_b, mask).slice([0..1, 0..3, 0..16]);

        let diff = (a - b).abs().max().into_scalar().elem::<f32>();
        assert!(diff < 1e-4, "padding changed real-token states by {diff}");
    }

    #[test]
    fn test_config_defaults() {
        let cfg = tiny_config();
        assert_eq!(cfg.type_vocab_size, 2);
        assert!((cfg.layer_norm_eps - 1e-12).abs() < 1e-18);
    }
}
