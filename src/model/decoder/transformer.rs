use burn::{
    config::Config,
    module::Module,
    nn::{
        attention::{
            generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig,
        },
        transformer::{PositionWiseFeedForward, PositionWiseFeedForwardConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig, PositionalEncoding, PositionalEncodingConfig,
    },
    tensor::{backend::Backend, Bool, Int, Tensor},
};

/// Pre-norm decoder layer: masked self-attention over the target tokens,
/// cross-attention over the encoder memory, position-wise feed-forward.
#[derive(Module, Debug)]
pub struct DecoderLayer<B: Backend> {
    norm_self: LayerNorm<B>,
    self_attn: MultiHeadAttention<B>,
    norm_cross: LayerNorm<B>,
    cross_attn: MultiHeadAttention<B>,
    norm_ff: LayerNorm<B>,
    feed_forward: PositionWiseFeedForward<B>,
    dropout: Dropout,
}

impl<B: Backend> DecoderLayer<B> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        memory: Tensor<B, 3>,
        pad_mask: Tensor<B, 2, Bool>,
        attn_mask: Tensor<B, 3, Bool>,
    ) -> Tensor<B, 3> {
        let normed = self.norm_self.forward(input.clone());
        let out = input
            + self.dropout.forward(
                self.self_attn
                    .forward(
                        MhaInput::new(normed.clone(), normed.clone(), normed)
                            .mask_pad(pad_mask)
                            .mask_attn(attn_mask),
                    )
                    .context,
            );

        let normed = self.norm_cross.forward(out.clone());
        let out = out
            + self.dropout.forward(
                self.cross_attn
                    .forward(MhaInput::new(normed, memory.clone(), memory))
                    .context,
            );

        let normed = self.norm_ff.forward(out.clone());
        out + self.dropout.forward(self.feed_forward.forward(normed))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    embedding: Embedding<B>,
    position: PositionalEncoding<B>,
    pos_dropout: Dropout,
    layers: Vec<DecoderLayer<B>>,
    norm: LayerNorm<B>,
    generator: Linear<B>,
    padding_idx: usize,
    sqrt_model_size: f64,
}

impl<B: Backend> Decoder<B> {
    /// # Shapes
    ///
    /// - memory: `[batch, memory_length, dimensions]`
    /// - target: `[batch, target_length]`
    /// - output: `[batch, target_length, num_classes]`
    pub fn forward(&self, memory: Tensor<B, 3>, target: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let device = memory.device();
        let target = target.to_device(&device);
        let [batch, target_length] = target.dims();

        let pad_mask = target.clone().equal_elem(self.padding_idx as i64);
        let attn_mask = generate_autoregressive_mask(batch, target_length, &device);

        let embedded = self
            .embedding
            .forward(target)
            .mul_scalar(self.sqrt_model_size);
        let embedded = self.position.forward(embedded);
        let mut output = self.pos_dropout.forward(embedded);

        for layer in self.layers.iter() {
            output = layer.forward(output, memory.clone(), pad_mask.clone(), attn_mask.clone());
        }

        let feature = self.norm.forward(output);
        self.generator.forward(feature)
    }
}

#[derive(Config, Debug)]
pub struct DecoderConfig {
    n_classes: usize,
    dimensions: usize,
    #[config(default = "0")]
    padding_idx: usize,
    #[config(default = "3")]
    stacks: usize,
    #[config(default = "8")]
    n_heads: usize,
    #[config(default = "0.1")]
    dropout: f64,
    #[config(default = "1536")]
    feed_forward_size: usize,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let layer = || DecoderLayer {
            norm_self: LayerNormConfig::new(self.dimensions)
                .with_epsilon(1e-6)
                .init(device),
            self_attn: MultiHeadAttentionConfig::new(self.dimensions, self.n_heads)
                .with_dropout(self.dropout)
                .init(device),
            norm_cross: LayerNormConfig::new(self.dimensions)
                .with_epsilon(1e-6)
                .init(device),
            cross_attn: MultiHeadAttentionConfig::new(self.dimensions, self.n_heads)
                .with_dropout(self.dropout)
                .init(device),
            norm_ff: LayerNormConfig::new(self.dimensions)
                .with_epsilon(1e-6)
                .init(device),
            feed_forward: PositionWiseFeedForwardConfig::new(
                self.dimensions,
                self.feed_forward_size,
            )
            .with_dropout(self.dropout)
            .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        };

        Decoder {
            embedding: EmbeddingConfig::new(self.n_classes, self.dimensions).init(device),
            position: PositionalEncodingConfig::new(self.dimensions).init(device),
            pos_dropout: DropoutConfig::new(self.dropout).init(),
            layers: (0..self.stacks.max(1)).map(|_| layer()).collect(),
            norm: LayerNormConfig::new(self.dimensions)
                .with_epsilon(1e-6)
                .init(device),
            generator: LinearConfig::new(self.dimensions, self.n_classes).init(device),
            padding_idx: self.padding_idx,
            sqrt_model_size: (self.dimensions as f64).sqrt(),
        }
    }
}
