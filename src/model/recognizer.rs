use burn::{
    config::Config,
    module::Module,
    nn::loss::CrossEntropyLoss,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Int, Tensor,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};

use crate::dataset::TextImgBatch;

use super::{
    decoder::transformer::{Decoder, DecoderConfig},
    encoder::conv_net::Encoder,
};

#[derive(Config, Debug)]
pub struct RecognizerConfig {
    num_classes: usize,
    padding_idx: usize,
    #[config(default = 384)]
    dimensions: usize,
    #[config(default = 3)]
    stacks: usize,
    #[config(default = 8)]
    n_heads: usize,
    #[config(default = 0.1)]
    dropout: f64,
    #[config(default = 1536)]
    feed_forward_size: usize,
}

impl RecognizerConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Recognizer<B> {
        Recognizer {
            encoder: Encoder::new(device, self.dimensions),
            decoder: DecoderConfig::new(self.num_classes, self.dimensions)
                .with_padding_idx(self.padding_idx)
                .with_stacks(self.stacks)
                .with_n_heads(self.n_heads)
                .with_dropout(self.dropout)
                .with_feed_forward_size(self.feed_forward_size)
                .init(device),
            padding_idx: self.padding_idx,
        }
    }
}

#[derive(Module, Debug)]
pub struct Recognizer<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
    padding_idx: usize,
}

impl<B: Backend> Recognizer<B> {
    pub fn forward(&self, images: Tensor<B, 4>, targets: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let memory = self.encoder.forward(images);
        self.decoder.forward(memory, targets)
    }

    /// Next-token prediction: the decoder sees the targets without the last
    /// token and is scored against the targets without the first one, with
    /// padding positions ignored by the loss.
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 2, Int>,
    ) -> ClassificationOutput<B> {
        let device = &self.devices()[0];
        let images = images.to_device(device);
        let targets = targets.to_device(device);

        let [batch, time_steps] = targets.dims();
        let target_in = targets.clone().slice([0..batch, 0..(time_steps - 1)]);
        let target_expected = targets.slice([0..batch, 1..time_steps]);

        let output = self.forward(images, target_in);
        let num_classes = output.dims()[2] as i32;
        let output_reshape = output.reshape([-1, num_classes]);
        let target_reshape = target_expected.reshape([-1]);
        let loss = CrossEntropyLoss::new(Some(self.padding_idx), device)
            .forward(output_reshape.clone(), target_reshape.clone());

        ClassificationOutput::new(loss, output_reshape, target_reshape)
    }
}

impl<B: AutodiffBackend> TrainStep<TextImgBatch<B>, ClassificationOutput<B>> for Recognizer<B> {
    fn step(&self, batch: TextImgBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<TextImgBatch<B>, ClassificationOutput<B>> for Recognizer<B> {
    fn step(&self, batch: TextImgBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

#[cfg(test)]
mod test {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    use super::*;

    #[test]
    fn test_recognizer_output_shape() {
        let device = NdArrayDevice::Cpu;
        let model = RecognizerConfig::new(39, 38)
            .with_dimensions(32)
            .with_stacks(1)
            .with_n_heads(4)
            .with_feed_forward_size(64)
            .init::<NdArray>(&device);

        let images = Tensor::random(
            [2, 1, 32, 64],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let targets = Tensor::arange(0..20, &device).reshape([2, 10]);

        let output = model.forward(images, targets);
        assert_eq!(output.dims(), [2, 10, 39]);
    }
}
