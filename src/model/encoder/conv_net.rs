use burn::{
    module::Module,
    nn::{conv::Conv2d, pool::MaxPool2d, BatchNorm, BatchNormConfig, Relu},
    tensor::{backend::Backend, Tensor},
};

use crate::burn_ext::utils::{convolution, max_pool_2d};

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn new(device: &B::Device, in_channels: usize, out_channels: usize) -> Self {
        Self {
            conv: convolution(device, in_channels, out_channels, [3, 3], [1, 1], [1, 1], false),
            norm: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(input);
        let out = self.norm.forward(out);
        self.relu.forward(out)
    }
}

/// Convolutional feature extractor for 32-pixel-high grayscale text images.
///
/// Collapses the height dimension entirely and downsamples the width by 4,
/// producing a width-wise feature sequence of size `dimensions`.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    block1a: ConvBlock<B>,
    block1b: ConvBlock<B>,
    pool1: MaxPool2d,
    block2a: ConvBlock<B>,
    block2b: ConvBlock<B>,
    pool2: MaxPool2d,
    block3a: ConvBlock<B>,
    block3b: ConvBlock<B>,
    pool3: MaxPool2d,
    block4: ConvBlock<B>,
    pool4: MaxPool2d,
}

impl<B: Backend> Encoder<B> {
    pub fn new(device: &B::Device, dimensions: usize) -> Self {
        Self {
            block1a: ConvBlock::new(device, 1, 64),
            block1b: ConvBlock::new(device, 64, 64),
            pool1: max_pool_2d([2, 2], [2, 2]),
            block2a: ConvBlock::new(device, 64, 128),
            block2b: ConvBlock::new(device, 128, 128),
            pool2: max_pool_2d([2, 2], [2, 2]),
            block3a: ConvBlock::new(device, 128, 256),
            block3b: ConvBlock::new(device, 256, 256),
            pool3: max_pool_2d([2, 1], [2, 1]),
            block4: ConvBlock::new(device, 256, dimensions),
            pool4: max_pool_2d([4, 1], [4, 1]),
        }
    }

    /// # Shapes
    ///
    /// - input: `[batch, 1, 32, width]`
    /// - output: `[batch, width / 4, dimensions]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 3> {
        let out = self.block1a.forward(input);
        let out = self.block1b.forward(out);
        let out = self.pool1.forward(out);
        let out = self.block2a.forward(out);
        let out = self.block2b.forward(out);
        let out = self.pool2.forward(out);
        let out = self.block3a.forward(out);
        let out = self.block3b.forward(out);
        let out = self.pool3.forward(out);
        let out = self.block4.forward(out);
        let out = self.pool4.forward(out);

        let features: Tensor<B, 3> = out.squeeze(2);
        features.swap_dims(1, 2)
    }
}

#[cfg(test)]
mod test {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    use super::*;

    #[test]
    fn test_encoder_shapes() {
        let device = NdArrayDevice::Cpu;
        let encoder = Encoder::<NdArray>::new(&device, 64);

        let input = Tensor::random(
            [2, 1, 32, 64],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let out = encoder.forward(input);
        assert_eq!(out.dims(), [2, 16, 64]);
    }
}
