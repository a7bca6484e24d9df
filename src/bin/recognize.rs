use std::time::Instant;

use burn::{
    backend::{wgpu::WgpuDevice, Wgpu},
    module::Module,
    record::{BinFileRecorder, FullPrecisionSettings},
    tensor::{activation, Data, Int, Tensor},
};
use scene_ocr::{
    model::recognizer::RecognizerConfig,
    parse_config::RecFullConfig,
    utils::{charset::CharsetMapper, image_reader::ImageReader},
};

fn main() {
    type MyBackend = Wgpu;
    let device = WgpuDevice::default();

    let full_config = RecFullConfig::from_yaml("./config.yaml");
    let image_paths: Vec<String> = std::env::args().skip(1).collect();
    assert!(!image_paths.is_empty(), "usage: recognize <image>...");

    let mapper = CharsetMapper::new(full_config.charset.trim());
    let images: Tensor<MyBackend, 4> =
        ImageReader::read_images(&image_paths, full_config.img_height, full_config.img_width)
            .to_tensor(&device);

    let model = RecognizerConfig::new(mapper.num_classes(), mapper.pad_id() as usize)
        .with_dimensions(full_config.dimensions)
        .with_stacks(full_config.stacks)
        .with_n_heads(full_config.n_heads)
        .with_dropout(full_config.dropout)
        .with_feed_forward_size(full_config.feed_forward_size)
        .init::<MyBackend>(&device);
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let model = model
        .load_file(
            format!("{}/model", full_config.save_dir),
            &recorder,
            &device,
        )
        .expect("trained model should exist in save_dir");

    let start = Instant::now();
    let batch_size = images.dims()[0];
    let seq_length = full_config.max_label_length + 2;
    let labels: Tensor<MyBackend, 2, Int> =
        Tensor::full([batch_size, seq_length], mapper.pad_id(), &device);
    let mut labels = labels.slice_assign(
        [0..batch_size, 0..1],
        Tensor::from_data(Data::from([mapper.bos_id()]).convert(), &device)
            .unsqueeze_dim::<2>(0)
            .expand([batch_size as i32, -1]),
    );

    let memory = model.encoder.forward(images);
    for i in 0..(seq_length - 1) {
        let logits = model.decoder.forward(memory.clone(), labels.clone());
        let probabilities = activation::softmax(logits, 2);
        let (_, next_token) = probabilities.max_dim_with_indices(2);
        let next_token: Tensor<MyBackend, 2, Int> = next_token.squeeze(2);
        labels = labels.slice_assign(
            [0..batch_size, (i + 1)..(i + 2)],
            next_token.slice([0..batch_size, i..(i + 1)]),
        );
    }

    let label_vecs: Vec<_> = labels
        .iter_dim(0)
        .map(|row| row.to_data().value)
        .collect();
    for (path, text) in image_paths.iter().zip(mapper.decode(&label_vecs)) {
        println!("{path}\t{text}");
    }
    println!("time: {:.5}", start.elapsed().as_secs_f64());
}
