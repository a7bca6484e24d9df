use burn::backend::{wgpu::WgpuDevice, Autodiff, Wgpu};
use scene_ocr::{
    model::recognizer::RecognizerConfig,
    parse_config::RecFullConfig,
    schedule::SwaConfig,
    training::{self, TrainingConfig},
};

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./config.yaml".to_string());
    let full_config = RecFullConfig::from_yaml(config_path);

    let charset_len = full_config.charset.trim().chars().count();
    let model_config = RecognizerConfig::new(charset_len + 3, charset_len + 2)
        .with_dimensions(full_config.dimensions)
        .with_stacks(full_config.stacks)
        .with_n_heads(full_config.n_heads)
        .with_dropout(full_config.dropout)
        .with_feed_forward_size(full_config.feed_forward_size);
    let swa_config = SwaConfig::new()
        .with_epoch_start(full_config.swa_epoch_start)
        .with_div_factor(full_config.swa_div_factor)
        .with_final_div_factor(full_config.swa_final_div_factor);
    let training_config = TrainingConfig::new(
        model_config,
        swa_config,
        full_config.num_workers,
        full_config.num_epochs,
        full_config.batch_size,
        full_config.seed,
        full_config.learning_rate,
        full_config.charset,
        full_config.data_root_path,
    )
    .with_warmup_pct(full_config.warmup_pct)
    .with_weight_decay(full_config.weight_decay)
    .with_img_height(full_config.img_height)
    .with_img_width(full_config.img_width)
    .with_max_label_length(full_config.max_label_length)
    .with_resume_from(full_config.resume_from);

    let devices: Vec<WgpuDevice> = if full_config.num_devices > 1 {
        (0..full_config.num_devices)
            .map(WgpuDevice::DiscreteGpu)
            .collect()
    } else {
        vec![WgpuDevice::default()]
    };

    training::train::<Autodiff<Wgpu>>(&full_config.save_dir, training_config, devices);
}
