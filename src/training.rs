use std::path::Path;

use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::Module,
    optim::AdamWConfig,
    record::{BinFileRecorder, FullPrecisionSettings},
    tensor::backend::AutodiffBackend,
    train::{
        metric::{AccuracyMetric, LearningRateMetric, LossMetric},
        LearnerBuilder,
    },
};

use crate::{
    dataset::{TextImgBatcher, TextImgDataset},
    model::recognizer::RecognizerConfig,
    schedule::{OneCycleSwaSchedulerConfig, SwaConfig},
    utils::charset::CharsetMapper,
};

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: RecognizerConfig,
    pub swa: SwaConfig,
    pub num_workers: usize,
    pub num_epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub learning_rate: f64,
    pub charset: String,
    pub data_root_path: String,
    #[config(default = 0.075)]
    pub warmup_pct: f64,
    #[config(default = 0.0)]
    pub weight_decay: f32,
    #[config(default = 32)]
    pub img_height: u32,
    #[config(default = 128)]
    pub img_width: u32,
    #[config(default = 25)]
    pub max_label_length: usize,
    pub resume_from: Option<usize>,
}

pub fn train<B: AutodiffBackend>(save_dir: &str, config: TrainingConfig, devices: Vec<B::Device>) {
    B::seed(config.seed);
    let main_device = devices[0].clone();

    let mapper = CharsetMapper::new(config.charset.trim());
    let pad_idx = mapper.pad_id() as usize;

    let data_root_path = Path::new(&config.data_root_path);
    let dataset_train = TextImgDataset::new(
        data_root_path.join("train-labels.txt"),
        data_root_path.to_path_buf(),
        mapper.clone(),
        config.img_height,
        config.img_width,
        config.max_label_length,
    );
    let dataset_valid = TextImgDataset::new(
        data_root_path.join("valid-labels.txt"),
        data_root_path.to_path_buf(),
        mapper,
        config.img_height,
        config.img_width,
        config.max_label_length,
    );

    // The scheduler covers the whole run, so it needs the optimizer step
    // count up front.
    let steps_per_epoch = (dataset_train.len() + config.batch_size - 1) / config.batch_size;
    let total_steps = steps_per_epoch.max(1) * config.num_epochs;
    let scheduler =
        OneCycleSwaSchedulerConfig::new(config.learning_rate, total_steps, config.swa.clone())
            .with_warmup_pct(config.warmup_pct)
            .init();

    let batcher_train = TextImgBatcher::<B>::new(main_device.clone());
    let batcher_valid = TextImgBatcher::<B::InnerBackend>::new(main_device.clone());

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_valid);

    let builder = LearnerBuilder::new(save_dir)
        .metric_train_numeric(AccuracyMetric::new().with_pad_token(pad_idx))
        .metric_valid_numeric(AccuracyMetric::new().with_pad_token(pad_idx))
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_train_numeric(LearningRateMetric::new())
        .with_file_checkpointer(BinFileRecorder::<FullPrecisionSettings>::new())
        .devices(devices)
        .num_epochs(config.num_epochs);
    let builder = match config.resume_from {
        Some(checkpoint) => builder.checkpoint(checkpoint),
        None => builder,
    };

    let learner = builder.build(
        config.model.init::<B>(&main_device),
        AdamWConfig::new()
            .with_weight_decay(config.weight_decay)
            .init(),
        scheduler,
    );

    let model_trained = learner.fit(dataloader_train, dataloader_valid);

    model_trained
        .save_file(
            format!("{save_dir}/model"),
            &BinFileRecorder::<FullPrecisionSettings>::new(),
        )
        .expect("Trained model should be saved successfully");
}
