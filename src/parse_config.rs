use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct ModelYaml {
    charset: String,
    max_label_length: usize,
    dimensions: usize,
    stacks: usize,
    n_heads: usize,
    dropout: f64,
    feed_forward_size: usize,
}

#[derive(Serialize, Deserialize, Debug)]
struct TrainingYaml {
    num_devices: usize,
    num_workers: usize,
    batch_size: usize,
    num_epochs: usize,
    seed: u64,
    learning_rate: f64,
    warmup_pct: f64,
    weight_decay: f32,
    img_height: u32,
    img_width: u32,
    data_root_path: String,
    save_dir: String,
    #[serde(default)]
    resume_from: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
struct SwaYaml {
    #[serde(default = "default_swa_epoch_start")]
    epoch_start: f64,
    #[serde(default = "default_swa_div_factor")]
    div_factor: f64,
    #[serde(default = "default_swa_final_div_factor")]
    final_div_factor: f64,
}

fn default_swa_epoch_start() -> f64 {
    0.75
}

fn default_swa_div_factor() -> f64 {
    25.0
}

fn default_swa_final_div_factor() -> f64 {
    1e4
}

impl Default for SwaYaml {
    fn default() -> Self {
        Self {
            epoch_start: default_swa_epoch_start(),
            div_factor: default_swa_div_factor(),
            final_div_factor: default_swa_final_div_factor(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "UPPERCASE")]
struct RecTrainingConfigYaml {
    model: ModelYaml,
    training: TrainingYaml,
    #[serde(default)]
    swa: SwaYaml,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RecFullConfig {
    pub charset: String,
    pub max_label_length: usize,
    pub dimensions: usize,
    pub stacks: usize,
    pub n_heads: usize,
    pub dropout: f64,
    pub feed_forward_size: usize,
    pub num_devices: usize,
    pub num_workers: usize,
    pub num_epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub learning_rate: f64,
    pub warmup_pct: f64,
    pub weight_decay: f32,
    pub img_height: u32,
    pub img_width: u32,
    pub data_root_path: String,
    pub save_dir: String,
    pub resume_from: Option<usize>,
    pub swa_epoch_start: f64,
    pub swa_div_factor: f64,
    pub swa_final_div_factor: f64,
}

impl RecFullConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Self {
        let content = fs::read_to_string(path).expect("training config does not exist");
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Self {
        let yaml: RecTrainingConfigYaml =
            serde_yaml::from_str(content).expect("fail to read training config");

        Self {
            charset: yaml.model.charset,
            max_label_length: yaml.model.max_label_length,
            dimensions: yaml.model.dimensions,
            stacks: yaml.model.stacks,
            n_heads: yaml.model.n_heads,
            dropout: yaml.model.dropout,
            feed_forward_size: yaml.model.feed_forward_size,
            num_devices: yaml.training.num_devices,
            num_workers: yaml.training.num_workers,
            num_epochs: yaml.training.num_epochs,
            batch_size: yaml.training.batch_size,
            seed: yaml.training.seed,
            learning_rate: yaml.training.learning_rate,
            warmup_pct: yaml.training.warmup_pct,
            weight_decay: yaml.training.weight_decay,
            img_height: yaml.training.img_height,
            img_width: yaml.training.img_width,
            data_root_path: yaml.training.data_root_path,
            save_dir: yaml.training.save_dir,
            resume_from: yaml.training.resume_from,
            swa_epoch_start: yaml.swa.epoch_start,
            swa_div_factor: yaml.swa.div_factor,
            swa_final_div_factor: yaml.swa.final_div_factor,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const YAML: &str = r#"
MODEL:
  charset: "0123456789abcdefghijklmnopqrstuvwxyz"
  max_label_length: 25
  dimensions: 384
  stacks: 3
  n_heads: 8
  dropout: 0.1
  feed_forward_size: 1536
TRAINING:
  num_devices: 1
  num_workers: 4
  batch_size: 128
  num_epochs: 20
  seed: 42
  learning_rate: 7e-4
  warmup_pct: 0.075
  weight_decay: 0.01
  img_height: 32
  img_width: 128
  data_root_path: ./data
  save_dir: ./build
"#;

    #[test]
    fn parse_without_swa_section() {
        let config = RecFullConfig::from_yaml_str(YAML);
        assert_eq!(config.charset.chars().count(), 36);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.warmup_pct, 0.075);
        assert_eq!(config.resume_from, None);
        // SWA section absent: defaults apply.
        assert_eq!(config.swa_epoch_start, 0.75);
        assert_eq!(config.swa_div_factor, 25.0);
        assert_eq!(config.swa_final_div_factor, 1e4);
    }

    #[test]
    fn parse_with_swa_section() {
        let yaml = format!(
            "{YAML}SWA:\n  epoch_start: 0.8\n  div_factor: 10\n"
        );
        let config = RecFullConfig::from_yaml_str(&yaml);
        assert_eq!(config.swa_epoch_start, 0.8);
        assert_eq!(config.swa_div_factor, 10.0);
        assert_eq!(config.swa_final_div_factor, 1e4);
    }
}
