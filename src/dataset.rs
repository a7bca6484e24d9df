use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Data, Int, Shape, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::utils::{charset::CharsetMapper, image_reader};

#[derive(Clone)]
pub struct TextImgBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> TextImgBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

#[derive(Clone, Debug)]
pub struct TextImgBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> Batcher<TextImgItem, TextImgBatch<B>> for TextImgBatcher<B> {
    fn batch(&self, items: Vec<TextImgItem>) -> TextImgBatch<B> {
        let batch_size = items.len();
        let mut images = Vec::with_capacity(batch_size);
        let mut targets = Vec::with_capacity(batch_size);

        for item in items {
            let data_img = Data::new(
                item.image_raw,
                Shape::new([1, 1, item.image_height, item.image_width]),
            );
            let tensor_img =
                Tensor::<B, 4, Int>::from_data(data_img.convert(), &self.device).float();
            // range: [-1.0, 1.0]
            let tensor_img = ((tensor_img / 255) - 0.5) / 0.5;

            let length = item.target.len();
            let data_target = Data::new(item.target, Shape::new([1, length]));
            let tensor_target = Tensor::<B, 2, Int>::from_data(data_target.convert(), &self.device);

            images.push(tensor_img);
            targets.push(tensor_target);
        }

        let images = Tensor::cat(images, 0).to_device(&self.device);
        let targets = Tensor::cat(targets, 0).to_device(&self.device);

        TextImgBatch { images, targets }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TextImgItem {
    // The raw vec of the image is passed here because GrayImage
    // does not directly implement the Serialize trait.
    pub image_raw: Vec<u8>,
    pub image_height: usize,
    pub image_width: usize,
    pub target: Vec<u32>,
}

/// Labeled text-image dataset backed by a TSV file of `path\tlabel` rows.
///
/// Rows whose label is longer than `max_label_length` or contains characters
/// outside the charset are dropped at load time.
pub struct TextImgDataset {
    root_path: PathBuf,
    samples: Vec<(String, String)>,
    mapper: CharsetMapper,
    img_height: u32,
    img_width: u32,
    target_length: usize,
}

impl TextImgDataset {
    pub fn new<P: AsRef<Path>>(
        label_file_path: P,
        root_path: P,
        mapper: CharsetMapper,
        img_height: u32,
        img_width: u32,
        max_label_length: usize,
    ) -> Self {
        let data = fs::read_to_string(&label_file_path).expect("label file should be readable");
        let samples = data
            .trim()
            .split('\n')
            .filter_map(|row| {
                let mut cols = row.trim().split('\t');
                let path = cols.next()?;
                let label = cols.next()?;
                let fits = label.chars().count() <= max_label_length
                    && mapper.contains_all(label);

                fits.then(|| (path.to_string(), label.to_string()))
            })
            .collect();

        Self {
            root_path: root_path.as_ref().to_path_buf(),
            samples,
            mapper,
            img_height,
            img_width,
            // room for the BOS and EOS markers
            target_length: max_label_length + 2,
        }
    }
}

impl Dataset<TextImgItem> for TextImgDataset {
    fn get(&self, index: usize) -> Option<TextImgItem> {
        let (path, label) = self.samples.get(index)?;
        let path = self.root_path.join(path);

        let gray = image_reader::read_resized(path, self.img_height, self.img_width);
        let image_height = gray.height() as usize;
        let image_width = gray.width() as usize;
        let image_raw = gray.into_vec();
        let target = self.mapper.encode(label, Some(self.target_length));

        Some(TextImgItem {
            image_raw,
            image_height,
            image_width,
            target,
        })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
