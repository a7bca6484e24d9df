use std::{cmp, path::Path};

use burn::tensor::{backend::Backend, Data, Shape, Tensor};
use image::{GrayImage, Luma};

/// Loads an image as grayscale, resized to `height` with the aspect ratio
/// preserved and right-padded (or clamped) to `width`.
pub fn read_resized<P: AsRef<Path>>(path: P, height: u32, width: u32) -> GrayImage {
    let img = GrayImage::from(image::open(path).expect("image should be readable"));
    let [origin_height, origin_width] = [img.height(), img.width()];
    let img = image::imageops::resize(
        &img,
        cmp::min(
            width,
            cmp::max(
                1,
                (height as f64 * origin_width as f64 / origin_height as f64) as u32,
            ),
        ),
        height,
        image::imageops::FilterType::Lanczos3,
    );
    if img.width() >= width {
        return img;
    }

    let mut padded = GrayImage::from_pixel(width, height, Luma([0]));
    image::imageops::overlay(&mut padded, &img, 0, 0);
    padded
}

/// Batches fixed-size grayscale images for inference.
#[derive(Debug)]
pub struct ImageReader {
    imgs: Vec<u8>,
    batch: usize,
    height: usize,
    width: usize,
}

impl ImageReader {
    pub fn read_images<P: AsRef<Path>>(paths: &[P], height: u32, width: u32) -> ImageReader {
        let batch = paths.len();
        let height_usize = height as usize;
        let width_usize = width as usize;
        let mut total_img_vec = Vec::with_capacity(batch * height_usize * width_usize);
        for path in paths {
            let mut img_vec = read_resized(path, height, width).into_vec();
            total_img_vec.append(&mut img_vec);
        }

        Self {
            imgs: total_img_vec,
            batch,
            height: height_usize,
            width: width_usize,
        }
    }

    pub fn to_tensor<B: Backend>(self, device: &B::Device) -> Tensor<B, 4> {
        let data = Data::new(
            self.imgs,
            Shape::new([self.batch, 1, self.height, self.width]),
        );
        let input = Tensor::<B, 4>::from_data(data.convert(), device);

        // range: [-1.0, 1.0]
        (input - 127.5) / 127.5
    }
}
