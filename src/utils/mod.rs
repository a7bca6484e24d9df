pub mod charset;
pub mod image_reader;
