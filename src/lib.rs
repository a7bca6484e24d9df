pub mod burn_ext;
pub mod dataset;
pub mod model;
pub mod parse_config;
pub mod schedule;
pub mod training;
pub mod utils;
