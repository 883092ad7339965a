pub mod error_model;

pub use error_model::{ErrorModel, DEFAULT_METERS_PER_DEGREE};
