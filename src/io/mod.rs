//! SafeTensors persistence for models and datasets

mod dataset;
mod model;
mod tensors;

pub use dataset::{load_dataset, save_dataset, NUM_CLASSES_KEY};
pub use model::{load_model, save_model, ARCHITECTURE_KEY};
