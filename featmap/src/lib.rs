//! Tensor formatting around the inference step: input preprocessing,
//! valid-region cropping and stride-aware feature records.

mod crop;
mod error;
mod mean;
mod preprocess;
mod record;

pub use crop::valid_region;
pub use error::{FeatErr, Result};
pub use mean::{channel_mean, load_channel_mean};
pub use preprocess::{PreprocessConfig, preprocess};
pub use record::FeatureRecord;
