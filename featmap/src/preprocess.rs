use ndarray::{Array1, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{FeatErr, Result};

/// Numeric formatting applied to one named input blob.
///
/// Absent fields are skipped. The canonical ImageNet-style setup is
/// `raw_scale = 255` with the `(2, 1, 0)` permutation (RGB to BGR) and no
/// `input_scale`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    #[serde(default)]
    pub raw_scale: Option<f32>,
    #[serde(default)]
    pub input_scale: Option<f32>,
    #[serde(default)]
    pub channel_permutation: Option<Vec<usize>>,
}

/// Formats a raw H×W×C image for the network.
///
/// Fixed step order (changing it changes the numbers):
/// 1. reorder channels per `channel_permutation`, still in H×W×C layout
/// 2. transpose to C×H×W
/// 3. multiply by `raw_scale`
/// 4. subtract the per-channel `mean`
/// 5. multiply by `input_scale`
///
/// `mean` is indexed in the network's channel order, i.e. after the
/// permutation has been applied.
pub fn preprocess(
    image: Array3<f32>,
    mean: &Array1<f32>,
    cfg: &PreprocessConfig,
) -> Result<Array3<f32>> {
    let image = match &cfg.channel_permutation {
        Some(order) => {
            let channels = image.len_of(Axis(2));
            if let Some(&index) = order.iter().find(|&&index| index >= channels) {
                return Err(FeatErr::BadChannelPermutation { index, channels });
            }
            image.select(Axis(2), order)
        }
        None => image,
    };

    let channels = image.len_of(Axis(2));
    if mean.len() != channels {
        return Err(FeatErr::MeanChannelMismatch {
            got: mean.len(),
            expected: channels,
        });
    }

    let mut out = image.permuted_axes([2, 0, 1]).as_standard_layout().into_owned();
    if let Some(scale) = cfg.raw_scale {
        out *= scale;
    }
    for (channel, mut plane) in out.outer_iter_mut().enumerate() {
        plane -= mean[channel];
    }
    if let Some(scale) = cfg.input_scale {
        out *= scale;
    }
    Ok(out)
}
