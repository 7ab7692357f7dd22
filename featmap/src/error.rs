use std::{error::Error, fmt};

/// The result type used across the formatting module.
pub type Result<T> = std::result::Result<T, FeatErr>;

/// Failures raised while formatting tensors for or from the network.
#[derive(Debug)]
pub enum FeatErr {
    MeanChannelMismatch {
        got: usize,
        expected: usize,
    },
    BadChannelPermutation {
        index: usize,
        channels: usize,
    },
}

impl fmt::Display for FeatErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatErr::MeanChannelMismatch { got, expected } => write!(
                f,
                "mean vector length mismatch: got {got} channels, expected {expected}"
            ),
            FeatErr::BadChannelPermutation { index, channels } => write!(
                f,
                "channel permutation refers to channel {index}, image has {channels}"
            ),
        }
    }
}

impl Error for FeatErr {}
