//! Seam to the external inference engine.
//!
//! The pipeline only needs two things from an engine: build a network handle
//! from a serialized model description, and expose per-layer output and
//! parameter tensors on that handle. Everything behind `forward` is opaque.

pub mod mock;

use std::{
    error::Error,
    fmt, io,
    path::Path,
};

use ndarray::{Array3, ArrayView3};
use netgraph::GraphError;

/// The result type used across the engine seam.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// Constructs network handles from a model description file.
pub trait Engine {
    type Net: Network;

    /// Builds a network bound to the input shape declared in `model`,
    /// loading parameters from `weights` when given.
    fn instantiate(&self, model: &Path, weights: Option<&Path>) -> Result<Self::Net>;
}

/// One instantiation of a network, bound to a fixed input shape.
pub trait Network {
    /// Runs a forward pass over a single C×H×W input.
    fn forward(&mut self, input: Array3<f32>) -> Result<()>;

    /// Output blob of `layer` after the last forward pass.
    fn output(&self, layer: &str) -> Option<ArrayView3<'_, f32>>;

    /// Names of the layers carrying parameters, in network order.
    fn param_layers(&self) -> Vec<String>;

    /// Ordered flat parameter tensors of `layer`.
    fn params(&self, layer: &str) -> Option<&[Vec<f32>]>;

    fn params_mut(&mut self, layer: &str) -> Option<&mut [Vec<f32>]>;
}

/// Copies every parameter tensor of `src` into `dst`.
///
/// Every parameter layer of `dst` must exist in `src` with the same tensor
/// count and tensor sizes; the copy itself is a plain element-wise move.
pub fn copy_weights<D: Network, S: Network>(dst: &mut D, src: &S) -> Result<()> {
    for name in dst.param_layers() {
        let expected = dst.params(&name).map(|params| params.len()).unwrap_or(0);
        let src_params = src
            .params(&name)
            .ok_or_else(|| EngineErr::ParameterCountMismatch {
                layer: name.clone(),
                got: 0,
                expected,
            })?;
        if src_params.len() != expected {
            return Err(EngineErr::ParameterCountMismatch {
                layer: name,
                got: src_params.len(),
                expected,
            });
        }
        let Some(dst_params) = dst.params_mut(&name) else {
            continue;
        };
        for (index, (dst_tensor, src_tensor)) in
            dst_params.iter_mut().zip(src_params).enumerate()
        {
            if dst_tensor.len() != src_tensor.len() {
                return Err(EngineErr::ParameterSizeMismatch {
                    layer: name,
                    index,
                    got: src_tensor.len(),
                    expected: dst_tensor.len(),
                });
            }
            dst_tensor.copy_from_slice(src_tensor);
        }
    }
    Ok(())
}

/// Failures raised at the engine seam.
#[derive(Debug)]
pub enum EngineErr {
    Io(io::Error),
    Graph(GraphError),
    ParameterCountMismatch {
        layer: String,
        got: usize,
        expected: usize,
    },
    ParameterSizeMismatch {
        layer: String,
        index: usize,
        got: usize,
        expected: usize,
    },
    InputShapeMismatch {
        got: (usize, usize, usize),
        expected: (usize, usize, usize),
    },
}

impl fmt::Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::Io(e) => write!(f, "io error: {e}"),
            EngineErr::Graph(e) => write!(f, "{e}"),
            EngineErr::ParameterCountMismatch {
                layer,
                got,
                expected,
            } => write!(
                f,
                "different number of params in layer {layer}: got {got}, expected {expected}"
            ),
            EngineErr::ParameterSizeMismatch {
                layer,
                index,
                got,
                expected,
            } => write!(
                f,
                "param {index} of layer {layer} has {got} elements, expected {expected}"
            ),
            EngineErr::InputShapeMismatch { got, expected } => write!(
                f,
                "input shape mismatch: got {got:?}, expected {expected:?}"
            ),
        }
    }
}

impl Error for EngineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineErr::Io(e) => Some(e),
            EngineErr::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<GraphError> for EngineErr {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}
