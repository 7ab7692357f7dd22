use std::{error::Error, fmt};

/// The result type used across the graph module.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Failures raised while validating or traversing a layer graph.
#[derive(Debug)]
pub enum GraphError {
    LayerNotFound {
        name: String,
    },
    MalformedLayerGraph {
        layer: String,
        inputs: usize,
    },
    UnsupportedLayerKind {
        layer: String,
        kind: String,
    },
    MissingKernelSize {
        layer: String,
    },
    DuplicateLayer {
        name: String,
    },
    BadInputDim {
        got: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::LayerNotFound { name } => write!(f, "layer not found: {name}"),
            GraphError::MalformedLayerGraph { layer, inputs } => {
                write!(f, "layer {layer} does not have exactly one input, got {inputs}")
            }
            GraphError::UnsupportedLayerKind { layer, kind } => {
                write!(f, "layer {layer} has unsupported kind: {kind}")
            }
            GraphError::MissingKernelSize { layer } => {
                write!(f, "layer {layer} needs a kernel size")
            }
            GraphError::DuplicateLayer { name } => {
                write!(f, "layer name appears more than once: {name}")
            }
            GraphError::BadInputDim { got } => {
                write!(f, "input_dim must have 4 entries (n, c, h, w), got {got}")
            }
        }
    }
}

impl Error for GraphError {}
