use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, BufReader},
    num::NonZeroU32,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{GraphError, Result},
    field::SpatialSize,
};

/// Name of the network input. It is the base case of every backward
/// traversal and never appears as a layer of its own.
pub const DATA_LAYER: &str = "data";

/// Operation carried by a layer.
///
/// `Other` keeps the raw type tag of anything outside the closed set, so the
/// traversal can report exactly what it refused to handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayerKind {
    Convolution,
    Pooling,
    LocalResponseNorm,
    Other(String),
}

impl From<String> for LayerKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "convolution" => LayerKind::Convolution,
            "pooling" => LayerKind::Pooling,
            "lrn" => LayerKind::LocalResponseNorm,
            _ => LayerKind::Other(tag),
        }
    }
}

impl From<LayerKind> for String {
    fn from(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Convolution => "convolution".to_string(),
            LayerKind::Pooling => "pooling".to_string(),
            LayerKind::LocalResponseNorm => "lrn".to_string(),
            LayerKind::Other(tag) => tag,
        }
    }
}

/// One named layer of the description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<NonZeroU32>,
    #[serde(default = "default_stride")]
    pub stride: NonZeroU32,
    #[serde(default)]
    pub inputs: Vec<String>,
}

fn default_stride() -> NonZeroU32 {
    NonZeroU32::MIN
}

impl LayerDef {
    /// The single data source this layer reads from.
    ///
    /// Multi-input layers are unsupported throughout; anything other than
    /// exactly one reference is malformed.
    pub fn single_input(&self) -> Result<&str> {
        match self.inputs.as_slice() {
            [one] => Ok(one),
            inputs => Err(GraphError::MalformedLayerGraph {
                layer: self.name.clone(),
                inputs: inputs.len(),
            }),
        }
    }
}

/// A full network description.
///
/// The base description loaded from disk stays immutable; per-image size
/// binding goes through [`NetDef::bind_input`], which returns a derived copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDef {
    #[serde(default)]
    pub name: String,
    /// Input shape as (n, c, h, w).
    pub input_dim: Vec<usize>,
    pub layers: Vec<LayerDef>,
}

impl NetDef {
    /// Reads a JSON description from `path`.
    pub fn load(path: &Path) -> io::Result<NetDef> {
        let file = File::open(path)?;
        let net = serde_json::from_reader(BufReader::new(file))?;
        Ok(net)
    }

    /// Structural validation run once after load.
    pub fn check(&self) -> Result<()> {
        if self.input_dim.len() != 4 {
            return Err(GraphError::BadInputDim {
                got: self.input_dim.len(),
            });
        }
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(GraphError::DuplicateLayer {
                    name: layer.name.clone(),
                });
            }
            let needs_kernel = matches!(layer.kind, LayerKind::Convolution | LayerKind::Pooling);
            if needs_kernel && layer.kernel_size.is_none() {
                return Err(GraphError::MissingKernelSize {
                    layer: layer.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Derived copy with batch size 1 and the given spatial input size bound.
    pub fn bind_input(&self, size: SpatialSize) -> NetDef {
        let mut bound = self.clone();
        bound.input_dim[0] = 1;
        bound.input_dim[2] = size.height;
        bound.input_dim[3] = size.width;
        bound
    }

    /// Keeps only the layers that feed `output`, preserving description order.
    pub fn subset_for_output(&self, output: &str) -> NetDef {
        let mut keep = HashSet::new();
        self.mark_before(output, &mut keep);
        NetDef {
            name: self.name.clone(),
            input_dim: self.input_dim.clone(),
            layers: self
                .layers
                .iter()
                .filter(|l| keep.contains(l.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    fn mark_before<'a>(&'a self, name: &str, keep: &mut HashSet<&'a str>) {
        if name == DATA_LAYER {
            return;
        }
        let Some(layer) = self.layers.iter().find(|l| l.name == name) else {
            return;
        };
        if !keep.insert(layer.name.as_str()) {
            // Already visited.
            return;
        }
        for input in &layer.inputs {
            self.mark_before(input, keep);
        }
    }

    /// Lookup table over the layers, borrowed from this description.
    pub fn graph(&self) -> LayerGraph<'_> {
        LayerGraph {
            by_name: self
                .layers
                .iter()
                .map(|layer| (layer.name.as_str(), layer))
                .collect(),
        }
    }
}

/// Name-indexed view of a [`NetDef`].
#[derive(Debug)]
pub struct LayerGraph<'a> {
    by_name: HashMap<&'a str, &'a LayerDef>,
}

impl<'a> LayerGraph<'a> {
    pub fn get(&self, name: &str) -> Option<&'a LayerDef> {
        self.by_name.get(name).copied()
    }
}
