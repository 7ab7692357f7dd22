//! Deterministic in-process engine.
//!
//! Stands in for a real inference backend in the CLI default and the
//! end-to-end tests. Blob values are a fixed pattern seeded from the
//! weights file, so copied parameters are observable in the output; blob
//! extents follow the padded-output geometry real backends produce (never
//! smaller than the valid region).

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use ndarray::{Array3, ArrayView3};
use netgraph::{DATA_LAYER, GraphError, LayerGraph, LayerKind, NetDef, spatial_effect};

use super::{Engine, EngineErr, Network, Result};

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    forwards: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total forward passes run by networks of this engine.
    pub fn forward_count(&self) -> usize {
        self.forwards.load(Ordering::Relaxed)
    }
}

impl Engine for MockEngine {
    type Net = MockNetwork;

    fn instantiate(&self, model: &Path, weights: Option<&Path>) -> Result<MockNetwork> {
        let def = NetDef::load(model)?;
        def.check()?;

        let seed = match weights {
            Some(path) => fs::read(path)?,
            None => Vec::new(),
        };
        let mut order = Vec::new();
        let mut params = HashMap::new();
        for (index, layer) in def.layers.iter().enumerate() {
            if layer.kind != LayerKind::Convolution {
                continue;
            }
            let Some(kernel) = layer.kernel_size else {
                continue;
            };
            let kernel = kernel.get() as usize;
            let bank = fill(&seed, index, kernel * kernel);
            let bias = fill(&seed, index + 1, 1);
            order.push(layer.name.clone());
            params.insert(layer.name.clone(), vec![bank, bias]);
        }

        Ok(MockNetwork {
            def,
            order,
            params,
            outputs: HashMap::new(),
            forwards: Arc::clone(&self.forwards),
        })
    }
}

fn fill(seed: &[u8], salt: usize, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            if seed.is_empty() {
                0.0
            } else {
                seed[(i + salt) % seed.len()] as f32 / 255.0
            }
        })
        .collect()
}

pub struct MockNetwork {
    def: NetDef,
    order: Vec<String>,
    params: HashMap<String, Vec<Vec<f32>>>,
    outputs: HashMap<String, Array3<f32>>,
    forwards: Arc<AtomicUsize>,
}

impl Network for MockNetwork {
    fn forward(&mut self, input: Array3<f32>) -> Result<()> {
        let expected = (self.def.input_dim[1], self.def.input_dim[2], self.def.input_dim[3]);
        let (channels, height, width) = input.dim();
        if (channels, height, width) != expected {
            return Err(EngineErr::InputShapeMismatch {
                got: (channels, height, width),
                expected,
            });
        }
        self.forwards.fetch_add(1, Ordering::Relaxed);
        self.outputs.clear();

        let graph = self.def.graph();
        for layer in &self.def.layers {
            let (rows, cols) = padded_size(&graph, &layer.name, (height, width))?;
            let bias = self
                .params
                .get(&layer.name)
                .and_then(|p| p.first())
                .and_then(|bank| bank.first())
                .copied()
                .unwrap_or(0.0);
            let blob = Array3::from_shape_fn((channels, rows, cols), |(c, y, x)| {
                bias + c as f32 + y as f32 * 0.01 + x as f32 * 0.0001
            });
            self.outputs.insert(layer.name.clone(), blob);
        }
        Ok(())
    }

    fn output(&self, layer: &str) -> Option<ArrayView3<'_, f32>> {
        self.outputs.get(layer).map(|blob| blob.view())
    }

    fn param_layers(&self) -> Vec<String> {
        self.order.clone()
    }

    fn params(&self, layer: &str) -> Option<&[Vec<f32>]> {
        self.params.get(layer).map(Vec::as_slice)
    }

    fn params_mut(&mut self, layer: &str) -> Option<&mut [Vec<f32>]> {
        self.params.get_mut(layer).map(Vec::as_mut_slice)
    }
}

/// Spatial extent of a layer's full (padded) output, which can exceed the
/// valid region: pooling-style geometry rounds partial windows up instead
/// of discarding them.
fn padded_size(
    graph: &LayerGraph<'_>,
    name: &str,
    input: (usize, usize),
) -> std::result::Result<(usize, usize), GraphError> {
    if name == DATA_LAYER {
        return Ok(input);
    }
    let layer = graph.get(name).ok_or_else(|| GraphError::LayerNotFound {
        name: name.to_string(),
    })?;
    let (field, stride) = spatial_effect(layer)?;
    let (rows, cols) = padded_size(graph, layer.single_input()?, input)?;
    Ok((ceil_step(rows, field, stride), ceil_step(cols, field, stride)))
}

fn ceil_step(prev: usize, field: usize, stride: usize) -> usize {
    if prev < field {
        return 0;
    }
    (prev - field).div_ceil(stride) + 1
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use netgraph::{SpatialSize, output_size};

    use super::*;

    const MODEL: &str = r#"{
        "name": "tiny",
        "input_dim": [1, 3, 9, 12],
        "layers": [
            {"name": "conv1", "type": "convolution", "kernel_size": 3, "stride": 2, "inputs": ["data"]},
            {"name": "pool1", "type": "pooling", "kernel_size": 2, "stride": 2, "inputs": ["conv1"]}
        ]
    }"#;

    fn model_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MODEL.as_bytes()).unwrap();
        file
    }

    #[test]
    fn instantiates_params_from_weights() {
        let model = model_file();
        let mut weights = tempfile::NamedTempFile::new().unwrap();
        weights.write_all(&[10u8, 20, 30, 40]).unwrap();

        let engine = MockEngine::new();
        let net = engine.instantiate(model.path(), Some(weights.path())).unwrap();
        assert_eq!(net.param_layers(), ["conv1"]);
        let params = net.params("conv1").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].len(), 9);
        assert_eq!(params[0][0], 10.0 / 255.0);

        let blank = engine.instantiate(model.path(), None).unwrap();
        assert!(blank.params("conv1").unwrap()[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn forward_blobs_cover_the_valid_region() {
        let model = model_file();
        let engine = MockEngine::new();
        let mut net = engine.instantiate(model.path(), None).unwrap();
        net.forward(Array3::zeros((3, 9, 12))).unwrap();
        assert_eq!(engine.forward_count(), 1);

        let def = NetDef::load(model.path()).unwrap();
        let valid = output_size(&def.graph(), "pool1", SpatialSize::new(9, 12)).unwrap();
        let blob = net.output("pool1").unwrap();
        assert!(blob.dim().1 >= valid.height);
        assert!(blob.dim().2 >= valid.width);
    }

    #[test]
    fn forward_rejects_wrong_shape() {
        let model = model_file();
        let mut net = MockEngine::new().instantiate(model.path(), None).unwrap();
        let err = net.forward(Array3::zeros((3, 8, 12))).unwrap_err();
        assert!(matches!(err, EngineErr::InputShapeMismatch { .. }));
    }
}
