//! Receptive-field geometry: how layer stacks shrink, stride and widen the
//! view each output location has of the input.

use std::fmt;

use log::debug;

use crate::{
    def::{DATA_LAYER, LayerDef, LayerGraph, LayerKind},
    error::{GraphError, Result},
};

/// A (height, width) pair of non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialSize {
    pub height: usize,
    pub width: usize,
}

impl SpatialSize {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// True when either axis has collapsed to nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

impl fmt::Display for SpatialSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.height, self.width)
    }
}

/// Kernel extent and stride of a layer, with identity for kinds that do not
/// touch the spatial axes.
pub fn spatial_effect(layer: &LayerDef) -> Result<(usize, usize)> {
    match &layer.kind {
        LayerKind::Convolution | LayerKind::Pooling => {
            let field = layer.kernel_size.ok_or_else(|| GraphError::MissingKernelSize {
                layer: layer.name.clone(),
            })?;
            Ok((field.get() as usize, layer.stride.get() as usize))
        }
        LayerKind::LocalResponseNorm => Ok((1, 1)),
        LayerKind::Other(tag) if spatially_neutral(tag) => Ok((1, 1)),
        LayerKind::Other(tag) => Err(GraphError::UnsupportedLayerKind {
            layer: layer.name.clone(),
            kind: tag.clone(),
        }),
    }
}

/// Elementwise kinds that pass spatial extents through unchanged.
fn spatially_neutral(tag: &str) -> bool {
    matches!(tag, "relu" | "dropout")
}

/// Spatial size of `target`'s valid output region for the given input size.
///
/// Walks backward from `target` to the `"data"` sentinel, applying per axis
/// `ceil((prev - field + 1) / stride)`, clamped at zero once the kernel no
/// longer fits.
pub fn output_size(graph: &LayerGraph<'_>, target: &str, input: SpatialSize) -> Result<SpatialSize> {
    if target == DATA_LAYER {
        return Ok(input);
    }
    let layer = graph.get(target).ok_or_else(|| GraphError::LayerNotFound {
        name: target.to_string(),
    })?;
    let (field, stride) = spatial_effect(layer)?;
    let prev = output_size(graph, layer.single_input()?, input)?;
    let out = SpatialSize {
        height: step_dim(prev.height, field, stride),
        width: step_dim(prev.width, field, stride),
    };
    debug!("{}: {prev} -> {out}", layer.name);
    Ok(out)
}

fn step_dim(prev: usize, field: usize, stride: usize) -> usize {
    let span = prev as i64 - field as i64 + 1;
    if span <= 0 {
        return 0;
    }
    (span as usize).div_ceil(stride)
}

/// Cumulative downsampling rate (product of strides) from input to `target`.
pub fn layer_rate(graph: &LayerGraph<'_>, target: &str) -> Result<usize> {
    rate_helper(graph, target, 1)
}

fn rate_helper(graph: &LayerGraph<'_>, name: &str, prod: usize) -> Result<usize> {
    if name == DATA_LAYER {
        return Ok(prod);
    }
    let layer = graph.get(name).ok_or_else(|| GraphError::LayerNotFound {
        name: name.to_string(),
    })?;
    let (_, stride) = spatial_effect(layer)?;
    rate_helper(graph, layer.single_input()?, stride * prod)
}

/// Extent, in input pixels, of the region one output location of `target`
/// can see.
pub fn receptive_field(graph: &LayerGraph<'_>, target: &str) -> Result<usize> {
    field_helper(graph, target).map(|(_, extent)| extent)
}

fn field_helper(graph: &LayerGraph<'_>, name: &str) -> Result<(usize, usize)> {
    if name == DATA_LAYER {
        return Ok((1, 1));
    }
    let layer = graph.get(name).ok_or_else(|| GraphError::LayerNotFound {
        name: name.to_string(),
    })?;
    let (field, stride) = spatial_effect(layer)?;
    let (rate, extent) = field_helper(graph, layer.single_input()?)?;
    Ok((stride * rate, (field - 1) * rate + extent))
}

/// Walks the path from `target` to `"data"` without computing sizes, so
/// graph-shape errors surface before any work is done.
pub fn validate_path(graph: &LayerGraph<'_>, target: &str) -> Result<()> {
    let mut name = target;
    while name != DATA_LAYER {
        let layer = graph.get(name).ok_or_else(|| GraphError::LayerNotFound {
            name: name.to_string(),
        })?;
        spatial_effect(layer)?;
        name = layer.single_input()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::def::NetDef;

    fn layer(name: &str, kind: LayerKind, kernel: Option<u32>, stride: u32, inputs: &[&str]) -> LayerDef {
        LayerDef {
            name: name.to_string(),
            kind,
            kernel_size: kernel.and_then(NonZeroU32::new),
            stride: NonZeroU32::new(stride).unwrap(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn net(layers: Vec<LayerDef>) -> NetDef {
        NetDef {
            name: String::new(),
            input_dim: vec![1, 3, 0, 0],
            layers,
        }
    }

    #[test]
    fn single_conv_matches_formula() {
        let net = net(vec![layer("conv1", LayerKind::Convolution, Some(3), 2, &["data"])]);
        let graph = net.graph();
        for (h, w) in [(7usize, 8usize), (3, 3), (10, 3), (224, 224)] {
            let out = output_size(&graph, "conv1", SpatialSize::new(h, w)).unwrap();
            let expect = |n: usize| (n - 3 + 1).div_ceil(2);
            assert_eq!(out, SpatialSize::new(expect(h), expect(w)));
        }
    }

    #[test]
    fn kernel_larger_than_input_clamps_to_zero() {
        let net = net(vec![layer("conv1", LayerKind::Convolution, Some(5), 1, &["data"])]);
        let out = output_size(&net.graph(), "conv1", SpatialSize::new(3, 8)).unwrap();
        assert_eq!(out, SpatialSize::new(0, 4));
        let out = output_size(&net.graph(), "conv1", SpatialSize::new(2, 2)).unwrap();
        assert_eq!(out, SpatialSize::new(0, 0));
        assert!(out.is_empty());
    }

    #[test]
    fn identity_kinds_pass_size_through() {
        let net = net(vec![
            layer("conv1", LayerKind::Convolution, Some(3), 1, &["data"]),
            layer("norm1", LayerKind::LocalResponseNorm, None, 1, &["conv1"]),
            layer("relu1", LayerKind::Other("relu".to_string()), None, 1, &["norm1"]),
        ]);
        let graph = net.graph();
        let size = SpatialSize::new(20, 30);
        let at_conv = output_size(&graph, "conv1", size).unwrap();
        assert_eq!(output_size(&graph, "norm1", size).unwrap(), at_conv);
        assert_eq!(output_size(&graph, "relu1", size).unwrap(), at_conv);
    }

    #[test]
    fn stacked_convs_compose() {
        let net = net(vec![
            layer("conv1", LayerKind::Convolution, Some(5), 2, &["data"]),
            layer("conv2", LayerKind::Convolution, Some(3), 2, &["conv1"]),
        ]);
        let graph = net.graph();
        let size = SpatialSize::new(40, 33);
        let step = |n: usize, k: usize, s: usize| (n - k + 1).div_ceil(s);
        let once = SpatialSize::new(step(40, 5, 2), step(33, 5, 2));
        let twice = SpatialSize::new(step(once.height, 3, 2), step(once.width, 3, 2));
        assert_eq!(output_size(&graph, "conv1", size).unwrap(), once);
        assert_eq!(output_size(&graph, "conv2", size).unwrap(), twice);
    }

    #[test]
    fn two_inputs_are_malformed() {
        let net = net(vec![
            layer("conv1", LayerKind::Convolution, Some(3), 1, &["data"]),
            layer("merge", LayerKind::Convolution, Some(1), 1, &["data", "conv1"]),
        ]);
        let err = output_size(&net.graph(), "merge", SpatialSize::new(8, 8)).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MalformedLayerGraph { inputs: 2, .. }
        ));
    }

    #[test]
    fn missing_target_is_reported() {
        let net = net(vec![layer("conv1", LayerKind::Convolution, Some(3), 1, &["data"])]);
        let err = output_size(&net.graph(), "conv9", SpatialSize::new(8, 8)).unwrap_err();
        match err {
            GraphError::LayerNotFound { name } => assert_eq!(name, "conv9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let net = net(vec![layer(
            "soft",
            LayerKind::Other("softmax".to_string()),
            None,
            1,
            &["data"],
        )]);
        let err = output_size(&net.graph(), "soft", SpatialSize::new(8, 8)).unwrap_err();
        match err {
            GraphError::UnsupportedLayerKind { kind, .. } => assert_eq!(kind, "softmax"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rate_is_product_of_strides() {
        let net = net(vec![
            layer("conv1", LayerKind::Convolution, Some(7), 2, &["data"]),
            layer("pool1", LayerKind::Pooling, Some(3), 3, &["conv1"]),
            layer("norm1", LayerKind::LocalResponseNorm, None, 1, &["pool1"]),
        ]);
        assert_eq!(layer_rate(&net.graph(), "norm1").unwrap(), 6);
    }

    #[test]
    fn receptive_field_composes() {
        // conv k=3 s=2 then conv k=3 s=1: extent 3, then (3-1)*2 + 3 = 7.
        let net = net(vec![
            layer("conv1", LayerKind::Convolution, Some(3), 2, &["data"]),
            layer("conv2", LayerKind::Convolution, Some(3), 1, &["conv1"]),
        ]);
        let graph = net.graph();
        assert_eq!(receptive_field(&graph, "conv1").unwrap(), 3);
        assert_eq!(receptive_field(&graph, "conv2").unwrap(), 7);
    }

    #[test]
    fn validate_path_accepts_good_and_rejects_bad() {
        let good = net(vec![
            layer("conv1", LayerKind::Convolution, Some(3), 1, &["data"]),
            layer("relu1", LayerKind::Other("relu".to_string()), None, 1, &["conv1"]),
        ]);
        validate_path(&good.graph(), "relu1").unwrap();

        let bad = net(vec![layer(
            "soft",
            LayerKind::Other("softmax".to_string()),
            None,
            1,
            &["data"],
        )]);
        assert!(validate_path(&bad.graph(), "soft").is_err());
    }
}
