//! Static network descriptions and spatial-geometry queries over them.

mod def;
mod error;
mod field;

pub use def::{DATA_LAYER, LayerDef, LayerGraph, LayerKind, NetDef};
pub use error::{GraphError, Result};
pub use field::{
    SpatialSize, layer_rate, output_size, receptive_field, spatial_effect, validate_path,
};
