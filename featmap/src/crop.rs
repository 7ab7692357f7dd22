use ndarray::{ArrayView3, s};
use netgraph::SpatialSize;

/// Takes the top-left `size` region of every channel as a borrowed sub-view.
///
/// Strides come from the source view, so nothing is copied and a
/// non-contiguous upstream tensor stays non-contiguous until serialization.
/// Extents beyond the tensor's physical bounds are clipped.
pub fn valid_region<'a>(output: ArrayView3<'a, f32>, size: SpatialSize) -> ArrayView3<'a, f32> {
    let (_, rows, cols) = output.dim();
    let height = size.height.min(rows);
    let width = size.width.min(cols);
    output.slice_move(s![.., ..height, ..width])
}
