//! Self-describing binary feature records.
//!
//! Layout: six `u32` header fields in big-endian order — width, height,
//! channels, x stride, y stride, channel stride — followed by
//! `width * height * channels` raw `f32` elements. The element for
//! `(channel, y, x)` sits at `channel * channel_stride + y * y_stride +
//! x * x_stride`, so a record can describe any axis ordering, not just
//! row-major. A record with all-zero dimensions and no elements is the
//! valid encoding of an empty tensor.

use std::io::{self, Read, Write};

use ndarray::{Array3, ArrayView3};

/// One serialized feature tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub x_stride: u32,
    pub y_stride: u32,
    pub channel_stride: u32,
    pub elements: Vec<f32>,
}

impl FeatureRecord {
    /// The record written when the valid region has collapsed to nothing.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 0,
            x_stride: 0,
            y_stride: 0,
            channel_stride: 0,
            elements: Vec::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Packs a C×H×W view into a record.
    ///
    /// The view may be a non-contiguous sub-view of a larger buffer; its
    /// memory-order of axes is preserved by ranking axes on their physical
    /// stride and rebuilding compact strides in that order.
    pub fn from_view(view: ArrayView3<'_, f32>) -> Self {
        let (channels, height, width) = view.dim();
        if channels == 0 || height == 0 || width == 0 {
            return Self::empty();
        }
        let [channel_stride, y_stride, x_stride] =
            compact_strides([channels, height, width], view.strides());
        let mut elements = vec![0.0; channels * height * width];
        for ((channel, y, x), &value) in view.indexed_iter() {
            elements[channel * channel_stride + y * y_stride + x * x_stride] = value;
        }
        Self {
            width: width as u32,
            height: height as u32,
            channels: channels as u32,
            x_stride: x_stride as u32,
            y_stride: y_stride as u32,
            channel_stride: channel_stride as u32,
            elements,
        }
    }

    /// Rebuilds the record as an owned C×H×W array.
    pub fn to_array(&self) -> Array3<f32> {
        let (channels, height, width) = (
            self.channels as usize,
            self.height as usize,
            self.width as usize,
        );
        Array3::from_shape_fn((channels, height, width), |(channel, y, x)| {
            self.elements[channel * self.channel_stride as usize
                + y * self.y_stride as usize
                + x * self.x_stride as usize]
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let header = [
            self.width,
            self.height,
            self.channels,
            self.x_stride,
            self.y_stride,
            self.channel_stride,
        ];
        for field in header {
            writer.write_all(&field.to_be_bytes())?;
        }
        writer.write_all(bytemuck::cast_slice(&self.elements))
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut header = [0u8; 24];
        reader.read_exact(&mut header)?;
        let mut fields = [0u32; 6];
        for (field, chunk) in fields.iter_mut().zip(header.chunks_exact(4)) {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            *field = u32::from_be_bytes(raw);
        }
        let [width, height, channels, x_stride, y_stride, channel_stride] = fields;

        let count = width as usize * height as usize * channels as usize;
        if count > 0 {
            let last = (width as usize - 1) * x_stride as usize
                + (height as usize - 1) * y_stride as usize
                + (channels as usize - 1) * channel_stride as usize;
            if last + 1 != count {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("strides do not address {count} elements"),
                ));
            }
        }
        let mut payload = vec![0u8; count * size_of::<f32>()];
        reader.read_exact(&mut payload)?;
        let elements = bytemuck::pod_collect_to_vec(&payload);

        Ok(Self {
            width,
            height,
            channels,
            x_stride,
            y_stride,
            channel_stride,
            elements,
        })
    }
}

/// Compact per-axis strides for `shape`, keeping the axis ordering implied
/// by the physical strides: the stride of an axis is the product of the
/// sizes of all axes with a smaller physical stride.
fn compact_strides(shape: [usize; 3], physical: &[isize]) -> [usize; 3] {
    let mut order = [0usize, 1, 2];
    order.sort_by_key(|&axis| physical[axis].unsigned_abs());
    let mut strides = [0usize; 3];
    let mut step = 1;
    for &axis in &order {
        strides[axis] = step;
        step *= shape[axis];
    }
    strides
}
