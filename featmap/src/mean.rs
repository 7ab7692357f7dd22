use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use ndarray::{Array1, Axis};

use crate::record::FeatureRecord;

/// Reads a C×H×W mean record from `path` and averages it over the spatial
/// axes, yielding one value per channel.
pub fn load_channel_mean(path: &Path) -> io::Result<Array1<f32>> {
    let mut reader = BufReader::new(File::open(path)?);
    let record = FeatureRecord::read_from(&mut reader)?;
    channel_mean(&record)
}

/// Per-channel average over the spatial axes of `record`.
pub fn channel_mean(record: &FeatureRecord) -> io::Result<Array1<f32>> {
    if record.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "mean record has no elements",
        ));
    }
    let tensor = record.to_array();
    let spatial = (record.height * record.width) as f32;
    Ok(tensor.sum_axis(Axis(2)).sum_axis(Axis(1)) / spatial)
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    #[test]
    fn averages_over_spatial_axes() {
        let tensor = Array3::from_shape_vec(
            (2, 2, 2),
            vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0],
        )
        .unwrap();
        let record = FeatureRecord::from_view(tensor.view());
        let mean = channel_mean(&record).unwrap();
        assert_eq!(mean.len(), 2);
        assert_eq!(mean[0], 2.5);
        assert_eq!(mean[1], 25.0);
    }

    #[test]
    fn single_pixel_record_broadcasts() {
        let tensor = Array3::from_shape_vec((3, 1, 1), vec![104.0, 117.0, 123.0]).unwrap();
        let record = FeatureRecord::from_view(tensor.view());
        let mean = channel_mean(&record).unwrap();
        assert_eq!(mean.to_vec(), vec![104.0, 117.0, 123.0]);
    }

    #[test]
    fn empty_record_is_rejected() {
        assert!(channel_mean(&FeatureRecord::empty()).is_err());
    }
}
