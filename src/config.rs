use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use featmap::PreprocessConfig;
use netgraph::DATA_LAYER;

/// Per-input preprocessing table.
///
/// Without an override file this is the ImageNet-style default for the
/// `data` blob: pixels back to `[0, 255]` and channels flipped to BGR.
pub fn preprocess_table(path: Option<&Path>) -> io::Result<HashMap<String, PreprocessConfig>> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            let table = serde_json::from_reader(BufReader::new(file))?;
            Ok(table)
        }
        None => {
            let mut table = HashMap::new();
            table.insert(
                DATA_LAYER.to_string(),
                PreprocessConfig {
                    raw_scale: Some(255.0),
                    input_scale: None,
                    channel_permutation: Some(vec![2, 1, 0]),
                },
            );
            Ok(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_table_formats_the_data_blob() {
        let table = preprocess_table(None).unwrap();
        let cfg = table.get(DATA_LAYER).unwrap();
        assert_eq!(cfg.raw_scale, Some(255.0));
        assert_eq!(cfg.input_scale, None);
        assert_eq!(cfg.channel_permutation, Some(vec![2, 1, 0]));
    }

    #[test]
    fn override_file_replaces_the_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"data": {"input_scale": 0.5}}"#).unwrap();

        let table = preprocess_table(Some(file.path())).unwrap();
        let cfg = table.get(DATA_LAYER).unwrap();
        assert_eq!(cfg.input_scale, Some(0.5));
        assert_eq!(cfg.raw_scale, None);
        assert_eq!(cfg.channel_permutation, None);
    }
}
