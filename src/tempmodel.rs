use std::{io, path::Path};

use netgraph::NetDef;
use tempfile::NamedTempFile;

/// Scratch file holding the serialized description of one network
/// instantiation.
///
/// Engines take model descriptions by path; this scopes the hand-off so the
/// file is removed when the value drops, on success and failure alike.
#[derive(Debug)]
pub struct TempModel {
    file: NamedTempFile,
}

impl TempModel {
    pub fn write(net: &NetDef) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        serde_json::to_writer(&mut file, net).map_err(io::Error::from)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_lives_exactly_as_long_as_the_guard() {
        let net = NetDef {
            name: "scratch".to_string(),
            input_dim: vec![1, 3, 8, 8],
            layers: Vec::new(),
        };
        let guard = TempModel::write(&net).unwrap();
        let path = guard.path().to_path_buf();
        assert!(path.exists());

        let read = NetDef::load(&path).unwrap();
        assert_eq!(read.input_dim, net.input_dim);

        drop(guard);
        assert!(!path.exists());
    }
}
