use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// One image to process: where to read it and where the feature record goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Reads a two-column `input,output` job list.
///
/// Blank lines and `#` comments are skipped.
pub fn load_jobs(path: &Path) -> io::Result<Vec<Job>> {
    let contents = fs::read_to_string(path)?;
    let mut jobs = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((input, output)) = line.split_once(',') else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: expected 'input,output'", number + 1),
            ));
        };
        jobs.push(Job {
            input: PathBuf::from(input.trim()),
            output: PathBuf::from(output.trim()),
        });
    }
    Ok(jobs)
}
