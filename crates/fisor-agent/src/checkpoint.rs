//! Checkpoint files: one JSON document per saved agent version.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointError {
    #[display("failed to access checkpoint {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[display("malformed checkpoint {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// `dir/model{version}.json`
#[must_use]
pub fn path_for(dir: &Path, version: usize) -> PathBuf {
    dir.join(format!("model{version}.json"))
}

pub fn write_json<T>(path: &Path, value: &T) -> Result<(), CheckpointError>
where
    T: Serialize + ?Sized,
{
    let io_err = |source| CheckpointError::Io {
        path: path.to_owned(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| CheckpointError::Json {
        path: path.to_owned(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    tracing::debug!(path = %path.display(), "Saved checkpoint");
    Ok(())
}

pub fn read_json<T>(path: &Path) -> Result<T, CheckpointError>
where
    T: DeserializeOwned,
{
    let file = File::open(path).map_err(|source| CheckpointError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CheckpointError::Json {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_version() {
        assert_eq!(
            path_for(Path::new("runs/a"), 12),
            Path::new("runs/a/model12.json")
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<f32>>(&dir.path().join("model1.json")).unwrap_err();
        assert!(matches!(err, CheckpointError::Io { .. }));
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("model1.json");
        assert!(write_json(&path, &[1.0_f32]).is_err());
    }
}
