use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::DatasetError;

/// On-disk, column-oriented trajectory data.
///
/// Rows are stored in trajectory order; row `i` of every column describes the
/// same transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub observations: Vec<Vec<f32>>,
    pub actions: Vec<Vec<f32>>,
    pub next_observations: Vec<Vec<f32>>,
    pub rewards: Vec<f32>,
    pub costs: Vec<f32>,
    pub terminals: Vec<bool>,
    pub timeouts: Vec<bool>,
}

impl DatasetFile {
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn load<P>(path: P) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json {
            path: path.to_owned(),
            source,
        })
    }

    pub fn save<P>(&self, path: P) -> Result<(), DatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let io_error = |source| DatasetError::Io {
            path: path.to_owned(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        serde_json::to_writer(&mut writer, self).map_err(|source| DatasetError::Json {
            path: path.to_owned(),
            source,
        })?;
        writer.flush().map_err(io_error)
    }

    /// Checks that all columns have the same length and the expected widths.
    pub fn validate(&self, observation_dim: usize, action_dim: usize) -> Result<(), DatasetError> {
        let expected = self.len();
        let lengths = [
            ("actions", self.actions.len()),
            ("next_observations", self.next_observations.len()),
            ("rewards", self.rewards.len()),
            ("costs", self.costs.len()),
            ("terminals", self.terminals.len()),
            ("timeouts", self.timeouts.len()),
        ];
        for (column, actual) in lengths {
            if actual != expected {
                return Err(DatasetError::ColumnLength {
                    column,
                    expected,
                    actual,
                });
            }
        }

        let rows = [
            ("observations", &self.observations, observation_dim),
            ("next_observations", &self.next_observations, observation_dim),
            ("actions", &self.actions, action_dim),
        ];
        for (column, values, expected) in rows {
            if let Some((row, value)) = values
                .iter()
                .enumerate()
                .find(|(_, value)| value.len() != expected)
            {
                return Err(DatasetError::Dimension {
                    column,
                    row,
                    expected,
                    actual: value.len(),
                });
            }
        }
        Ok(())
    }

    /// Keeps only the first `len` rows.
    pub fn truncate(&mut self, len: usize) {
        self.observations.truncate(len);
        self.actions.truncate(len);
        self.next_observations.truncate(len);
        self.rewards.truncate(len);
        self.costs.truncate(len);
        self.terminals.truncate(len);
        self.timeouts.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rows() -> DatasetFile {
        DatasetFile {
            observations: vec![vec![0.0, 0.0], vec![1.0, 0.0]],
            actions: vec![vec![0.5], vec![-0.5]],
            next_observations: vec![vec![1.0, 0.0], vec![2.0, 0.0]],
            rewards: vec![1.0, 2.0],
            costs: vec![0.0, 1.0],
            terminals: vec![false, true],
            timeouts: vec![false, false],
        }
    }

    #[test]
    fn test_validate_accepts_consistent_columns() {
        two_rows().validate(2, 1).unwrap();
    }

    #[test]
    fn test_validate_rejects_short_column() {
        let mut file = two_rows();
        file.costs.pop();
        assert!(matches!(
            file.validate(2, 1),
            Err(DatasetError::ColumnLength {
                column: "costs",
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_width() {
        let file = two_rows();
        assert!(matches!(
            file.validate(2, 2),
            Err(DatasetError::Dimension {
                column: "actions",
                row: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let file = two_rows();
        file.save(&path).unwrap();
        assert_eq!(DatasetFile::load(&path).unwrap(), file);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DatasetFile::load(dir.path().join("missing.json")),
            Err(DatasetError::Io { .. })
        ));
    }
}
