//! Experiment tracking sinks.
//!
//! A tracker receives one [`Record`] per logging event, tagged with the
//! training step. [`JsonlTracker`] persists the session next to the
//! checkpoints:
//!
//! ```text
//! results/<group>/<experiment_name>/
//! ├── config.json      resolved configuration
//! ├── tracking.json    session header (project, run name, group, agent config)
//! ├── metrics.jsonl    one {"step": i, "metrics": {...}} object per line
//! └── model{n}.json    checkpoints
//! ```

use std::{
    fs::File,
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use fisor_agent::Record;
use serde::Serialize;
use serde_json::Value;

use crate::config::ExperimentConfig;

pub const HEADER_FILE_NAME: &str = "tracking.json";
pub const METRICS_FILE_NAME: &str = "metrics.jsonl";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrackerError {
    #[display("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to serialize tracking data for {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub trait Tracker {
    /// Records `record` at training step `step`.
    fn log(&mut self, record: &Record, step: usize) -> Result<(), TrackerError>;
}

/// Session identity written once when a tracker is initialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInfo {
    pub project: String,
    pub name: String,
    pub group: String,
    /// Agent hyperparameters.
    pub config: Value,
}

impl RunInfo {
    pub fn from_config(config: &ExperimentConfig) -> Result<Self, serde_json::Error> {
        Ok(Self {
            project: config.project.clone(),
            name: config.experiment_name.clone(),
            group: config.group.clone(),
            config: serde_json::to_value(&config.agent_kwargs)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct Header<'a> {
    #[serde(flatten)]
    info: &'a RunInfo,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct Line<'a> {
    step: usize,
    metrics: &'a Record,
}

/// Writes the session to JSON files in a run directory.
#[derive(Debug)]
pub struct JsonlTracker {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlTracker {
    /// Writes the session header and opens the metrics log in `dir`.
    pub fn init(dir: &Path, info: &RunInfo) -> Result<Self, TrackerError> {
        let header_path = dir.join(HEADER_FILE_NAME);
        let header = Header {
            info,
            started_at: Utc::now(),
        };
        let file = File::create(&header_path).map_err(|source| TrackerError::Io {
            path: header_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &header).map_err(|source| {
            TrackerError::Json {
                path: header_path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|source| TrackerError::Io {
            path: header_path.clone(),
            source,
        })?;

        let path = dir.join(METRICS_FILE_NAME);
        let file = File::create(&path).map_err(|source| TrackerError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            project = %info.project,
            name = %info.name,
            group = %info.group,
            "Tracking session started"
        );
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }
}

impl Tracker for JsonlTracker {
    fn log(&mut self, record: &Record, step: usize) -> Result<(), TrackerError> {
        let line = Line {
            step,
            metrics: record,
        };
        serde_json::to_writer(&mut self.writer, &line).map_err(|source| TrackerError::Json {
            path: self.path.clone(),
            source,
        })?;
        writeln!(self.writer)
            .and_then(|()| self.writer.flush())
            .map_err(|source| TrackerError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Keeps every logged record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryTracker {
    entries: Vec<(usize, Record)>,
}

impl MemoryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[(usize, Record)] {
        &self.entries
    }

    /// Entries containing at least one metric under `prefix/`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a (usize, Record)> + 'a {
        self.entries.iter().filter(move |(_, record)| {
            record.iter().any(|(name, _)| {
                name.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
            })
        })
    }
}

impl Tracker for MemoryTracker {
    fn log(&mut self, record: &Record, step: usize) -> Result<(), TrackerError> {
        self.entries.push((step, record.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn info() -> RunInfo {
        RunInfo {
            project: "safe-rl".to_owned(),
            name: "run".to_owned(),
            group: "OfflineCarRun-v0".to_owned(),
            config: serde_json::json!({"model_cls": "FISOR"}),
        }
    }

    #[test]
    fn test_jsonl_tracker_writes_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = JsonlTracker::init(dir.path(), &info()).unwrap();
        let mut record = Record::new();
        record.insert("train/loss", 0.5);
        tracker.log(&record, 0).unwrap();
        tracker.log(&record, 10).unwrap();

        let header: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(HEADER_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(header["project"], "safe-rl");
        assert_eq!(header["group"], "OfflineCarRun-v0");
        assert_eq!(header["config"]["model_cls"], "FISOR");
        assert!(header["started_at"].is_string());

        let text = fs::read_to_string(dir.path().join(METRICS_FILE_NAME)).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], r#"{"step":10,"metrics":{"train/loss":0.5}}"#);
    }

    #[test]
    fn test_init_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonlTracker::init(&dir.path().join("missing"), &info()).unwrap_err();
        assert!(matches!(err, TrackerError::Io { .. }));
    }

    #[test]
    fn test_memory_tracker_prefix_filter() {
        let mut tracker = MemoryTracker::new();
        let train = [("train/loss", 1.0)].into_iter().collect::<Record>();
        let eval = [("eval/return", 2.0)].into_iter().collect::<Record>();
        tracker.log(&train, 0).unwrap();
        tracker.log(&eval, 0).unwrap();
        tracker.log(&train, 5).unwrap();
        assert_eq!(tracker.entries().len(), 3);
        assert_eq!(
            tracker.with_prefix("train").map(|(step, _)| *step).collect::<Vec<_>>(),
            vec![0, 5]
        );
        assert_eq!(tracker.with_prefix("eval").count(), 1);
    }
}
