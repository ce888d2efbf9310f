use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed sample table {}: {reason}", .table.display())]
    MalformedTable { table: PathBuf, reason: String },

    #[error("Sample {sample}: data file {} is not readable", .path.display())]
    MissingArtifact { sample: String, path: PathBuf },

    #[error("Analysis {analysis}: sample {sample} has no '{stage}' output yet, run that stage first")]
    DependencyNotReady {
        analysis: String,
        sample: String,
        stage: String,
    },

    #[error("Analysis {analysis}: no samples selected")]
    EmptyGroup { analysis: String },

    #[error("Script {} exited with {}: {stderr}", .script.display(), describe_exit(.code))]
    Dispatch {
        script: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse sample table {}: {source}", .table.display())]
    Csv { table: PathBuf, source: csv::Error },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

impl PipelineError {
    pub(crate) fn malformed<P, S>(table: P, reason: S) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        PipelineError::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
