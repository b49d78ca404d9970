use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::task::{PipelineStage, TypeOfTask};

/// Errors raised by the task lifecycle, the performance harness and the
/// settings loader.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A lifecycle method was called while the task was in a stage that does not allow it.
    #[error("{called} cannot be called while the task is in the {stage} stage")]
    ExecutionOrder {
        /// The lifecycle method that was called.
        called: &'static str,
        /// The stage the task was in at the time of the call.
        stage: PipelineStage,
    },

    /// A measured time reached or exceeded its ceiling.
    #[error("task execute time need to be: time < {limit} secs, actual time in secs: {actual}")]
    PerformanceExceeded {
        /// The ceiling, in seconds.
        limit: f64,
        /// The measured time, in seconds.
        actual: f64,
    },

    /// Statistics were requested before any measurement populated them.
    #[error("the type of performance check for the task was not selected")]
    MissingRun,

    /// A measurement was requested with zero repetitions.
    #[error("num_running must be at least 1")]
    ZeroRepetitions,

    #[error("failed to open {}", path.display())]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings file parsed, but `tasks.<key>` is missing or not a string.
    #[error("expected a string at tasks.{key} in {}, found {found}", path.display())]
    ConfigType {
        path: PathBuf,
        key: &'static str,
        found: &'static str,
    },

    /// No timer is known for this kind of task.
    #[error("the task type {type_of_task} is not supported for performance testing")]
    UnsupportedTaskType { type_of_task: TypeOfTask },

    #[error("{test_name}: {stage} reported failure")]
    StageFailed {
        test_name: String,
        stage: &'static str,
    },

    #[error("{test_name}: output data did not pass the check")]
    OutputMismatch { test_name: String },

    #[error("{test_name}: task type resolved to unknown")]
    UnknownTaskType { test_name: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A specialized `Result` type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
