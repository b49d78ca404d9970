// Task metadata: which parallel technology backs a task, whether it is
// enabled, and how both are rendered into test names.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};

/// The parallelization technology behind a task implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeOfTask {
    /// Every technology at once (MPI combined with threads).
    All,
    Mpi,
    /// OpenMP-style fork/join parallel regions.
    Omp,
    Seq,
    /// Plain standard-library threads.
    Stl,
    /// Work-stealing task scheduler (TBB, rayon).
    Tbb,
    #[default]
    Unknown,
}

const TASK_TYPE_MAPPINGS: [(TypeOfTask, &str); 6] = [
    (TypeOfTask::All, "all"),
    (TypeOfTask::Mpi, "mpi"),
    (TypeOfTask::Omp, "omp"),
    (TypeOfTask::Seq, "seq"),
    (TypeOfTask::Stl, "stl"),
    (TypeOfTask::Tbb, "tbb"),
];

const UNKNOWN: &str = "unknown";

impl From<u8> for TypeOfTask {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::All,
            1 => Self::Mpi,
            2 => Self::Omp,
            3 => Self::Seq,
            4 => Self::Stl,
            5 => Self::Tbb,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TypeOfTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(type_of_task_to_string(*self))
    }
}

/// Returns the short lowercase token of a task type, `"unknown"` for anything unmapped.
pub fn type_of_task_to_string(type_of_task: TypeOfTask) -> &'static str {
    TASK_TYPE_MAPPINGS
        .iter()
        .find(|(key, _)| *key == type_of_task)
        .map_or(UNKNOWN, |(_, value)| value)
}

/// Whether a task takes part in test runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusOfTask {
    #[default]
    Enabled,
    Disabled,
}

pub fn get_string_task_status(status_of_task: StatusOfTask) -> &'static str {
    match status_of_task {
        StatusOfTask::Enabled => "enabled",
        StatusOfTask::Disabled => "disabled",
    }
}

/// Resolves the display label of a task type from a settings file.
///
/// The settings file is a JSON object with a `tasks` object mapping the
/// short token of each type to a label, for example
/// `{"tasks": {"seq": "enabled", "omp": "disabled"}}`. The result is
/// `"<token>_<label>"`, or `"unknown"` when the type has no token.
///
/// # Errors
///
/// [`Error::ConfigNotFound`] if the file cannot be opened,
/// [`Error::ConfigParse`] if it is not valid JSON and
/// [`Error::ConfigType`] if the looked-up label is missing or not a string.
pub fn get_string_task_type(type_of_task: TypeOfTask, settings_file_path: impl AsRef<Path>) -> Result<String> {
    let path = settings_file_path.as_ref();

    let file = File::open(path).map_err(|source| Error::ConfigNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let list_settings: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    let type_str = type_of_task_to_string(type_of_task);
    if type_str == UNKNOWN {
        return Ok(type_str.to_string());
    }

    match list_settings.get("tasks").and_then(|tasks| tasks.get(type_str)) {
        Some(Value::String(label)) => {
            info!(path = %path.display(), type_str, label = label.as_str(), "resolved task type");
            Ok(format!("{type_str}_{label}"))
        }
        other => Err(Error::ConfigType {
            path: path.to_path_buf(),
            key: type_str,
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}
