// Environment knobs and naming helpers shared by the task, the performance
// harness and the test-matrix generators.


use std::env;
use std::str::FromStr;

const NUM_THREADS_VAR: &str = "PPC_NUM_THREADS";
const NUM_PROC_VAR: &str = "PPC_NUM_PROC";
const TASK_MAX_TIME_VAR: &str = "PPC_TASK_MAX_TIME";
const PERF_MAX_TIME_VAR: &str = "PPC_PERF_MAX_TIME";

pub const DEFAULT_TASK_MAX_TIME: f64 = 1.0;
pub const DEFAULT_PERF_MAX_TIME: f64 = 10.0;

// Any of these holding an integer means an MPI launcher started us.
const MPI_ENV_VARS: [&str; 10] = [
    "OMPI_COMM_WORLD_SIZE",
    "OMPI_UNIVERSE_SIZE",
    "PMI_SIZE",
    "PMI_RANK",
    "PMI_FD",
    "HYDRA_CONTROL_FD",
    "PMIX_RANK",
    "SLURM_PROCID",
    "MSMPI_RANK",
    "MSMPI_LOCALRANK",
];

/// Parses an environment value, falling back to `default` when it is unset or unparsable.
pub fn parse_env_value<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(default)
}

fn env_value<T: FromStr>(name: &str, default: T) -> T {
    parse_env_value(env::var(name).ok().as_deref(), default)
}

/// Requested number of threads per process. Not validated: zero and negative values pass through.
pub fn get_num_threads() -> i32 {
    env_value(NUM_THREADS_VAR, 1)
}

/// Requested number of processes.
pub fn get_num_proc() -> i32 {
    env_value(NUM_PROC_VAR, 1)
}

/// Ceiling for a functional-mode task cycle, in seconds.
pub fn get_task_max_time() -> f64 {
    env_value(TASK_MAX_TIME_VAR, DEFAULT_TASK_MAX_TIME)
}

/// Ceiling for an averaged performance measurement, in seconds.
pub fn get_perf_max_time() -> f64 {
    env_value(PERF_MAX_TIME_VAR, DEFAULT_PERF_MAX_TIME)
}

/// Thread count for building a pool: the requested count, or one if it is not positive.
pub fn pool_threads() -> usize {
    usize::try_from(get_num_threads())
        .ok()
        .filter(|&threads| threads > 0)
        .unwrap_or(1)
}

pub fn is_under_mpirun() -> bool {
    MPI_ENV_VARS
        .iter()
        .any(|name| env::var(name).is_ok_and(|value| value.trim().parse::<i64>().is_ok()))
}

/// Module path of `T`, or an empty string for types outside any module.
///
/// `my_crate::solvers::Seq<u8>` yields `my_crate::solvers`.
pub fn get_namespace<T: ?Sized>() -> String {
    namespace_of(std::any::type_name::<T>()).to_string()
}

fn namespace_of(type_name: &str) -> &str {
    let without_generics = type_name.find('<').map_or(type_name, |start| &type_name[..start]);
    without_generics.rfind("::").map_or("", |end| &without_generics[..end])
}

/// Replaces every character that is not alphanumeric, `_`, `-` or `.` with `_`.
pub fn sanitize_token(token: &str) -> String {
    token
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
