//! A harness for parallel-programming exercises.
//!
//! A computation is written once as a [`TaskKernel`] with four hooks and
//! wrapped in a [`Task`], which enforces the order of the lifecycle
//! (validation, pre-processing, run, post-processing) and keeps a time
//! ceiling on functional runs. [`Perf`] measures a task as a whole
//! pipeline or by its run stage only. The [`util`] module reads the
//! `PPC_*` environment, resolves test names against a settings file and
//! drives functional and performance test matrices.
//!
//! ```no_run
//! use ppc_task_harness::performance::wall_clock_timer;
//! use ppc_task_harness::tasks::sum_of_vector_elements::SumTbb;
//! use ppc_task_harness::{task_getter, Perf, PerfAttr};
//!
//! let mut task = task_getter::<SumTbb, Vec<u32>, u64>(vec![1_u32; 2000]);
//! let attr = PerfAttr {
//!     num_running: 10,
//!     current_timer: Box::new(wall_clock_timer()),
//! };
//! let mut perf = Perf::new(&mut task);
//! perf.pipeline_run(&attr)?;
//! perf.print_perf_statistic("sum_tbb")?;
//! # Ok::<(), ppc_task_harness::Error>(())
//! ```

pub mod error;
pub mod performance;
pub mod task;
pub mod tasks;
pub mod util;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use performance::{Perf, PerfAttr, PerfResults, TypeOfRunning};
pub use task::{
    task_getter, PipelineStage, StateOfTesting, StatusOfTask, Task, TaskData, TaskKernel, TypeOfTask,
};
pub use util::func_test::{FuncTestCase, FuncTestFixture, TaskGetter, TestOutcome};
pub use util::perf_test::{PerfTestCase, PerfTestFixture};
