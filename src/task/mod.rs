//! The task lifecycle.
//!
//! A [`Task`] hosts one computation, supplied as a [`TaskKernel`], and
//! enforces that its four stages are driven in order:
//!
//! ```text
//! NotStarted -> Validated -> PreProcessed -> Running (repeatable) -> Done
//! ```
//!
//! `Done` may start a fresh cycle with another validation. Any call made
//! from the wrong stage moves the task to `Error` and returns
//! [`Error::ExecutionOrder`]. Dropping a task outside `Done` or `Error`
//! means the caller skipped stages and panics.

mod type_of_task;

pub use type_of_task::*;

use std::fmt;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::util;

/// Whether the task guards its own run time or leaves timing to [`Perf`](crate::performance::Perf).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateOfTesting {
    /// The span from pre-processing to post-processing must stay under the task ceiling.
    #[default]
    Functional,
    Performance,
}

/// Position of a task in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineStage {
    #[default]
    NotStarted,
    Validated,
    PreProcessed,
    Running,
    Done,
    Error,
}

impl PipelineStage {
    /// Whether a task may be dropped in this stage.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Validated => "validated",
            Self::PreProcessed => "pre-processed",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        })
    }
}

/// Input and output owned by a [`Task`] and handed to its kernel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskData<I, O> {
    pub input: I,
    pub output: O,
}

/// The computation hosted by a [`Task`].
///
/// Every hook returns whether it succeeded. The task passes that flag
/// through untouched; a `false` is a data problem, not a contract violation.
pub trait TaskKernel<I, O> {
    /// Checks the input data and task attributes before running.
    fn validation_impl(&mut self, data: &mut TaskData<I, O>) -> bool;

    fn pre_processing_impl(&mut self, data: &mut TaskData<I, O>) -> bool;

    /// The computation itself. May be called several times per cycle.
    fn run_impl(&mut self, data: &mut TaskData<I, O>) -> bool;

    fn post_processing_impl(&mut self, data: &mut TaskData<I, O>) -> bool;

    /// The technology this kernel is written with.
    fn static_type_of_task() -> TypeOfTask
    where
        Self: Sized,
    {
        TypeOfTask::Unknown
    }
}

/// A computation together with its data and lifecycle state.
pub struct Task<I, O> {
    data: TaskData<I, O>,
    kernel: Box<dyn TaskKernel<I, O>>,
    stage: PipelineStage,
    state_of_testing: StateOfTesting,
    type_of_task: TypeOfTask,
    status_of_task: StatusOfTask,
    max_test_time: f64,
    pre_processing_started: Option<Instant>,
}

impl<I, O> Task<I, O> {
    /// Binds `kernel` to `input`, starting from a default output.
    pub fn new<K>(kernel: K, input: I) -> Self
    where
        K: TaskKernel<I, O> + 'static,
        O: Default,
    {
        Self {
            data: TaskData {
                input,
                output: O::default(),
            },
            kernel: Box::new(kernel),
            stage: PipelineStage::NotStarted,
            state_of_testing: StateOfTesting::default(),
            type_of_task: TypeOfTask::default(),
            status_of_task: StatusOfTask::default(),
            max_test_time: util::get_task_max_time(),
            pre_processing_started: None,
        }
    }

    /// Validates input data and task attributes before execution.
    ///
    /// Legal on a fresh task and on a finished one, which starts a new cycle.
    pub fn validation(&mut self) -> Result<bool> {
        self.advance("validation", PipelineStage::Validated, |stage| {
            matches!(stage, PipelineStage::NotStarted | PipelineStage::Done)
        })?;
        Ok(self.kernel.validation_impl(&mut self.data))
    }

    pub fn pre_processing(&mut self) -> Result<bool> {
        self.advance("pre_processing", PipelineStage::PreProcessed, |stage| {
            stage == PipelineStage::Validated
        })?;
        if self.state_of_testing == StateOfTesting::Functional {
            self.pre_processing_started = Some(Instant::now());
        }
        Ok(self.kernel.pre_processing_impl(&mut self.data))
    }

    /// Runs the computation. Repeatable until post-processing.
    pub fn run(&mut self) -> Result<bool> {
        self.advance("run", PipelineStage::Running, |stage| {
            matches!(stage, PipelineStage::PreProcessed | PipelineStage::Running)
        })?;
        Ok(self.kernel.run_impl(&mut self.data))
    }

    /// Finishes the cycle.
    ///
    /// In functional testing mode the time since pre-processing started is
    /// checked against the task ceiling first, and a breach is returned as
    /// [`Error::PerformanceExceeded`] without running the hook.
    pub fn post_processing(&mut self) -> Result<bool> {
        self.advance("post_processing", PipelineStage::Done, |stage| {
            stage == PipelineStage::Running
        })?;
        if self.state_of_testing == StateOfTesting::Functional {
            self.internal_time_test()?;
        }
        Ok(self.kernel.post_processing_impl(&mut self.data))
    }

    fn advance(
        &mut self,
        called: &'static str,
        next: PipelineStage,
        allowed: impl FnOnce(PipelineStage) -> bool,
    ) -> Result<()> {
        let stage = self.stage;
        if allowed(stage) {
            debug!(called, from = %stage, to = %next, "pipeline stage");
            self.stage = next;
            Ok(())
        } else {
            warn!(called, %stage, "pipeline stage called out of order");
            self.stage = PipelineStage::Error;
            Err(Error::ExecutionOrder { called, stage })
        }
    }

    fn internal_time_test(&mut self) -> Result<()> {
        let Some(started) = self.pre_processing_started.take() else {
            return Ok(());
        };

        let diff = started.elapsed().as_secs_f64();
        if diff < self.max_test_time {
            debug!("test time: {diff:.10}");
            Ok(())
        } else {
            Err(Error::PerformanceExceeded {
                limit: self.max_test_time,
                actual: diff,
            })
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn state_of_testing(&self) -> StateOfTesting {
        self.state_of_testing
    }

    pub fn set_state_of_testing(&mut self, state_of_testing: StateOfTesting) {
        self.state_of_testing = state_of_testing;
    }

    pub fn dynamic_type_of_task(&self) -> TypeOfTask {
        self.type_of_task
    }

    pub fn set_type_of_task(&mut self, type_of_task: TypeOfTask) {
        self.type_of_task = type_of_task;
    }

    pub fn status_of_task(&self) -> StatusOfTask {
        self.status_of_task
    }

    pub fn set_status_of_task(&mut self, status_of_task: StatusOfTask) {
        self.status_of_task = status_of_task;
    }

    /// Overrides the functional-mode ceiling, in seconds.
    pub fn set_max_test_time(&mut self, seconds: f64) {
        self.max_test_time = seconds;
    }

    pub fn input(&self) -> &I {
        &self.data.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.data.input
    }

    pub fn output(&self) -> &O {
        &self.data.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.data.output
    }
}

impl<I, O> fmt::Debug for Task<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("stage", &self.stage)
            .field("state_of_testing", &self.state_of_testing)
            .field("type_of_task", &self.type_of_task)
            .field("status_of_task", &self.status_of_task)
            .field("max_test_time", &self.max_test_time)
            .finish_non_exhaustive()
    }
}

impl<I, O> Drop for Task<I, O> {
    fn drop(&mut self) {
        if self.stage.is_terminal() {
            return;
        }

        error!(stage = %self.stage, "task dropped before its pipeline finished");

        // A second panic while unwinding would abort the whole test binary.
        if !thread::panicking() {
            panic!(
                "ORDER OF FUNCTIONS IS NOT RIGHT: task dropped in the {} stage",
                self.stage
            );
        }
    }
}

/// Creates a task running a default `K` on `input`, tagged with `K`'s technology.
pub fn task_getter<K, I, O>(input: I) -> Task<I, O>
where
    K: TaskKernel<I, O> + Default + 'static,
    O: Default,
{
    let mut task = Task::new(K::default(), input);
    task.set_type_of_task(K::static_type_of_task());
    task
}
