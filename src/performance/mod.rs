//! Performance measurement of a [`Task`].
//!
//! [`Perf`] drives a borrowed task either through whole pipelines or
//! through repeated `run` calls, times the batch with a caller-supplied
//! clock and keeps the average per repetition. The clock is not chosen
//! here: a process-wide clock, a thread-pool clock or a plain wall clock
//! are all just a `Fn() -> f64` returning seconds.

use std::fmt;
use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::task::{StateOfTesting, Task};
use crate::util;

/// Placeholder clock. Returns `-1.0` to flag that no real clock was configured.
pub fn default_timer() -> f64 {
    -1.0
}

/// A monotonic clock returning seconds elapsed since this call.
pub fn wall_clock_timer() -> impl Fn() -> f64 + Send + Sync + 'static {
    let t0 = Instant::now();
    move || t0.elapsed().as_secs_f64()
}

/// How a measurement is taken.
pub struct PerfAttr {
    /// Number of repetitions averaged over.
    pub num_running: u64,
    /// Returns the current time in seconds.
    pub current_timer: Box<dyn Fn() -> f64>,
}

impl Default for PerfAttr {
    fn default() -> Self {
        Self {
            num_running: 5,
            current_timer: Box::new(default_timer),
        }
    }
}

impl fmt::Debug for PerfAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerfAttr")
            .field("num_running", &self.num_running)
            .finish_non_exhaustive()
    }
}

/// Which part of the pipeline a measurement covered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOfRunning {
    /// Validation, pre-processing, run and post-processing.
    Pipeline,
    /// Only `run`.
    TaskRun,
    #[default]
    None,
}

impl fmt::Display for TypeOfRunning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(get_string_param_name(*self))
    }
}

pub fn get_string_param_name(type_of_running: TypeOfRunning) -> &'static str {
    match type_of_running {
        TypeOfRunning::Pipeline => "pipeline",
        TypeOfRunning::TaskRun => "task_run",
        TypeOfRunning::None => "none",
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerfResults {
    /// Average time per repetition, in seconds.
    pub time_sec: f64,
    pub type_of_running: TypeOfRunning,
}

impl PerfResults {
    /// Default ceiling for [`Perf::print_perf_statistic`], in seconds.
    pub const MAX_TIME: f64 = 10.0;
}

/// Measures a borrowed task.
///
/// Creating a `Perf` switches the task to [`StateOfTesting::Performance`]
/// so that the task stops timing itself.
pub struct Perf<'t, I, O> {
    task: &'t mut Task<I, O>,
    perf_results: PerfResults,
    max_time: f64,
}

impl<'t, I, O> Perf<'t, I, O> {
    pub fn new(task: &'t mut Task<I, O>) -> Self {
        task.set_state_of_testing(StateOfTesting::Performance);
        Self {
            task,
            perf_results: PerfResults::default(),
            max_time: util::get_perf_max_time(),
        }
    }

    /// Overrides the ceiling used by [`Perf::print_perf_statistic`].
    #[must_use]
    pub fn with_max_time(mut self, seconds: f64) -> Self {
        self.max_time = seconds;
        self
    }

    /// Times `num_running` full pipelines as one batch.
    pub fn pipeline_run(&mut self, perf_attr: &PerfAttr) -> Result<()> {
        self.common_run(perf_attr, |task| {
            task.validation()?;
            task.pre_processing()?;
            task.run()?;
            task.post_processing()?;
            Ok(())
        })?;
        self.perf_results.type_of_running = TypeOfRunning::Pipeline;
        Ok(())
    }

    /// Times `num_running` calls of `run` alone.
    ///
    /// Validation and pre-processing happen once, untimed, before the batch
    /// and post-processing once after it. One more untimed full pipeline
    /// follows so that the task ends finished with a fresh output.
    pub fn task_run(&mut self, perf_attr: &PerfAttr) -> Result<()> {
        if perf_attr.num_running == 0 {
            return Err(Error::ZeroRepetitions);
        }

        self.task.validation()?;
        self.task.pre_processing()?;
        self.common_run(perf_attr, |task| task.run().map(drop))?;
        self.task.post_processing()?;

        self.task.validation()?;
        self.task.pre_processing()?;
        self.task.run()?;
        self.task.post_processing()?;

        self.perf_results.type_of_running = TypeOfRunning::TaskRun;
        Ok(())
    }

    fn common_run(
        &mut self,
        perf_attr: &PerfAttr,
        mut pipeline: impl FnMut(&mut Task<I, O>) -> Result<()>,
    ) -> Result<()> {
        if perf_attr.num_running == 0 {
            return Err(Error::ZeroRepetitions);
        }

        let begin = (perf_attr.current_timer)();
        for _ in 0..perf_attr.num_running {
            pipeline(self.task)?;
        }
        let end = (perf_attr.current_timer)();

        let time_sec = (end - begin) / perf_attr.num_running as f64;
        self.perf_results.time_sec = time_sec;
        info!(num_running = perf_attr.num_running, time_sec, "measured");
        Ok(())
    }

    /// Prints `<test_id>:<type>:<seconds>` to stdout.
    ///
    /// # Errors
    ///
    /// [`Error::MissingRun`] before any measurement. When the average time
    /// reached the ceiling the line carries `-1.0000000000` instead of the
    /// time and [`Error::PerformanceExceeded`] is returned after printing.
    pub fn print_perf_statistic(&self, test_id: &str) -> Result<()> {
        self.write_perf_statistic(&mut io::stdout().lock(), test_id)
    }

    /// Like [`Perf::print_perf_statistic`], writing to `out`.
    pub fn write_perf_statistic(&self, out: &mut impl Write, test_id: &str) -> Result<()> {
        let type_of_running = self.perf_results.type_of_running;
        if type_of_running == TypeOfRunning::None {
            return Err(Error::MissingRun);
        }

        let time_secs = self.perf_results.time_sec;
        if time_secs < self.max_time {
            writeln!(out, "{test_id}:{type_of_running}:{time_secs:.10}")?;
            return Ok(());
        }

        writeln!(out, "{test_id}:{type_of_running}:{:.10}", -1.0)?;
        Err(Error::PerformanceExceeded {
            limit: self.max_time,
            actual: time_secs,
        })
    }

    pub fn perf_results(&self) -> PerfResults {
        self.perf_results
    }

    pub fn task(&self) -> &Task<I, O> {
        self.task
    }
}

impl<I, O> fmt::Debug for Perf<'_, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Perf")
            .field("task", &self.task)
            .field("perf_results", &self.perf_results)
            .field("max_time", &self.max_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::task::{PipelineStage, TaskData, TaskKernel};
    use crate::test_utils::SumKernel;

    struct SlowKernel(Duration);

    impl TaskKernel<Vec<u8>, u8> for SlowKernel {
        fn validation_impl(&mut self, data: &mut TaskData<Vec<u8>, u8>) -> bool {
            !data.input.is_empty()
        }

        fn pre_processing_impl(&mut self, _data: &mut TaskData<Vec<u8>, u8>) -> bool {
            true
        }

        fn run_impl(&mut self, _data: &mut TaskData<Vec<u8>, u8>) -> bool {
            thread::sleep(self.0);
            true
        }

        fn post_processing_impl(&mut self, _data: &mut TaskData<Vec<u8>, u8>) -> bool {
            true
        }
    }

    /// Returns each value in turn, repeating the last one.
    fn scripted_timer(values: Vec<f64>) -> Box<dyn Fn() -> f64> {
        let calls = Cell::new(0_usize);
        Box::new(move || {
            let i = calls.get();
            calls.set(i + 1);
            values[i.min(values.len() - 1)]
        })
    }

    fn statistic_line(perf: &Perf<'_, Vec<u32>, u32>, id: &str) -> (String, Result<()>) {
        let mut out = Vec::new();
        let result = perf.write_perf_statistic(&mut out, id);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn pipeline_averages_over_repetitions() {
        let mut task = Task::new(SumKernel, vec![1_u32; 2000]);
        let mut perf = Perf::new(&mut task);

        let attr = PerfAttr {
            num_running: 4,
            current_timer: scripted_timer(vec![0.0, 3.0]),
        };
        perf.pipeline_run(&attr).unwrap();

        let results = perf.perf_results();
        assert_eq!(results.time_sec, 0.75);
        assert_eq!(results.type_of_running, TypeOfRunning::Pipeline);
        assert_eq!(*perf.task().output(), 2000);
    }

    #[test]
    fn new_switches_task_to_performance_mode() {
        let mut task = Task::new(SumKernel, vec![1_u32; 3]);
        assert_eq!(task.state_of_testing(), StateOfTesting::Functional);

        let mut perf = Perf::new(&mut task);
        assert_eq!(perf.task().state_of_testing(), StateOfTesting::Performance);

        perf.pipeline_run(&PerfAttr::default()).unwrap();
    }

    #[test]
    fn task_run_leaves_task_done() {
        let mut task = Task::new(SumKernel, vec![1_u32; 2000]);
        let mut perf = Perf::new(&mut task);

        let attr = PerfAttr {
            num_running: 10,
            current_timer: Box::new(wall_clock_timer()),
        };
        perf.task_run(&attr).unwrap();

        assert_eq!(perf.perf_results().type_of_running, TypeOfRunning::TaskRun);
        assert!(perf.perf_results().time_sec <= PerfResults::MAX_TIME);
        drop(perf);

        assert_eq!(task.stage(), PipelineStage::Done);
        assert_eq!(*task.output(), 2000);
    }

    #[test]
    fn default_timer_is_sentinel() {
        assert_eq!(default_timer(), -1.0);
        let attr = PerfAttr::default();
        assert_eq!(attr.num_running, 5);
        assert_eq!((attr.current_timer)(), -1.0);
    }

    #[test]
    fn zero_repetitions_rejected() {
        let mut task = Task::new(SumKernel, vec![1_u32; 3]);
        let mut perf = Perf::new(&mut task);
        let attr = PerfAttr {
            num_running: 0,
            ..PerfAttr::default()
        };

        assert!(matches!(perf.pipeline_run(&attr), Err(Error::ZeroRepetitions)));
        assert!(matches!(perf.task_run(&attr), Err(Error::ZeroRepetitions)));
        assert_eq!(perf.perf_results().type_of_running, TypeOfRunning::None);

        // Nothing ran, so close the task with a real cycle.
        perf.pipeline_run(&PerfAttr::default()).unwrap();
    }

    #[test]
    fn statistic_before_run_is_missing_run() {
        let mut task = Task::new(SumKernel, vec![1_u32; 2000]);
        let mut perf = Perf::new(&mut task);

        assert!(matches!(
            perf.print_perf_statistic("check_perf_task_exception"),
            Err(Error::MissingRun)
        ));

        perf.task_run(&PerfAttr::default()).unwrap();
    }

    #[test]
    fn statistic_prints_ten_decimals() {
        let mut task = Task::new(SumKernel, vec![1_u32; 2000]);
        let mut perf = Perf::new(&mut task);
        let attr = PerfAttr {
            num_running: 2,
            current_timer: scripted_timer(vec![1.0, 1.5]),
        };
        perf.pipeline_run(&attr).unwrap();

        let (line, result) = statistic_line(&perf, "check_perf_pipeline");
        result.unwrap();
        assert_eq!(line, "check_perf_pipeline:pipeline:0.2500000000\n");
    }

    #[test]
    fn statistic_over_ceiling_prints_sentinel_then_fails() {
        let mut task = Task::new(SumKernel, vec![1_u32; 10]);
        let mut perf = Perf::new(&mut task).with_max_time(PerfResults::MAX_TIME);
        let attr = PerfAttr {
            num_running: 1,
            current_timer: scripted_timer(vec![0.0, PerfResults::MAX_TIME]),
        };
        perf.task_run(&attr).unwrap();

        let (line, result) = statistic_line(&perf, "slow");
        assert_eq!(line, "slow:task_run:-1.0000000000\n");
        match result {
            Err(Error::PerformanceExceeded { limit, actual }) => {
                assert_eq!(limit, PerfResults::MAX_TIME);
                assert_eq!(actual, PerfResults::MAX_TIME);
            }
            other => panic!("expected a ceiling breach, got {other:?}"),
        }
    }

    #[test]
    fn real_slow_task_breaches_lowered_ceiling() {
        let mut task = Task::new(SlowKernel(Duration::from_millis(120)), vec![1_u8; 128]);
        let mut perf = Perf::new(&mut task).with_max_time(0.1);
        let attr = PerfAttr {
            num_running: 1,
            current_timer: Box::new(wall_clock_timer()),
        };
        perf.pipeline_run(&attr).unwrap();

        assert!(perf.print_perf_statistic("check_perf_pipeline_slow").is_err());
    }

    #[test]
    fn raised_ceiling_accepts_slow_task() {
        let mut task = Task::new(SlowKernel(Duration::from_millis(120)), vec![1_u8; 128]);
        let mut perf = Perf::new(&mut task).with_max_time(12.0);
        let attr = PerfAttr {
            num_running: 1,
            current_timer: Box::new(wall_clock_timer()),
        };
        perf.pipeline_run(&attr).unwrap();

        perf.print_perf_statistic("slow_perf_respects_override").unwrap();
    }

    #[test]
    fn param_names() {
        assert_eq!(get_string_param_name(TypeOfRunning::Pipeline), "pipeline");
        assert_eq!(get_string_param_name(TypeOfRunning::TaskRun), "task_run");
        assert_eq!(get_string_param_name(TypeOfRunning::None), "none");
    }

    #[test]
    fn order_violation_surfaces_through_perf() {
        let mut task = Task::new(SumKernel, vec![1_u32; 3]);
        task.validation().unwrap();

        let mut perf = Perf::new(&mut task);
        let error = perf.pipeline_run(&PerfAttr::default()).unwrap_err();
        assert!(matches!(error, Error::ExecutionOrder { called: "validation", .. }));
        assert_eq!(perf.task().stage(), PipelineStage::Error);
    }

    #[test]
    fn results_serialize_with_param_names() {
        let results = PerfResults {
            time_sec: 0.5,
            type_of_running: TypeOfRunning::TaskRun,
        };
        assert_eq!(
            serde_json::to_string(&results).unwrap(),
            r#"{"time_sec":0.5,"type_of_running":"task_run"}"#
        );
    }
}
