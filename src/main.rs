// Performance runner for the hosted kernels.
// Every kernel of a family is measured on the same input and checked
// against the output of that family's sequential kernel.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};

use ppc_task_harness::performance::wall_clock_timer;
use ppc_task_harness::tasks::histogram::{self, HistogramSeq, HistogramTbb};
use ppc_task_harness::tasks::matrix_multiply::{self, Matrix, MatrixMultiplySeq, MatrixMultiplyTbb};
use ppc_task_harness::tasks::prefix_sum::{PrefixSumSeq, PrefixSumTbb};
use ppc_task_harness::tasks::random_vector;
use ppc_task_harness::tasks::sum_of_vector_elements::{SumSeq, SumStl, SumTbb};
use ppc_task_harness::util::perf_test::{add_perf_task, perf_test_name};
use ppc_task_harness::{
    task_getter, Error, PerfAttr, PerfTestFixture, Result, Task, TaskKernel, TestOutcome, TypeOfRunning,
    TypeOfTask,
};

const MAX_MATRIX_DIM: usize = 512;

#[derive(Parser, Debug)]
#[command(name = "ppc_perf")]
#[command(about = "Measure the hosted kernels as pipelines and as bare runs")]
struct Args {
    /// Kernel family to measure
    #[arg(long, value_enum, default_value_t = Family::All)]
    task: Family,

    /// Which part of the pipeline is timed
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Number of input elements; matrices use the square root as their dimension
    #[arg(long, default_value_t = 1_000_000)]
    size: usize,

    /// Repetitions averaged over
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    num_running: u64,

    /// Settings file mapping technologies to enabled/disabled
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Seed for the random inputs
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Family {
    Sum,
    PrefixSum,
    Histogram,
    MatrixMultiply,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Pipeline,
    TaskRun,
    Both,
}

impl Mode {
    fn includes(self, type_of_running: TypeOfRunning) -> bool {
        match self {
            Mode::Pipeline => type_of_running == TypeOfRunning::Pipeline,
            Mode::TaskRun => type_of_running == TypeOfRunning::TaskRun,
            Mode::Both => true,
        }
    }
}

/// Expected output of a family, computed once by its sequential kernel.
struct Reference<I, O> {
    input: I,
    expected: O,
    matches: fn(&O, &O) -> bool,
    num_running: u64,
}

impl<I: Clone, O> PerfTestFixture<I, O> for Reference<I, O> {
    fn test_input_data(&self) -> I {
        self.input.clone()
    }

    fn check_test_output_data(&self, output: &O) -> bool {
        (self.matches)(&self.expected, output)
    }

    fn set_perf_attributes(&self, task: &Task<I, O>, perf_attr: &mut PerfAttr) -> Result<()> {
        if task.dynamic_type_of_task() == TypeOfTask::Unknown {
            return Err(Error::UnsupportedTaskType {
                type_of_task: TypeOfTask::Unknown,
            });
        }
        perf_attr.num_running = self.num_running;
        perf_attr.current_timer = Box::new(wall_clock_timer());
        Ok(())
    }
}

/// Tally of one invocation.
#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    skipped: usize,
    failed: usize,
}

struct Runner<'a> {
    settings: &'a Path,
    mode: Mode,
    num_running: u64,
    summary: Summary,
}

impl Runner<'_> {
    /// Runs `K` once, untimed, to produce the reference output.
    fn reference<K, I, O>(&self, input: I, matches: fn(&O, &O) -> bool) -> Result<Reference<I, O>>
    where
        K: TaskKernel<I, O> + Default + 'static,
        I: Clone,
        O: Clone + Default,
    {
        let mut task = task_getter::<K, I, O>(input.clone());
        let stages = [
            task.validation()?,
            task.pre_processing()?,
            task.run()?,
            task.post_processing()?,
        ];
        if stages.contains(&false) {
            return Err(Error::StageFailed {
                test_name: ppc_task_harness::util::get_namespace::<K>(),
                stage: "reference",
            });
        }
        Ok(Reference {
            input,
            expected: task.output().clone(),
            matches,
            num_running: self.num_running,
        })
    }

    fn measure<K, I, O>(&mut self, reference: &Reference<I, O>)
    where
        K: TaskKernel<I, O> + Default + 'static,
        I: Clone,
        O: Default,
    {
        let cases = match add_perf_task::<K, I, O>(self.settings) {
            Ok(cases) => cases,
            Err(e) => {
                error!("failed to resolve test name: {e}");
                self.summary.failed += 1;
                return;
            }
        };

        for case in cases.iter().filter(|case| self.mode.includes(case.mode)) {
            let test_id = perf_test_name(case);
            match reference.execute_test(case) {
                Ok(TestOutcome::Passed) => self.summary.passed += 1,
                Ok(TestOutcome::Skipped { reason }) => {
                    info!(%test_id, reason, "skipped");
                    self.summary.skipped += 1;
                }
                Err(e) => {
                    error!(%test_id, "{e}");
                    self.summary.failed += 1;
                }
            }
        }
    }

    fn sum(&mut self, size: usize, seed: u64) -> Result<()> {
        let input = random_vector(size, 1000, seed);
        let reference = self.reference::<SumSeq, Vec<u32>, u64>(input, |a, b| a == b)?;
        self.measure::<SumSeq, _, _>(&reference);
        self.measure::<SumStl, _, _>(&reference);
        self.measure::<SumTbb, _, _>(&reference);
        Ok(())
    }

    fn prefix_sum(&mut self, size: usize, seed: u64) -> Result<()> {
        let input: Vec<u64> = random_vector(size, 100, seed).into_iter().map(u64::from).collect();
        let reference = self.reference::<PrefixSumSeq, Vec<u64>, Vec<u64>>(input, |a, b| a == b)?;
        self.measure::<PrefixSumSeq, _, _>(&reference);
        self.measure::<PrefixSumTbb, _, _>(&reference);
        Ok(())
    }

    fn histogram(&mut self, size: usize) -> Result<()> {
        for input in [histogram::gen_uniform(size), histogram::gen_skewed(size)] {
            let reference = self.reference::<HistogramSeq, Vec<u8>, Vec<u64>>(input, |a, b| a == b)?;
            self.measure::<HistogramSeq, _, _>(&reference);
            self.measure::<HistogramTbb, _, _>(&reference);
        }
        Ok(())
    }

    fn matrix_multiply(&mut self, size: usize, seed: u64) -> Result<()> {
        let n = ((size as f64).sqrt() as usize).clamp(1, MAX_MATRIX_DIM);
        let random_matrix = |seed: u64| -> Matrix {
            random_vector(n * n, 10, seed)
                .chunks(n)
                .map(|row| row.iter().map(|&v| f64::from(v)).collect())
                .collect()
        };
        let input = (random_matrix(seed), random_matrix(seed.wrapping_add(1)));

        let reference =
            self.reference::<MatrixMultiplySeq, (Matrix, Matrix), Matrix>(input, matrix_multiply::matrices_match)?;
        self.measure::<MatrixMultiplySeq, _, _>(&reference);
        self.measure::<MatrixMultiplyTbb, _, _>(&reference);
        Ok(())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut runner = Runner {
        settings: &args.settings,
        mode: args.mode,
        num_running: args.num_running,
        summary: Summary::default(),
    };

    let all = args.task == Family::All;
    let families = [
        (Family::Sum, "sum"),
        (Family::PrefixSum, "prefix_sum"),
        (Family::Histogram, "histogram"),
        (Family::MatrixMultiply, "matrix_multiply"),
    ];
    for (family, label) in families {
        if !all && args.task != family {
            continue;
        }
        let result = match family {
            Family::Sum => runner.sum(args.size, args.seed),
            Family::PrefixSum => runner.prefix_sum(args.size, args.seed),
            Family::Histogram => runner.histogram(args.size),
            Family::MatrixMultiply => runner.matrix_multiply(args.size, args.seed),
            Family::All => Ok(()),
        };
        if let Err(e) = result {
            error!(family = label, "{e}");
            runner.summary.failed += 1;
        }
    }

    let summary = runner.summary;
    info!(
        passed = summary.passed,
        skipped = summary.skipped,
        failed = summary.failed,
        "done"
    );
    if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
