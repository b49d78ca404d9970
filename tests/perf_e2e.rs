use std::cell::Cell;
use std::rc::Rc;

use ppc_task_harness::performance::wall_clock_timer;
use ppc_task_harness::tasks::prefix_sum::PrefixSumTbb;
use ppc_task_harness::tasks::sum_of_vector_elements::{SumSeq, SumTbb};
use ppc_task_harness::{
    task_getter, Error, Perf, PerfAttr, PerfResults, PipelineStage, StateOfTesting, TypeOfRunning,
};

fn wall_clock(num_running: u64) -> PerfAttr {
    PerfAttr {
        num_running,
        current_timer: Box::new(wall_clock_timer()),
    }
}

/// A clock that advances one second per reading.
fn ticking_timer() -> Box<dyn Fn() -> f64> {
    let now = Rc::new(Cell::new(0.0));
    Box::new(move || {
        let t = now.get();
        now.set(t + 1.0);
        t
    })
}

#[test]
fn pipeline_run_sums_ones() {
    let mut task = task_getter::<SumTbb, Vec<u32>, u64>(vec![1_u32; 2000]);
    let mut perf = Perf::new(&mut task);
    perf.pipeline_run(&wall_clock(10)).unwrap();

    let results = perf.perf_results();
    assert_eq!(results.type_of_running, TypeOfRunning::Pipeline);
    assert!(results.time_sec >= 0.0);
    assert!(results.time_sec <= PerfResults::MAX_TIME);
    perf.print_perf_statistic("pipeline_run_sums_ones").unwrap();

    assert_eq!(task.state_of_testing(), StateOfTesting::Performance);
    assert_eq!(task.stage(), PipelineStage::Done);
    assert_eq!(*task.output(), 2000);
}

#[test]
fn task_run_ends_finished() {
    let mut task = task_getter::<SumSeq, Vec<u32>, u64>(vec![1_u32; 2000]);
    let mut perf = Perf::new(&mut task);
    perf.task_run(&wall_clock(10)).unwrap();
    assert_eq!(perf.perf_results().type_of_running, TypeOfRunning::TaskRun);

    assert_eq!(task.stage(), PipelineStage::Done);
    assert_eq!(*task.output(), 2000);
}

#[test]
fn average_uses_caller_clock() {
    for num_running in [1, 4, 10] {
        let mut task = task_getter::<SumSeq, Vec<u32>, u64>(vec![1_u32; 16]);
        let mut perf = Perf::new(&mut task);
        let attr = PerfAttr {
            num_running,
            current_timer: ticking_timer(),
        };
        perf.pipeline_run(&attr).unwrap();

        let expected = 1.0 / num_running as f64;
        assert!((perf.perf_results().time_sec - expected).abs() < 1e-12);
    }
}

#[test]
fn statistic_line_format() {
    let mut task = task_getter::<PrefixSumTbb, Vec<u64>, Vec<u64>>(vec![1_u64; 64]);
    let mut perf = Perf::new(&mut task);
    let attr = PerfAttr {
        num_running: 2,
        current_timer: ticking_timer(),
    };
    perf.task_run(&attr).unwrap();

    let mut out = Vec::new();
    perf.write_perf_statistic(&mut out, "prefix").unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "prefix:task_run:0.5000000000\n");
    drop(perf);

    assert_eq!(task.output().last(), Some(&64));
}

#[test]
fn slow_measurement_is_reported_and_rejected() {
    let mut task = task_getter::<SumSeq, Vec<u32>, u64>(vec![3_u32; 8]);
    let mut perf = Perf::new(&mut task).with_max_time(0.5);
    let attr = PerfAttr {
        num_running: 1,
        current_timer: ticking_timer(),
    };
    perf.pipeline_run(&attr).unwrap();

    let mut out = Vec::new();
    let err = perf.write_perf_statistic(&mut out, "slow").unwrap_err();
    assert!(matches!(err, Error::PerformanceExceeded { .. }));
    assert_eq!(String::from_utf8(out).unwrap(), "slow:pipeline:-1.0000000000\n");
}

#[test]
fn statistic_before_measuring_is_missing_run() {
    let mut task = task_getter::<SumSeq, Vec<u32>, u64>(vec![1_u32; 8]);
    let mut perf = Perf::new(&mut task);
    assert!(matches!(perf.print_perf_statistic("early"), Err(Error::MissingRun)));

    perf.pipeline_run(&PerfAttr::default()).unwrap();
    assert_eq!(perf.perf_results().time_sec, 0.0);
}
