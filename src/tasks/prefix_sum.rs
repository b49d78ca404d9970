use rayon::prelude::*;
use rayon::ThreadPool;

use crate::task::{TaskData, TaskKernel, TypeOfTask};

pub type Data = TaskData<Vec<u64>, Vec<u64>>;

fn prefix_sum_sequential(arr: &[u64]) -> Vec<u64> {
    arr.iter()
        .scan(0u64, |acc, &val| {
            *acc += val;
            Some(*acc)
        })
        .collect()
}

fn prefix_sum_parallel(arr: &[u64], threads: usize) -> Vec<u64> {
    let chunk_size = arr.len().div_ceil(threads.max(1)).max(1);

    // local prefix sums in parallel
    let local_sums: Vec<Vec<u64>> = arr.par_chunks(chunk_size).map(prefix_sum_sequential).collect();

    // offset of each chunk is the running total of the chunks before it
    let offsets: Vec<u64> = local_sums
        .iter()
        .scan(0u64, |acc, local| {
            let offset = *acc;
            *acc += local.last().copied().unwrap_or(0);
            Some(offset)
        })
        .collect();

    local_sums
        .into_par_iter()
        .zip(offsets.into_par_iter())
        .flat_map_iter(|(local, offset)| local.into_iter().map(move |val| val + offset))
        .collect()
}

fn prepare(data: &mut Data) {
    data.output.clear();
    data.output.reserve(data.input.len());
}

#[derive(Debug, Default)]
pub struct PrefixSumSeq;

impl TaskKernel<Vec<u64>, Vec<u64>> for PrefixSumSeq {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        !data.input.is_empty()
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        prepare(data);
        true
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        data.output = prefix_sum_sequential(&data.input);
        true
    }

    fn post_processing_impl(&mut self, data: &mut Data) -> bool {
        data.output.len() == data.input.len()
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Seq
    }
}

/// Chunked scan: local prefix sums per chunk, then a per-chunk offset.
#[derive(Debug, Default)]
pub struct PrefixSumTbb {
    pool: Option<ThreadPool>,
}

impl TaskKernel<Vec<u64>, Vec<u64>> for PrefixSumTbb {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        !data.input.is_empty()
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        if self.pool.is_none() {
            self.pool = super::build_pool();
        }
        prepare(data);
        self.pool.is_some()
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        let threads = pool.current_num_threads();
        data.output = pool.install(|| prefix_sum_parallel(&data.input, threads));
        true
    }

    fn post_processing_impl(&mut self, data: &mut Data) -> bool {
        data.output.len() == data.input.len()
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Tbb
    }
}
