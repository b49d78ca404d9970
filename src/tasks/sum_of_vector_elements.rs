// Sum of vector elements, widened to u64 so large inputs cannot overflow.

use std::thread;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::task::{TaskData, TaskKernel, TypeOfTask};
use crate::util;

pub type Data = TaskData<Vec<u32>, u64>;

fn validate(data: &Data) -> bool {
    !data.input.is_empty()
}

#[derive(Debug, Default)]
pub struct SumSeq;

impl TaskKernel<Vec<u32>, u64> for SumSeq {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        validate(data)
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        data.output = 0;
        true
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        data.output = data.input.iter().map(|&v| u64::from(v)).sum();
        true
    }

    fn post_processing_impl(&mut self, _data: &mut Data) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Seq
    }
}

/// One scoped thread per chunk.
#[derive(Debug, Default)]
pub struct SumStl {
    threads: usize,
}

impl TaskKernel<Vec<u32>, u64> for SumStl {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        validate(data)
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        self.threads = util::pool_threads();
        data.output = 0;
        true
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        let chunk_size = data.input.len().div_ceil(self.threads.max(1)).max(1);

        let total = thread::scope(|s| {
            let handles: Vec<_> = data
                .input
                .chunks(chunk_size)
                .map(|chunk| s.spawn(move || chunk.iter().map(|&v| u64::from(v)).sum::<u64>()))
                .collect();

            handles.into_iter().map(|handle| handle.join()).sum::<thread::Result<u64>>()
        });

        match total {
            Ok(total) => {
                data.output = total;
                true
            }
            Err(_) => false,
        }
    }

    fn post_processing_impl(&mut self, _data: &mut Data) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Stl
    }
}

#[derive(Debug, Default)]
pub struct SumTbb {
    pool: Option<ThreadPool>,
}

impl TaskKernel<Vec<u32>, u64> for SumTbb {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        validate(data)
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        if self.pool.is_none() {
            self.pool = super::build_pool();
        }
        data.output = 0;
        self.pool.is_some()
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        data.output = pool.install(|| data.input.par_iter().map(|&v| u64::from(v)).sum());
        true
    }

    fn post_processing_impl(&mut self, _data: &mut Data) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Tbb
    }
}
