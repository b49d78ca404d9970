// Byte histogram over 256 bins.
//
// Inputs come from a small LCG so that runs are reproducible:
//   uniform: every bin equally likely
//   skewed:  ~80% of values land in the first 20% of bins

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::task::{TaskData, TaskKernel, TypeOfTask};

pub const BINS: usize = 256;

pub type Data = TaskData<Vec<u8>, Vec<u64>>;

fn lcg_next(x: u32) -> u32 {
    x.wrapping_mul(1664525u32).wrapping_add(1013904223u32)
}

/// Uniform distribution over [0, 255].
pub fn gen_uniform(n: usize) -> Vec<u8> {
    let mut x = 123456789u32;
    (0..n)
        .map(|_| {
            x = lcg_next(x);
            (x & 0xFF) as u8
        })
        .collect()
}

/// Skewed distribution: ~80% in the first 20% of bins (0..51).
pub fn gen_skewed(n: usize) -> Vec<u8> {
    let hot_bins = (BINS as f64 * 0.2) as u8; // 51
    let threshold = (0.8 * u32::MAX as f64) as u32; // ~80%
    let mut x = 987654321u32;

    (0..n)
        .map(|_| {
            x = lcg_next(x);
            if x < threshold {
                // hot range
                (x % u32::from(hot_bins)) as u8
            } else {
                // cold range
                let v = (x & 0xFF) as u8;
                if v < hot_bins {
                    v + hot_bins
                } else {
                    v
                }
            }
        })
        .collect()
}

fn hist_sequential(data: &[u8]) -> [u64; BINS] {
    let mut histogram = [0u64; BINS];
    for &val in data {
        histogram[val as usize] += 1;
    }
    histogram
}

// Thread-local histograms per chunk, merged by reduction.
fn hist_local(data: &[u8], threads: usize, grain: usize) -> [u64; BINS] {
    let chunk_size = if grain > 0 {
        grain
    } else {
        data.len().div_ceil(threads.max(1)).max(1)
    };

    data.par_chunks(chunk_size).map(hist_sequential).reduce(
        || [0u64; BINS],
        |mut acc, local| {
            for (total, count) in acc.iter_mut().zip(local) {
                *total += count;
            }
            acc
        },
    )
}

/// Every element must have landed in exactly one bin.
pub fn check_correct(hist: &[u64], n: usize) -> bool {
    let total: u64 = hist.iter().sum();
    hist.len() == BINS && total as usize == n
}

#[derive(Debug, Default)]
pub struct HistogramSeq;

impl TaskKernel<Vec<u8>, Vec<u64>> for HistogramSeq {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        !data.input.is_empty()
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        data.output = vec![0; BINS];
        true
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        data.output = hist_sequential(&data.input).to_vec();
        true
    }

    fn post_processing_impl(&mut self, data: &mut Data) -> bool {
        check_correct(&data.output, data.input.len())
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Seq
    }
}

#[derive(Debug, Default)]
pub struct HistogramTbb {
    pool: Option<ThreadPool>,
    /// Elements per chunk; zero splits the input evenly across the pool.
    pub grain: usize,
}

impl TaskKernel<Vec<u8>, Vec<u64>> for HistogramTbb {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        !data.input.is_empty()
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        if self.pool.is_none() {
            self.pool = super::build_pool();
        }
        data.output = vec![0; BINS];
        self.pool.is_some()
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        let threads = pool.current_num_threads();
        let grain = self.grain;
        data.output = pool.install(|| hist_local(&data.input, threads, grain)).to_vec();
        true
    }

    fn post_processing_impl(&mut self, data: &mut Data) -> bool {
        check_correct(&data.output, data.input.len())
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Tbb
    }
}
