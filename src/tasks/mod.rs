//! Reference computations hosted by the harness.
//!
//! Each family ships a sequential kernel and one or more parallel kernels
//! with the same input and output types, so the sequential result can
//! check the parallel ones. Parallel kernels size themselves from
//! `PPC_NUM_THREADS` during pre-processing.

pub mod histogram;
pub mod matrix_multiply;
pub mod prefix_sum;
pub mod sum_of_vector_elements;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::warn;

use crate::util;

/// A rayon pool with the requested number of threads, or `None` if it could not be built.
pub(crate) fn build_pool() -> Option<ThreadPool> {
    let threads = util::pool_threads();
    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(threads, "failed to build thread pool: {e}");
            None
        }
    }
}

/// `n` seeded random values in `0..bound`.
pub fn random_vector(n: usize, bound: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..bound.max(1))).collect()
}
