use rayon::prelude::*;
use rayon::ThreadPool;

use crate::task::{TaskData, TaskKernel, TypeOfTask};

pub type Matrix = Vec<Vec<f64>>;

pub type Data = TaskData<(Matrix, Matrix), Matrix>;

const EPSILON: f64 = 1e-6;

pub fn create_matrix(n: usize, init_value: f64) -> Matrix {
    vec![vec![init_value; n]; n]
}

fn is_square(m: &Matrix, n: usize) -> bool {
    m.len() == n && m.iter().all(|row| row.len() == n)
}

// Both operands square and of the same non-zero size.
fn validate(data: &Data) -> bool {
    let (a, b) = &data.input;
    let n = a.len();
    n > 0 && is_square(a, n) && is_square(b, n)
}

fn multiply_row(a_row: &[f64], b: &Matrix, row: &mut [f64]) {
    for (j, cell) in row.iter_mut().enumerate() {
        *cell = a_row.iter().zip(b).map(|(a_ik, b_row)| a_ik * b_row[j]).sum();
    }
}

fn matrix_multiply_sequential(a: &Matrix, b: &Matrix) -> Matrix {
    let mut c = create_matrix(a.len(), 0.0);
    for (a_row, row) in a.iter().zip(c.iter_mut()) {
        multiply_row(a_row, b, row);
    }
    c
}

fn matrix_multiply_parallel(a: &Matrix, b: &Matrix) -> Matrix {
    let mut c = create_matrix(a.len(), 0.0);
    c.par_iter_mut()
        .zip(a.par_iter())
        .for_each(|(row, a_row)| multiply_row(a_row, b, row));
    c
}

pub fn matrices_match(left: &Matrix, right: &Matrix) -> bool {
    left.len() == right.len()
        && left.iter().zip(right).all(|(l, r)| {
            l.len() == r.len() && l.iter().zip(r).all(|(x, y)| (x - y).abs() <= EPSILON)
        })
}

#[derive(Debug, Default)]
pub struct MatrixMultiplySeq;

impl TaskKernel<(Matrix, Matrix), Matrix> for MatrixMultiplySeq {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        validate(data)
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        data.output.clear();
        true
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        // Stages keep going after a failed validation.
        if !validate(data) {
            return false;
        }
        let (a, b) = &data.input;
        data.output = matrix_multiply_sequential(a, b);
        true
    }

    fn post_processing_impl(&mut self, _data: &mut Data) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Seq
    }
}

/// Rows of the result computed in parallel.
#[derive(Debug, Default)]
pub struct MatrixMultiplyTbb {
    pool: Option<ThreadPool>,
}

impl TaskKernel<(Matrix, Matrix), Matrix> for MatrixMultiplyTbb {
    fn validation_impl(&mut self, data: &mut Data) -> bool {
        validate(data)
    }

    fn pre_processing_impl(&mut self, data: &mut Data) -> bool {
        if self.pool.is_none() {
            self.pool = super::build_pool();
        }
        data.output.clear();
        self.pool.is_some()
    }

    fn run_impl(&mut self, data: &mut Data) -> bool {
        let Some(pool) = &self.pool else {
            return false;
        };
        if !validate(data) {
            return false;
        }
        let (a, b) = &data.input;
        data.output = pool.install(|| matrix_multiply_parallel(a, b));
        true
    }

    fn post_processing_impl(&mut self, _data: &mut Data) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Tbb
    }
}
