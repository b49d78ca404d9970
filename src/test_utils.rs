//! Shared helpers for unit tests.

use std::ops::AddAssign;
use std::sync::Once;

use crate::task::{TaskData, TaskKernel, TypeOfTask};

static INIT_LOGGING: Once = Once::new();

/// Routes `tracing` output through the test writer. Only the first call has an effect.
pub(crate) fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Adds every input element onto the output. Repeated runs keep accumulating.
#[derive(Debug, Default)]
pub(crate) struct SumKernel;

impl<T> TaskKernel<Vec<T>, T> for SumKernel
where
    T: Copy + Default + AddAssign,
{
    fn validation_impl(&mut self, data: &mut TaskData<Vec<T>, T>) -> bool {
        !data.input.is_empty()
    }

    fn pre_processing_impl(&mut self, data: &mut TaskData<Vec<T>, T>) -> bool {
        data.output = T::default();
        true
    }

    fn run_impl(&mut self, data: &mut TaskData<Vec<T>, T>) -> bool {
        for &value in &data.input {
            data.output += value;
        }
        true
    }

    fn post_processing_impl(&mut self, _data: &mut TaskData<Vec<T>, T>) -> bool {
        true
    }

    fn static_type_of_task() -> TypeOfTask {
        TypeOfTask::Seq
    }
}
