use common::consts::{DUMMY_DATABASE_PATH, DUMMY_ERROR_PATH, DUMMY_PASS_PATH, DUMMY_SLEEP_PATH};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use std::fmt;
use std::ops::Range;

use crate::LoadError;

pub const SLEEP_SECONDS: Range<i64> = 1..10;
pub const DATABASE_ITERATIONS: Range<i64> = 100..10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Task {
    DummySleep,
    DummyDatabase,
    DummyPass,
    DummyError,
}

impl Task {
    pub const ALL: [Task; 4] = [
        Task::DummySleep,
        Task::DummyDatabase,
        Task::DummyPass,
        Task::DummyError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::DummySleep => "dummy_sleep",
            Task::DummyDatabase => "dummy_database",
            Task::DummyPass => "dummy_pass",
            Task::DummyError => "dummy_error",
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            Task::DummySleep => 5,
            Task::DummyDatabase => 3,
            Task::DummyPass => 2,
            Task::DummyError => 1,
        }
    }

    /// Request path with freshly drawn parameters.
    pub fn path<R: Rng>(&self, rng: &mut R) -> String {
        match self {
            Task::DummySleep => {
                format!("{}/{}", DUMMY_SLEEP_PATH, rng.random_range(SLEEP_SECONDS))
            }
            Task::DummyDatabase => format!(
                "{}/{}",
                DUMMY_DATABASE_PATH,
                rng.random_range(DATABASE_ITERATIONS)
            ),
            Task::DummyPass => DUMMY_PASS_PATH.to_string(),
            Task::DummyError => DUMMY_ERROR_PATH.to_string(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks tasks in proportion to their weights.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
    index: WeightedIndex<u32>,
}

impl TaskSet {
    pub fn new() -> Result<Self, LoadError> {
        let tasks = Task::ALL.to_vec();
        let index = WeightedIndex::new(tasks.iter().map(Task::weight))
            .map_err(|err| LoadError::Weights(err.to_string()))?;
        Ok(Self { tasks, index })
    }

    pub fn pick<R: Rng>(&self, rng: &mut R) -> Task {
        self.tasks[self.index.sample(rng)]
    }
}
