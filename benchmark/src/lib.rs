pub mod engine;
pub mod error;
pub mod game;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod results;
pub mod rules;
pub mod summary;
pub mod work;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineCommand, EngineLauncher, EngineProcess, ProcessLauncher, Role};
pub use error::{EngineError, InputError, PoolError, RulesError};
pub use game::{GameRecord, GameSession, SessionLimits};
pub use pool::{PoolConfig, PoolReport, WorkerPool};
pub use progress::ProgressReporter;
pub use queue::WorkQueue;
pub use results::{MatchOutcome, ResultAggregator, ResultSnapshot};
pub use work::WorkItem;
