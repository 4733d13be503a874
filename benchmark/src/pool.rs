use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chess::{ChessMove, Color};

use crate::engine::{Engine, EngineGuard, EngineLauncher, Role};
use crate::error::{EngineError, PoolError};
use crate::game::{GameSession, SessionLimits, DEFAULT_MAX_PLIES};
use crate::progress::ProgressReporter;
use crate::queue::WorkQueue;
use crate::results::{MatchOutcome, ResultAggregator};
use crate::rules::STANDARD_POSITION_FEN;
use crate::work::WorkItem;

pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub engine_time: Duration,
    pub reference_time: Duration,
    pub max_plies: u32,
    pub start_fen: String,
    /// Accuracy runs only talk to the engine under test.
    pub launch_reference: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            engine_time: Duration::from_millis(1000),
            reference_time: Duration::from_millis(100),
            max_plies: DEFAULT_MAX_PLIES,
            start_fen: STANDARD_POSITION_FEN.to_string(),
            launch_reference: true,
        }
    }
}

impl PoolConfig {
    fn session_limits(&self, engine_plays_white: bool) -> SessionLimits {
        let (white_time, black_time) = if engine_plays_white {
            (self.engine_time, self.reference_time)
        } else {
            (self.reference_time, self.engine_time)
        };

        SessionLimits {
            white_time,
            black_time,
            max_plies: self.max_plies,
            start_fen: self.start_fen.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    pub workers_started: usize,
    pub remaining: usize,
    pub cancelled: bool,
}

pub struct WorkerPool<'a, L: EngineLauncher> {
    launcher: &'a L,
    config: PoolConfig,
    stop: &'a AtomicBool,
}

impl<'a, L: EngineLauncher> WorkerPool<'a, L> {
    pub fn new(launcher: &'a L, config: PoolConfig, stop: &'a AtomicBool) -> Self {
        Self {
            launcher,
            config,
            stop,
        }
    }

    /// Runs every worker to completion while `progress` watches the queue
    /// from the calling thread.
    pub fn run(
        &self,
        queue: &WorkQueue<WorkItem>,
        results: &ResultAggregator,
        progress: &mut ProgressReporter,
    ) -> Result<PoolReport, PoolError> {
        let workers = self.config.workers;
        log::info!("Running {} items on {} workers", queue.total(), workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("worker-{}", index))
            .build()?;

        let running = AtomicUsize::new(workers);
        let failed_to_start = AtomicUsize::new(0);

        pool.in_place_scope(|scope| {
            for id in 0..workers {
                let running = &running;
                let failed_to_start = &failed_to_start;

                scope.spawn(move |_| {
                    let _exit = ExitSignal(running);

                    match Worker::start(id, self.launcher, &self.config, self.stop) {
                        Ok(worker) => worker.run(queue, results),
                        Err(e) => {
                            log::error!("Worker {} could not start its engines: {}", id, e);
                            failed_to_start.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }

            progress.watch(|| queue.len(), || running.load(Ordering::SeqCst) == 0);
        });

        let failed_to_start = failed_to_start.into_inner();
        if failed_to_start == workers {
            return Err(PoolError::NoWorkersStarted { workers });
        }

        let report = PoolReport {
            workers_started: workers - failed_to_start,
            remaining: queue.len(),
            cancelled: self.stop.load(Ordering::SeqCst),
        };

        if report.remaining > 0 && !report.cancelled {
            return Err(PoolError::WorkStranded {
                remaining: report.remaining,
            });
        }

        Ok(report)
    }
}

/// Marks a worker as gone however its closure ends, unwinding included.
struct ExitSignal<'a>(&'a AtomicUsize);

impl Drop for ExitSignal<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Worker<'a, L: EngineLauncher> {
    id: usize,
    launcher: &'a L,
    config: &'a PoolConfig,
    stop: &'a AtomicBool,
    engine: EngineGuard<L::Engine>,
    reference: Option<EngineGuard<L::Engine>>,
}

impl<'a, L: EngineLauncher> Worker<'a, L> {
    fn start(
        id: usize,
        launcher: &'a L,
        config: &'a PoolConfig,
        stop: &'a AtomicBool,
    ) -> Result<Self, EngineError> {
        let engine = EngineGuard::new(launcher.launch(Role::EngineUnderTest, id)?);

        // If this fails, `engine` is dropped and stopped on the way out.
        let reference = if config.launch_reference {
            Some(EngineGuard::new(launcher.launch(Role::Reference, id)?))
        } else {
            None
        };

        Ok(Self {
            id,
            launcher,
            config,
            stop,
            engine,
            reference,
        })
    }

    /// Takes items until the queue is drained or a stop is requested. The
    /// engines are stopped when `self` drops at the end.
    fn run(mut self, queue: &WorkQueue<WorkItem>, results: &ResultAggregator) {
        log::debug!("Worker {} started", self.id);
        let mut processed = 0;

        while !self.stop.load(Ordering::Relaxed) {
            let Some(item) = queue.try_dequeue() else {
                break;
            };

            let healthy = match item {
                WorkItem::Match { engine_plays_white } => {
                    self.play_match(engine_plays_white, results)
                }
                WorkItem::Accuracy { fen, expected_move } => {
                    self.check_accuracy(&fen, &expected_move, results)
                }
            };
            processed += 1;

            if !healthy {
                log::error!("Worker {} has no usable engine left, exiting", self.id);
                break;
            }
        }

        log::debug!("Worker {} finished after {} items", self.id, processed);
    }

    /// Returns false when a dead engine could not be replaced.
    fn play_match(&mut self, engine_plays_white: bool, results: &ResultAggregator) -> bool {
        let limits = self.config.session_limits(engine_plays_white);
        let engine: &mut L::Engine = &mut self.engine;
        let Some(reference) = self.reference.as_mut() else {
            log::error!("Worker {} has no reference engine for a match", self.id);
            results.record_match(MatchOutcome::Aborted, 0);
            return true;
        };
        let reference: &mut L::Engine = reference;

        let engine_color = if engine_plays_white {
            Color::White
        } else {
            Color::Black
        };

        let failure = match prepare(engine, reference) {
            Err(failure) => {
                results.record_match(MatchOutcome::Aborted, 0);
                failure
            }
            Ok(()) => {
                let (white, black) = if engine_plays_white {
                    (engine, reference)
                } else {
                    (reference, engine)
                };

                let record = match GameSession::new(white, black, &limits) {
                    Ok(session) => session.play(),
                    Err(e) => {
                        log::error!("Worker {} cannot set up a game: {}", self.id, e);
                        results.record_match(MatchOutcome::Aborted, 0);
                        return true;
                    }
                };

                let outcome = MatchOutcome::from_game(record.outcome, engine_color);
                results.record_match(outcome, record.plies);
                log::debug!("Worker {}: {} -> {:?}", self.id, record, outcome);

                record.abort.and_then(|reason| {
                    let role = if reason.color() == engine_color {
                        Role::EngineUnderTest
                    } else {
                        Role::Reference
                    };
                    log::warn!("Worker {}: game aborted by {}: {}", self.id, role, reason);
                    reason.needs_respawn().then_some(role)
                })
            }
        };

        match failure {
            Some(role) => self.respawn(role),
            None => true,
        }
    }

    fn check_accuracy(
        &mut self,
        fen: &str,
        expected_move: &str,
        results: &ResultAggregator,
    ) -> bool {
        match best_move(&mut *self.engine, fen, self.config.engine_time) {
            Ok(mv) => {
                let correct = mv.to_string() == expected_move;
                log::debug!(
                    "Worker {}: {} played {} (expected {})",
                    self.id,
                    fen,
                    mv,
                    expected_move
                );
                results.record_accuracy(correct);
                true
            }
            Err(e) => {
                log::warn!("Worker {}: no answer for {}: {}", self.id, fen, e);
                results.record_accuracy(false);

                if e.is_fatal() {
                    self.respawn(Role::EngineUnderTest)
                } else {
                    true
                }
            }
        }
    }

    fn respawn(&mut self, role: Role) -> bool {
        // The worker leaves after this item anyway.
        if self.stop.load(Ordering::Relaxed) {
            log::info!("Worker {}: stop requested, not restarting {}", self.id, role);
            return true;
        }

        log::warn!("Worker {}: restarting {}", self.id, role);

        let fresh = match self.launcher.launch(role, self.id) {
            Ok(fresh) => fresh,
            Err(e) => {
                log::error!("Worker {}: could not restart {}: {}", self.id, role, e);
                return false;
            }
        };

        match role {
            Role::EngineUnderTest => self.engine.replace(fresh),
            Role::Reference => match self.reference.as_mut() {
                Some(reference) => reference.replace(fresh),
                None => self.reference = Some(EngineGuard::new(fresh)),
            },
        }
        true
    }
}

/// Resets both engines before a game. On failure reports which role broke,
/// if the process needs replacing.
fn prepare<E: Engine>(engine: &mut E, reference: &mut E) -> Result<(), Option<Role>> {
    let failed = |role: Role| {
        move |e: EngineError| {
            log::warn!("{} failed to start a new game: {}", role, e);
            e.is_fatal().then_some(role)
        }
    };

    engine.new_game().map_err(failed(Role::EngineUnderTest))?;
    reference.new_game().map_err(failed(Role::Reference))
}

fn best_move<E: Engine>(engine: &mut E, fen: &str, time_limit: Duration) -> Result<ChessMove, EngineError> {
    engine.new_game()?;
    engine.set_position(fen, &[])?;
    engine.request_move(time_limit)
}
