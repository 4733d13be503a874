//! In-process engines for exercising games and the worker pool without
//! spawning subprocesses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chess::{ChessMove, MoveGen};

use crate::engine::{Engine, EngineLauncher, Role};
use crate::error::EngineError;
use crate::rules::{parse_move, Position};

/// Plays a fixed list of moves and "crashes" once it runs out.
pub struct ScriptedEngine {
    name: String,
    moves: VecDeque<ChessMove>,
}

impl ScriptedEngine {
    pub fn new(name: &str, moves: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            moves: moves.iter().map(|m| parse_move(m).unwrap()).collect(),
        }
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_position(&mut self, _fen: &str, _moves: &[ChessMove]) -> Result<(), EngineError> {
        Ok(())
    }

    fn request_move(&mut self, _time_limit: Duration) -> Result<ChessMove, EngineError> {
        self.moves.pop_front().ok_or_else(|| EngineError::Crashed {
            engine: self.name.clone(),
        })
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Always plays the first legal move the move generator yields.
pub struct FirstLegalEngine<'a> {
    name: String,
    position: Option<Position>,
    crash_on_move: bool,
    stopped: bool,
    stats: &'a LaunchStats,
}

impl FirstLegalEngine<'_> {
    pub fn first_legal(position: &Position) -> Option<ChessMove> {
        MoveGen::new_legal(&position.board()).next()
    }
}

impl Engine for FirstLegalEngine<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.position = None;
        Ok(())
    }

    fn set_position(&mut self, fen: &str, moves: &[ChessMove]) -> Result<(), EngineError> {
        let position =
            Position::from_history(fen, moves).map_err(|source| EngineError::InvalidPosition {
                engine: self.name.clone(),
                source,
            })?;
        self.position = Some(position);
        Ok(())
    }

    fn request_move(&mut self, _time_limit: Duration) -> Result<ChessMove, EngineError> {
        let requested = self.stats.moves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stats.stop_after_moves == Some(requested) {
            self.stats.stop.store(true, Ordering::SeqCst);
        }

        if self.crash_on_move || self.stopped {
            return Err(EngineError::Crashed {
                engine: self.name.clone(),
            });
        }

        self.position
            .as_ref()
            .and_then(Self::first_legal)
            .ok_or_else(|| EngineError::Protocol {
                engine: self.name.clone(),
                reason: "no move".to_string(),
            })
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        if !self.stopped {
            self.stopped = true;
            self.stats.stopped.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct LaunchStats {
    pub launched: AtomicUsize,
    pub stopped: AtomicUsize,
    /// Move requests across all engines, answered or not.
    pub moves: AtomicUsize,
    /// Raised by the engine that receives move request number
    /// `stop_after_moves`, standing in for Ctrl-C.
    pub stop: AtomicBool,
    pub stop_after_moves: Option<usize>,
}

/// Hands out `FirstLegalEngine`s. The first `crashing` engines launched for
/// the engine-under-test role crash on their first move request.
pub struct MockLauncher {
    pub stats: LaunchStats,
    pub crashing: usize,
    pub refuse_to_start: bool,
    crashes_handed_out: AtomicUsize,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            stats: LaunchStats::default(),
            crashing: 0,
            refuse_to_start: false,
            crashes_handed_out: AtomicUsize::new(0),
        }
    }

    pub fn crashing(crashing: usize) -> Self {
        Self {
            crashing,
            ..Self::new()
        }
    }

    pub fn stopping_after(moves: usize) -> Self {
        let mut launcher = Self::new();
        launcher.stats.stop_after_moves = Some(moves);
        launcher
    }

    pub fn stop_flag(&self) -> &AtomicBool {
        &self.stats.stop
    }

    pub fn refusing() -> Self {
        Self {
            refuse_to_start: true,
            ..Self::new()
        }
    }

    pub fn launched(&self) -> usize {
        self.stats.launched.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stats.stopped.load(Ordering::SeqCst)
    }
}

impl<'a> EngineLauncher for &'a MockLauncher {
    type Engine = FirstLegalEngine<'a>;

    fn launch(&self, role: Role, worker: usize) -> Result<Self::Engine, EngineError> {
        let launcher: &'a MockLauncher = *self;

        if launcher.refuse_to_start {
            return Err(EngineError::Spawn {
                path: "mock".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "refused"),
            });
        }

        launcher.stats.launched.fetch_add(1, Ordering::SeqCst);

        let crash_on_move = role == Role::EngineUnderTest
            && launcher.crashes_handed_out.fetch_add(1, Ordering::SeqCst) < launcher.crashing;

        Ok(FirstLegalEngine {
            name: format!("{}-{}", role, worker),
            position: None,
            crash_on_move,
            stopped: false,
            stats: &launcher.stats,
        })
    }
}
