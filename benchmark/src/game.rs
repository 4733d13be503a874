use std::fmt;
use std::time::Duration;

use chess::{ChessMove, Color};

use crate::engine::Engine;
use crate::error::{EngineError, RulesError};
use crate::rules::{Outcome, Position, STANDARD_POSITION_FEN};

pub const DEFAULT_MAX_PLIES: u32 = 500;

#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub white_time: Duration,
    pub black_time: Duration,
    pub max_plies: u32,
    pub start_fen: String,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            white_time: Duration::from_millis(100),
            black_time: Duration::from_millis(100),
            max_plies: DEFAULT_MAX_PLIES,
            start_fen: STANDARD_POSITION_FEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingWhite,
    WaitingBlack,
    Terminated(Outcome),
}

impl SessionState {
    fn waiting_for(color: Color) -> Self {
        match color {
            Color::White => SessionState::WaitingWhite,
            Color::Black => SessionState::WaitingBlack,
        }
    }
}

#[derive(Debug)]
pub enum AbortReason {
    /// The engine answered, but the rules engine refused the move.
    IllegalMove { color: Color, error: RulesError },
    /// The engine itself failed: bad reply, timeout or crash.
    Engine { color: Color, error: EngineError },
}

impl AbortReason {
    pub fn color(&self) -> Color {
        match self {
            AbortReason::IllegalMove { color, .. } | AbortReason::Engine { color, .. } => *color,
        }
    }

    /// The failed engine has to be replaced before it can play again.
    pub fn needs_respawn(&self) -> bool {
        matches!(self, AbortReason::Engine { error, .. } if error.is_fatal())
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::IllegalMove { color, error } => write!(f, "{:?}: {}", color, error),
            AbortReason::Engine { color, error } => write!(f, "{:?}: {}", color, error),
        }
    }
}

#[derive(Debug)]
pub struct GameRecord {
    pub plies: u32,
    pub outcome: Outcome,
    pub moves: Vec<ChessMove>,
    pub abort: Option<AbortReason>,
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} plies", self.outcome, self.plies)?;
        if let Some(reason) = &self.abort {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}

/// One game between two engines, advanced a ply at a time.
pub struct GameSession<'a, E: Engine> {
    white: &'a mut E,
    black: &'a mut E,
    limits: &'a SessionLimits,
    position: Position,
    state: SessionState,
    plies: u32,
    abort: Option<AbortReason>,
}

impl<'a, E: Engine> GameSession<'a, E> {
    pub fn new(
        white: &'a mut E,
        black: &'a mut E,
        limits: &'a SessionLimits,
    ) -> Result<Self, RulesError> {
        let position = Position::from_fen(&limits.start_fen)?;

        let state = match position.terminal_outcome() {
            Some(outcome) => SessionState::Terminated(outcome),
            None => SessionState::waiting_for(position.side_to_move()),
        };

        Ok(Self {
            white,
            black,
            limits,
            position,
            state,
            plies: 0,
            abort: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn plies(&self) -> u32 {
        self.plies
    }

    /// Performs one transition and returns the new state.
    pub fn step(&mut self) -> SessionState {
        let color = match self.state {
            SessionState::WaitingWhite => Color::White,
            SessionState::WaitingBlack => Color::Black,
            SessionState::Terminated(_) => return self.state,
        };

        let mv = match self.request_move(color) {
            Ok(mv) => mv,
            Err(error) => return self.abort(AbortReason::Engine { color, error }),
        };

        if let Err(error) = self.position.apply(mv) {
            return self.abort(AbortReason::IllegalMove { color, error });
        }
        self.plies += 1;

        self.state = match self.position.terminal_outcome() {
            Some(outcome) => SessionState::Terminated(outcome),
            // The rules engine alone may never end a shuffling game.
            None if self.plies >= self.limits.max_plies => SessionState::Terminated(Outcome::Draw),
            None => SessionState::waiting_for(!color),
        };

        self.state
    }

    pub fn play(mut self) -> GameRecord {
        let outcome = loop {
            if let SessionState::Terminated(outcome) = self.step() {
                break outcome;
            }
        };

        GameRecord {
            plies: self.plies,
            outcome,
            moves: self.position.moves().to_vec(),
            abort: self.abort,
        }
    }

    fn request_move(&mut self, color: Color) -> Result<ChessMove, EngineError> {
        let (engine, time_limit) = match color {
            Color::White => (&mut *self.white, self.limits.white_time),
            Color::Black => (&mut *self.black, self.limits.black_time),
        };

        engine.set_position(self.position.start_fen(), self.position.moves())?;
        engine.request_move(time_limit)
    }

    fn abort(&mut self, reason: AbortReason) -> SessionState {
        log::debug!("Game aborted after {} plies: {}", self.plies, reason);

        self.abort = Some(reason);
        self.state = SessionState::Terminated(Outcome::Aborted);
        self.state
    }
}
