use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chess::Color;

use crate::rules::Outcome;

/// A finished game seen from the engine under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    EngineWin,
    ReferenceWin,
    Draw,
    Aborted,
}

impl MatchOutcome {
    pub fn from_game(outcome: Outcome, engine_color: Color) -> Self {
        match outcome {
            Outcome::Draw => MatchOutcome::Draw,
            Outcome::Aborted => MatchOutcome::Aborted,
            Outcome::WhiteWins | Outcome::BlackWins => {
                if outcome.winner() == Some(engine_color) {
                    MatchOutcome::EngineWin
                } else {
                    MatchOutcome::ReferenceWin
                }
            }
        }
    }
}

/// Counters shared by every worker. Each update is a single atomic
/// operation, so concurrent workers never lose one.
#[derive(Default)]
pub struct ResultAggregator {
    engine_wins: AtomicU64,
    reference_wins: AtomicU64,
    draws: AtomicU64,
    aborted: AtomicU64,
    correct_accuracy: AtomicU64,
    total_accuracy: AtomicU64,
    game_plies: Mutex<Vec<u32>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborted games do not contribute a ply count.
    pub fn record_match(&self, outcome: MatchOutcome, plies: u32) {
        let counter = match outcome {
            MatchOutcome::EngineWin => &self.engine_wins,
            MatchOutcome::ReferenceWin => &self.reference_wins,
            MatchOutcome::Draw => &self.draws,
            MatchOutcome::Aborted => &self.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if outcome != MatchOutcome::Aborted {
            self.game_plies
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(plies);
        }
    }

    pub fn record_accuracy(&self, correct: bool) {
        if correct {
            self.correct_accuracy.fetch_add(1, Ordering::Relaxed);
        }
        self.total_accuracy.fetch_add(1, Ordering::Relaxed);
    }

    /// Meant for after every worker has been joined; earlier calls see a
    /// consistent list but possibly torn counters.
    pub fn snapshot(&self) -> ResultSnapshot {
        ResultSnapshot {
            engine_wins: self.engine_wins.load(Ordering::Relaxed),
            reference_wins: self.reference_wins.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            correct_accuracy: self.correct_accuracy.load(Ordering::Relaxed),
            total_accuracy: self.total_accuracy.load(Ordering::Relaxed),
            game_plies: self
                .game_plies
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSnapshot {
    pub engine_wins: u64,
    pub reference_wins: u64,
    pub draws: u64,
    pub aborted: u64,
    pub correct_accuracy: u64,
    pub total_accuracy: u64,
    pub game_plies: Vec<u32>,
}

impl ResultSnapshot {
    #[inline]
    pub fn games_played(&self) -> u64 {
        self.engine_wins + self.reference_wins + self.draws + self.aborted
    }

    pub fn average_plies(&self) -> Option<f64> {
        if self.game_plies.is_empty() {
            return None;
        }
        let total: u64 = self.game_plies.iter().map(|&p| p as u64).sum();
        Some(total as f64 / self.game_plies.len() as f64)
    }

    pub fn longest_game(&self) -> Option<u32> {
        self.game_plies.iter().copied().max()
    }

    pub fn shortest_game(&self) -> Option<u32> {
        self.game_plies.iter().copied().min()
    }

    pub fn accuracy_percentage(&self) -> f64 {
        if self.total_accuracy == 0 {
            0.0
        } else {
            self.correct_accuracy as f64 * 100.0 / self.total_accuracy as f64
        }
    }
}
