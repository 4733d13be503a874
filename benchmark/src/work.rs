use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::InputError;
use crate::rules::Position;

const CASE_DELIMITER: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Match {
        engine_plays_white: bool,
    },
    Accuracy {
        fen: String,
        expected_move: String,
    },
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Match { engine_plays_white } => {
                let color = if *engine_plays_white { "white" } else { "black" };
                write!(f, "match (engine as {})", color)
            }
            WorkItem::Accuracy { fen, expected_move } => {
                write!(f, "accuracy {} (expect {})", fen, expected_move)
            }
        }
    }
}

/// Colors alternate so the engine under test gets white on even games.
pub fn schedule_matches(games: usize) -> Vec<WorkItem> {
    (0..games)
        .map(|game| WorkItem::Match {
            engine_plays_white: game % 2 == 0,
        })
        .collect()
}

pub fn load_accuracy_cases(path: impl AsRef<Path>) -> Result<Vec<WorkItem>, InputError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let cases = parse_accuracy_cases(&text)?;
    log::info!("Loaded {} accuracy cases from {}", cases.len(), path.display());

    Ok(cases)
}

/// One case per line: `<bestMove> | <fen>`.
pub fn parse_accuracy_cases(text: &str) -> Result<Vec<WorkItem>, InputError> {
    let mut cases = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let (expected_move, fen) =
            line.split_once(CASE_DELIMITER)
                .ok_or_else(|| InputError::Malformed {
                    line: line_number,
                    reason: format!("missing '{}' delimiter", CASE_DELIMITER),
                })?;

        let expected_move = expected_move.trim();
        let fen = fen.trim();

        if expected_move.is_empty() {
            return Err(InputError::Malformed {
                line: line_number,
                reason: "empty best move".to_string(),
            });
        }

        Position::from_fen(fen).map_err(|e| InputError::Malformed {
            line: line_number,
            reason: e.to_string(),
        })?;

        cases.push(WorkItem::Accuracy {
            fen: fen.to_string(),
            expected_move: expected_move.to_string(),
        });
    }

    if cases.is_empty() {
        return Err(InputError::Empty);
    }

    Ok(cases)
}
