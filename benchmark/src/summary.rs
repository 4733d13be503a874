use std::fmt;

use crate::results::ResultSnapshot;

pub struct MatchSummary<'a> {
    engine_name: &'a str,
    reference_name: &'a str,
    results: &'a ResultSnapshot,
}

impl<'a> MatchSummary<'a> {
    pub fn new(engine_name: &'a str, reference_name: &'a str, results: &'a ResultSnapshot) -> Self {
        Self {
            engine_name,
            reference_name,
            results,
        }
    }

    /// Points per finished game, draws count half. Aborted games are left out.
    #[inline]
    fn score(&self) -> Option<f64> {
        let decided = self.results.engine_wins + self.results.reference_wins + self.results.draws;
        if decided == 0 {
            return None;
        }
        let points = self.results.engine_wins as f64 + self.results.draws as f64 * 0.5;
        Some(points * 100.0 / decided as f64)
    }
}

impl fmt::Display for MatchSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self.results;

        writeln!(f, "[*] Results")?;
        writeln!(f, "    games played:     {}", results.games_played())?;
        writeln!(f, "    {} wins: {}", self.engine_name, results.engine_wins)?;
        writeln!(f, "    {} wins: {}", self.reference_name, results.reference_wins)?;
        writeln!(f, "    draws:            {}", results.draws)?;
        writeln!(f, "    aborted:          {}", results.aborted)?;

        if let Some(score) = self.score() {
            writeln!(f, "    score:            {:.1}%", score)?;
        }

        match (
            results.average_plies(),
            results.longest_game(),
            results.shortest_game(),
        ) {
            (Some(average), Some(longest), Some(shortest)) => {
                writeln!(f, "    avg plies/game:   {:.2}", average)?;
                writeln!(f, "    longest game:     {}", longest)?;
                write!(f, "    shortest game:    {}", shortest)
            }
            _ => write!(f, "    no completed games"),
        }
    }
}

pub struct AccuracySummary<'a> {
    results: &'a ResultSnapshot,
}

impl<'a> AccuracySummary<'a> {
    pub fn new(results: &'a ResultSnapshot) -> Self {
        Self { results }
    }
}

impl fmt::Display for AccuracySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[*] Results")?;
        write!(
            f,
            "    accuracy: {}/{} ({:.2}%)",
            self.results.correct_accuracy,
            self.results.total_accuracy,
            self.results.accuracy_percentage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_summary() {
        let results = ResultSnapshot {
            engine_wins: 3,
            reference_wins: 5,
            draws: 2,
            aborted: 1,
            game_plies: vec![40, 80, 61],
            ..Default::default()
        };

        let text = MatchSummary::new("engine", "stockfish", &results).to_string();

        assert!(text.contains("games played:     11"));
        assert!(text.contains("engine wins: 3"));
        assert!(text.contains("stockfish wins: 5"));
        assert!(text.contains("aborted:          1"));
        assert!(text.contains("score:            40.0%"));
        assert!(text.contains("avg plies/game:   60.33"));
        assert!(text.contains("longest game:     80"));
        assert!(text.contains("shortest game:    40"));
    }

    #[test]
    fn test_match_summary_without_games() {
        let results = ResultSnapshot {
            aborted: 2,
            ..Default::default()
        };

        let text = MatchSummary::new("engine", "stockfish", &results).to_string();
        assert!(text.contains("no completed games"));
        assert!(!text.contains("score"));
    }

    #[test]
    fn test_accuracy_summary() {
        let results = ResultSnapshot {
            correct_accuracy: 2,
            total_accuracy: 3,
            ..Default::default()
        };

        let text = AccuracySummary::new(&results).to_string();
        assert!(text.contains("accuracy: 2/3 (66.67%)"));
    }
}
