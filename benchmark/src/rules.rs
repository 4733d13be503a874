//! Thin adapter over the `chess` crate, which owns move legality and
//! game-end detection.

use std::fmt;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, Game, Piece};

use crate::error::RulesError;

pub const STANDARD_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    WhiteWins,
    BlackWins,
    Draw,
    Aborted,
}

impl Outcome {
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            Outcome::Draw | Outcome::Aborted => None,
        }
    }

    fn checkmated(loser: Color) -> Self {
        match loser {
            Color::White => Outcome::BlackWins,
            Color::Black => Outcome::WhiteWins,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
            Outcome::Aborted => "*",
        };
        f.write_str(result)
    }
}

/// A game in progress: the starting FEN, the moves played from it, and the
/// rules engine's view of the current position.
#[derive(Clone)]
pub struct Position {
    start_fen: String,
    game: Game,
    moves: Vec<ChessMove>,
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let fen = fen.trim();
        let board = Board::from_str(fen).map_err(|e| RulesError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            start_fen: fen.to_string(),
            game: Game::new_with_board(board),
            moves: Vec::new(),
        })
    }

    pub fn from_history(fen: &str, moves: &[ChessMove]) -> Result<Self, RulesError> {
        let mut position = Self::from_fen(fen)?;
        for &mv in moves {
            position.apply(mv)?;
        }
        Ok(position)
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    pub fn starts_from_standard(&self) -> bool {
        self.start_fen == STANDARD_POSITION_FEN
    }

    pub fn moves(&self) -> &[ChessMove] {
        &self.moves
    }

    pub fn board(&self) -> Board {
        self.game.current_position()
    }

    pub fn fen(&self) -> String {
        self.board().to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    pub fn is_legal(&self, mv: ChessMove) -> bool {
        self.board().legal(mv)
    }

    pub fn apply(&mut self, mv: ChessMove) -> Result<(), RulesError> {
        if !self.is_legal(mv) || !self.game.make_move(mv) {
            return Err(RulesError::IllegalMove {
                mv: mv.to_string(),
                fen: self.fen(),
            });
        }

        self.moves.push(mv);
        Ok(())
    }

    /// Checkmate and stalemate come from the board; threefold repetition and
    /// the fifty-move rule come from the game's draw-claim check.
    pub fn terminal_outcome(&self) -> Option<Outcome> {
        let board = self.board();

        match board.status() {
            BoardStatus::Checkmate => return Some(Outcome::checkmated(board.side_to_move())),
            BoardStatus::Stalemate => return Some(Outcome::Draw),
            BoardStatus::Ongoing => {}
        }

        if self.game.can_declare_draw() || has_insufficient_material(&board) {
            return Some(Outcome::Draw);
        }

        None
    }
}

/// K v K and K+minor v K.
fn has_insufficient_material(board: &Board) -> bool {
    let pieces = board.combined().popcnt();
    if pieces == 2 {
        return true;
    }

    let minors = (*board.pieces(Piece::Knight) | *board.pieces(Piece::Bishop)).popcnt();
    pieces == 3 && minors == 1
}

pub fn parse_move(text: &str) -> Option<ChessMove> {
    ChessMove::from_str(text.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(position: &mut Position, moves: &[&str]) {
        for mv in moves {
            position.apply(parse_move(mv).unwrap()).unwrap();
        }
    }

    #[test]
    fn test_standard_position() {
        let position = Position::from_fen(STANDARD_POSITION_FEN).unwrap();
        assert!(position.starts_from_standard());
        assert_eq!(position.side_to_move(), Color::White);
        assert_eq!(position.terminal_outcome(), None);
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            Position::from_fen("not a fen"),
            Err(RulesError::InvalidFen { .. })
        ));
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let mut position = Position::from_fen(STANDARD_POSITION_FEN).unwrap();
        let result = position.apply(parse_move("e2e5").unwrap());

        assert!(matches!(result, Err(RulesError::IllegalMove { .. })));
        assert!(position.moves().is_empty());
    }

    #[test]
    fn test_fools_mate() {
        let mut position = Position::from_fen(STANDARD_POSITION_FEN).unwrap();
        play(&mut position, &["f2f3", "e7e5", "g2g4", "d8h4"]);

        assert_eq!(position.terminal_outcome(), Some(Outcome::BlackWins));
        assert_eq!(position.moves().len(), 4);
    }

    #[test]
    fn test_stalemate() {
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(position.terminal_outcome(), Some(Outcome::Draw));
    }

    #[test]
    fn test_insufficient_material() {
        let bare_kings = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(bare_kings.terminal_outcome(), Some(Outcome::Draw));

        let king_and_knight = Position::from_fen("8/8/4k3/8/8/3KN3/8/8 w - - 0 1").unwrap();
        assert_eq!(king_and_knight.terminal_outcome(), Some(Outcome::Draw));

        let king_and_rook = Position::from_fen("8/8/4k3/8/8/3K4/7R/8 w - - 0 1").unwrap();
        assert_eq!(king_and_rook.terminal_outcome(), None);
    }

    #[test]
    fn test_repetition_is_a_draw() {
        let mut position = Position::from_fen(STANDARD_POSITION_FEN).unwrap();
        play(
            &mut position,
            &["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"],
        );

        assert_eq!(position.terminal_outcome(), Some(Outcome::Draw));
    }

    #[test]
    fn test_from_history() {
        let moves = ["e2e4", "e7e5"].map(|m| parse_move(m).unwrap());
        let position = Position::from_history(STANDARD_POSITION_FEN, &moves).unwrap();

        assert_eq!(position.moves(), &moves);
        assert_eq!(position.side_to_move(), Color::White);
    }

    #[test]
    fn test_parse_move() {
        assert!(parse_move("e2e4").is_some());
        assert!(parse_move("e7e8q").is_some());
        assert!(parse_move("xyz").is_none());
        assert!(parse_move("").is_none());
    }
}
