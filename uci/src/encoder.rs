use super::commands::{GoParams, GuiCommand};

pub struct Encoder {}

impl Encoder {
    pub fn encode(&self, command: &GuiCommand) -> String {
        match command {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),

            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(fen) => format!("position fen {}", fen),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(params) => encode_go(params),

            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

fn encode_go(params: &GoParams) -> String {
    let mut line = String::from("go");

    if params.infinite {
        line.push_str(" infinite");
    }
    if let Some(wtime) = params.wtime {
        line.push_str(&format!(" wtime {}", wtime));
    }
    if let Some(btime) = params.btime {
        line.push_str(&format!(" btime {}", btime));
    }
    if let Some(depth) = params.depth {
        line.push_str(&format!(" depth {}", depth));
    }
    if let Some(move_time) = params.move_time {
        line.push_str(&format!(" movetime {}", move_time));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        let encoder = Encoder {};
        assert_eq!(encoder.encode(&GuiCommand::Uci), "uci");
        assert_eq!(encoder.encode(&GuiCommand::IsReady), "isready");
        assert_eq!(encoder.encode(&GuiCommand::UciNewGame), "ucinewgame");
        assert_eq!(encoder.encode(&GuiCommand::Quit), "quit");
    }

    #[test]
    fn test_position_startpos() {
        let encoder = Encoder {};
        let command = GuiCommand::Position {
            fen: None,
            moves: vec![],
        };
        assert_eq!(encoder.encode(&command), "position startpos");
    }

    #[test]
    fn test_position_fen_with_moves() {
        let encoder = Encoder {};
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        let command = GuiCommand::Position {
            fen: Some(fen.to_string()),
            moves: vec!["g1f3".to_string(), "b8c6".to_string()],
        };
        assert_eq!(
            encoder.encode(&command),
            format!("position fen {} moves g1f3 b8c6", fen)
        );
    }

    #[test]
    fn test_go_movetime() {
        let encoder = Encoder {};
        assert_eq!(
            encoder.encode(&GuiCommand::Go(GoParams::move_time(250))),
            "go movetime 250"
        );
    }

    #[test]
    fn test_go_clock_and_depth() {
        let encoder = Encoder {};
        let params = GoParams {
            wtime: Some(60000),
            btime: Some(59000),
            depth: Some(12),
            ..Default::default()
        };
        assert_eq!(
            encoder.encode(&GuiCommand::Go(params)),
            "go wtime 60000 btime 59000 depth 12"
        );
    }
}
