use super::commands::EngineReply;

pub struct Decoder;

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, input: &str) -> EngineReply {
        let input = input.trim();

        match first_token(input) {
            "uciok" => EngineReply::UciOk,
            "readyok" => EngineReply::ReadyOk,

            "id" => EngineReply::Id(rest_after(input, "id")),
            "info" => EngineReply::Info(rest_after(input, "info")),
            "option" => EngineReply::Option(input.to_string()),
            "bestmove" => self.decode_bestmove(input),

            _ => EngineReply::Unknown(input.to_string()),
        }
    }

    fn decode_bestmove(&self, input: &str) -> EngineReply {
        // bestmove <move> [ponder <move>]
        let tokens: Vec<&str> = input.split_whitespace().collect();

        match tokens.as_slice() {
            ["bestmove", best_move] => EngineReply::BestMove {
                best_move: best_move.to_string(),
                ponder: None,
            },
            ["bestmove", best_move, "ponder", ponder] => EngineReply::BestMove {
                best_move: best_move.to_string(),
                ponder: Some(ponder.to_string()),
            },
            _ => EngineReply::Unknown(input.to_string()),
        }
    }
}

fn first_token(input: &str) -> &str {
    input.split_whitespace().next().unwrap_or("")
}

fn rest_after(input: &str, keyword: &str) -> String {
    input
        .strip_prefix(keyword)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}
