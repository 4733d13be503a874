/// Commands sent from the controlling side to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuiCommand {
    Uci,
    IsReady,

    UciNewGame,
    Position {
        // None means the standard starting position.
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoParams),

    Stop,
    Quit,
}

/// Lines an engine writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineReply {
    Id(String),
    UciOk,
    ReadyOk,
    BestMove {
        best_move: String,
        ponder: Option<String>,
    },
    Info(String),
    Option(String),
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    // Search in the background until a stop command is received.
    pub infinite: bool,

    // Integer of milliseconds White has left on the clock.
    pub wtime: Option<u64>,

    // Integer of milliseconds Black has left on the clock.
    pub btime: Option<u64>,

    // Search depth ply only.
    pub depth: Option<u8>,

    // Search exactly movetime milliseconds.
    pub move_time: Option<u64>,
}

impl GoParams {
    pub fn move_time(millis: u64) -> Self {
        Self {
            move_time: Some(millis),
            ..Default::default()
        }
    }
}
