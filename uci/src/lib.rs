mod connection;
mod decoder;
mod encoder;

pub mod commands;

pub use commands::{EngineReply, GoParams, GuiCommand};
pub use connection::EngineConnection;
pub use decoder::Decoder;
pub use encoder::Encoder;

/// Null move in UCI format. Engines send it as the bestmove when the position
/// has no legal moves.
pub const NULL_MOVE: &str = "0000";
