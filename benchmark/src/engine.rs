use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};

use chess::ChessMove;
use uci::{EngineConnection, EngineReply, GoParams, GuiCommand, NULL_MOVE};

use crate::error::EngineError;
use crate::rules::{parse_move, Position};

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_GRACE: Duration = Duration::from_millis(500);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Deadlines past the clock's range are clamped to this far ahead.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Something that picks moves: a UCI subprocess in production, a scripted
/// player in tests.
pub trait Engine: Send {
    fn name(&self) -> &str;

    fn new_game(&mut self) -> Result<(), EngineError>;

    fn set_position(&mut self, fen: &str, moves: &[ChessMove]) -> Result<(), EngineError>;

    fn request_move(&mut self, time_limit: Duration) -> Result<ChessMove, EngineError>;

    /// Must be idempotent and tolerate an engine that is already gone.
    fn stop(&mut self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    EngineUnderTest,
    Reference,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::EngineUnderTest => f.write_str("engine"),
            Role::Reference => f.write_str("reference"),
        }
    }
}

/// Creates fresh engine handles. Shared by all workers, so it must be `Sync`;
/// the handles it returns are owned by exactly one worker.
pub trait EngineLauncher: Sync {
    type Engine: Engine;

    fn launch(&self, role: Role, worker: usize) -> Result<Self::Engine, EngineError>;
}

/// Owns an engine for as long as a worker holds it and stops it on every way
/// out, including unwinding.
pub struct EngineGuard<E: Engine> {
    engine: E,
}

impl<E: Engine> EngineGuard<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Swaps in a freshly launched engine and stops the old one.
    pub fn replace(&mut self, engine: E) {
        let mut old = std::mem::replace(&mut self.engine, engine);
        if let Err(e) = old.stop() {
            log::debug!("Stopping replaced engine {} failed: {}", old.name(), e);
        }
    }
}

impl<E: Engine> Deref for EngineGuard<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

impl<E: Engine> DerefMut for EngineGuard<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: Engine> Drop for EngineGuard<E> {
    fn drop(&mut self) {
        if let Err(e) = self.engine.stop() {
            log::warn!("Failed to stop {}: {}", self.engine.name(), e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    AwaitingReply,
    Terminated,
}

/// A UCI engine running as a child process.
pub struct EngineProcess {
    name: String,
    child: Child,
    connection: EngineConnection<ChildStdin>,
    position: Option<Position>,
    state: ProtocolState,
    handshake_timeout: Duration,
    timeout_margin: Duration,
}

impl EngineProcess {
    pub fn start(
        name: impl Into<String>,
        program: &Path,
        args: &[String],
        handshake_timeout: Duration,
        timeout_margin: Duration,
    ) -> Result<Self, EngineError> {
        let name = name.into();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        // Own process group, so a terminal Ctrl-C reaches only the benchmark
        // and engines live until their worker stops them.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: program.to_path_buf(),
                source,
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Crashed { engine: name });
            }
        };

        let connection = match EngineConnection::new(name.clone(), stdin, stdout) {
            Ok(connection) => connection,
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Io {
                    engine: name,
                    source,
                });
            }
        };

        let mut engine = Self {
            name,
            child,
            connection,
            position: None,
            state: ProtocolState::Idle,
            handshake_timeout,
            timeout_margin,
        };

        // On failure the engine is dropped here, which kills the child.
        engine.handshake(handshake_timeout)?;

        log::debug!("Engine {} ready (pid {})", engine.name, engine.child.id());
        Ok(engine)
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    fn handshake(&mut self, timeout: Duration) -> Result<(), EngineError> {
        self.send(&GuiCommand::Uci)?;
        self.wait_for(EngineReply::UciOk, timeout)?;
        self.sync(timeout)
    }

    fn sync(&mut self, timeout: Duration) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady)?;
        self.wait_for(EngineReply::ReadyOk, timeout)
    }

    fn send(&mut self, command: &GuiCommand) -> Result<(), EngineError> {
        if self.state == ProtocolState::Terminated {
            return Err(EngineError::Crashed {
                engine: self.name.clone(),
            });
        }

        self.connection
            .send(command)
            .map_err(|source| EngineError::Io {
                engine: self.name.clone(),
                source,
            })
    }

    fn wait_for(&mut self, expected: EngineReply, timeout: Duration) -> Result<(), EngineError> {
        let deadline = deadline_after(timeout);

        self.connection
            .wait_for(&expected, deadline)
            .map_err(|e| self.receive_failed(e, timeout))
    }

    /// Turns a failed receive into the matching error. A silent engine is
    /// killed so it can never block its worker again.
    fn receive_failed(&mut self, error: RecvTimeoutError, limit: Duration) -> EngineError {
        self.kill();

        match error {
            RecvTimeoutError::Timeout => EngineError::Timeout {
                engine: self.name.clone(),
                limit,
            },
            RecvTimeoutError::Disconnected => EngineError::Crashed {
                engine: self.name.clone(),
            },
        }
    }

    fn protocol_error(&mut self, reason: String) -> EngineError {
        self.state = ProtocolState::Idle;
        EngineError::Protocol {
            engine: self.name.clone(),
            reason,
        }
    }

    /// Checks a `bestmove` reply against the position the engine was given.
    fn parse_best_move(&self, text: &str) -> Result<ChessMove, String> {
        if text == NULL_MOVE || text == "(none)" {
            return Err(format!("engine returned no move ({})", text));
        }

        let mv = parse_move(text).ok_or_else(|| format!("unparseable move '{}'", text))?;

        match &self.position {
            Some(position) if position.is_legal(mv) => Ok(mv),
            Some(position) => Err(format!("illegal move {} in {}", text, position.fen())),
            None => Err("move reply without a position".to_string()),
        }
    }

    fn kill(&mut self) {
        if self.state == ProtocolState::Terminated {
            return;
        }
        self.reap();
        self.state = ProtocolState::Terminated;
    }

    /// Kills the child and collects its exit status so no zombie is left.
    fn reap(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Engine for EngineProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.position = None;
        self.send(&GuiCommand::UciNewGame)?;
        self.sync(self.handshake_timeout)
    }

    fn set_position(&mut self, fen: &str, moves: &[ChessMove]) -> Result<(), EngineError> {
        let position =
            Position::from_history(fen, moves).map_err(|source| EngineError::InvalidPosition {
                engine: self.name.clone(),
                source,
            })?;

        let fen = if position.starts_from_standard() {
            None
        } else {
            Some(position.start_fen().to_string())
        };

        self.send(&GuiCommand::Position {
            fen,
            moves: moves.iter().map(|mv| mv.to_string()).collect(),
        })?;

        self.position = Some(position);
        Ok(())
    }

    fn request_move(&mut self, time_limit: Duration) -> Result<ChessMove, EngineError> {
        if self.position.is_none() {
            return Err(self.protocol_error("move requested before a position was set".into()));
        }

        let millis = u64::try_from(time_limit.as_millis()).unwrap_or(u64::MAX);
        self.send(&GuiCommand::Go(GoParams::move_time(millis)))?;
        self.state = ProtocolState::AwaitingReply;

        let limit = time_limit.saturating_add(self.timeout_margin);
        let deadline = deadline_after(limit);

        loop {
            let reply = match self.connection.recv_until(deadline) {
                Ok(reply) => reply,
                Err(e) => return Err(self.receive_failed(e, limit)),
            };

            match reply {
                EngineReply::Info(_) => continue,
                EngineReply::BestMove { best_move, .. } => {
                    return match self.parse_best_move(&best_move) {
                        Ok(mv) => {
                            self.state = ProtocolState::Idle;
                            Ok(mv)
                        }
                        Err(reason) => Err(self.protocol_error(reason)),
                    };
                }
                other => {
                    return Err(self.protocol_error(format!(
                        "unexpected reply while searching: {:?}",
                        other
                    )))
                }
            }
        }
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        if self.state == ProtocolState::Terminated {
            return Ok(());
        }

        // A dead engine fails the write; that is fine, it is killed below.
        let _ = self.connection.send(&GuiCommand::Quit);

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => {
                    log::debug!("{} ignored quit, killing it", self.name);
                    self.reap();
                    break;
                }
                Err(source) => {
                    self.reap();
                    self.state = ProtocolState::Terminated;
                    return Err(EngineError::Io {
                        engine: self.name.clone(),
                        source,
                    });
                }
            }
        }

        self.state = ProtocolState::Terminated;
        Ok(())
    }
}

fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit).unwrap_or(now + MAX_WAIT)
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Starts engine subprocesses from executable paths.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    pub engine: EngineCommand,
    pub reference: Option<EngineCommand>,
    pub handshake_timeout: Duration,
    pub timeout_margin: Duration,
}

impl EngineLauncher for ProcessLauncher {
    type Engine = EngineProcess;

    fn launch(&self, role: Role, worker: usize) -> Result<EngineProcess, EngineError> {
        let command = match role {
            Role::EngineUnderTest => &self.engine,
            Role::Reference => self.reference.as_ref().unwrap_or(&self.engine),
        };

        EngineProcess::start(
            format!("{}-{}", role, worker),
            &command.program,
            &command.args,
            self.handshake_timeout,
            self.timeout_margin,
        )
    }
}
