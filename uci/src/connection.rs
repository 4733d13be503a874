use super::commands::{EngineReply, GuiCommand};
use super::decoder::Decoder;
use super::encoder::Encoder;
use log::debug;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Controlling end of a UCI conversation.
///
/// Commands are written synchronously. Replies are read on a background
/// thread, decoded, and handed over through a channel so callers can wait
/// with a deadline instead of blocking on the pipe.
pub struct EngineConnection<W: Write> {
    label: String,
    writer: BufWriter<W>,
    replies: Receiver<EngineReply>,
    encoder: Encoder,
}

impl<W: Write> EngineConnection<W> {
    pub fn new<R>(label: impl Into<String>, writer: W, reader: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let label = label.into();
        let (reply_tx, replies) = channel();

        Self::spawn_input_handler(&label, reader, reply_tx)?;

        Ok(Self {
            label,
            writer: BufWriter::new(writer),
            replies,
            encoder: Encoder {},
        })
    }

    pub fn send(&mut self, command: &GuiCommand) -> io::Result<()> {
        let out_line = self.encoder.encode(command);
        debug!("[{}] > {}", self.label, out_line);

        self.writer.write_all(out_line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Waits for the next reply. `Disconnected` means the engine closed its
    /// output, which in practice means the process is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineReply, RecvTimeoutError> {
        self.replies.recv_timeout(timeout)
    }

    pub fn recv_until(&self, deadline: Instant) -> Result<EngineReply, RecvTimeoutError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.recv_timeout(remaining)
    }

    /// Drops replies until one matches `expected` or the deadline passes.
    pub fn wait_for(
        &self,
        expected: &EngineReply,
        deadline: Instant,
    ) -> Result<(), RecvTimeoutError> {
        loop {
            let reply = self.recv_until(deadline)?;
            if &reply == expected {
                return Ok(());
            }
        }
    }

    fn spawn_input_handler<R>(label: &str, reader: R, reply_tx: Sender<EngineReply>) -> io::Result<()>
    where
        R: Read + Send + 'static,
    {
        let label = label.to_string();

        thread::Builder::new()
            .name(format!("{}-reader", label))
            .spawn(move || {
                let decoder = Decoder::new();
                let reader = BufReader::new(reader);

                for in_line in reader.lines().map_while(Result::ok) {
                    let in_line = in_line.trim();
                    if in_line.is_empty() {
                        continue;
                    }
                    debug!("[{}] < {}", label, in_line);

                    if reply_tx.send(decoder.decode(in_line)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_send_writes_encoded_lines() {
        let buffer = SharedBuffer::default();
        let mut connection =
            EngineConnection::new("test", buffer.clone(), Cursor::new(Vec::new())).unwrap();

        connection.send(&GuiCommand::Uci).unwrap();
        connection.send(&GuiCommand::IsReady).unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "uci\nisready\n");
    }

    #[test]
    fn test_replies_are_decoded_in_order() {
        let input = "id name Fake\n\nuciok\nbestmove e2e4\n";
        let connection =
            EngineConnection::new("test", io::sink(), Cursor::new(input.as_bytes().to_vec()))
                .unwrap();

        assert_eq!(
            connection.recv_timeout(TIMEOUT).unwrap(),
            EngineReply::Id("name Fake".to_string())
        );
        assert_eq!(connection.recv_timeout(TIMEOUT).unwrap(), EngineReply::UciOk);
        assert!(matches!(
            connection.recv_timeout(TIMEOUT).unwrap(),
            EngineReply::BestMove { .. }
        ));
    }

    #[test]
    fn test_eof_disconnects() {
        let connection =
            EngineConnection::new("test", io::sink(), Cursor::new(b"readyok\n".to_vec()))
                .unwrap();

        assert_eq!(connection.recv_timeout(TIMEOUT).unwrap(), EngineReply::ReadyOk);
        assert_eq!(
            connection.recv_timeout(TIMEOUT),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_wait_for_skips_other_replies() {
        let input = "id name Fake\noption name Hash type spin\nuciok\n";
        let connection =
            EngineConnection::new("test", io::sink(), Cursor::new(input.as_bytes().to_vec()))
                .unwrap();

        let deadline = Instant::now() + TIMEOUT;
        assert!(connection.wait_for(&EngineReply::UciOk, deadline).is_ok());
        assert_eq!(
            connection.wait_for(&EngineReply::ReadyOk, deadline),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
