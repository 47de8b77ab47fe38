use crate::format::ConsoleStream;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Synchronous destination for rendered log output.
///
/// Called on the emitting thread with an already rendered line (which may
/// span several lines in pretty mode). Implementations must not panic and
/// have no way to report failure: losing console output never fails a
/// request.
pub trait EventWriter: Send + Sync {
    fn write_line(&self, stream: ConsoleStream, line: &str);
}

/// Writes `Out` to stdout and `Warn`/`Error` to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleWriter;

impl EventWriter for ConsoleWriter {
    fn write_line(&self, stream: ConsoleStream, line: &str) {
        let _ = match stream {
            ConsoleStream::Out => writeln!(std::io::stdout().lock(), "{}", line),
            ConsoleStream::Warn | ConsoleStream::Error => {
                writeln!(std::io::stderr().lock(), "{}", line)
            }
        };
    }
}

/// Keeps every written line in memory. Cloning shares the buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryWriter {
    lines: Arc<Mutex<Vec<(ConsoleStream, String)>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ConsoleStream, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventWriter for MemoryWriter {
    fn write_line(&self, stream: ConsoleStream, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((stream, line.to_string()));
    }
}

/// Drops all output.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardWriter;

impl EventWriter for DiscardWriter {
    fn write_line(&self, _stream: ConsoleStream, _line: &str) {}
}
