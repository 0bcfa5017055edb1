// src/crawl/sink.rs
// =============================================================================
// Output and error writers.
//
// The caller gives us two plain std::io::Write values (stdout and stderr in
// the CLI, buffers in tests). We can't assume they are safe to use from many
// workers at once, so each one is owned by exactly one blocking thread that
// drains a channel and writes one line per message.
//
// A broken output must never stop the crawl: write failures of the result
// writer go to the error sink, failures of the error sink only go to tracing.
//
// Also here:
// - SharedBuffer: a Write that several owners can read back afterwards
// - Tee: writes everything to two writers
// =============================================================================

use super::Upgrade;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

// Starts the thread that owns the result writer
//
// Each upgrade becomes one line: `<page> <insecure link>`.
// Returns how many lines were written successfully.
pub fn spawn_result_writer<W>(
    mut out: W,
    mut results: mpsc::UnboundedReceiver<Upgrade>,
    errors: mpsc::UnboundedSender<String>,
) -> JoinHandle<usize>
where
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut written = 0;
        while let Some(upgrade) = results.blocking_recv() {
            match writeln!(out, "{}", upgrade) {
                Ok(()) => written += 1,
                Err(e) => {
                    let _ = errors.send(format!("failed to write output '{}': {}", upgrade, e));
                }
            }
        }
        if let Err(e) = out.flush() {
            let _ = errors.send(format!("failed to flush output: {}", e));
        }
        written
    })
}

// Starts the thread that owns the error writer
//
// Returns how many lines were written successfully.
pub fn spawn_error_writer<W>(mut log: W, mut lines: mpsc::UnboundedReceiver<String>) -> JoinHandle<usize>
where
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut written = 0;
        while let Some(line) = lines.blocking_recv() {
            match writeln!(log, "{}", line) {
                Ok(()) => written += 1,
                Err(e) => warn!(error = %e, line = %line, "failed to write to error log"),
            }
        }
        if let Err(e) = log.flush() {
            warn!(error = %e, "failed to flush error log");
        }
        written
    })
}

// An in-memory writer that can be cloned and read back later
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Writes everything to both `a` and `b`
#[derive(Debug)]
pub struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.a.write_all(buf)?;
        self.b.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}
