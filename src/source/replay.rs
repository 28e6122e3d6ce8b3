//! Replay of recorded samples from a JSON-lines stream.
//!
//! Each line is one [`Sample`]. Lines are parsed on a background thread and
//! handed to the consumer through a bounded channel, the same shape a live
//! camera source would have.

use crate::source::types::Sample;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Channel capacity; at 15 Hz this is a little over a minute of frames.
const CHANNEL_CAPACITY: usize = 1_024;

/// Errors that can occur while replaying samples.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    Io(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Source is already running"),
            SourceError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Reads samples from a line-oriented reader.
pub struct ReplaySource {
    reader: Option<Box<dyn BufRead + Send>>,
    sender: Option<Sender<Sample>>,
    receiver: Receiver<Sample>,
    running: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
}

impl ReplaySource {
    /// Create a source over any buffered reader.
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            reader: Some(Box::new(reader)),
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            malformed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open a file, or stdin when `path` is `-`.
    pub fn open(path: &str) -> Result<Self, SourceError> {
        if path == "-" {
            let stdin = std::io::stdin();
            return Ok(Self::new(std::io::BufReader::new(stdin)));
        }
        let file = std::fs::File::open(path).map_err(|e| SourceError::Io(e.to_string()))?;
        Ok(Self::new(std::io::BufReader::new(file)))
    }

    /// Start the reader thread.
    ///
    /// A source replays its reader once; starting it a second time reports
    /// `AlreadyRunning`.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        let (Some(reader), Some(sender)) = (self.reader.take(), self.sender.take()) else {
            return Err(SourceError::AlreadyRunning);
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let malformed = self.malformed.clone();

        // Detached: a reader blocked on stdin must not hold up shutdown.
        thread::Builder::new()
            .name("sample-replay".to_string())
            .spawn(move || read_lines(reader, sender, running, malformed))
            .map_err(|e| SourceError::Io(e.to_string()))?;

        Ok(())
    }

    /// Ask the reader thread to stop after its current line.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is still producing samples.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for samples. It disconnects once the input is exhausted.
    pub fn receiver(&self) -> &Receiver<Sample> {
        &self.receiver
    }

    /// Try to receive a sample without blocking.
    pub fn try_recv(&self) -> Option<Sample> {
        self.receiver.try_recv().ok()
    }

    /// Number of input lines that could not be parsed.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

fn read_lines(
    reader: Box<dyn BufRead + Send>,
    sender: Sender<Sample>,
    running: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
) {
    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Stopping replay, read failed: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Sample>(trimmed) {
            Ok(sample) => {
                if sender.send(sample).is_err() {
                    break;
                }
            }
            Err(e) => {
                malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Skipping malformed sample on line {}: {}", index + 1, e);
            }
        }
    }
    running.store(false, Ordering::SeqCst);
}
