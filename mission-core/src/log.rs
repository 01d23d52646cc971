//! Persistent mission event log.
//!
//! Every entry is one `H:MM:SS<TAB>message` line stamped with time since boot.
//! Persistence is best effort: a sink failure drops that entry and bumps a
//! counter, and the mission carries on. The most recent entries are also kept
//! in memory so tests and diagnostics can inspect what was written.

use core::fmt::{self, Write};

use heapless::{HistoryBuf, String};

use crate::clock::{Elapsed, MissionInstant};

/// Longest message kept per entry; longer messages are cut at a character
/// boundary.
pub const MAX_MESSAGE_LEN: usize = 96;
/// Entries retained in memory.
pub const HISTORY_CAPACITY: usize = 32;
pub const LOG_FILE_NAME: &str = "MISSION.LOG";

const MAX_LINE_LEN: usize = MAX_MESSAGE_LEN + 16;

pub type Message = String<MAX_MESSAGE_LEN>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SinkError {
    /// No storage medium present.
    Absent,
    /// The medium rejected the write.
    Write,
    /// The log could not be created or emptied.
    Truncate,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Absent => f.write_str("storage absent"),
            SinkError::Write => f.write_str("log write failed"),
            SinkError::Truncate => f.write_str("log truncate failed"),
        }
    }
}

/// Append-only destination for rendered log lines.
pub trait LogSink {
    /// Returns `true` when the storage medium is usable.
    fn is_present(&mut self) -> bool;

    /// Empties the log.
    fn truncate(&mut self) -> Result<(), SinkError>;

    /// Appends one rendered line, newline included, and makes it durable.
    fn append_line(&mut self, line: &str) -> Result<(), SinkError>;
}

/// One log entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogEntry {
    pub elapsed: Elapsed,
    pub message: Message,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.elapsed, self.message)
    }
}

/// Event log over a sink.
pub struct EventLog<S> {
    sink: S,
    history: HistoryBuf<LogEntry, HISTORY_CAPACITY>,
    dropped: u32,
    truncated: bool,
}

impl<S: LogSink> EventLog<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            history: HistoryBuf::new(),
            dropped: 0,
            truncated: false,
        }
    }

    /// Empties the persistent log. Only the first call per boot truncates.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Absent`] without storage, or the sink's truncate
    /// error.
    pub fn begin(&mut self) -> Result<(), SinkError> {
        if self.truncated {
            return Ok(());
        }
        if !self.sink.is_present() {
            return Err(SinkError::Absent);
        }
        self.sink.truncate()?;
        self.truncated = true;
        Ok(())
    }

    /// Appends `message` stamped with `at`.
    pub fn append(&mut self, at: MissionInstant, message: &str) {
        self.append_fmt(at, format_args!("{message}"));
    }

    /// Appends a formatted message stamped with `at`.
    pub fn append_fmt(&mut self, at: MissionInstant, args: fmt::Arguments<'_>) {
        let mut message = Message::new();
        // Truncation is reported as an error by the writer; the prefix is kept.
        let _ = Truncating(&mut message).write_fmt(args);
        let entry = LogEntry {
            elapsed: at.since_boot(),
            message,
        };

        let mut line = String::<MAX_LINE_LEN>::new();
        let persisted = writeln!(line, "{entry}").is_ok() && self.sink.append_line(&line).is_ok();
        if !persisted {
            self.dropped = self.dropped.saturating_add(1);
        }
        self.history.write(entry);
    }

    /// Entries that failed to persist.
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Most recent entries, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.history.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.history.recent()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Writer that keeps as much of the output as fits.
struct Truncating<'a>(&'a mut Message);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            self.0.push(ch).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}
