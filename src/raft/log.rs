use super::RaftError;

/// A replicated command placeholder. Nothing in the election core produces
/// entries yet; the log only contributes its last index and term to RPCs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub term: u64,
    pub index: u64,
    pub command: String,
}

/// In-memory, append-only log with a fixed capacity.
///
/// Indices are zero-based, so an empty log reports a last index of `-1`.
#[derive(Debug)]
pub struct Log {
    entries: Vec<LogEntry>,
    capacity: usize,
    max_command_len: usize,
}

impl Log {
    pub fn new(capacity: usize, max_command_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            max_command_len,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_index(&self) -> i64 {
        self.entries.len() as i64 - 1
    }

    pub fn last_term(&self) -> u64 {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    /// Appends a command under `term` and returns its index.
    pub fn append(&mut self, term: u64, command: &str) -> Result<u64, RaftError> {
        if self.entries.len() >= self.capacity {
            return Err(RaftError::LogFull {
                capacity: self.capacity,
            });
        }
        if command.len() > self.max_command_len {
            return Err(RaftError::CommandTooLong {
                len: command.len(),
                max: self.max_command_len,
            });
        }

        let index = self.entries.len() as u64;
        self.entries.push(LogEntry {
            term,
            index,
            command: command.to_string(),
        });

        Ok(index)
    }
}
