//! # Determinism Log
//!
//! One line per completed node, in declaration order:
//!
//! ```text
//! <contentHash>\t<file:line:column>\t<gridName>\t<callingMethod>
//! ```
//!
//! The hash is 16 lowercase hex digits. Diffing the logs of two same-seed
//! runs pinpoints the first node whose output diverged.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::panic::Location;
use std::path::Path;

/// One completed node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashRecord {
    /// Content hash of the node's output.
    pub hash: u64,
    /// Declaration site.
    pub location: &'static Location<'static>,
    /// Output grid name.
    pub grid: String,
    /// Calling method.
    pub method: String,
}

impl HashRecord {
    /// Formats the record as a log line (without newline).
    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "{:016x}\t{}:{}:{}\t{}\t{}",
            self.hash,
            self.location.file(),
            self.location.line(),
            self.location.column(),
            self.grid,
            self.method
        )
    }
}

/// Hash records keyed by global node sequence number.
#[derive(Debug, Default)]
pub struct DeterminismLog {
    records: BTreeMap<usize, HashRecord>,
}

impl DeterminismLog {
    /// Records a completed node.
    pub fn record(&mut self, sequence: usize, record: HashRecord) {
        self.records.insert(sequence, record);
    }

    /// Number of recorded nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lines in declaration order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.records.values().map(HashRecord::line).collect()
    }

    /// Writes every line to `writer`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        for record in self.records.values() {
            writeln!(writer, "{}", record.line())?;
        }
        writer.flush()
    }

    /// Writes the log to a file, replacing it.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors.
    pub fn write_file(&self, path: &Path) -> io::Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}
