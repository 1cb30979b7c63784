//! Sample-log recording and replay.
//!
//! A sample log is a JSONL file with one record per line, interleaving the
//! two input streams in arrival order:
//!
//! ```text
//! {"type":"speed","t_us":1000,"speed":12.5}
//! {"type":"odometry","t_us":1020,"trans":[12.4,0.01,-0.02],"rot":[0.0,0.0,0.001],"trans_std":[0.05,0.05,0.05]}
//! ```
//!
//! The format is human-greppable on purpose; recordings double as fixtures
//! for offline calibration runs.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One line of a sample log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SampleRecord {
    /// Vehicle speed sample.
    Speed {
        /// Arrival timestamp, microseconds.
        t_us: u64,
        /// Vehicle speed, m/s.
        speed: f64,
    },
    /// Visual-odometry sample.
    Odometry {
        /// Arrival timestamp, microseconds.
        t_us: u64,
        /// Translation rate [x, y, z], m/s.
        trans: [f64; 3],
        /// Rotation rate [roll, pitch, yaw], rad/s.
        rot: [f64; 3],
        /// Translation rate standard deviation.
        trans_std: [f64; 3],
    },
}

impl SampleRecord {
    /// Arrival timestamp of the record, microseconds.
    pub fn timestamp_us(&self) -> u64 {
        match self {
            SampleRecord::Speed { t_us, .. } | SampleRecord::Odometry { t_us, .. } => *t_us,
        }
    }
}

/// Appends sample records to a JSONL log file.
pub struct SampleLogWriter {
    writer: BufWriter<File>,
    count: u64,
}

impl SampleLogWriter {
    /// Create a new log file, truncating any existing one.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            count: 0,
        })
    }

    /// Append one record.
    pub fn record(&mut self, record: &SampleRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.count += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads sample records back from a JSONL log file.
pub struct SampleLogReader {
    lines: Lines<BufReader<File>>,
}

impl SampleLogReader {
    /// Open a log file for replay.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines(),
        })
    }
}

impl Iterator for SampleLogReader {
    type Item = Result<SampleRecord>;

    /// Yield the next record. Blank lines are skipped; a malformed line
    /// yields an error and replay can continue past it.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    return Some(serde_json::from_str(&line).map_err(Into::into));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
