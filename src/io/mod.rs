//! I/O infrastructure: sample-log recording and replay.

pub mod log;

pub use log::{SampleLogReader, SampleLogWriter, SampleRecord};
