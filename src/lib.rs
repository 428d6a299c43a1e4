//! Per-path, per-day hit counts for fixed-layout access logs.
//!
//! The file is cut into line-aligned ranges, every range is tallied by its own
//! worker, results travel back as binary frames and are merged into one report.

pub mod aggregate;
pub mod cli;
pub mod codec;
pub mod data;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod splitter;
pub mod worker;

pub use aggregate::{Aggregate, Report};
pub use data::{CountMatrix, Date, WorkerResult};
pub use error::{Error, FrameError};
pub use orchestrator::{run, Summary};
