//! Fixed record layout and run constants.
//!
//! A record line is `PREFIX_LEN` discarded bytes, the path, then a suffix of
//! `MIN_SUFFIX_LEN` bytes whose last `TIMESTAMP_LEN` bytes are the timestamp.

pub const WORKERS: usize = 6;
pub const BUFFER_SIZE: usize = 8 * 1024 * 1024;

pub const PREFIX_LEN: usize = 19;
pub const DATE_LEN: usize = 10;
pub const TIMESTAMP_LEN: usize = 25;
pub const MIN_SUFFIX_LEN: usize = 26;

/// Lines this short or shorter carry no record.
pub const MIN_LINE_LEN: usize = PREFIX_LEN + MIN_SUFFIX_LEN;
