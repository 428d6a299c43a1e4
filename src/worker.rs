use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    ops::Range,
    path::Path,
};

use memchr::memchr_iter;

use crate::{
    data::{CountMatrix, Date, Table, WorkerResult},
    layout::{BUFFER_SIZE, DATE_LEN, MIN_LINE_LEN, MIN_SUFFIX_LEN, PREFIX_LEN, TIMESTAMP_LEN},
};

/// Counts every record in `range` of the file at `path`.
///
/// `range.start` must be 0 or sit right after a newline.
pub fn process_range(path: &Path, range: Range<u64>) -> io::Result<WorkerResult> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(range.start))?;

    let expected = range.end.saturating_sub(range.start);
    let mut tally = Tally::default();
    let read = tally.scan(file.take(expected), BUFFER_SIZE)?;
    if read != expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {range:?} ended after {read} of {expected} bytes"),
        ));
    }

    Ok(tally.finish())
}

/// Per-worker path/date tables and the matrix they index.
#[derive(Debug, Default)]
pub struct Tally {
    paths: Table<Vec<u8>>,
    dates: Table<Date>,
    counts: CountMatrix,
}

impl Tally {
    /// Reads `reader` to the end through a `buffer_size` buffer, recording every
    /// line. A final line without a newline is recorded too. Returns the number
    /// of bytes read.
    pub fn scan<R: Read>(&mut self, mut reader: R, buffer_size: usize) -> io::Result<u64> {
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut pending = 0;
        let mut total = 0u64;

        loop {
            // a single line longer than the buffer
            if pending == buf.len() {
                buf.resize(buf.len() * 2, 0);
            }

            let read = match reader.read(&mut buf[pending..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            total += read as u64;

            let filled = pending + read;
            let mut line_start = 0;
            for nl in memchr_iter(b'\n', &buf[pending..filled]) {
                let nl = pending + nl;
                self.record_line(&buf[line_start..nl]);
                line_start = nl + 1;
            }

            buf.copy_within(line_start..filled, 0);
            pending = filled - line_start;
        }

        if pending > 0 {
            self.record_line(&buf[..pending]);
        }

        Ok(total)
    }

    /// Counts one line, without its newline. Lines too short to hold a record
    /// are ignored.
    pub fn record_line(&mut self, line: &[u8]) {
        let len = line.len();
        if len <= MIN_LINE_LEN {
            return;
        }

        let path = &line[PREFIX_LEN..len - MIN_SUFFIX_LEN];
        let date_start = len - TIMESTAMP_LEN;
        let mut date: Date = [0; DATE_LEN];
        date.copy_from_slice(&line[date_start..date_start + DATE_LEN]);

        let (path_id, new_path) = self.paths.intern(path);
        if new_path {
            self.counts.push_row();
        }
        let (date_id, new_date) = self.dates.intern(&date);
        if new_date {
            self.counts.push_column();
        }

        self.counts.increment(path_id, date_id);
    }

    pub fn finish(self) -> WorkerResult {
        WorkerResult {
            paths: self.paths.into_keys(),
            dates: self.dates.into_keys(),
            counts: self.counts,
        }
    }
}
