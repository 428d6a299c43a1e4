use std::{fs::File, ops::Range, path::Path};

use memchr::memchr;
use memmap2::Mmap;

use crate::error::{Error, Result};

/// Splits `path` into `workers` contiguous ranges that never cut a line.
pub fn split_file(path: &Path, workers: usize) -> Result<Vec<Range<u64>>> {
    let split_err = |source| Error::Split {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(split_err)?;
    if file.metadata().map_err(split_err)?.len() == 0 {
        return Ok(line_aligned_ranges(&[], workers));
    }

    // SAFETY: the map is read-only and dropped before any worker starts; the
    // input is not expected to change during a run.
    let mmap = unsafe { Mmap::map(&file) }.map_err(split_err)?;
    Ok(line_aligned_ranges(&mmap, workers))
}

/// Cuts `data` at `len * i / workers` for `i` in `1..workers`, pushing every
/// cut forward to just past the next newline (or to the end if there is none).
pub fn line_aligned_ranges(data: &[u8], workers: usize) -> Vec<Range<u64>> {
    let len = data.len();
    let workers = workers.max(1);

    let mut bounds = Vec::with_capacity(workers + 1);
    bounds.push(0);
    for i in 1..workers {
        let candidate = (len as u128 * i as u128 / workers as u128) as usize;
        let next = memchr(b'\n', &data[candidate..]).map_or(len, |n| candidate + n + 1);
        bounds.push(next);
    }
    bounds.push(len);

    bounds
        .windows(2)
        .map(|w| w[0] as u64..w[1] as u64)
        .collect()
}
