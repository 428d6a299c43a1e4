//! Binary frame carrying one [`WorkerResult`] across a worker boundary.
//!
//! All integers are little-endian `u32`:
//!
//! ```text
//! path_count, date_count
//! path_count x { len, len bytes }     path table, id order
//! date_count x { 10 bytes }           date table, id order
//! path_count x { date_count x count } matrix, row-major
//! ```

use crate::{
    data::{CountMatrix, Date, WorkerResult},
    error::FrameError,
    layout::DATE_LEN,
};

// ---- Binary helpers ----

#[inline]
fn ensure_len(data: &[u8], pos: usize, need: usize) -> Result<(), FrameError> {
    match pos.checked_add(need) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(FrameError::Truncated {
            need,
            offset: pos,
            have: data.len(),
        }),
    }
}

#[inline]
fn read_bytes<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], FrameError> {
    ensure_len(data, *pos, len)?;
    let v = &data[*pos..*pos + len];
    *pos += len;
    Ok(v)
}

#[inline]
fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, FrameError> {
    let mut le = [0u8; 4];
    le.copy_from_slice(read_bytes(data, pos, 4)?);
    Ok(u32::from_le_bytes(le))
}

#[inline]
fn to_u32(n: usize, what: &'static str) -> Result<u32, FrameError> {
    u32::try_from(n).map_err(|_| FrameError::TooLarge { what })
}

pub fn encode(result: &WorkerResult) -> Result<Vec<u8>, FrameError> {
    let paths = result.paths.len();
    let dates = result.dates.len();

    let path_bytes: usize = result.paths.iter().map(|p| 4 + p.len()).sum();
    let matrix_bytes = paths.saturating_mul(dates).saturating_mul(4);
    let mut out = Vec::with_capacity(8 + path_bytes + dates * DATE_LEN + matrix_bytes);

    out.extend_from_slice(&to_u32(paths, "path count")?.to_le_bytes());
    out.extend_from_slice(&to_u32(dates, "date count")?.to_le_bytes());
    for path in &result.paths {
        out.extend_from_slice(&to_u32(path.len(), "path length")?.to_le_bytes());
        out.extend_from_slice(path);
    }
    for date in &result.dates {
        out.extend_from_slice(date);
    }
    for row in result.counts.rows() {
        for count in row {
            out.extend_from_slice(&count.to_le_bytes());
        }
    }

    Ok(out)
}

pub fn decode(frame: &[u8]) -> Result<WorkerResult, FrameError> {
    let mut pos = 0;
    let path_count = read_u32(frame, &mut pos)? as usize;
    let date_count = read_u32(frame, &mut pos)? as usize;

    // Sizes below are bounded by the frame before anything is allocated.
    ensure_len(frame, pos, path_count.saturating_mul(4))?;
    let mut paths = Vec::with_capacity(path_count);
    for _ in 0..path_count {
        let len = read_u32(frame, &mut pos)? as usize;
        paths.push(read_bytes(frame, &mut pos, len)?.to_vec());
    }

    ensure_len(frame, pos, date_count.saturating_mul(DATE_LEN))?;
    let mut dates = Vec::with_capacity(date_count);
    for _ in 0..date_count {
        let mut date: Date = [0; DATE_LEN];
        date.copy_from_slice(read_bytes(frame, &mut pos, DATE_LEN)?);
        dates.push(date);
    }

    let row_bytes = date_count.saturating_mul(4);
    ensure_len(frame, pos, path_count.saturating_mul(row_bytes))?;
    let mut rows = Vec::with_capacity(path_count);
    for _ in 0..path_count {
        let row = read_bytes(frame, &mut pos, row_bytes)?
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect::<Vec<_>>();
        rows.push(row);
    }

    if pos != frame.len() {
        return Err(FrameError::TrailingBytes {
            extra: frame.len() - pos,
        });
    }

    Ok(WorkerResult {
        paths,
        dates,
        counts: CountMatrix::from_rows(rows, date_count),
    })
}
