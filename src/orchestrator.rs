use std::{
    io::{self, BufWriter},
    ops::Range,
    path::Path,
    sync::mpsc::{self, Receiver},
    thread::{self, ScopedJoinHandle},
    time::Instant,
};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::{
    aggregate::{Aggregate, Report},
    codec,
    error::{Error, Result},
    splitter, worker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub paths: usize,
    pub dates: usize,
    pub records: u64,
}

/// Counts `input` with `workers` ranges and writes the JSON report to `output`.
/// Nothing is written unless every range succeeded.
pub fn run(input: &Path, output: &Path, workers: usize) -> Result<Summary> {
    run_with(input, output, workers, count_and_encode)
}

fn run_with<F>(input: &Path, output: &Path, workers: usize, body: F) -> Result<Summary>
where
    F: Fn(&Path, usize, Range<u64>) -> Result<Vec<u8>> + Sync,
{
    let started = Instant::now();
    let (aggregate, records) = aggregate_with(input, workers, body)?;

    let summary = Summary {
        paths: aggregate.paths(),
        dates: aggregate.dates(),
        records,
    };
    write_report(&aggregate.into_report(), output).map_err(|source| Error::Output {
        path: output.to_path_buf(),
        source,
    })?;

    info!(
        "wrote {} paths over {} dates ({} records) to {} in {:.3}s",
        summary.paths,
        summary.dates,
        summary.records,
        output.display(),
        started.elapsed().as_secs_f32()
    );
    Ok(summary)
}

/// Writes to a temporary file next to `output` and renames it into place, so
/// `output` is either untouched or complete.
fn write_report(report: &Report, output: &Path) -> io::Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    report.write_json(BufWriter::with_capacity(2 * 1024 * 1024, tmp.as_file_mut()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}

struct Child<'scope> {
    range: usize,
    frames: Receiver<Vec<u8>>,
    handle: ScopedJoinHandle<'scope, Result<()>>,
}

/// Runs ranges `1..` on scoped threads and range 0 inline, then merges every
/// result in range order. Returns the merged counts and the record total.
pub fn aggregate(input: &Path, workers: usize) -> Result<(Aggregate, u64)> {
    aggregate_with(input, workers, count_and_encode)
}

/// `body` produces the frame for one child range.
fn aggregate_with<F>(input: &Path, workers: usize, body: F) -> Result<(Aggregate, u64)>
where
    F: Fn(&Path, usize, Range<u64>) -> Result<Vec<u8>> + Sync,
{
    let ranges = splitter::split_file(input, workers)?;
    info!(
        "counting {} with {} workers",
        input.display(),
        ranges.len()
    );
    debug!("ranges: {ranges:?}");

    thread::scope(|s| {
        let body = &body;
        let children = ranges
            .iter()
            .enumerate()
            .skip(1)
            .map(|(range, bytes)| {
                let (tx, frames) = mpsc::channel();
                let bytes = bytes.clone();
                let handle = s.spawn(move || -> Result<()> {
                    let frame = body(input, range, bytes)?;
                    // the receiver is only gone if the run is already failing
                    let _ = tx.send(frame);
                    Ok(())
                });
                Child {
                    range,
                    frames,
                    handle,
                }
            })
            .collect::<Vec<_>>();

        let mut aggregate = Aggregate::default();
        let mut records = 0;
        let mut failure = None;

        match worker::process_range(input, ranges[0].clone()) {
            Ok(result) => {
                records += result.records();
                aggregate.merge(&result);
            }
            Err(source) => failure = Some(Error::WorkerRead { range: 0, source }),
        }

        // every child is drained and joined, even after a failure
        for child in children {
            let frame = drain(&child.frames);
            let status = child.handle.join();
            if failure.is_some() {
                continue;
            }

            let outcome = match status {
                Ok(Ok(())) => codec::decode(&frame).map_err(|source| Error::Decode {
                    range: child.range,
                    source,
                }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(Error::WorkerAbnormalExit { range: child.range }),
            };
            match outcome {
                Ok(result) => {
                    records += result.records();
                    aggregate.merge(&result);
                }
                Err(e) => failure = Some(e),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok((aggregate, records)),
        }
    })
}

fn count_and_encode(input: &Path, range: usize, bytes: Range<u64>) -> Result<Vec<u8>> {
    let started = Instant::now();
    let result =
        worker::process_range(input, bytes).map_err(|source| Error::WorkerRead { range, source })?;
    let frame = codec::encode(&result).map_err(|source| Error::Encode { range, source })?;
    debug!(
        "range {range}: {} records, {} paths, {} dates, {} byte frame in {:.3}s",
        result.records(),
        result.paths.len(),
        result.dates.len(),
        frame.len(),
        started.elapsed().as_secs_f32()
    );
    Ok(frame)
}

/// Reads the channel until the sender hangs up.
fn drain(frames: &Receiver<Vec<u8>>) -> Vec<u8> {
    let mut frame = Vec::new();
    for chunk in frames.iter() {
        if frame.is_empty() {
            frame = chunk;
        } else {
            frame.extend_from_slice(&chunk);
        }
    }
    frame
}
