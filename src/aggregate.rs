use std::io::{self, Write};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::ser::PrettyFormatter;

use crate::data::{Table, WorkerResult};

/// Global sparse `path -> date -> count`, paths kept in first-merged order.
///
/// Keys are the UTF-8 text that ends up in the document, so byte strings that
/// render the same are merged rather than emitted as duplicate keys.
#[derive(Debug, Default)]
pub struct Aggregate {
    paths: Table<String>,
    counts: Vec<FxHashMap<String, u64>>,
    dates: FxHashSet<String>,
}

impl Aggregate {
    /// Adds every non-zero cell of `result`.
    pub fn merge(&mut self, result: &WorkerResult) {
        let dates = result
            .dates
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect::<Vec<_>>();

        for (path, row) in result.paths.iter().zip(result.counts.rows()) {
            // resolved on the first non-zero cell of the row
            let mut slot = None;
            for (date, &count) in dates.iter().zip(row) {
                if count == 0 {
                    continue;
                }

                let id = *slot.get_or_insert_with(|| {
                    let (id, new) = self.paths.intern(&*String::from_utf8_lossy(path));
                    if new {
                        self.counts.push(FxHashMap::default());
                    }
                    id
                });
                let counts = &mut self.counts[id];
                match counts.get_mut(date) {
                    Some(total) => *total += count as u64,
                    None => {
                        counts.insert(date.clone(), count as u64);
                    }
                }
                if !self.dates.contains(date) {
                    self.dates.insert(date.clone());
                }
            }
        }
    }

    pub fn count(&self, path: &str, date: &str) -> Option<u64> {
        let id = self.paths.find(path)?;
        self.counts[id].get(date).copied()
    }

    pub fn paths(&self) -> usize {
        self.counts.len()
    }

    pub fn dates(&self) -> usize {
        self.dates.len()
    }

    /// Orders every path's dates by the globally sorted date list.
    pub fn into_report(self) -> Report {
        let mut sorted = self.dates.into_iter().collect::<Box<_>>();
        glidesort::sort(&mut sorted);

        let entries = self
            .paths
            .into_keys()
            .into_iter()
            .zip(self.counts)
            .map(|(path, mut counts)| {
                let dated = sorted
                    .iter()
                    .filter_map(|date| counts.remove(date).map(|c| (date.clone(), c)))
                    .collect();
                (path, dated)
            })
            .collect();

        Report { entries }
    }
}

/// The output document: paths in merge order, dates ascending, no zero counts.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub entries: Vec<(String, Vec<(String, u64)>)>,
}

impl Report {
    /// Pretty JSON with a four-space indent and one trailing newline.
    pub fn write_json<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut ser =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

struct Dated<'a>(&'a [(String, u64)]);

impl Serialize for Dated<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (date, count) in self.0 {
            map.serialize_entry(date, count)?;
        }
        map.end()
    }
}

impl Serialize for Report {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, dated) in &self.entries {
            map.serialize_entry(path, &Dated(dated))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::Aggregate;
    use crate::worker::Tally;
    use crate::WorkerResult;

    fn result(records: &[(&str, &str)]) -> WorkerResult {
        let mut tally = Tally::default();
        for (path, date) in records {
            let line = format!("https://stitcher.io{path},{date}T08:00:00+02:00");
            tally.record_line(line.as_bytes());
        }
        tally.finish()
    }

    fn json(aggregate: Aggregate) -> String {
        let mut out = Vec::new();
        aggregate.into_report().write_json(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn counts_are_summed_across_workers() {
        let three = [("/a", "2024-01-01"); 3];
        let mut aggregate = Aggregate::default();
        aggregate.merge(&result(&three));
        aggregate.merge(&result(&three));
        assert_eq!(aggregate.count("/a", "2024-01-01"), Some(6));
        assert_eq!(aggregate.paths(), 1);
        assert_eq!(aggregate.dates(), 1);
    }

    #[test]
    fn dates_sort_globally_regardless_of_discovery() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(&result(&[("/a", "2024-01-02"), ("/b", "2024-01-03")]));
        aggregate.merge(&result(&[("/a", "2024-01-01"), ("/b", "2024-01-01")]));

        let report = aggregate.into_report();
        let dates = |i: usize| {
            report.entries[i]
                .1
                .iter()
                .map(|(d, _)| d.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(dates(0), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(dates(1), vec!["2024-01-01", "2024-01-03"]);
    }

    #[test]
    fn zero_cells_never_appear() {
        // "/b" has a zero cell for 2024-01-01 inside the worker matrix
        let mut aggregate = Aggregate::default();
        aggregate.merge(&result(&[("/a", "2024-01-01"), ("/b", "2024-01-02")]));
        assert_eq!(aggregate.count("/b", "2024-01-01"), None);

        let report = aggregate.into_report();
        assert_eq!(report.entries[1].1, vec![("2024-01-02".to_string(), 1)]);
    }

    #[test]
    fn paths_keep_first_merged_order() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(&result(&[("/z", "2024-01-01"), ("/m", "2024-01-01")]));
        aggregate.merge(&result(&[("/a", "2024-01-01"), ("/z", "2024-01-01")]));

        let paths = aggregate
            .into_report()
            .entries
            .into_iter()
            .map(|(p, _)| p)
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["/z", "/m", "/a"]);
    }

    #[test]
    fn single_record_document() {
        let mut aggregate = Aggregate::default();
        aggregate.merge(&result(&[("/foo/bar.html", "2024-03-02")]));
        assert_eq!(
            json(aggregate),
            "{\n    \"/foo/bar.html\": {\n        \"2024-03-02\": 1\n    }\n}\n"
        );
    }

    #[test]
    fn paths_that_render_alike_share_one_key() {
        let mut tally = Tally::default();
        for raw in [&b"/a\xff"[..], &b"/a\xfe"[..]] {
            let mut line = b"https://stitcher.io".to_vec();
            line.extend_from_slice(raw);
            line.extend_from_slice(b",2024-01-01T08:00:00+02:00");
            tally.record_line(&line);
        }
        let result = tally.finish();
        assert_eq!(result.paths.len(), 2);

        let mut aggregate = Aggregate::default();
        aggregate.merge(&result);
        assert_eq!(aggregate.paths(), 1);
        assert_eq!(aggregate.count("/a\u{fffd}", "2024-01-01"), Some(2));

        let text = json(aggregate);
        assert_eq!(text.matches("/a\u{fffd}").count(), 1, "{text}");
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["/a\u{fffd}"]["2024-01-01"], 2);
    }

    #[test]
    fn empty_document() {
        assert_eq!(json(Aggregate::default()), "{}\n");
    }
}
