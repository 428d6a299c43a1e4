use std::{
    borrow::Borrow,
    hash::{Hash, Hasher},
};

use hashbrown::HashTable;
use rustc_hash::FxHasher;

use crate::layout::DATE_LEN;

/// `YYYY-MM-DD`, raw bytes as they appear in the timestamp.
pub type Date = [u8; DATE_LEN];

fn fx_hash<Q: Hash + ?Sized>(key: &Q) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Bijection between keys and dense ids, assigned in first-seen order.
///
/// Each key is stored once, in `keys`; the hash table only holds ids.
#[derive(Debug, Clone)]
pub struct Table<K> {
    ids: HashTable<usize>,
    keys: Vec<K>,
}

impl<K> Default for Table<K> {
    fn default() -> Self {
        Self {
            ids: HashTable::new(),
            keys: Vec::new(),
        }
    }
}

impl<K> Table<K> {
    /// Id of `key`, if it has been interned.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let keys = &self.keys;
        self.ids
            .find(fx_hash(key), |&id| <K as Borrow<Q>>::borrow(&keys[id]) == key)
            .copied()
    }

    /// Returns the id of `key`, and whether it was assigned by this call.
    pub fn intern<Q>(&mut self, key: &Q) -> (usize, bool)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(id) = self.find(key) {
            return (id, false);
        }

        let id = self.keys.len();
        self.keys.push(key.to_owned());
        let keys = &self.keys;
        self.ids.insert_unique(fx_hash(key), id, |&id| {
            fx_hash(<K as Borrow<Q>>::borrow(&keys[id]))
        });
        (id, true)
    }

    pub fn into_keys(self) -> Vec<K> {
        self.keys
    }
}

/// Dense `(path id, date id) -> count` grid. Every row is exactly `width` long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMatrix {
    rows: Vec<Vec<u32>>,
    width: usize,
}

impl CountMatrix {
    /// Rebuilds a matrix from rows that all have length `width`.
    pub(crate) fn from_rows(rows: Vec<Vec<u32>>, width: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == width));
        Self { rows, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Appends a zero row for a newly seen path.
    pub fn push_row(&mut self) {
        self.rows.push(vec![0; self.width]);
    }

    /// Appends a zero column for a newly seen date.
    pub fn push_column(&mut self) {
        self.width += 1;
        for row in &mut self.rows {
            row.push(0);
        }
    }

    pub fn increment(&mut self, path_id: usize, date_id: usize) {
        let cell = &mut self.rows[path_id][date_id];
        *cell = cell.saturating_add(1);
    }

    pub fn get(&self, path_id: usize, date_id: usize) -> Option<u32> {
        self.rows.get(path_id)?.get(date_id).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Everything one worker learned about its range. Ids are vector positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerResult {
    pub paths: Vec<Vec<u8>>,
    pub dates: Vec<Date>,
    pub counts: CountMatrix,
}

impl WorkerResult {
    /// Number of records counted.
    pub fn records(&self) -> u64 {
        self.counts
            .rows()
            .flat_map(|row| row.iter())
            .map(|&c| c as u64)
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::{CountMatrix, Table};

    #[test]
    fn table_assigns_ids_in_first_seen_order() {
        let mut table = Table::<Vec<u8>>::default();
        assert_eq!(table.intern(b"/b".as_slice()), (0, true));
        assert_eq!(table.intern(b"/a".as_slice()), (1, true));
        assert_eq!(table.intern(b"/b".as_slice()), (0, false));
        assert_eq!(table.find(b"/a".as_slice()), Some(1));
        assert_eq!(table.find(b"/c".as_slice()), None);
        assert_eq!(table.into_keys(), vec![b"/b".to_vec(), b"/a".to_vec()]);
    }

    #[test]
    fn table_survives_growth() {
        let mut table = Table::<String>::default();
        for i in 0..10_000 {
            assert_eq!(table.intern(format!("/p/{i}").as_str()), (i, true));
        }
        for i in (0..10_000).rev() {
            assert_eq!(table.intern(format!("/p/{i}").as_str()), (i, false));
        }
        assert_eq!(table.into_keys().len(), 10_000);
    }

    #[test]
    fn matrix_rows_track_width() {
        let mut m = CountMatrix::default();
        m.push_row();
        assert_eq!(m.rows().next(), Some(&[][..]));

        m.push_column();
        m.push_column();
        m.push_row();
        m.increment(1, 1);
        m.increment(1, 1);
        m.increment(0, 0);
        m.push_column();

        assert_eq!(m.rows().count(), 2);
        assert_eq!(m.width(), 3);
        for row in m.rows() {
            assert_eq!(row.len(), 3, "every row must be as wide as the date table");
        }
        assert_eq!(m.get(0, 0), Some(1));
        assert_eq!(m.get(1, 1), Some(2));
        assert_eq!(m.get(1, 2), Some(0));
        assert_eq!(m.get(2, 0), None);
    }
}
