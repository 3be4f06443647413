//! Sharded concurrent map from spatial cell to histogram record.
//!
//! Shard locks are held only long enough to clone a cell handle. The cell's
//! own lock is then taken shared for reads and exclusive for updates, so
//! threads working on different cells never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::table::DirectionalTable;

const SHARD_COUNT: usize = 64;

/// Histogram and visit counters of one spatial cell.
#[derive(Debug, Clone)]
pub struct CellRecord<T> {
    pub table: T,
    /// One counter per bin, row-major like the table
    pub visits: Vec<u32>,
}

impl<T: DirectionalTable> CellRecord<T> {
    pub fn new(table: T) -> Self {
        let bins = table.rows() * table.cols();
        Self {
            table,
            visits: vec![0; bins],
        }
    }
}

pub type CellHandle<T> = Arc<RwLock<CellRecord<T>>>;

type Shard<T> = RwLock<HashMap<u32, CellHandle<T>>>;

#[derive(Debug)]
pub struct CellStore<T> {
    shards: Box<[Shard<T>]>,
}

impl<T> Default for CellStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CellStore<T> {
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    #[inline]
    fn shard(&self, cell: u32) -> &Shard<T> {
        &self.shards[cell as usize & (SHARD_COUNT - 1)]
    }

    pub fn get(&self, cell: u32) -> Option<CellHandle<T>> {
        self.shard(cell).read().get(&cell).cloned()
    }

    /// Handle of `cell`, creating the record with `make` if it is missing.
    pub fn get_or_create(&self, cell: u32, make: impl FnOnce() -> CellRecord<T>) -> CellHandle<T> {
        if let Some(handle) = self.get(cell) {
            return handle;
        }
        // Another thread may have inserted it between the two locks
        self.shard(cell)
            .write()
            .entry(cell)
            .or_insert_with(|| Arc::new(RwLock::new(make())))
            .clone()
    }

    /// Insert or replace a record.
    pub fn insert(&self, cell: u32, record: CellRecord<T>) {
        self.shard(cell)
            .write()
            .insert(cell, Arc::new(RwLock::new(record)));
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All cells in ascending index order.
    pub fn sorted_cells(&self) -> Vec<(u32, CellHandle<T>)> {
        let mut cells: Vec<(u32, CellHandle<T>)> = self
            .shards
            .iter()
            .flat_map(|s| {
                s.read()
                    .iter()
                    .map(|(&k, v)| (k, Arc::clone(v)))
                    .collect::<Vec<_>>()
            })
            .collect();
        cells.sort_unstable_by_key(|(k, _)| *k);
        cells
    }
}
