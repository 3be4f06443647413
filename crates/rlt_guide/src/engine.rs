//! State shared by both guider variants: configuration, spatial grid, cell
//! storage, lifecycle and persistence.

use rlt_math::{Aabb, Vec3};

use crate::config::GuiderConfig;
use crate::error::GuideResult;
use crate::grid::SpatialGrid;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::persist::{self, TableRecord};
use crate::storage::{CellHandle, CellRecord, CellStore};
use crate::table::DirectionalTable;

#[derive(Debug)]
pub(crate) struct GuiderState<T> {
    pub config: GuiderConfig,
    pub grid: SpatialGrid,
    pub store: CellStore<T>,
    pub lifecycle: Lifecycle,
    rows: usize,
    cols: usize,
}

impl<T: DirectionalTable> GuiderState<T> {
    pub fn new(config: GuiderConfig, rows: usize, cols: usize) -> GuideResult<Self> {
        config.validate()?;
        // Replaced in `init`
        let grid = SpatialGrid::new(Aabb::new(Vec3::ZERO, Vec3::ONE), config.scene_resolution);
        Ok(Self {
            config,
            grid,
            store: CellStore::new(),
            lifecycle: Lifecycle::default(),
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Fix the grid (from the imported table if configured) and activate.
    pub fn init(&mut self, scene_bounds: &Aabb) -> GuideResult<()> {
        self.lifecycle.expect(LifecycleState::Uninitialized, "init");
        let resolution = self.config.scene_resolution;
        match self.config.import_path.clone() {
            Some(path) => {
                let (bounds, records) = persist::read_table(&path, self.rows * self.cols)?;
                self.grid = SpatialGrid::from_expanded(bounds, resolution);
                let cell_count = self.grid.cell_count();
                for record in records {
                    if record.cell >= cell_count {
                        log::warn!(
                            "Guide table {}: skipping cell {} outside a {}^3 grid",
                            path.display(),
                            record.cell,
                            resolution
                        );
                        continue;
                    }
                    let table = T::from_weights(
                        self.rows,
                        self.cols,
                        record.weights,
                        self.config.weight_floor,
                    );
                    self.store.insert(
                        record.cell,
                        CellRecord {
                            table,
                            visits: record.visits,
                        },
                    );
                }
            }
            None => self.grid = SpatialGrid::new(*scene_bounds, resolution),
        }

        self.lifecycle.activate();
        log::info!(
            "Guider: {}^3 cells over {:?}, {} x {} bins per cell, {} cells loaded",
            resolution,
            self.grid.bounds(),
            self.rows,
            self.cols,
            self.store.len()
        );
        Ok(())
    }

    /// Record of the cell holding `p`, created uniform on first use.
    pub fn cell(&self, p: Vec3) -> CellHandle<T> {
        let index = self.grid.cell_index(p);
        self.store.get_or_create(index, || {
            CellRecord::new(T::new(
                self.rows,
                self.cols,
                self.config.initial_weight,
                self.config.weight_floor,
            ))
        })
    }

    /// Move bin `(row, col)` towards `estimate` by the learning rate.
    pub fn blend(&self, record: &mut CellRecord<T>, row: usize, col: usize, estimate: f32) {
        if !estimate.is_finite() {
            return;
        }
        let bin = row * self.cols + col;
        let visits = record.visits[bin];
        let alpha = self.config.learning_rate.alpha(visits);
        let old = record.table.get(row, col);
        record.table.set(row, col, (1.0 - alpha) * old + alpha * estimate);
        record.visits[bin] = visits.saturating_add(1);
    }

    /// Finalize, then write the table if an export path is configured.
    pub fn done(&self) -> GuideResult<()> {
        self.lifecycle.finalize();

        let Some(path) = &self.config.export_path else {
            return Ok(());
        };
        let records: Vec<TableRecord> = self
            .store
            .sorted_cells()
            .into_iter()
            .map(|(cell, handle)| {
                let rec = handle.read();
                TableRecord {
                    cell,
                    weights: rec.table.weights().to_vec(),
                    visits: rec.visits.clone(),
                }
            })
            .collect();
        persist::write_table(path, &self.grid.bounds(), &records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuideError;
    use crate::range_tree::RangeTree;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_unwritable_export_fails() {
        let missing_dir = std::env::temp_dir().join(format!("rlt_guide_no_dir_{}", std::process::id()));
        let config = GuiderConfig {
            scene_resolution: 2,
            angle_resolution: 2,
            export_path: Some(missing_dir.join("table.qtable")),
            ..Default::default()
        };
        let mut state: GuiderState<RangeTree> = GuiderState::new(config, 2, 2).unwrap();
        state.init(&unit_box()).unwrap();
        state.cell(Vec3::splat(0.1));

        let err = state.done().unwrap_err();
        assert!(matches!(err, GuideError::Io { .. }), "{}", err);
        assert_eq!(state.lifecycle.state(), LifecycleState::Finalized);
    }

    #[test]
    fn test_import_skips_cells_outside_grid() {
        let _ = env_logger::builder().is_test(true).try_init();
        let path = std::env::temp_dir().join(format!("rlt_guide_engine_import_{}.qtable", std::process::id()));
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let records = [
            TableRecord {
                cell: 3,
                weights: vec![4.0, 1.0, 1.0, 2.0],
                visits: vec![5, 0, 0, 1],
            },
            TableRecord {
                cell: 7,
                weights: vec![1.0, 3.0, 1.0, 1.0],
                visits: vec![0, 2, 0, 0],
            },
            // A 2^3 grid has cells 0..8
            TableRecord {
                cell: 8,
                weights: vec![9.0; 4],
                visits: vec![1; 4],
            },
            TableRecord {
                cell: 1000,
                weights: vec![9.0; 4],
                visits: vec![1; 4],
            },
        ];
        persist::write_table(&path, &bounds, &records).unwrap();

        let config = GuiderConfig {
            scene_resolution: 2,
            angle_resolution: 2,
            import_path: Some(path.clone()),
            ..Default::default()
        };
        let mut state: GuiderState<RangeTree> = GuiderState::new(config, 2, 2).unwrap();
        // The imported header replaces these bounds
        state.init(&unit_box()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(state.grid.bounds(), bounds);
        assert_eq!(state.store.len(), 2);
        assert!(state.store.get(8).is_none());

        let kept = state.store.get(3).unwrap();
        let kept = kept.read();
        assert_eq!(kept.table.weights(), &[4.0, 1.0, 1.0, 2.0]);
        assert_eq!(kept.visits, vec![5, 0, 0, 1]);
        assert_eq!(state.store.get(7).unwrap().read().visits, vec![0, 2, 0, 0]);
    }
}
