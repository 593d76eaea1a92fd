use std::{fs, path::Path};

use enum_map::EnumMap;
use hashbrown::HashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, TradingError},
    gym::{Action, Observation},
    utils::{bin_index, write_atomic},
};

/// Estimated return of each action from one state
pub type ActionValues = EnumMap<Action, f64>;

/// Bucketed observation used to look up the table. Fields are bucket indices, so a
/// price of 12.4 with a 5.0 bin is stored as 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub price_bin: i64,
    pub balance_bin: i64,
    pub position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discretizer {
    pub price_bin: f64,
    pub balance_bin: f64,
}

impl Discretizer {
    pub fn new(price_bin: f64, balance_bin: f64) -> Self {
        Self {
            price_bin,
            balance_bin,
        }
    }

    pub fn key(&self, observation: &Observation) -> StateKey {
        StateKey {
            price_bin: bin_index(observation.price, self.price_bin),
            balance_bin: bin_index(observation.balance, self.balance_bin),
            position: i64::from(observation.position),
        }
    }
}

/// One row of the persisted table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QRecord {
    pub key: StateKey,
    pub values: [f64; Action::COUNT],
}

#[derive(Debug, Serialize, Deserialize)]
struct QTableFile {
    discretizer: Discretizer,
    records: Vec<QRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    discretizer: Discretizer,
    rows: HashMap<StateKey, ActionValues>,
}

impl QTable {
    pub fn new(discretizer: Discretizer) -> Self {
        Self {
            discretizer,
            rows: HashMap::new(),
        }
    }

    pub fn discretizer(&self) -> Discretizer {
        self.discretizer
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &StateKey) -> Option<&ActionValues> {
        self.rows.get(key)
    }

    /// Row for `key`, created with all zeros on first access.
    pub fn row_mut(&mut self, key: StateKey) -> &mut ActionValues {
        self.rows.entry(key).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.rows.iter()
    }

    /// Greedy action for `key`. An unseen key reads as all zeros, so it picks Hold.
    pub fn best_action(&self, key: &StateKey) -> Action {
        match self.rows.get(key) {
            // max_by_key keeps the last maximum, so scan high to low to prefer the lowest index
            Some(row) => Action::ALL
                .into_iter()
                .rev()
                .max_by_key(|action| OrderedFloat(row[*action]))
                .unwrap_or(Action::Hold),
            None => Action::Hold,
        }
    }

    pub fn max_value(&self, key: &StateKey) -> f64 {
        self.rows
            .get(key)
            .and_then(|row| row.values().copied().map(OrderedFloat).max())
            .map_or(0.0, |value| value.0)
    }

    /// Rows as records ordered by key
    pub fn records(&self) -> Vec<QRecord> {
        let mut records: Vec<QRecord> = self
            .rows
            .iter()
            .map(|(key, row)| QRecord {
                key: *key,
                values: Action::ALL.map(|action| row[action]),
            })
            .collect();
        records.sort_by_key(|record| record.key);
        records
    }

    pub fn from_records(discretizer: Discretizer, records: Vec<QRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| {
                let row = EnumMap::from_fn(|action: Action| record.values[action.index()]);
                (record.key, row)
            })
            .collect();
        Self { discretizer, rows }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = QTableFile {
            discretizer: self.discretizer,
            records: self.records(),
        };
        let encoded = postcard::to_stdvec(&file)?;
        write_atomic(path, &encoded)?;

        debug!(path = %path.display(), rows = self.len(), "persisted q-table");
        Ok(())
    }

    /// Load a table written by [`QTable::persist`]. The stored bin widths must match
    /// `discretizer`, otherwise keys would be read against the wrong buckets.
    pub fn restore(path: &Path, discretizer: Discretizer) -> Result<Self> {
        if !path.exists() {
            return Err(TradingError::PersistenceMissing(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let file: QTableFile = postcard::from_bytes(&bytes)?;
        if file.discretizer != discretizer {
            return Err(TradingError::InvalidInput(format!(
                "q-table was built with bins {:?}, agent uses {:?}",
                file.discretizer, discretizer
            )));
        }

        let table = Self::from_records(file.discretizer, file.records);
        debug!(path = %path.display(), rows = table.len(), "restored q-table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enum_map::enum_map;

    fn discretizer() -> Discretizer {
        Discretizer::new(5.0, 50.0)
    }

    fn key(price_bin: i64, balance_bin: i64, position: i64) -> StateKey {
        StateKey {
            price_bin,
            balance_bin,
            position,
        }
    }

    #[test]
    fn nearby_observations_share_a_key() {
        let d = discretizer();
        let a = d.key(&Observation::new(101.0, 1010.0, 2));
        let b = d.key(&Observation::new(99.0, 990.0, 2));

        assert_eq!(a, b);
        assert_eq!(a, key(20, 20, 2));
    }

    #[test]
    fn position_is_part_of_the_key() {
        let d = discretizer();
        assert_ne!(
            d.key(&Observation::new(100.0, 1000.0, 1)),
            d.key(&Observation::new(100.0, 1000.0, 2))
        );
    }

    #[test]
    fn rows_are_created_lazily_with_zeros() {
        let mut table = QTable::new(discretizer());
        assert!(table.get(&key(1, 1, 0)).is_none());

        let row = table.row_mut(key(1, 1, 0));
        assert!(row.values().all(|value| *value == 0.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn best_action_breaks_ties_by_lowest_index() {
        let mut table = QTable::new(discretizer());
        let k = key(0, 0, 0);

        table.row_mut(k);
        assert_eq!(table.best_action(&k), Action::Hold);

        *table.row_mut(k) = enum_map! { Action::Hold => 0.0, Action::Buy => 2.0, Action::Sell => 2.0 };
        assert_eq!(table.best_action(&k), Action::Buy);

        table.row_mut(k)[Action::Sell] = 2.5;
        assert_eq!(table.best_action(&k), Action::Sell);
    }

    #[test]
    fn unseen_key_is_greedy_hold_and_not_created() {
        let table = QTable::new(discretizer());
        assert_eq!(table.best_action(&key(3, 3, 3)), Action::Hold);
        assert_eq!(table.max_value(&key(3, 3, 3)), 0.0);
        assert!(table.is_empty());
    }

    #[test]
    fn max_value_handles_negative_rows() {
        let mut table = QTable::new(discretizer());
        let k = key(0, 0, 0);
        *table.row_mut(k) = enum_map! { Action::Hold => -3.0, Action::Buy => -1.5, Action::Sell => -2.0 };

        assert_eq!(table.max_value(&k), -1.5);
    }

    #[test]
    fn records_are_sorted_by_key() {
        let mut table = QTable::new(discretizer());
        table.row_mut(key(2, 0, 0));
        table.row_mut(key(1, 5, 0));
        table.row_mut(key(1, 0, 3));

        let keys: Vec<StateKey> = table.records().iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![key(1, 0, 3), key(1, 5, 0), key(2, 0, 0)]);
    }

    #[test]
    fn persist_then_restore_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/q_table.bin");

        let mut table = QTable::new(discretizer());
        table.row_mut(key(20, 20, 0))[Action::Buy] = 0.1 + 0.2;
        table.row_mut(key(-1, 3, 7))[Action::Sell] = -1.0e-300;
        table.row_mut(key(4, 0, 1))[Action::Hold] = 12345.678901234567;

        table.persist(&path).unwrap();
        let restored = QTable::restore(&path, discretizer()).unwrap();

        assert_eq!(restored, table);
        for (key, row) in table.iter() {
            let other = restored.get(key).unwrap();
            for action in Action::ALL {
                assert_eq!(row[action].to_bits(), other[action].to_bits());
            }
        }
    }

    #[test]
    fn restore_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never_written.bin");

        assert!(matches!(
            QTable::restore(&path, discretizer()),
            Err(TradingError::PersistenceMissing(p)) if p == path
        ));
    }

    #[test]
    fn restore_rejects_mismatched_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.bin");
        QTable::new(discretizer()).persist(&path).unwrap();

        assert!(matches!(
            QTable::restore(&path, Discretizer::new(1.0, 50.0)),
            Err(TradingError::InvalidInput(_))
        ));
    }
}
