//! Static game data lookup
//!
//! The engine never parses data tables itself; it consumes an in-memory
//! [`DataLibrary`] built by the host. Each `(kind, data id)` pair maps to a
//! [`DataGroup`] holding the ordered per-level records a buildable walks
//! through as it upgrades. Obstacles use the same record shape with the
//! duration/cost fields read as clearing values.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::EntityKind;

/// Classification of a data group beyond its entity kind
///
/// Replaces name-string comparison for the two rows the engine treats
/// specially: the town hall (gates upgrades) and the worker hut (grows
/// worker capacity when completed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupRole {
    Plain,
    TownHall,
    WorkerHut,
}

/// One level's worth of static data for a buildable or obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// Seconds of build (or clear) time for this level.
    pub build_time_secs: i64,
    /// Cost to start building (or clearing) this level.
    pub build_cost: i64,
    /// Name of the resource the cost is paid in.
    pub build_resource: String,
    /// Town hall level required before this level may be started;
    /// 0 means unconditional.
    pub town_hall_level: i32,
}

/// Ordered per-level records for one data identifier
#[derive(Debug, Clone, PartialEq)]
pub struct DataGroup {
    pub data_id: u32,
    pub kind: EntityKind,
    pub name: String,
    pub role: GroupRole,
    levels: Vec<LevelRecord>,
}

impl DataGroup {
    pub fn new(
        data_id: u32,
        kind: EntityKind,
        name: impl Into<String>,
        role: GroupRole,
        levels: Vec<LevelRecord>,
    ) -> Self {
        Self {
            data_id,
            kind,
            name: name.into(),
            role,
            levels,
        }
    }

    /// Record for the given level, if the group defines one.
    pub fn level(&self, level: i32) -> Option<&LevelRecord> {
        if level < 0 {
            return None;
        }
        self.levels.get(level as usize)
    }

    /// Record for the given level, failing loudly when absent
    ///
    /// Absence here means the persisted object state and the loaded data
    /// tables disagree, which is a configuration error rather than a
    /// recoverable condition.
    pub fn level_or_err(&self, level: i32) -> Result<&LevelRecord> {
        self.level(level).ok_or(SimError::MissingLevelRecord {
            data_id: self.data_id,
            level,
        })
    }

    /// Highest defined level, or -1 for an empty group.
    pub fn max_level(&self) -> i32 {
        self.levels.len() as i32 - 1
    }
}

/// Lookup table from `(kind, data id)` to data groups
///
/// Groups are handed out as `Arc` so objects can cache the resolved group
/// across ticks without borrowing the library.
#[derive(Debug, Clone, Default)]
pub struct DataLibrary {
    groups: AHashMap<(EntityKind, u32), Arc<DataGroup>>,
}

impl DataLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data group, replacing any previous one with the same id.
    pub fn insert(&mut self, group: DataGroup) {
        self.groups
            .insert((group.kind, group.data_id), Arc::new(group));
    }

    /// Resolve a data group; absence is a hard error.
    pub fn group(&self, kind: EntityKind, data_id: u32) -> Result<Arc<DataGroup>> {
        self.groups
            .get(&(kind, data_id))
            .cloned()
            .ok_or(SimError::UnknownDataGroup { kind, data_id })
    }

    /// Resolve a data group without failing.
    pub fn try_group(&self, kind: EntityKind, data_id: u32) -> Option<Arc<DataGroup>> {
        self.groups.get(&(kind, data_id)).cloned()
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cottage_levels() -> Vec<LevelRecord> {
        vec![
            LevelRecord {
                build_time_secs: 0,
                build_cost: 10,
                build_resource: "wood".into(),
                town_hall_level: 0,
            },
            LevelRecord {
                build_time_secs: 60,
                build_cost: 100,
                build_resource: "wood".into(),
                town_hall_level: 2,
            },
        ]
    }

    #[test]
    fn test_group_lookup_and_levels() {
        let mut library = DataLibrary::new();
        library.insert(DataGroup::new(
            1_000_001,
            EntityKind::Building,
            "Cottage",
            GroupRole::Plain,
            cottage_levels(),
        ));

        let group = library.group(EntityKind::Building, 1_000_001).unwrap();
        assert_eq!(group.name, "Cottage");
        assert_eq!(group.max_level(), 1);
        assert_eq!(group.level(0).unwrap().build_cost, 10);
        assert_eq!(group.level(2), None);
        assert_eq!(group.level(-1), None);
    }

    #[test]
    fn test_missing_group_is_hard_error() {
        let library = DataLibrary::new();
        let err = library.group(EntityKind::Building, 9).unwrap_err();
        assert!(matches!(err, SimError::UnknownDataGroup { data_id: 9, .. }));
    }

    #[test]
    fn test_missing_level_is_hard_error() {
        let group = DataGroup::new(
            7,
            EntityKind::Building,
            "Cottage",
            GroupRole::Plain,
            cottage_levels(),
        );
        let err = group.level_or_err(5).unwrap_err();
        assert!(matches!(
            err,
            SimError::MissingLevelRecord { data_id: 7, level: 5 }
        ));
    }
}
