//! Village layout serialization
//!
//! Layouts are a JSON tree: one array per entity kind, one object per
//! entity. Field names are part of the on-disk contract (`lvl`,
//! `const_t_end`, `clear_t`, ...), so the codec goes through explicit entry
//! structs rather than serializing live objects directly. Optional fields
//! are omitted when they hold their default, keeping stored layouts sparse.
//!
//! Reading rebuilds objects through the shared pools, restarts in-flight
//! timers against the load timestamp, and finishes with a single
//! `update(0)` pass so already-expired timers complete immediately.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::{DataLibrary, GroupRole};
use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::EntityKind;
use crate::player::PlayerProfile;
use crate::village::buildable::NOT_CONSTRUCTED_LEVEL;
use crate::village::object::ObjectBody;
use crate::village::pool::PoolSet;
use crate::village::Village;

#[derive(Debug, Serialize, Deserialize)]
struct VillageLayout {
    #[serde(default)]
    exp_ver: i32,
    #[serde(default)]
    buildings: Vec<BuildingEntry>,
    #[serde(default)]
    obstacles: Vec<ObstacleEntry>,
    #[serde(default)]
    traps: Vec<TrapEntry>,
    #[serde(default)]
    decos: Vec<DecorationEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuildingEntry {
    data: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    lvl: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    const_t_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    const_t: Option<i64>,
    x: i32,
    y: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObstacleEntry {
    data: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clear_t: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loot_multiply_ver: Option<i32>,
    x: i32,
    y: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrapEntry {
    data: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    lvl: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    need_repair: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    const_t_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    const_t: Option<i64>,
    x: i32,
    y: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecorationEntry {
    data: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    x: i32,
    y: i32,
}

fn non_zero(value: i64) -> Option<i64> {
    if value != 0 {
        Some(value)
    } else {
        None
    }
}

impl Village {
    /// Serialize the village layout as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.layout())?)
    }

    /// Serialize the village layout as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.layout())?)
    }

    fn layout(&self) -> VillageLayout {
        let mut layout = VillageLayout {
            exp_ver: self.exp_version(),
            buildings: Vec::new(),
            obstacles: Vec::new(),
            traps: Vec::new(),
            decos: Vec::new(),
        };

        for obj in self.buildings() {
            let Some(building) = obj.as_building() else {
                continue;
            };
            layout.buildings.push(BuildingEntry {
                data: building.base.data_id(),
                id: obj.id().map(|id| id.raw()),
                lvl: building.base.level(),
                locked: building.locked.then_some(true),
                const_t_end: non_zero(building.base.construction_end_time()),
                const_t: non_zero(building.base.construction_secs()),
                x: obj.x(),
                y: obj.y(),
            });
        }

        for obj in self.obstacles() {
            let Some(obstacle) = obj.as_obstacle() else {
                continue;
            };
            layout.obstacles.push(ObstacleEntry {
                data: obstacle.data_id(),
                id: obj.id().map(|id| id.raw()),
                clear_t: non_zero(obstacle.clear_secs()),
                loot_multiply_ver: (obstacle.loot_multiplier != 0).then_some(obstacle.loot_multiplier),
                x: obj.x(),
                y: obj.y(),
            });
        }

        for obj in self.traps() {
            let Some(trap) = obj.as_trap() else {
                continue;
            };
            layout.traps.push(TrapEntry {
                data: trap.base.data_id(),
                id: obj.id().map(|id| id.raw()),
                lvl: trap.base.level(),
                need_repair: trap.need_repair.then_some(true),
                const_t_end: non_zero(trap.base.construction_end_time()),
                const_t: non_zero(trap.base.construction_secs()),
                x: obj.x(),
                y: obj.y(),
            });
        }

        for obj in self.decorations() {
            let Some(decoration) = obj.as_decoration() else {
                continue;
            };
            layout.decos.push(DecorationEntry {
                data: decoration.data_id(),
                id: obj.id().map(|id| id.raw()),
                x: obj.x(),
                y: obj.y(),
            });
        }

        layout
    }

    /// Rebuild a village from a serialized layout
    ///
    /// `now_unix` is the load timestamp: in-flight timers restart against it
    /// with their persisted end time, clamped so already-expired work
    /// completes during the closing `update(0)` pass. Loading a layout
    /// without a town hall is an error.
    pub fn from_json(
        value: &str,
        assets: Arc<DataLibrary>,
        pools: Arc<PoolSet>,
        config: EngineConfig,
        now_unix: i64,
        player: &mut PlayerProfile,
    ) -> Result<Village> {
        let layout: VillageLayout = serde_json::from_str(value)?;
        let mut village = Village::new(assets, pools, config, now_unix);
        village.set_exp_version(layout.exp_ver);

        for entry in &layout.buildings {
            village.load_building(entry, now_unix)?;
        }
        for entry in &layout.traps {
            village.load_trap(entry, now_unix)?;
        }
        for entry in &layout.obstacles {
            village.load_obstacle(entry, now_unix)?;
        }
        for entry in &layout.decos {
            village.load_decoration(entry)?;
        }

        if village.town_hall().is_none() {
            return Err(SimError::MissingTownHall);
        }

        // One pass to settle derived state and finish anything already due.
        village.update(0, player)?;
        Ok(village)
    }

    fn load_building(&mut self, entry: &BuildingEntry, now_unix: i64) -> Result<()> {
        if entry.lvl < NOT_CONSTRUCTED_LEVEL {
            return Err(SimError::MalformedLayout(format!(
                "building level {} is below the not-constructed sentinel",
                entry.lvl
            )));
        }

        let group = self.assets().group(EntityKind::Building, entry.data)?;
        if entry.lvl >= 0 {
            group.level_or_err(entry.lvl)?;
        }

        let mut obj = self.pools().instantiate(EntityKind::Building);
        obj.set_position(entry.x, entry.y, self.config())?;
        {
            let building = obj.as_building_mut().expect("pool returned building body");
            building.base.load(entry.data, entry.lvl);
            building
                .base
                .resolve_row(EntityKind::Building, self.assets())?;
            building.locked = entry.locked.unwrap_or(false);
            if let Some(end_time) = entry.const_t_end {
                let duration = (end_time - now_unix).max(0);
                building.base.timer.start(now_unix, 0, duration)?;
            }
        }

        let id = self.table.add(obj);
        if group.role == GroupRole::TownHall {
            self.claim_town_hall(id)?;
        }
        if group.role == GroupRole::WorkerHut && entry.lvl >= 0 {
            self.workers.add_capacity(1);
        }
        if entry.const_t_end.is_some() {
            self.workers.allocate(id);
        }
        Ok(())
    }

    fn load_trap(&mut self, entry: &TrapEntry, now_unix: i64) -> Result<()> {
        if entry.lvl < NOT_CONSTRUCTED_LEVEL {
            return Err(SimError::MalformedLayout(format!(
                "trap level {} is below the not-constructed sentinel",
                entry.lvl
            )));
        }

        let group = self.assets().group(EntityKind::Trap, entry.data)?;
        if entry.lvl >= 0 {
            group.level_or_err(entry.lvl)?;
        }

        let mut obj = self.pools().instantiate(EntityKind::Trap);
        obj.set_position(entry.x, entry.y, self.config())?;
        {
            let trap = obj.as_trap_mut().expect("pool returned trap body");
            trap.base.load(entry.data, entry.lvl);
            trap.base.resolve_row(EntityKind::Trap, self.assets())?;
            trap.need_repair = entry.need_repair.unwrap_or(false);
            if let Some(end_time) = entry.const_t_end {
                let duration = (end_time - now_unix).max(0);
                trap.base.timer.start(now_unix, 0, duration)?;
            }
        }

        let id = self.table.add(obj);
        if entry.const_t_end.is_some() {
            self.workers.allocate(id);
        }
        Ok(())
    }

    fn load_obstacle(&mut self, entry: &ObstacleEntry, now_unix: i64) -> Result<()> {
        self.assets().group(EntityKind::Obstacle, entry.data)?;

        let mut obj = self.pools().instantiate(EntityKind::Obstacle);
        obj.set_position(entry.x, entry.y, self.config())?;
        if let ObjectBody::Obstacle(obstacle) = &mut obj.body {
            obstacle.load(entry.data);
            obstacle.resolve_row(self.assets())?;
            obstacle.loot_multiplier = entry.loot_multiply_ver.unwrap_or(0);
            if let Some(clear_secs) = entry.clear_t {
                obstacle.timer.start(now_unix, 0, clear_secs.max(0))?;
            }
        }

        let id = self.table.add(obj);
        if entry.clear_t.is_some() {
            self.workers.allocate(id);
        }
        Ok(())
    }

    fn load_decoration(&mut self, entry: &DecorationEntry) -> Result<()> {
        self.assets().group(EntityKind::Decoration, entry.data)?;

        let mut obj = self.pools().instantiate(EntityKind::Decoration);
        obj.set_position(entry.x, entry.y, self.config())?;
        if let ObjectBody::Decoration(decoration) = &mut obj.body {
            decoration.load(entry.data);
            decoration.resolve_row(self.assets())?;
        }

        self.table.add(obj);
        Ok(())
    }
}
