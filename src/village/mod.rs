//! Village driver — owns the object table and advances simulated time
//!
//! A village is the unit of simulation: one object table, one worker
//! roster, one town hall. `update(tick)` is the single place time advances;
//! it fans the tick out to every live object in table order and applies
//! completion side effects synchronously before the next object is ticked.
//!
//! Pools and the data library are injected as shared handles: pools are
//! cross-village state, the library is immutable reference data.

pub mod buildable;
pub mod component;
pub mod json;
pub mod object;
pub mod obstacle;
pub mod pool;
pub mod table;
pub mod timer;
pub mod workers;

pub use buildable::{Buildable, Building, Trap, NOT_CONSTRUCTED_LEVEL};
pub use component::{Component, ComponentKind, COMPONENT_SLOTS};
pub use object::{ActiveTask, Decoration, ObjectBody, VillageObject};
pub use obstacle::Obstacle;
pub use pool::{ComponentPool, ObjectPool, PoolSet, PoolStats};
pub use table::ObjectTable;
pub use timer::TickTimer;
pub use workers::WorkerRoster;

use std::sync::Arc;

use crate::assets::{DataLibrary, GroupRole};
use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{seconds_for, EntityKind, GameId, Tick};
use crate::player::PlayerProfile;

/// Side effect of ticking or force-completing one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// A buildable finished construction and now sits at `level`.
    Leveled { id: GameId, level: i32 },
    /// An obstacle finished clearing and must leave the table.
    Cleared { id: GameId },
}

/// Village-level state threaded into per-object operations
///
/// Objects do not hold a village back-reference; everything an operation
/// needs from the village arrives through this context.
pub(crate) struct LogicCtx<'a> {
    pub assets: &'a DataLibrary,
    pub player: &'a mut PlayerProfile,
    pub workers: &'a mut WorkerRoster,
    pub config: &'a EngineConfig,
    pub town_hall_level: Option<i32>,
    pub now: i64,
    pub obstacle_clears: &'a mut u32,
}

/// One player's base
pub struct Village {
    assets: Arc<DataLibrary>,
    pools: Arc<PoolSet>,
    config: EngineConfig,
    table: ObjectTable,
    workers: WorkerRoster,
    town_hall: Option<GameId>,
    obstacle_clear_count: u32,
    exp_version: i32,
    // UNIX time the village was created; tick timestamps derive from it.
    epoch: i64,
    last_tick_time: i64,
    tick: Tick,
    disposed: bool,
}

impl Village {
    /// New empty village wired to shared pools and a data library
    ///
    /// `now_unix` anchors the wall-clock timestamps carried by timers and
    /// layouts; pass a fixed value for reproducible output.
    pub fn new(
        assets: Arc<DataLibrary>,
        pools: Arc<PoolSet>,
        config: EngineConfig,
        now_unix: i64,
    ) -> Self {
        let initial_kind_rows = config.initial_kind_rows;
        Self {
            assets,
            pools,
            config,
            table: ObjectTable::new(initial_kind_rows),
            workers: WorkerRoster::new(),
            town_hall: None,
            obstacle_clear_count: 0,
            exp_version: 0,
            epoch: now_unix,
            last_tick_time: now_unix,
            tick: 0,
            disposed: false,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// UNIX time of the most recent update.
    pub fn last_tick_time(&self) -> i64 {
        self.last_tick_time
    }

    pub fn exp_version(&self) -> i32 {
        self.exp_version
    }

    pub fn set_exp_version(&mut self, version: i32) {
        self.exp_version = version;
    }

    pub fn workers(&self) -> &WorkerRoster {
        &self.workers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assets(&self) -> &DataLibrary {
        &self.assets
    }

    pub fn pools(&self) -> &PoolSet {
        &self.pools
    }

    /// The village's town hall, if one has been placed.
    pub fn town_hall(&self) -> Option<GameId> {
        self.town_hall
    }

    /// Level of the town hall building; `None` without a town hall.
    pub fn town_hall_level(&self) -> Option<i32> {
        let id = self.town_hall?;
        let building = self.table.get(id)?.as_building()?;
        Some(building.base.level())
    }

    /// How many obstacles this village has cleared, modulo the gem cycle.
    pub fn obstacle_clear_count(&self) -> u32 {
        self.obstacle_clear_count
    }

    pub fn object(&self, id: GameId) -> Option<&VillageObject> {
        self.table.get(id)
    }

    pub fn object_mut(&mut self, id: GameId) -> Option<&mut VillageObject> {
        self.table.get_mut(id)
    }

    pub fn contains(&self, id: GameId) -> bool {
        self.table.contains(id)
    }

    pub fn object_count(&self) -> usize {
        self.table.len()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &VillageObject> {
        self.table.iter_kind(EntityKind::Building)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &VillageObject> {
        self.table.iter_kind(EntityKind::Obstacle)
    }

    pub fn traps(&self) -> impl Iterator<Item = &VillageObject> {
        self.table.iter_kind(EntityKind::Trap)
    }

    pub fn decorations(&self) -> impl Iterator<Item = &VillageObject> {
        self.table.iter_kind(EntityKind::Decoration)
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Place a new building and start constructing its first level
    ///
    /// New buildables enter at level -1 and begin construction immediately;
    /// a zero-duration first level completes before this returns.
    pub fn place_building(
        &mut self,
        data_id: u32,
        x: i32,
        y: i32,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<GameId> {
        let group = self.assets.group(EntityKind::Building, data_id)?;
        if group.role == GroupRole::TownHall {
            if let Some(existing) = self.town_hall {
                return Err(SimError::DuplicateTownHall { existing });
            }
        }

        let mut obj = self.pools.instantiate(EntityKind::Building);
        obj.set_position(x, y, &self.config)?;
        {
            let building = obj.as_building_mut().expect("pool returned building body");
            building.base.load(data_id, NOT_CONSTRUCTED_LEVEL);
            building
                .base
                .resolve_row(EntityKind::Building, &self.assets)?;
        }

        let id = self.table.add(obj);
        tracing::info!(%id, data_id, "placed building");
        if group.role == GroupRole::TownHall {
            self.claim_town_hall(id)?;
        }
        self.begin_construction(id, tick, player)?;
        Ok(id)
    }

    /// Place a new trap and start constructing its first level.
    pub fn place_trap(
        &mut self,
        data_id: u32,
        x: i32,
        y: i32,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<GameId> {
        self.assets.group(EntityKind::Trap, data_id)?;

        let mut obj = self.pools.instantiate(EntityKind::Trap);
        obj.set_position(x, y, &self.config)?;
        {
            let trap = obj.as_trap_mut().expect("pool returned trap body");
            trap.base.load(data_id, NOT_CONSTRUCTED_LEVEL);
            trap.base.resolve_row(EntityKind::Trap, &self.assets)?;
        }

        let id = self.table.add(obj);
        tracing::info!(%id, data_id, "placed trap");
        self.begin_construction(id, tick, player)?;
        Ok(id)
    }

    /// Place an obstacle (worldgen or season spawn path).
    pub fn place_obstacle(&mut self, data_id: u32, x: i32, y: i32) -> Result<GameId> {
        self.assets.group(EntityKind::Obstacle, data_id)?;

        let mut obj = self.pools.instantiate(EntityKind::Obstacle);
        obj.set_position(x, y, &self.config)?;
        if let ObjectBody::Obstacle(obstacle) = &mut obj.body {
            obstacle.load(data_id);
            obstacle.resolve_row(&self.assets)?;
        }

        let id = self.table.add(obj);
        tracing::info!(%id, data_id, "placed obstacle");
        Ok(id)
    }

    /// Place a decoration.
    pub fn place_decoration(&mut self, data_id: u32, x: i32, y: i32) -> Result<GameId> {
        self.assets.group(EntityKind::Decoration, data_id)?;

        let mut obj = self.pools.instantiate(EntityKind::Decoration);
        obj.set_position(x, y, &self.config)?;
        if let ObjectBody::Decoration(decoration) = &mut obj.body {
            decoration.load(data_id);
            decoration.resolve_row(&self.assets)?;
        }

        let id = self.table.add(obj);
        tracing::info!(%id, data_id, "placed decoration");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Start constructing the next level of a building or trap.
    pub fn begin_construction(
        &mut self,
        id: GameId,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
        let mut ctx = LogicCtx {
            assets: self.assets.as_ref(),
            player,
            workers: &mut self.workers,
            config: &self.config,
            town_hall_level,
            now,
            obstacle_clears: &mut self.obstacle_clear_count,
        };
        buildable::begin_construction(obj, id, &mut ctx, tick)?;
        Ok(())
    }

    /// Cancel an in-flight construction, refunding half the build cost.
    pub fn cancel_construction(
        &mut self,
        id: GameId,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
        let mut ctx = LogicCtx {
            assets: self.assets.as_ref(),
            player,
            workers: &mut self.workers,
            config: &self.config,
            town_hall_level,
            now,
            obstacle_clears: &mut self.obstacle_clear_count,
        };
        buildable::cancel_construction(obj, id, &mut ctx, tick)
    }

    /// Finish an in-flight construction immediately.
    pub fn speed_up_construction(
        &mut self,
        id: GameId,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
        let mut ctx = LogicCtx {
            assets: self.assets.as_ref(),
            player,
            workers: &mut self.workers,
            config: &self.config,
            town_hall_level,
            now,
            obstacle_clears: &mut self.obstacle_clear_count,
        };
        buildable::speed_up_construction(obj, id, &mut ctx, tick)?;
        Ok(())
    }

    /// Start clearing an obstacle.
    pub fn begin_clearing(
        &mut self,
        id: GameId,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let event = {
            let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
            let mut ctx = LogicCtx {
                assets: self.assets.as_ref(),
                player,
                workers: &mut self.workers,
                config: &self.config,
                town_hall_level,
                now,
                obstacle_clears: &mut self.obstacle_clear_count,
            };
            obstacle::begin_clearing(obj, id, &mut ctx, tick)?
        };
        if let Some(event) = event {
            self.apply_event(event);
        }
        Ok(())
    }

    /// Cancel an in-flight clear without removing the obstacle.
    pub fn cancel_clearing(
        &mut self,
        id: GameId,
        tick: Tick,
        player: &mut PlayerProfile,
    ) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
        let mut ctx = LogicCtx {
            assets: self.assets.as_ref(),
            player,
            workers: &mut self.workers,
            config: &self.config,
            town_hall_level,
            now,
            obstacle_clears: &mut self.obstacle_clear_count,
        };
        obstacle::cancel_clearing(obj, id, &mut ctx, tick)
    }

    /// Finish an in-flight clear immediately and remove the obstacle.
    pub fn finish_clear(&mut self, id: GameId, tick: Tick, player: &mut PlayerProfile) -> Result<()> {
        let town_hall_level = self.town_hall_level();
        let now = self.last_tick_time;
        let event = {
            let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
            let mut ctx = LogicCtx {
                assets: self.assets.as_ref(),
                player,
                workers: &mut self.workers,
                config: &self.config,
                town_hall_level,
                now,
                obstacle_clears: &mut self.obstacle_clear_count,
            };
            obstacle::finish_clear(obj, id, &mut ctx, tick)?
        };
        self.apply_event(event);
        Ok(())
    }

    /// Move a live object on the grid, bounds-checked.
    pub fn move_object(&mut self, id: GameId, x: i32, y: i32) -> Result<()> {
        let config = &self.config;
        let obj = self.table.get_mut(id).ok_or(SimError::ObjectNotFound(id))?;
        obj.set_position(x, y, config)
    }

    /// Remove a live object, returning it to the shared pool.
    pub fn remove_object(&mut self, id: GameId) -> Result<()> {
        let obj = self.table.remove(id).ok_or(SimError::ObjectNotFound(id))?;
        self.workers.deallocate(id);
        if self.town_hall == Some(id) {
            self.town_hall = None;
        }
        self.pools.objects.push(obj);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Worker scheduling
    // ------------------------------------------------------------------

    /// Force-complete whichever allocated task would finish soonest
    ///
    /// Scans the allocation set in insertion order and picks the strictly
    /// smallest remaining duration, so the earliest allocation wins ties.
    /// A village with no allocated tasks is a no-op.
    pub fn finish_fastest_task(&mut self, tick: Tick, player: &mut PlayerProfile) -> Result<()> {
        let mut fastest: Option<(GameId, i64)> = None;
        for &id in self.workers.allocations() {
            let Some(task) = self.table.get(id).and_then(|obj| obj.active_task()) else {
                continue;
            };
            let secs = task.remaining_secs();
            if fastest.map_or(true, |(_, best)| secs < best) {
                fastest = Some((id, secs));
            }
        }

        match fastest {
            Some((id, _)) => self.force_complete(id, tick, player),
            None => Ok(()),
        }
    }

    /// Complete the given object's task through its own completion path.
    pub fn force_complete(&mut self, id: GameId, tick: Tick, player: &mut PlayerProfile) -> Result<()> {
        let task = self
            .table
            .get(id)
            .and_then(|obj| obj.active_task())
            .ok_or(SimError::ObjectNotFound(id))?;
        match task {
            ActiveTask::Construction { .. } => self.speed_up_construction(id, tick, player),
            ActiveTask::Clearing { .. } => self.finish_clear(id, tick, player),
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Advance every live object to the given tick
    ///
    /// Objects are ticked once each in table order; completion side effects
    /// (experience, gems, removals) apply synchronously before the next
    /// object is ticked. A failing object aborts the whole update.
    pub fn update(&mut self, tick: Tick, player: &mut PlayerProfile) -> Result<()> {
        if self.disposed {
            return Ok(());
        }

        self.tick = tick;
        self.last_tick_time = self.epoch + seconds_for(tick.max(0));
        let mut town_hall_level = self.town_hall_level();

        for id in self.table.live_ids() {
            let event = {
                let Some(obj) = self.table.get_mut(id) else {
                    continue;
                };
                let mut ctx = LogicCtx {
                    assets: self.assets.as_ref(),
                    player: &mut *player,
                    workers: &mut self.workers,
                    config: &self.config,
                    town_hall_level,
                    now: self.last_tick_time,
                    obstacle_clears: &mut self.obstacle_clear_count,
                };
                obj.tick(id, &mut ctx, tick)?
            };

            match event {
                Some(TickEvent::Leveled { id: leveled, level }) => {
                    // Later objects in this same pass see the fresh level.
                    if self.town_hall == Some(leveled) {
                        town_hall_level = Some(level);
                    }
                }
                Some(event @ TickEvent::Cleared { .. }) => self.apply_event(event),
                None => {}
            }
        }

        Ok(())
    }

    /// Release every live object back to the shared pool.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for obj in self.table.drain() {
            self.pools.objects.push(obj);
        }
        self.workers.clear();
        self.town_hall = None;
        self.disposed = true;
        tracing::debug!("village disposed");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    // Checked town-hall assignment: a second claimant is rejected rather
    // than overwriting the first.
    fn claim_town_hall(&mut self, id: GameId) -> Result<()> {
        match self.town_hall {
            Some(existing) if existing != id => Err(SimError::DuplicateTownHall { existing }),
            _ => {
                self.town_hall = Some(id);
                Ok(())
            }
        }
    }

    fn apply_event(&mut self, event: TickEvent) {
        if let TickEvent::Cleared { id } = event {
            if let Some(obj) = self.table.remove(id) {
                self.pools.objects.push(obj);
            }
        }
    }
}

impl Drop for Village {
    fn drop(&mut self) {
        self.dispose();
    }
}
