//! Construction lifecycle for upgradeable objects
//!
//! Buildings and traps share one state machine:
//! `NotConstructed (level -1)` -> `Constructing` -> `Constructed(n)`, with
//! `Constructing` re-entered for each upgrade. All level data comes from the
//! resolved data group; a missing record for a level the object claims to be
//! at means the persisted state and the loaded tables disagree, and the
//! operation aborts.

use std::sync::Arc;

use crate::assets::{DataGroup, DataLibrary, GroupRole, LevelRecord};
use crate::core::error::{Result, SimError};
use crate::core::types::{GameId, Tick};
use crate::player::experience_for_duration;
use crate::village::object::{ObjectBody, VillageObject};
use crate::village::timer::TickTimer;
use crate::village::{LogicCtx, TickEvent};

/// Level of a buildable that has never finished construction.
pub const NOT_CONSTRUCTED_LEVEL: i32 = -1;

/// Construction-capable core shared by buildings and traps
#[derive(Debug, Clone)]
pub struct Buildable {
    data_id: u32,
    level: i32,
    is_upgradeable: bool,
    row: Option<Arc<DataGroup>>,
    pub(crate) timer: TickTimer,
}

impl Default for Buildable {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Buildable {
    pub fn new(data_id: u32) -> Self {
        Self {
            data_id,
            level: NOT_CONSTRUCTED_LEVEL,
            is_upgradeable: false,
            row: None,
            timer: TickTimer::new(),
        }
    }

    pub fn data_id(&self) -> u32 {
        self.data_id
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn is_constructing(&self) -> bool {
        self.timer.is_active()
    }

    pub fn is_upgradeable(&self) -> bool {
        self.is_upgradeable
    }

    /// Remaining construction time in seconds; 0 while idle.
    pub fn construction_secs(&self) -> i64 {
        self.timer.remaining_secs()
    }

    /// UNIX time construction will end; 0 while idle.
    pub fn construction_end_time(&self) -> i64 {
        self.timer.end_time()
    }

    /// Tick at which construction will end; 0 while idle.
    pub fn construction_end_tick(&self) -> crate::core::types::Tick {
        self.timer.end_tick()
    }

    /// Data record for the current level
    ///
    /// `None` while not constructed; a constructed level with no record is
    /// an inconsistency surfaced by [`Buildable::snapshot_or_err`].
    pub fn snapshot(&self) -> Option<&LevelRecord> {
        self.row.as_ref()?.level(self.level)
    }

    pub(crate) fn snapshot_or_err(&self) -> Result<&LevelRecord> {
        let row = self.row_or_err()?;
        row.level_or_err(self.level)
    }

    /// Data record for the next level, if one exists.
    pub fn next_upgrade(&self) -> Option<&LevelRecord> {
        self.row.as_ref()?.level(self.level + 1)
    }

    pub(crate) fn row(&self) -> Option<&Arc<DataGroup>> {
        self.row.as_ref()
    }

    pub(crate) fn row_or_err(&self) -> Result<&Arc<DataGroup>> {
        self.row.as_ref().ok_or(SimError::MalformedLayout(
            "buildable data row not resolved".into(),
        ))
    }

    /// Resolve and cache the data group for this object's kind and data id.
    pub(crate) fn resolve_row(
        &mut self,
        kind: crate::core::types::EntityKind,
        assets: &DataLibrary,
    ) -> Result<Arc<DataGroup>> {
        if self.row.is_none() {
            self.row = Some(assets.group(kind, self.data_id)?);
        }
        Ok(self.row.as_ref().cloned().expect("row just resolved"))
    }

    /// Adopt persisted state during layout loading.
    pub(crate) fn load(&mut self, data_id: u32, level: i32) {
        self.data_id = data_id;
        self.level = level;
        self.row = None;
        self.is_upgradeable = false;
    }

    /// Re-derive `is_upgradeable` for the current level
    ///
    /// False when the data group defines no next level. A next level gated
    /// on the town hall requires the village's town hall to be at least one
    /// level below the gate; a gated level with no town hall at all simply
    /// derives false. The missing-town-hall *error* belongs to the explicit
    /// gate check in [`begin_construction`], so that passive re-derivation
    /// (completion, idle ticks) can never fail a whole update pass.
    pub(crate) fn update_is_upgradeable(&mut self, town_hall_level: Option<i32>) -> Result<()> {
        let row = self.row_or_err()?;
        self.is_upgradeable = match row.level(self.level + 1) {
            None => false,
            Some(next) => {
                if next.town_hall_level == 0 {
                    true
                } else {
                    match town_hall_level {
                        Some(th) => th >= next.town_hall_level - 1,
                        None => false,
                    }
                }
            }
        };
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.data_id = 0;
        self.level = NOT_CONSTRUCTED_LEVEL;
        self.is_upgradeable = false;
        self.row = None;
        self.timer.reset();
    }
}

/// A construction-capable defensive or economic structure
#[derive(Debug, Clone, Default)]
pub struct Building {
    pub base: Buildable,
    /// Whether the building is locked out of use (e.g. a gated unlock).
    pub locked: bool,
}

impl Building {
    pub fn new(data_id: u32) -> Self {
        Self {
            base: Buildable::new(data_id),
            locked: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.base.reset();
        self.locked = false;
    }
}

/// A construction-capable trap that may need re-arming after a raid
#[derive(Debug, Clone, Default)]
pub struct Trap {
    pub base: Buildable,
    pub need_repair: bool,
}

impl Trap {
    pub fn new(data_id: u32) -> Self {
        Self {
            base: Buildable::new(data_id),
            need_repair: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.base.reset();
        self.need_repair = false;
    }
}

fn buildable_mut(obj: &mut VillageObject, id: GameId) -> Result<&mut Buildable> {
    match &mut obj.body {
        ObjectBody::Building(building) => Ok(&mut building.base),
        ObjectBody::Trap(trap) => Ok(&mut trap.base),
        _ => Err(SimError::NotBuildable(id)),
    }
}

/// Start constructing the next level
///
/// Requesting a town-hall-gated upgrade in a village with no town hall is
/// an error here, and only here. A next level with zero build time
/// completes synchronously and returns its completion event; otherwise a
/// worker is allocated and the timer starts.
pub(crate) fn begin_construction(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    tick: Tick,
) -> Result<Option<TickEvent>> {
    let kind = obj.kind();
    let town_hall_level = ctx.town_hall_level;
    let base = buildable_mut(obj, id)?;

    if base.is_constructing() {
        return Err(SimError::AlreadyConstructing);
    }

    let row = base.resolve_row(kind, ctx.assets)?;
    if let Some(next) = row.level(base.level + 1) {
        if next.town_hall_level != 0 && town_hall_level.is_none() {
            return Err(SimError::MissingTownHall);
        }
    }

    base.update_is_upgradeable(town_hall_level)?;
    if !base.is_upgradeable() {
        return Err(SimError::NotUpgradeable);
    }

    let next = base.row_or_err()?.level_or_err(base.level + 1)?;
    let build_secs = next.build_time_secs;

    tracing::info!(%id, level = base.level + 1, build_secs, "construction started");

    if build_secs == 0 {
        return finish_construction(obj, id, ctx).map(Some);
    }

    base.timer.start(ctx.now, tick, build_secs)?;
    ctx.workers.allocate(id);
    Ok(None)
}

/// Cancel an in-flight construction
///
/// Refunds half of the next level's build cost (rounded to nearest) and
/// leaves the level untouched.
pub(crate) fn cancel_construction(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    _tick: Tick,
) -> Result<()> {
    let base = buildable_mut(obj, id)?;

    if !base.is_constructing() {
        return Err(SimError::NotConstructing);
    }

    let next = base.row_or_err()?.level_or_err(base.level + 1)?;
    let refund = (next.build_cost as f64 * ctx.config.cancel_refund_ratio).round() as i64;
    let resource = next.build_resource.clone();

    base.timer.stop();
    ctx.workers.deallocate(id);
    ctx.player.deposit(&resource, refund);

    tracing::info!(%id, refund, %resource, "construction cancelled");
    Ok(())
}

/// Force an in-flight construction to finish now.
pub(crate) fn speed_up_construction(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    _tick: Tick,
) -> Result<TickEvent> {
    let base = buildable_mut(obj, id)?;
    if !base.is_constructing() {
        return Err(SimError::NotConstructing);
    }
    finish_construction(obj, id, ctx)
}

// Shared completion path for natural, instant, and sped-up construction.
//
// Experience is computed from the duration the data tables configured for
// the finished level, not from elapsed wall time.
fn finish_construction(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
) -> Result<TickEvent> {
    let town_hall_level = ctx.town_hall_level;
    let base = buildable_mut(obj, id)?;

    let finished = base.row_or_err()?.level_or_err(base.level + 1)?;
    let build_secs = finished.build_time_secs;
    let role = base.row_or_err()?.role;

    base.timer.stop();
    base.level += 1;
    base.snapshot_or_err()?;
    base.update_is_upgradeable(town_hall_level)?;
    let level = base.level;

    ctx.workers.deallocate(id);
    if role == GroupRole::WorkerHut && level == 0 {
        ctx.workers.add_capacity(1);
    }
    ctx.player.grant_experience(experience_for_duration(build_secs));

    tracing::info!(%id, level, "construction finished");
    Ok(TickEvent::Leveled { id, level })
}

/// Per-tick update: complete the construction once its timer lapses
///
/// While idle but resolved, the upgradeability derivation is kept fresh so
/// town-hall upgrades elsewhere in the village are reflected without an
/// explicit refresh call.
pub(crate) fn tick_buildable(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    tick: Tick,
) -> Result<Option<TickEvent>> {
    let town_hall_level = ctx.town_hall_level;
    let base = buildable_mut(obj, id)?;

    if base.timer.tick(tick) {
        return finish_construction(obj, id, ctx).map(Some);
    }

    if base.row().is_some() {
        base.update_is_upgradeable(town_hall_level)?;
    }
    Ok(None)
}
