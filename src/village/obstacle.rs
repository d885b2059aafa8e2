//! Obstacle clearing lifecycle
//!
//! Obstacles are one-shot: `Present` -> `Clearing` -> `Removed`. Completion
//! grants experience from the configured clear duration plus a gem reward
//! drawn from a fixed cycle, then removes the object from the table
//! entirely.

use std::sync::Arc;

use crate::assets::{DataGroup, DataLibrary};
use crate::core::config::GEM_CYCLE_LEN;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityKind, GameId, Tick};
use crate::player::experience_for_duration;
use crate::village::object::{ObjectBody, VillageObject};
use crate::village::timer::TickTimer;
use crate::village::{LogicCtx, TickEvent};

/// A clearable, non-upgradeable object (tree, rock, bush)
#[derive(Debug, Clone, Default)]
pub struct Obstacle {
    data_id: u32,
    row: Option<Arc<DataGroup>>,
    pub(crate) timer: TickTimer,
    /// Multiplier applied by the host to loot dropped from this obstacle.
    pub loot_multiplier: i32,
}

impl Obstacle {
    pub fn new(data_id: u32) -> Self {
        Self {
            data_id,
            row: None,
            timer: TickTimer::new(),
            loot_multiplier: 0,
        }
    }

    pub fn data_id(&self) -> u32 {
        self.data_id
    }

    pub fn is_clearing(&self) -> bool {
        self.timer.is_active()
    }

    /// Remaining clear time in seconds; 0 while idle.
    pub fn clear_secs(&self) -> i64 {
        self.timer.remaining_secs()
    }

    pub(crate) fn resolve_row(&mut self, assets: &DataLibrary) -> Result<Arc<DataGroup>> {
        if self.row.is_none() {
            self.row = Some(assets.group(EntityKind::Obstacle, self.data_id)?);
        }
        Ok(self.row.as_ref().cloned().expect("row just resolved"))
    }

    pub(crate) fn load(&mut self, data_id: u32) {
        self.data_id = data_id;
        self.row = None;
    }

    pub(crate) fn reset(&mut self) {
        self.data_id = 0;
        self.row = None;
        self.timer.reset();
        self.loot_multiplier = 0;
    }
}

fn obstacle_mut(obj: &mut VillageObject, id: GameId) -> Result<&mut Obstacle> {
    match &mut obj.body {
        ObjectBody::Obstacle(obstacle) => Ok(obstacle),
        _ => Err(SimError::NotAnObstacle(id)),
    }
}

/// Start clearing the obstacle
///
/// A zero clear duration completes synchronously and returns the removal
/// event; otherwise a worker is allocated and the timer starts.
pub(crate) fn begin_clearing(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    tick: Tick,
) -> Result<Option<TickEvent>> {
    let obstacle = obstacle_mut(obj, id)?;

    if obstacle.is_clearing() {
        return Err(SimError::AlreadyClearing);
    }

    let row = obstacle.resolve_row(ctx.assets)?;
    let clear_secs = row.level_or_err(0)?.build_time_secs;

    tracing::info!(%id, clear_secs, "clearing started");

    if clear_secs == 0 {
        return finish_clear(obj, id, ctx, tick).map(Some);
    }

    obstacle.timer.start(ctx.now, tick, clear_secs)?;
    ctx.workers.allocate(id);
    Ok(None)
}

/// Cancel an in-flight clear without removing the obstacle.
pub(crate) fn cancel_clearing(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    _tick: Tick,
) -> Result<()> {
    let obstacle = obstacle_mut(obj, id)?;

    if !obstacle.is_clearing() {
        return Err(SimError::NotClearing);
    }

    obstacle.timer.stop();
    ctx.workers.deallocate(id);

    tracing::info!(%id, "clearing cancelled");
    Ok(())
}

/// Shared completion path for natural and forced clear completion
///
/// Grants experience from the configured clear duration and the next gem
/// reward in the village's 20-entry cycle. The returned event tells the
/// driver to remove the object from the table.
pub(crate) fn finish_clear(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    _tick: Tick,
) -> Result<TickEvent> {
    let obstacle = obstacle_mut(obj, id)?;

    let row = obstacle.resolve_row(ctx.assets)?;
    let clear_secs = row.level_or_err(0)?.build_time_secs;

    obstacle.timer.stop();
    ctx.workers.deallocate(id);

    let gems = ctx.config.obstacle_gem_rewards[*ctx.obstacle_clears as usize % GEM_CYCLE_LEN];
    *ctx.obstacle_clears = (*ctx.obstacle_clears + 1) % GEM_CYCLE_LEN as u32;
    ctx.player.grant_gems(gems);
    ctx.player
        .grant_experience(experience_for_duration(clear_secs));

    tracing::info!(%id, gems, "clearing finished");
    Ok(TickEvent::Cleared { id })
}

/// Per-tick update: finish the clear once its timer lapses.
pub(crate) fn tick_obstacle(
    obj: &mut VillageObject,
    id: GameId,
    ctx: &mut LogicCtx<'_>,
    tick: Tick,
) -> Result<Option<TickEvent>> {
    let obstacle = obstacle_mut(obj, id)?;
    if obstacle.timer.tick(tick) {
        return finish_clear(obj, id, ctx, tick).map(Some);
    }
    Ok(None)
}
