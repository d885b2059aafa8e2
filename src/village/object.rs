//! Village objects — the entities stored in the object table
//!
//! One struct covers every placeable kind; the kind-specific state lives in
//! [`ObjectBody`]. Objects do not hold a reference to their village: the
//! table owns them, and village-level state reaches them through the logic
//! context passed into each operation.

use std::sync::Arc;

use crate::assets::{DataGroup, DataLibrary};
use crate::core::config::EngineConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{EntityKind, GameId, Tick};
use crate::village::buildable::{tick_buildable, Building, Trap};
use crate::village::component::{Component, ComponentKind, COMPONENT_SLOTS};
use crate::village::obstacle::{tick_obstacle, Obstacle};
use crate::village::pool::ComponentPool;
use crate::village::{LogicCtx, TickEvent};

/// Column index sentinel for an object that is not in any table.
pub const DETACHED_COLUMN: i64 = -1;

/// Kind-specific state of a village object
#[derive(Debug, Clone)]
pub enum ObjectBody {
    Building(Building),
    Obstacle(Obstacle),
    Trap(Trap),
    Decoration(Decoration),
}

impl ObjectBody {
    pub fn kind(&self) -> EntityKind {
        match self {
            ObjectBody::Building(_) => EntityKind::Building,
            ObjectBody::Obstacle(_) => EntityKind::Obstacle,
            ObjectBody::Trap(_) => EntityKind::Trap,
            ObjectBody::Decoration(_) => EntityKind::Decoration,
        }
    }
}

/// Purely cosmetic object; no lifecycle beyond placement
#[derive(Debug, Clone, Default)]
pub struct Decoration {
    pub(crate) data_id: u32,
    pub(crate) row: Option<Arc<DataGroup>>,
}

impl Decoration {
    pub fn new(data_id: u32) -> Self {
        Self { data_id, row: None }
    }

    pub fn data_id(&self) -> u32 {
        self.data_id
    }

    pub(crate) fn load(&mut self, data_id: u32) {
        self.data_id = data_id;
        self.row = None;
    }

    pub(crate) fn resolve_row(&mut self, assets: &DataLibrary) -> Result<Arc<DataGroup>> {
        if self.row.is_none() {
            self.row = Some(assets.group(EntityKind::Decoration, self.data_id)?);
        }
        Ok(self.row.as_ref().cloned().expect("row just resolved"))
    }
}

/// The task an object currently holds a worker for
///
/// A closed view used by the worker scheduler so it never needs to match on
/// concrete object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTask {
    Construction { remaining_secs: i64 },
    Clearing { remaining_secs: i64 },
}

impl ActiveTask {
    pub fn remaining_secs(self) -> i64 {
        match self {
            ActiveTask::Construction { remaining_secs } => remaining_secs,
            ActiveTask::Clearing { remaining_secs } => remaining_secs,
        }
    }
}

/// One placed object in a village
#[derive(Debug, Clone)]
pub struct VillageObject {
    // Position within the kind's table row; DETACHED_COLUMN while pooled.
    pub(crate) column_index: i64,
    x: i32,
    y: i32,
    // Times this object has been handed back out of a pool.
    pub(crate) reuse_count: u32,
    components: [Option<Component>; COMPONENT_SLOTS],
    pub body: ObjectBody,
}

impl VillageObject {
    /// New detached object with the given body at the grid origin.
    pub fn new(body: ObjectBody) -> Self {
        Self {
            column_index: DETACHED_COLUMN,
            x: 0,
            y: 0,
            reuse_count: 0,
            components: std::array::from_fn(|_| None),
            body,
        }
    }

    /// New detached object with an empty body of the given kind.
    pub(crate) fn bare(kind: EntityKind) -> Self {
        let body = match kind {
            EntityKind::Building => ObjectBody::Building(Building::default()),
            EntityKind::Obstacle => ObjectBody::Obstacle(Obstacle::default()),
            EntityKind::Trap => ObjectBody::Trap(Trap::default()),
            EntityKind::Decoration => ObjectBody::Decoration(Decoration::default()),
        };
        Self::new(body)
    }

    pub fn kind(&self) -> EntityKind {
        self.body.kind()
    }

    /// Packed identifier; `None` while the object is not in a table.
    pub fn id(&self) -> Option<GameId> {
        if self.column_index < 0 {
            return None;
        }
        Some(GameId::encode(self.kind(), self.column_index as u32))
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    /// Move the object on the grid, bounds-checked against the village size.
    pub fn set_position(&mut self, x: i32, y: i32, config: &EngineConfig) -> Result<()> {
        if x < 0 || x > config.village_width {
            return Err(SimError::CoordinateOutOfRange {
                value: x,
                max: config.village_width,
            });
        }
        if y < 0 || y > config.village_height {
            return Err(SimError::CoordinateOutOfRange {
                value: y,
                max: config.village_height,
            });
        }
        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Times this object has been recycled through a pool.
    pub fn reuse_count(&self) -> u32 {
        self.reuse_count
    }

    /// Attach a component, replacing any previous one in its slot.
    pub fn attach_component(&mut self, component: Component) {
        let slot = component.kind().index();
        self.components[slot] = Some(component);
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components[kind.index()].as_ref()
    }

    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components[kind.index()].as_mut()
    }

    /// Detach a component and hand it back to the component pool.
    pub fn remove_component(&mut self, kind: ComponentKind, pool: &ComponentPool) -> bool {
        match self.components[kind.index()].take() {
            Some(component) => {
                pool.push(component);
                true
            }
            None => false,
        }
    }

    /// The task this object currently runs, if any.
    pub fn active_task(&self) -> Option<ActiveTask> {
        match &self.body {
            ObjectBody::Building(building) if building.base.is_constructing() => {
                Some(ActiveTask::Construction {
                    remaining_secs: building.base.timer.remaining_secs(),
                })
            }
            ObjectBody::Trap(trap) if trap.base.is_constructing() => {
                Some(ActiveTask::Construction {
                    remaining_secs: trap.base.timer.remaining_secs(),
                })
            }
            ObjectBody::Obstacle(obstacle) if obstacle.is_clearing() => {
                Some(ActiveTask::Clearing {
                    remaining_secs: obstacle.timer.remaining_secs(),
                })
            }
            _ => None,
        }
    }

    pub fn as_building(&self) -> Option<&Building> {
        match &self.body {
            ObjectBody::Building(building) => Some(building),
            _ => None,
        }
    }

    pub fn as_building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.body {
            ObjectBody::Building(building) => Some(building),
            _ => None,
        }
    }

    pub fn as_obstacle(&self) -> Option<&Obstacle> {
        match &self.body {
            ObjectBody::Obstacle(obstacle) => Some(obstacle),
            _ => None,
        }
    }

    pub fn as_trap(&self) -> Option<&Trap> {
        match &self.body {
            ObjectBody::Trap(trap) => Some(trap),
            _ => None,
        }
    }

    pub fn as_trap_mut(&mut self) -> Option<&mut Trap> {
        match &mut self.body {
            ObjectBody::Trap(trap) => Some(trap),
            _ => None,
        }
    }

    pub fn as_obstacle_mut(&mut self) -> Option<&mut Obstacle> {
        match &mut self.body {
            ObjectBody::Obstacle(obstacle) => Some(obstacle),
            _ => None,
        }
    }

    pub fn as_decoration(&self) -> Option<&Decoration> {
        match &self.body {
            ObjectBody::Decoration(decoration) => Some(decoration),
            _ => None,
        }
    }

    /// Advance this object by one tick, applying completion effects.
    pub(crate) fn tick(
        &mut self,
        id: GameId,
        ctx: &mut LogicCtx<'_>,
        tick: Tick,
    ) -> Result<Option<TickEvent>> {
        match self.kind() {
            EntityKind::Building | EntityKind::Trap => tick_buildable(self, id, ctx, tick),
            EntityKind::Obstacle => tick_obstacle(self, id, ctx, tick),
            EntityKind::Decoration => Ok(None),
        }
    }

    // Clears all village-scoped state so the object can be reused.
    //
    // Invoked by the object pool on pop, never by entity logic; a popped
    // object must be indistinguishable from a freshly built one apart from
    // its reuse counter.
    pub(super) fn reset_for_reuse(&mut self, components: &ComponentPool) {
        self.column_index = DETACHED_COLUMN;
        self.x = 0;
        self.y = 0;
        for slot in &mut self.components {
            if let Some(component) = slot.take() {
                components.push(component);
            }
        }
        match &mut self.body {
            ObjectBody::Building(building) => building.reset(),
            ObjectBody::Obstacle(obstacle) => obstacle.reset(),
            ObjectBody::Trap(trap) => trap.reset(),
            ObjectBody::Decoration(decoration) => *decoration = Decoration::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::village::component::UnitProduction;

    #[test]
    fn test_detached_object_has_no_id() {
        let obj = VillageObject::bare(EntityKind::Building);
        assert_eq!(obj.id(), None);
    }

    #[test]
    fn test_attached_id_uses_kind_and_column() {
        let mut obj = VillageObject::bare(EntityKind::Trap);
        obj.column_index = 7;
        assert_eq!(obj.id(), Some(GameId::encode(EntityKind::Trap, 7)));
    }

    #[test]
    fn test_set_position_bounds_checked() {
        let config = EngineConfig::default();
        let mut obj = VillageObject::bare(EntityKind::Decoration);
        assert!(obj.set_position(10, 20, &config).is_ok());
        assert_eq!((obj.x(), obj.y()), (10, 20));

        assert!(obj.set_position(-1, 0, &config).is_err());
        assert!(obj.set_position(0, 49, &config).is_err());
        // Failed moves leave the position untouched.
        assert_eq!((obj.x(), obj.y()), (10, 20));
    }

    #[test]
    fn test_component_slots() {
        let mut obj = VillageObject::bare(EntityKind::Building);
        assert!(obj.component(ComponentKind::UnitProduction).is_none());

        obj.attach_component(Component::UnitProduction(UnitProduction {
            capacity: 10,
            queued: 0,
        }));
        assert!(obj.component(ComponentKind::UnitProduction).is_some());
        assert!(obj.component(ComponentKind::ResourceCollector).is_none());
    }

    #[test]
    fn test_idle_object_has_no_active_task() {
        let obj = VillageObject::bare(EntityKind::Building);
        assert_eq!(obj.active_task(), None);
    }
}
