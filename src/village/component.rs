//! Attachable behavior components
//!
//! Every village object carries a small fixed array of component slots,
//! addressed by component kind. Components are pooled across villages just
//! like objects are, so their state must be fully resettable.

/// Number of component slots on every village object.
pub const COMPONENT_SLOTS: usize = 8;

/// Kind of an attachable component; doubles as the slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    UnitProduction,
    ResourceCollector,
}

impl ComponentKind {
    /// Slot index of this component kind.
    pub fn index(self) -> usize {
        match self {
            ComponentKind::UnitProduction => 0,
            ComponentKind::ResourceCollector => 1,
        }
    }
}

/// Unit production queue attached to army buildings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitProduction {
    pub capacity: i32,
    pub queued: i32,
}

/// Passive resource generation attached to collector buildings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCollector {
    pub rate_per_hour: i64,
    pub stored: i64,
}

/// Attachable behavior module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    UnitProduction(UnitProduction),
    ResourceCollector(ResourceCollector),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::UnitProduction(_) => ComponentKind::UnitProduction,
            Component::ResourceCollector(_) => ComponentKind::ResourceCollector,
        }
    }

    // Clears all state so the component can be reused; invoked by the
    // component pool on pop, never by entity logic.
    pub(super) fn reset(&mut self) {
        match self {
            Component::UnitProduction(state) => *state = UnitProduction::default(),
            Component::ResourceCollector(state) => *state = ResourceCollector::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_to_slot() {
        let comp = Component::UnitProduction(UnitProduction {
            capacity: 20,
            queued: 3,
        });
        assert_eq!(comp.kind().index(), 0);

        let comp = Component::ResourceCollector(ResourceCollector::default());
        assert_eq!(comp.kind().index(), 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut comp = Component::UnitProduction(UnitProduction {
            capacity: 20,
            queued: 3,
        });
        comp.reset();
        assert_eq!(
            comp,
            Component::UnitProduction(UnitProduction::default())
        );
    }
}
