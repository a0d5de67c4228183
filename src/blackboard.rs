use gulde_common::{Cell, Position};
use gulde_navigation::Pathfinder;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the rest of the host may know about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub position: Position,
    pub cell: Cell,
    pub moving: bool,
    pub travel_percentage: f32,
    pub arrivals: u64,
}

impl EntitySnapshot {
    pub fn of(pathfinder: &Pathfinder) -> Self {
        EntitySnapshot {
            position: pathfinder.position(),
            cell: pathfinder.cell_position(),
            moving: pathfinder.is_moving(),
            travel_percentage: pathfinder.travel_percentage(),
            arrivals: pathfinder.progress().arrivals(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub time_scale: f32,
    pub tick: u64,
    pub entities: BTreeMap<String, EntitySnapshot>,
}

impl Default for World {
    fn default() -> Self {
        World {
            time_scale: 1.0,
            tick: 0,
            entities: BTreeMap::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<World>>;

pub fn new_blackboard(time_scale: f32) -> Blackboard {
    Arc::new(RwLock::new(World {
        time_scale,
        ..World::default()
    }))
}

pub fn snapshot(bb: &Blackboard) -> World {
    (*bb.read()).clone()
}

pub fn time_scale(bb: &Blackboard) -> f32 {
    bb.read().time_scale
}

#[cfg(test)]
pub fn set_time_scale(bb: &Blackboard, time_scale: f32) {
    bb.write().time_scale = time_scale.max(0.0);
}

pub fn record_tick(bb: &Blackboard, tick: u64) {
    bb.write().tick = tick;
}

pub fn update_entity(bb: &Blackboard, name: &str, entity: EntitySnapshot) {
    let mut g = bb.write();
    match g.entities.get_mut(name) {
        Some(existing) => *existing = entity,
        None => {
            g.entities.insert(name.to_string(), entity);
        }
    }
}
