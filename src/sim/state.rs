//! Simulation state
//!
//! Everything a run needs lives in [`Simulation`]: parsed map, tile
//! geometry, the spatial registry, the collision cache and the actor.
//! Loading and resetting rebuild that state from scratch.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::collision::CollisionCache;
use super::entity::{CollisionRecord, EntityId, create_entity};
use super::geometry::TileGeometry;
use super::grid::SpatialRegistry;
use super::map::{MapData, MapError};
use crate::settings::SimConfig;

/// Externally visible state of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub entity_type: u8,
    pub pos: DVec2,
    pub active: bool,
}

/// Serialisable picture of a simulation at one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub frame: u64,
    pub actor: Option<Actor>,
    pub entities: Vec<EntityView>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub config: SimConfig,
    pub(crate) frame: u64,
    pub(crate) map: Option<MapData>,
    pub(crate) geometry: TileGeometry,
    pub(crate) registry: SpatialRegistry,
    pub(crate) cache: CollisionCache,
    pub(crate) collision_log: Vec<CollisionRecord>,
    pub(crate) actor: Option<Actor>,
}

impl Simulation {
    /// Empty simulation. Nothing moves until a map is loaded.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            frame: 0,
            map: None,
            geometry: TileGeometry::empty(),
            registry: SpatialRegistry::new(),
            cache: CollisionCache::new(),
            collision_log: Vec::new(),
            actor: None,
        }
    }

    /// Parse `bytes` and rebuild everything from it. A malformed map leaves
    /// the current state untouched.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), MapError> {
        let map = MapData::parse(bytes)?;
        self.geometry = TileGeometry::from_tiles(&map.tiles);
        self.map = Some(map);
        self.reset();
        log::info!(
            "Loaded map: {} segments, {} entities, spawn at ({:.1}, {:.1})",
            self.registry.segment_count(),
            self.registry.entity_count(),
            self.actor.as_ref().map_or(0.0, |a| a.pos.x),
            self.actor.as_ref().map_or(0.0, |a| a.pos.y),
        );
        Ok(())
    }

    /// Rewind to frame 0: fresh actor, fresh entities, tile geometry kept
    pub fn reset(&mut self) {
        self.frame = 0;
        self.collision_log.clear();
        self.cache.clear();

        // Door segments belong to entities, so geometry is re-registered too
        self.registry.clear_segments();
        self.geometry.register_segments(&mut self.registry);
        self.registry.clear_entities();

        let Some(map) = &self.map else {
            self.actor = None;
            return;
        };
        self.actor = Some(Actor::new(map.spawn.pos, map.spawn.facing));
        for record in &map.entities {
            if let Some(mut entity) = create_entity(&mut self.registry, record) {
                entity.log_position(0);
                self.registry.add_entity(entity);
            }
        }
    }

    // === Accessors ===

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn actor_mut(&mut self) -> Option<&mut Actor> {
        self.actor.as_mut()
    }

    pub fn registry(&self) -> &SpatialRegistry {
        &self.registry
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn map(&self) -> Option<&MapData> {
        self.map.as_ref()
    }

    pub fn cache(&self) -> &CollisionCache {
        &self.cache
    }

    /// Every entity event since the last reset
    pub fn collision_log(&self) -> &[CollisionRecord] {
        &self.collision_log
    }

    /// Whether the run is over (actor dead, celebrating or disabled)
    pub fn is_finished(&self) -> bool {
        self.actor.as_ref().is_none_or(|a| a.state.code() >= 6)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            actor: self.actor.clone(),
            entities: self
                .registry
                .entities()
                .map(|(id, e)| EntityView {
                    id,
                    entity_type: e.entity_type,
                    pos: e.pos,
                    active: e.active,
                })
                .collect(),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{TYPE_EXIT, TYPE_EXIT_SWITCH, TYPE_GOLD};
    use crate::sim::map::MapBuilder;

    fn loaded(bytes: &[u8]) -> Simulation {
        let mut sim = Simulation::default();
        sim.load(bytes).unwrap();
        sim
    }

    #[test]
    fn test_new_is_empty() {
        let sim = Simulation::default();
        assert_eq!(sim.frame(), 0);
        assert!(sim.actor().is_none());
        assert!(sim.is_finished());
        assert_eq!(sim.registry().entity_count(), 0);
    }

    #[test]
    fn test_load_builds_actor_and_entities() {
        let bytes = MapBuilder::new()
            .spawn(20, 20, 1)
            .entity(TYPE_GOLD, 30, 20, 0, 0)
            .exit(40, 20, 10, 20)
            .build();
        let sim = loaded(&bytes);
        let actor = sim.actor().unwrap();
        assert_eq!(actor.pos, DVec2::new(120.0, 120.0));
        assert_eq!(actor.facing, 1);
        assert_eq!(sim.registry().entities_of_type(TYPE_GOLD).len(), 1);
        assert_eq!(sim.registry().entities_of_type(TYPE_EXIT_SWITCH).len(), 1);
        let exit = sim.registry().entities_of_type(TYPE_EXIT)[0];
        assert!(!sim.registry().entity(exit).active);
        assert!(sim.registry().segment_count() > 0);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let bytes = MapBuilder::new().spawn(20, 20, 1).build();
        let mut sim = loaded(&bytes);
        let before = sim.snapshot();
        assert!(sim.load(&bytes[..100]).is_err());
        assert_eq!(sim.snapshot(), before);
    }

    #[test]
    fn test_off_grid_entity_fails_load() {
        let bytes = MapBuilder::new().spawn(20, 20, 1).entity(TYPE_GOLD, 250, 250, 0, 0).build();
        let mut sim = Simulation::default();
        assert!(matches!(sim.load(&bytes), Err(MapError::EntityOutOfGrid { .. })));
        assert!(sim.actor().is_none());
        assert_eq!(sim.registry().entity_count(), 0);
    }

    #[test]
    fn test_reset_does_not_duplicate_geometry() {
        let bytes = MapBuilder::new()
            .spawn(20, 20, 1)
            .entity(5, 40, 40, 0, 0)
            .build();
        let mut sim = loaded(&bytes);
        let segments = sim.registry().segment_count();
        let entities = sim.registry().entity_count();
        sim.reset();
        sim.reset();
        assert_eq!(sim.registry().segment_count(), segments);
        assert_eq!(sim.registry().entity_count(), entities);
    }

    #[test]
    fn test_snapshot_serialises() {
        let bytes = MapBuilder::new().spawn(20, 20, -1).entity(TYPE_GOLD, 30, 20, 0, 0).build();
        let sim = loaded(&bytes);
        let json = serde_json::to_string(&sim.snapshot()).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.frame, 0);
        assert_eq!(back.entities, sim.snapshot().entities);
    }
}
