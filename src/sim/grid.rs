//! Spatial registry
//!
//! The only place entities and segments can be found through. Entities are
//! indexed twice (by type and by occupying cell); segments once (by cell).
//! Bucket contents keep insertion order, which decides the order collisions
//! are resolved in.

use glam::DVec2;

use super::entity::{Entity, EntityId};
use super::segment::{Segment, SegmentId};
use crate::consts::{GRID_HEIGHT, GRID_WIDTH, MAX_ENTITY_TYPE, SEGMENT_GRID_HEIGHT, SEGMENT_GRID_WIDTH};
use crate::{cell_of, clamp_cell};

/// A cell in the tile/entity grid
pub type Cell = (usize, usize);

/// Cell of an entity positioned outside the grid. Never indexable.
pub const OFF_GRID: Cell = (GRID_WIDTH, GRID_HEIGHT);

#[derive(Debug, Clone)]
pub struct SpatialRegistry {
    entities: Vec<Entity>,
    by_type: Vec<Vec<EntityId>>,
    by_cell: Vec<Vec<EntityId>>,
    segments: Vec<Segment>,
    segment_cells: Vec<Vec<SegmentId>>,
}

impl Default for SpatialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialRegistry {
    /// Registry with every bucket allocated and empty
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            by_type: vec![Vec::new(); MAX_ENTITY_TYPE as usize + 1],
            by_cell: vec![Vec::new(); GRID_WIDTH * GRID_HEIGHT],
            segments: Vec::new(),
            segment_cells: vec![Vec::new(); SEGMENT_GRID_WIDTH * SEGMENT_GRID_HEIGHT],
        }
    }

    /// Drop all entities, keeping geometry
    pub fn clear_entities(&mut self) {
        self.entities.clear();
        self.by_type.iter_mut().for_each(Vec::clear);
        self.by_cell.iter_mut().for_each(Vec::clear);
    }

    /// Drop all geometry, keeping entities
    pub fn clear_segments(&mut self) {
        self.segments.clear();
        self.segment_cells.iter_mut().for_each(Vec::clear);
    }

    fn cell_index(cell: Cell) -> usize {
        assert!(
            cell.0 < GRID_WIDTH && cell.1 < GRID_HEIGHT,
            "entity cell {cell:?} outside {GRID_WIDTH}x{GRID_HEIGHT} grid"
        );
        cell.1 * GRID_WIDTH + cell.0
    }

    fn segment_cell_index(cell: Cell) -> usize {
        assert!(
            cell.0 < SEGMENT_GRID_WIDTH && cell.1 < SEGMENT_GRID_HEIGHT,
            "segment cell {cell:?} outside {SEGMENT_GRID_WIDTH}x{SEGMENT_GRID_HEIGHT} grid"
        );
        cell.1 * SEGMENT_GRID_WIDTH + cell.0
    }

    // === Entities ===

    /// Register an entity under its type and its cell.
    ///
    /// # Panics
    /// If the entity's type has no bucket or its cell is outside the grid.
    /// Both are checked before either index is touched.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        assert!(
            entity.entity_type <= MAX_ENTITY_TYPE,
            "entity type {} has no bucket",
            entity.entity_type
        );
        let cell_idx = Self::cell_index(entity.cell);
        let id = EntityId(self.entities.len() as u32);
        self.by_type[entity.entity_type as usize].push(id);
        self.by_cell[cell_idx].push(id);
        self.entities.push(entity);
        id
    }

    /// Remove an entity from both indices. No-op if it is not indexed.
    /// The entity stays readable through [`Self::entity`].
    pub fn remove_entity(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id.0 as usize) else {
            return;
        };
        let type_bucket = &mut self.by_type[entity.entity_type as usize];
        let Some(pos) = type_bucket.iter().position(|&e| e == id) else {
            return;
        };
        type_bucket.remove(pos);
        let cell_bucket = &mut self.by_cell[Self::cell_index(entity.cell)];
        cell_bucket.retain(|&e| e != id);
    }

    /// Whether the entity is currently indexed
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities
            .get(id.0 as usize)
            .is_some_and(|e| self.by_type[e.entity_type as usize].contains(&id))
    }

    /// Move an indexed entity to the bucket of `cell`.
    /// Its position in the type bucket is unchanged.
    pub fn move_entity(&mut self, id: EntityId, cell: Cell) {
        let new_idx = Self::cell_index(cell);
        let old = self.entities[id.0 as usize].cell;
        if old == cell || !self.contains(id) {
            return;
        }
        self.by_cell[Self::cell_index(old)].retain(|&e| e != id);
        self.by_cell[new_idx].push(id);
        self.entities[id.0 as usize].cell = cell;
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0 as usize]
    }

    /// Every entity ever added since the last clear, indexed or not
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities whose owning cell is `cell`, in insertion order
    pub fn entities_in_cell(&self, cell: Cell) -> &[EntityId] {
        &self.by_cell[Self::cell_index(cell)]
    }

    /// Entities of one type, in insertion order
    pub fn entities_of_type(&self, entity_type: u8) -> &[EntityId] {
        assert!(entity_type <= MAX_ENTITY_TYPE, "entity type {entity_type} has no bucket");
        &self.by_type[entity_type as usize]
    }

    /// Entities of every type, type by type
    pub fn entities_by_type(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_type.iter().flatten().copied()
    }

    /// Entities in the 3x3 cells around `pos` (columns outer, rows inner)
    pub fn neighbourhood(&self, pos: DVec2) -> Vec<EntityId> {
        let (cx, cy) = cell_of(pos);
        let (x1, y1) = clamp_cell(cx - 1, cy - 1);
        let (x2, y2) = clamp_cell(cx + 1, cy + 1);
        let mut out = Vec::new();
        for x in x1..=x2 {
            for y in y1..=y2 {
                out.extend_from_slice(self.entities_in_cell((x, y)));
            }
        }
        out
    }

    /// Mutable access to one entity together with the segment arena, so
    /// door entities can switch their own segment
    pub fn entity_and_segments_mut(&mut self, id: EntityId) -> (&mut Entity, &mut [Segment]) {
        (&mut self.entities[id.0 as usize], &mut self.segments)
    }

    // === Segments ===

    /// Add a segment to the arena and register it under `cell`
    pub fn add_segment(&mut self, cell: Cell, segment: Segment) -> SegmentId {
        let idx = Self::segment_cell_index(cell);
        let id = SegmentId(self.segments.len() as u32);
        self.segments.push(segment);
        self.segment_cells[idx].push(id);
        id
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0 as usize]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.0 as usize]
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segments registered under `cell`, active or not
    pub fn segments_in_cell(&self, cell: Cell) -> &[SegmentId] {
        &self.segment_cells[Self::segment_cell_index(cell)]
    }

    /// Active segments of an inclusive cell rectangle, columns outer
    pub fn segments_in_region(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> Vec<SegmentId> {
        let mut out = Vec::new();
        for x in x1..=x2 {
            for y in y1..=y2 {
                out.extend(
                    self.segments_in_cell((x, y))
                        .iter()
                        .copied()
                        .filter(|&id| self.segment(id).active),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EntityKind;

    fn gold_at(x: f64, y: f64) -> Entity {
        Entity::new(2, DVec2::new(x, y), 0, EntityKind::Gold)
    }

    #[test]
    fn test_add_indexes_type_and_cell() {
        let mut reg = SpatialRegistry::new();
        let a = reg.add_entity(gold_at(30.0, 30.0));
        let b = reg.add_entity(gold_at(40.0, 30.0));
        assert_eq!(reg.entities_of_type(2), &[a, b]);
        assert_eq!(reg.entities_in_cell((1, 1)), &[a, b]);
        assert!(reg.entities_in_cell((0, 0)).is_empty());
    }

    #[test]
    fn test_remove_clears_both_indices() {
        let mut reg = SpatialRegistry::new();
        let a = reg.add_entity(gold_at(30.0, 30.0));
        let b = reg.add_entity(gold_at(100.0, 30.0));
        reg.remove_entity(a);
        assert!(!reg.contains(a));
        assert_eq!(reg.entities_of_type(2), &[b]);
        assert!(reg.entities_in_cell((1, 1)).is_empty());
        // Second removal is a no-op
        reg.remove_entity(a);
        reg.remove_entity(EntityId(99));
        assert_eq!(reg.entities_of_type(2), &[b]);
    }

    #[test]
    fn test_move_rebuckets_cell_only() {
        let mut reg = SpatialRegistry::new();
        let a = reg.add_entity(gold_at(30.0, 30.0));
        let b = reg.add_entity(gold_at(30.0, 30.0));
        reg.move_entity(a, (2, 1));
        assert_eq!(reg.entities_in_cell((1, 1)), &[b]);
        assert_eq!(reg.entities_in_cell((2, 1)), &[a]);
        assert_eq!(reg.entities_of_type(2), &[a, b]);
        assert_eq!(reg.entity(a).cell, (2, 1));
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_off_grid_entity_refused() {
        let mut reg = SpatialRegistry::new();
        let gold = gold_at(1500.0, 1500.0);
        assert_eq!(gold.cell, OFF_GRID);
        assert_eq!(gold.current_cell(), None);
        reg.add_entity(gold);
    }

    #[test]
    fn test_neighbourhood_order_and_clamp() {
        let mut reg = SpatialRegistry::new();
        let far = reg.add_entity(gold_at(200.0, 200.0));
        let right = reg.add_entity(gold_at(30.0, 6.0));
        let origin = reg.add_entity(gold_at(6.0, 30.0));
        let near = reg.neighbourhood(DVec2::new(5.0, 5.0));
        assert_eq!(near, vec![origin, right]);
        assert!(!near.contains(&far));
    }

    #[test]
    fn test_segments_filter_inactive() {
        let mut reg = SpatialRegistry::new();
        let a = reg.add_segment((1, 1), Segment::linear(DVec2::ZERO, DVec2::X));
        let b = reg.add_segment((2, 1), Segment::linear(DVec2::ZERO, DVec2::Y));
        reg.segment_mut(a).active = false;
        assert_eq!(reg.segments_in_region(0, 0, 3, 3), vec![b]);
        assert_eq!(reg.segments_in_cell((1, 1)), &[a]);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_query_panics() {
        let reg = SpatialRegistry::new();
        let _ = reg.entities_in_cell((GRID_WIDTH, 0));
    }
}
