//! Entity lifecycle registry
//!
//! Owns every creature, room, trap, missile, and map light on the map, in
//! insertion order, and mediates add/remove so tile back-references and the
//! active-object roster stay consistent. Destruction is deferred: removal
//! takes an entity out of enumeration immediately, but the value itself is
//! parked in a graveyard and dropped only when the turn engine flushes the
//! deletion queues.

use ahash::AHashMap;
use tracing::debug;

use crate::core::types::{CreatureId, FactionColor, LightId, MissileId, RoomId, TrapId, Turn};
use crate::map::coord::TileCoord;
use crate::entities::capability::{Attackable, UpkeepEnv, UpkeepOutcome, Upkeepable};
use crate::entities::creature::Creature;
use crate::entities::light::MapLight;
use crate::entities::missile::Missile;
use crate::entities::room::{Room, RoomType};
use crate::entities::trap::Trap;
use crate::game::notify::{OutboundQueue, ServerNotification};
use crate::map::grid::TileGrid;

/// Handle to any entity in the active-object roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveHandle {
    Room(RoomId),
    Trap(TrapId),
    Missile(MissileId),
}

/// Entity removed from the map, awaiting the deletion-queue flush
#[derive(Debug)]
pub enum DeadEntity {
    Creature(Creature),
    Room(Room),
    Trap(Trap),
    Missile(Missile),
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    creatures: AHashMap<CreatureId, Creature>,
    creature_order: Vec<CreatureId>,
    rooms: AHashMap<RoomId, Room>,
    room_order: Vec<RoomId>,
    traps: AHashMap<TrapId, Trap>,
    trap_order: Vec<TrapId>,
    missiles: AHashMap<MissileId, Missile>,
    missile_order: Vec<MissileId>,
    lights: AHashMap<LightId, MapLight>,
    light_order: Vec<LightId>,

    active: Vec<ActiveHandle>,
    pending_active: Vec<ActiveHandle>,

    entity_graveyard: Vec<DeadEntity>,
    light_graveyard: Vec<MapLight>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // === Creatures ===

    pub fn add_creature(
        &mut self,
        creature: Creature,
        grid: &mut TileGrid,
        outbound: &mut OutboundQueue,
    ) {
        grid.add_occupant(creature.position, creature.id);
        creature.set_on_map(true);
        outbound.push(ServerNotification::CreatureAdded {
            id: creature.id,
            name: creature.name.clone(),
        });
        self.creature_order.push(creature.id);
        self.creatures.insert(creature.id, creature);
    }

    /// Remove a creature from the map and enumeration. The value is
    /// returned so the caller can queue it for deferred deletion.
    pub fn remove_creature(
        &mut self,
        id: CreatureId,
        grid: &mut TileGrid,
        outbound: &mut OutboundQueue,
    ) -> Option<Creature> {
        let creature = self.creatures.remove(&id)?;
        self.creature_order.retain(|c| *c != id);
        grid.remove_occupant(creature.position, id);
        creature.set_on_map(false);
        outbound.push(ServerNotification::CreatureRemoved { id });
        Some(creature)
    }

    /// Temporarily take a creature out for its AI step. Pair with
    /// `put_creature`; enumeration order is preserved.
    pub fn take_creature(&mut self, id: CreatureId) -> Option<Creature> {
        self.creatures.remove(&id)
    }

    pub fn put_creature(&mut self, creature: Creature) {
        self.creatures.insert(creature.id, creature);
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    pub fn creature_by_index(&self, index: usize) -> Option<&Creature> {
        self.creature_order
            .get(index)
            .and_then(|id| self.creatures.get(id))
    }

    pub fn creature_by_name(&self, name: &str) -> Option<&Creature> {
        self.creatures_in_order().find(|c| c.name == name)
    }

    /// Registration order, the order creature turns run in
    pub fn creature_ids(&self) -> Vec<CreatureId> {
        self.creature_order.clone()
    }

    pub fn creatures_in_order(&self) -> impl Iterator<Item = &Creature> {
        self.creature_order
            .iter()
            .filter_map(|id| self.creatures.get(id))
    }

    pub fn creatures_by_color(&self, color: FactionColor) -> Vec<&Creature> {
        self.creatures_in_order()
            .filter(|c| c.color == color)
            .collect()
    }

    /// Faction of every living creature, keyed by id
    pub fn living_creature_colors(&self) -> AHashMap<CreatureId, FactionColor> {
        self.creatures
            .values()
            .filter(|c| c.hp() > 0.0)
            .map(|c| (c.id, c.color))
            .collect()
    }

    // === Rooms ===

    pub fn add_room(&mut self, room: Room, grid: &mut TileGrid) {
        for &coord in room.covered_tiles() {
            if let Some(tile) = grid.tile_mut(coord) {
                tile.covering_room = Some(room.id);
            }
        }
        self.active.push(ActiveHandle::Room(room.id));
        self.room_order.push(room.id);
        self.rooms.insert(room.id, room);
    }

    /// Remove a room, clearing every covered tile's back-reference.
    pub fn remove_room(&mut self, id: RoomId, grid: &mut TileGrid) -> Option<Room> {
        let room = self.rooms.remove(&id)?;
        self.room_order.retain(|r| *r != id);
        self.active.retain(|h| *h != ActiveHandle::Room(id));
        self.pending_active.retain(|h| *h != ActiveHandle::Room(id));
        for &coord in room.covered_tiles() {
            if let Some(tile) = grid.tile_mut(coord) {
                if tile.covering_room == Some(id) {
                    tile.covering_room = None;
                }
            }
        }
        Some(room)
    }

    /// Detach one covered tile from a room, clearing the tile's
    /// back-reference in the same step so neither side can go stale.
    pub fn release_room_tile(&mut self, id: RoomId, coord: TileCoord, grid: &mut TileGrid) {
        if let Some(room) = self.rooms.get_mut(&id) {
            room.release_tile(coord);
        }
        if let Some(tile) = grid.tile_mut(coord) {
            if tile.covering_room == Some(id) {
                tile.covering_room = None;
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn room_by_index(&self, index: usize) -> Option<&Room> {
        self.room_order.get(index).and_then(|id| self.rooms.get(id))
    }

    pub fn room_by_name(&self, name: &str) -> Option<&Room> {
        self.rooms_in_order().find(|r| r.name == name)
    }

    pub fn rooms_in_order(&self) -> impl Iterator<Item = &Room> {
        self.room_order.iter().filter_map(|id| self.rooms.get(id))
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.room_order.clone()
    }

    pub fn rooms_by_type(&self, room_type: RoomType) -> Vec<&Room> {
        self.rooms_in_order()
            .filter(|r| r.room_type == room_type)
            .collect()
    }

    pub fn rooms_by_type_and_color(&self, room_type: RoomType, color: FactionColor) -> Vec<&Room> {
        self.rooms_in_order()
            .filter(|r| r.room_type == room_type && r.color == color)
            .collect()
    }

    /// Gold across all treasuries owned by a faction
    pub fn total_gold_for_color(&self, color: FactionColor) -> i64 {
        self.rooms
            .values()
            .filter(|r| r.room_type == RoomType::Treasury && r.color == color)
            .map(|r| r.total_gold())
            .sum()
    }

    /// Deposit gold into the faction's first treasury. Returns the amount
    /// that found a home; gold is lost when the faction has no treasury.
    pub fn deposit_gold(&mut self, color: FactionColor, amount: i64) -> i64 {
        let id = self
            .rooms_in_order()
            .find(|r| r.room_type == RoomType::Treasury && r.color == color)
            .map(|r| r.id);
        match id.and_then(|id| self.rooms.get_mut(&id)) {
            Some(treasury) => treasury.deposit_gold(amount),
            None => 0,
        }
    }

    /// Withdraw `amount` spread across the faction's treasuries. Fails
    /// without taking anything when the total is insufficient.
    pub fn withdraw_from_treasuries(&mut self, color: FactionColor, amount: i64) -> bool {
        if self.total_gold_for_color(color) < amount {
            return false;
        }
        let treasuries: Vec<RoomId> = self
            .rooms_in_order()
            .filter(|r| r.room_type == RoomType::Treasury && r.color == color)
            .map(|r| r.id)
            .collect();
        let mut still_needed = amount;
        for id in treasuries {
            if still_needed <= 0 {
                break;
            }
            if let Some(room) = self.rooms.get_mut(&id) {
                still_needed -= room.withdraw_gold(still_needed);
            }
        }
        true
    }

    // === Traps ===

    pub fn add_trap(&mut self, trap: Trap, grid: &mut TileGrid) {
        for &coord in trap.covered_tiles() {
            if let Some(tile) = grid.tile_mut(coord) {
                tile.covering_trap = Some(trap.id);
            }
        }
        self.active.push(ActiveHandle::Trap(trap.id));
        self.trap_order.push(trap.id);
        self.traps.insert(trap.id, trap);
    }

    pub fn remove_trap(&mut self, id: TrapId, grid: &mut TileGrid) -> Option<Trap> {
        let trap = self.traps.remove(&id)?;
        self.trap_order.retain(|t| *t != id);
        self.active.retain(|h| *h != ActiveHandle::Trap(id));
        self.pending_active.retain(|h| *h != ActiveHandle::Trap(id));
        for &coord in trap.covered_tiles() {
            if let Some(tile) = grid.tile_mut(coord) {
                if tile.covering_trap == Some(id) {
                    tile.covering_trap = None;
                }
            }
        }
        Some(trap)
    }

    pub fn trap_count(&self) -> usize {
        self.traps.len()
    }

    pub fn trap(&self, id: TrapId) -> Option<&Trap> {
        self.traps.get(&id)
    }

    pub fn trap_by_index(&self, index: usize) -> Option<&Trap> {
        self.trap_order.get(index).and_then(|id| self.traps.get(id))
    }

    // === Missiles ===

    /// Missiles activate through the pending queue: they join the roster
    /// only after the current upkeep sweep completes.
    pub fn add_missile(&mut self, missile: Missile, outbound: &mut OutboundQueue) {
        outbound.push(ServerNotification::MissileAdded { id: missile.id });
        self.pending_active.push(ActiveHandle::Missile(missile.id));
        self.missile_order.push(missile.id);
        self.missiles.insert(missile.id, missile);
    }

    pub fn remove_missile(
        &mut self,
        id: MissileId,
        outbound: &mut OutboundQueue,
    ) -> Option<Missile> {
        let missile = self.missiles.remove(&id)?;
        self.missile_order.retain(|m| *m != id);
        self.active.retain(|h| *h != ActiveHandle::Missile(id));
        self.pending_active.retain(|h| *h != ActiveHandle::Missile(id));
        outbound.push(ServerNotification::MissileRemoved { id });
        Some(missile)
    }

    pub fn missile_count(&self) -> usize {
        self.missiles.len()
    }

    pub fn missile(&self, id: MissileId) -> Option<&Missile> {
        self.missiles.get(&id)
    }

    pub fn missile_by_index(&self, index: usize) -> Option<&Missile> {
        self.missile_order
            .get(index)
            .and_then(|id| self.missiles.get(id))
    }

    pub fn missile_by_name(&self, name: &str) -> Option<&Missile> {
        self.missile_order
            .iter()
            .filter_map(|id| self.missiles.get(id))
            .find(|m| m.name == name)
    }

    pub fn missiles_mut(&mut self) -> impl Iterator<Item = &mut Missile> {
        self.missiles.values_mut()
    }

    // === Map lights ===

    pub fn add_light(&mut self, light: MapLight) {
        self.light_order.push(light.id);
        self.lights.insert(light.id, light);
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn light(&self, id: LightId) -> Option<&MapLight> {
        self.lights.get(&id)
    }

    pub fn light_by_index(&self, index: usize) -> Option<&MapLight> {
        self.light_order
            .get(index)
            .and_then(|id| self.lights.get(id))
    }

    pub fn light_by_name(&self, name: &str) -> Option<&MapLight> {
        self.light_order
            .iter()
            .filter_map(|id| self.lights.get(id))
            .find(|l| l.name == name)
    }

    pub fn lights_mut(&mut self) -> impl Iterator<Item = &mut MapLight> {
        self.lights.values_mut()
    }

    /// Take a light off the map and park it for the deletion flush.
    pub fn queue_light_deletion(&mut self, id: LightId) {
        if let Some(light) = self.lights.remove(&id) {
            self.light_order.retain(|l| *l != id);
            self.light_graveyard.push(light);
        }
    }

    // === Active objects & deletion queues ===

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn queue_entity_deletion(&mut self, entity: DeadEntity) {
        self.entity_graveyard.push(entity);
    }

    /// Run one upkeep round over the active roster, in order.
    ///
    /// Entries reporting `Finished` (or whose entity has vanished) are
    /// removed in place without advancing the index, so removal neither
    /// skips nor double-visits entries. Returns missiles spawned during
    /// the sweep; the caller adds them and then activates the pending
    /// queue.
    pub fn run_active_upkeep(
        &mut self,
        grid: &mut TileGrid,
        outbound: &mut OutboundQueue,
        turn: Turn,
    ) -> Vec<Missile> {
        let creature_colors = self.living_creature_colors();
        let mut spawned = Vec::new();

        let mut i = 0;
        while i < self.active.len() {
            let handle = self.active[i];
            let outcome = {
                let mut env = UpkeepEnv {
                    grid: &mut *grid,
                    creature_colors: &creature_colors,
                    spawned_missiles: &mut spawned,
                    turn,
                };
                match handle {
                    ActiveHandle::Room(id) => self.rooms.get_mut(&id).map(|r| r.upkeep(&mut env)),
                    ActiveHandle::Trap(id) => self.traps.get_mut(&id).map(|t| t.upkeep(&mut env)),
                    ActiveHandle::Missile(id) => {
                        self.missiles.get_mut(&id).map(|m| m.upkeep(&mut env))
                    }
                }
            };

            match outcome {
                Some(UpkeepOutcome::Continue) => i += 1,
                Some(UpkeepOutcome::Finished) | None => {
                    self.active.remove(i);
                    self.retire_active(handle, grid, outbound);
                }
            }
        }

        spawned
    }

    /// Append objects that became active during the sweep.
    pub fn activate_pending(&mut self) {
        self.active.append(&mut self.pending_active);
    }

    fn retire_active(
        &mut self,
        handle: ActiveHandle,
        grid: &mut TileGrid,
        outbound: &mut OutboundQueue,
    ) {
        match handle {
            ActiveHandle::Room(id) => {
                if let Some(room) = self.remove_room(id, grid) {
                    self.entity_graveyard.push(DeadEntity::Room(room));
                }
            }
            ActiveHandle::Trap(id) => {
                if let Some(trap) = self.remove_trap(id, grid) {
                    self.entity_graveyard.push(DeadEntity::Trap(trap));
                }
            }
            ActiveHandle::Missile(id) => {
                if let Some(missile) = self.remove_missile(id, outbound) {
                    // Impact: hurt one enemy standing where the missile died
                    let impact = missile.position.nearest_tile();
                    let victim = grid.tile(impact).and_then(|tile| {
                        tile.occupants
                            .iter()
                            .find(|&&cid| {
                                self.creatures
                                    .get(&cid)
                                    .map(|c| c.color != missile.color)
                                    .unwrap_or(false)
                            })
                            .copied()
                    });
                    if let Some(cid) = victim {
                        if let Some(creature) = self.creatures.get_mut(&cid) {
                            creature.take_damage(missile.damage);
                        }
                    }
                    self.entity_graveyard.push(DeadEntity::Missile(missile));
                }
            }
        }
    }

    /// Drain the deletion queues and release everything in them. This is
    /// the only point entities are actually destroyed.
    pub fn flush_deletion_queues(&mut self, turn: Turn) {
        let entities = self.entity_graveyard.len();
        let lights = self.light_graveyard.len();
        if entities > 0 || lights > 0 {
            debug!(turn, entities, lights, "processing deletion queues");
        }
        self.entity_graveyard.clear();
        self.light_graveyard.clear();
    }

    /// Drop every entity and reset the rosters. Map-clear boundary.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }
}
