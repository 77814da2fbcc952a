//! The turn engine: one discrete simulation step
//!
//! Phases run strictly in order: creature turns, misc upkeep (goals,
//! worker quotas, active objects, seat resources), the dead-creature
//! sweep, and finally the deferred-deletion flush. The engine runs on a
//! single thread and is not reentrant; everything a phase touches is
//! resolved before the next entity is processed.

use ahash::AHashMap;
use rand::Rng;
use tracing::{debug, info};

use crate::core::config::DIG_RATE;
use crate::core::types::FactionColor;
use crate::entities::capability::Attackable;
use crate::entities::creature::{Creature, CreatureAction, CreatureKind};
use crate::entities::registry::DeadEntity;
use crate::entities::room::RoomType;
use crate::game::goal::GoalView;
use crate::game::notify::ServerNotification;
use crate::game::world::GameWorld;
use crate::map::coord::TileCoord;
use crate::map::pathfinding::{self, step_allowed};
use crate::map::tile::{Passability, TileType};
use crate::map::visibility;

impl GameWorld {
    /// Run one full game turn.
    pub fn do_turn(&mut self) {
        self.turn_number += 1;
        let path_calls_at_start = self.ctx.path_calls();
        info!(turn = self.turn_number, "computing turn");

        // Stale connectivity colors would give wrong fast-path rejections
        // to every creature below, so repair the partition first.
        if self.connectivity.is_stale(&self.grid) {
            self.refresh_connectivity();
        }

        self.do_creature_turns();
        self.do_misc_upkeep();
        self.dead_creature_sweep();
        self.registry.flush_deletion_queues(self.turn_number);

        self.outbound.push(ServerNotification::TurnEnded {
            turn: self.turn_number,
        });
        debug!(
            turn = self.turn_number,
            path_calls = self.ctx.path_calls() - path_calls_at_start,
            "turn complete"
        );
    }

    /// Phase 1: every creature takes its AI step, in registration order.
    /// The id list is snapshotted up front, so creatures spawned during
    /// the sweep are first visited next turn.
    fn do_creature_turns(&mut self) {
        for id in self.registry.creature_ids() {
            let Some(mut creature) = self.registry.take_creature(id) else {
                continue;
            };
            self.creature_ai_step(&mut creature);
            self.registry.put_creature(creature);
        }
    }

    /// Phase 2: seat, goal, quota, and active-object upkeep.
    fn do_misc_upkeep(&mut self) {
        // Goals and winners, per filled seat
        let filled_colors: Vec<FactionColor> = self
            .seats
            .filled_seats()
            .iter()
            .map(|s| s.color)
            .collect();
        for color in &filled_colors {
            let view = self.build_goal_view(*color);
            let (unmet, failed) = match self.seats.seat_by_color_mut(*color) {
                Some(seat) => {
                    seat.check_all_completed_goals(&view);
                    let unmet = seat.check_all_goals(&view);
                    // Counter rebuilt by the dead-creature sweep
                    seat.controlled_creatures = 0;
                    (unmet, seat.num_failed_goals())
                }
                None => continue,
            };
            if unmet == 0 && failed == 0 {
                self.seats.add_winning_seat(*color);
            }
        }

        self.spawn_workers_for_temples();

        // Active-object upkeep; finished objects leave the roster within
        // this same pass, and anything spawned joins only afterwards.
        let spawned = self
            .registry
            .run_active_upkeep(&mut self.grid, &mut self.outbound, self.turn_number);
        for missile in spawned {
            self.add_missile(missile);
        }
        self.registry.activate_pending();

        // Rooms that lost their last covered tile are culled
        let empty_rooms: Vec<_> = self
            .registry
            .rooms_in_order()
            .filter(|r| r.num_covered_tiles() == 0)
            .map(|r| r.id)
            .collect();
        for id in empty_rooms {
            if let Some(room) = self.registry.remove_room(id, &mut self.grid) {
                debug!(room = %room.name, "removing emptied room");
                self.registry.queue_entity_deletion(DeadEntity::Room(room));
            }
        }

        // Seat resources: mana accrues from claimed tiles, gold mirrors the
        // treasuries.
        let gold_by_color: Vec<(FactionColor, i64)> = filled_colors
            .iter()
            .map(|c| (*c, self.registry.total_gold_for_color(*c)))
            .collect();
        for (color, gold) in gold_by_color {
            if let Some(seat) = self.seats.seat_by_color_mut(color) {
                seat.accrue_mana();
                seat.gold = gold;
            }
        }

        self.recount_claimed_tiles();
    }

    /// Phase 3: live creatures are credited to their seat; dead ones are
    /// removed and queued, never destroyed synchronously.
    fn dead_creature_sweep(&mut self) {
        for id in self.registry.creature_ids() {
            let Some((hp, color)) = self.registry.creature(id).map(|c| (c.hp(), c.color)) else {
                continue;
            };
            if hp > 0.0 {
                if let Some(seat) = self.seats.seat_by_color_mut(color) {
                    seat.controlled_creatures += 1;
                }
            } else if let Some(corpse) =
                self.registry
                    .remove_creature(id, &mut self.grid, &mut self.outbound)
            {
                debug!(creature = %corpse.name, "queueing dead creature for deletion");
                self.registry
                    .queue_entity_deletion(DeadEntity::Creature(corpse));
            }
        }
    }

    /// Each faction wants `4 * temples` workers, but spawns at most one
    /// per temple per turn.
    fn spawn_workers_for_temples(&mut self) {
        let mut worker_counts: AHashMap<FactionColor, i64> = AHashMap::new();
        for creature in self.registry.creatures_in_order() {
            if creature.kind.is_worker && creature.hp() > 0.0 {
                *worker_counts.entry(creature.color).or_insert(0) += 1;
            }
        }

        let temples: Vec<(FactionColor, Option<TileCoord>)> = self
            .registry
            .rooms_by_type(RoomType::DungeonTemple)
            .iter()
            .map(|r| (r.color, r.first_covered_tile()))
            .collect();

        let mut temple_counts: AHashMap<FactionColor, i64> = AHashMap::new();
        for (color, _) in &temples {
            *temple_counts.entry(*color).or_insert(0) += 1;
        }

        let mut needed: AHashMap<FactionColor, i64> = AHashMap::new();
        for (color, num_temples) in &temple_counts {
            let workers = worker_counts.get(color).copied().unwrap_or(0);
            let quota = (crate::core::config::WORKERS_PER_TEMPLE as i64 * num_temples - workers)
                .clamp(0, *num_temples);
            needed.insert(*color, quota);
        }

        for (color, spawn_tile) in temples {
            let Some(remaining) = needed.get_mut(&color) else {
                continue;
            };
            if *remaining > 0 {
                if let Some(at) = spawn_tile {
                    *remaining -= 1;
                    let id = self.spawn_creature(CreatureKind::kobold(), color, at);
                    debug!(creature = ?id, %color, "temple produced a worker");
                }
            }
        }
    }

    /// Full-grid recount of claimed tiles, applied to every seat in both
    /// pools.
    fn recount_claimed_tiles(&mut self) {
        let mut counts: AHashMap<FactionColor, u32> = AHashMap::new();
        for tile in self.grid.iter() {
            if tile.tile_type() == TileType::Claimed {
                if let Some(owner) = tile.owner {
                    *counts.entry(owner).or_insert(0) += 1;
                }
            }
        }
        for seat in self.seats.filled_seats_mut() {
            seat.claimed_tiles = counts.get(&seat.color).copied().unwrap_or(0);
        }
        for seat in self.seats.empty_seats_mut() {
            seat.claimed_tiles = counts.get(&seat.color).copied().unwrap_or(0);
        }
    }

    fn build_goal_view(&self, color: FactionColor) -> GoalView {
        let claimed_tiles = self
            .seats
            .seat_by_color(color)
            .map(|s| s.claimed_tiles)
            .unwrap_or(0);
        let gold = self.registry.total_gold_for_color(color);

        let mut living_enemies = 0;
        let mut living_creature_names = Vec::new();
        for creature in self.registry.creatures_in_order() {
            if creature.hp() > 0.0 {
                living_creature_names.push(creature.name.clone());
                if creature.color != color {
                    living_enemies += 1;
                }
            }
        }

        GoalView {
            claimed_tiles,
            gold,
            living_enemies,
            living_creature_names,
        }
    }

    // === Creature AI ===

    /// One creature's turn: refresh its view of the map, plan if idle,
    /// then execute the front of its action queue.
    fn creature_ai_step(&mut self, creature: &mut Creature) {
        if creature.hp() <= 0.0 {
            return;
        }

        creature.visible_tiles = visibility::visible_tiles(
            &self.grid,
            &self.spiral,
            creature.position,
            creature.kind.sight_radius,
        );
        creature.visible_enemies = self.collect_visible_enemies(creature);

        if creature.action_queue_len() == 0 {
            if let Some(action) = self.select_action(creature) {
                creature.push_action(action);
            }
        }

        self.execute_action(creature);
        creature.update_stats();
    }

    fn select_action(&mut self, creature: &Creature) -> Option<CreatureAction> {
        let planned = if creature.kind.is_worker {
            self.select_worker_action(creature)
        } else {
            self.select_fighter_action(creature)
        };
        planned.or_else(|| self.select_wander(creature))
    }

    /// Workers head for the nearest tile their faction has marked for
    /// digging, tunneling to reach it if they must; with nothing to dig
    /// they claim bare floor around them.
    fn select_worker_action(&self, creature: &Creature) -> Option<CreatureAction> {
        let marked = self.grid.tiles_marked_for_digging(creature.color);
        let target = marked
            .into_iter()
            .filter(|t| {
                self.grid
                    .tile(*t)
                    .map(|tile| tile.is_diggable(creature.color))
                    .unwrap_or(false)
            })
            .min_by_key(|t| creature.position.manhattan(t));

        if let Some(target) = target {
            if creature.position.is_adjacent(&target) {
                return Some(CreatureAction::Dig(target));
            }
            let route = pathfinding::path(
                &self.grid,
                &self.connectivity,
                &self.ctx,
                creature.position,
                target,
                Passability::Diggable,
                creature.color,
            );
            if route.len() >= 2 {
                return Some(CreatureAction::WalkTo(route.into_iter().skip(1).collect()));
            }
        }

        std::iter::once(creature.position)
            .chain(creature.position.neighbors4())
            .find(|c| {
                self.grid
                    .tile(*c)
                    .map(|t| t.fullness() == 0.0 && t.tile_type() == TileType::Dirt)
                    .unwrap_or(false)
            })
            .map(CreatureAction::Claim)
    }

    /// Living enemies standing on the creature's visible tiles.
    fn collect_visible_enemies(&self, creature: &Creature) -> Vec<crate::core::types::CreatureId> {
        let mut enemies = Vec::new();
        for coord in &creature.visible_tiles {
            let Some(tile) = self.grid.tile(*coord) else { continue };
            for occupant in &tile.occupants {
                if let Some(other) = self.registry.creature(*occupant) {
                    if other.color != creature.color && other.hp() > 0.0 {
                        enemies.push(*occupant);
                    }
                }
            }
        }
        enemies
    }

    /// Fighters close on the nearest visible enemy and attack it.
    fn select_fighter_action(&self, creature: &Creature) -> Option<CreatureAction> {
        let mut nearest: Option<(u32, crate::core::types::CreatureId, TileCoord)> = None;
        for enemy in &creature.visible_enemies {
            let Some(other) = self.registry.creature(*enemy) else {
                continue;
            };
            if other.hp() <= 0.0 {
                continue;
            }
            let dist = creature.position.manhattan(&other.position);
            if nearest.map(|(d, _, _)| dist < d).unwrap_or(true) {
                nearest = Some((dist, *enemy, other.position));
            }
        }

        let (dist, enemy, enemy_pos) = nearest?;
        if dist <= 1 {
            return Some(CreatureAction::Attack(enemy));
        }

        let route = pathfinding::path(
            &self.grid,
            &self.connectivity,
            &self.ctx,
            creature.position,
            enemy_pos,
            Passability::Walkable,
            creature.color,
        );
        // Stop next to the enemy rather than on top of it
        if route.len() >= 3 {
            Some(CreatureAction::WalkTo(
                route[1..route.len() - 1].iter().copied().collect(),
            ))
        } else {
            None
        }
    }

    /// Idle fallback: shuffle to a random passable neighbor.
    fn select_wander(&mut self, creature: &Creature) -> Option<CreatureAction> {
        let neighbors: Vec<TileCoord> = creature
            .position
            .neighbors4()
            .into_iter()
            .filter(|c| {
                self.grid
                    .tile(*c)
                    .map(|t| step_allowed(t, creature.kind.tile_passability, creature.color))
                    .unwrap_or(false)
            })
            .collect();
        if neighbors.is_empty() {
            return None;
        }
        let choice = neighbors[self.ctx.rng.gen_range(0..neighbors.len())];
        Some(CreatureAction::WalkTo([choice].into_iter().collect()))
    }

    /// Execute the front action of the creature's queue, one step's worth.
    fn execute_action(&mut self, creature: &mut Creature) {
        let Some(action) = creature.peek_action() else {
            return;
        };

        match action {
            CreatureAction::Idle => {
                creature.pop_action();
            }
            CreatureAction::WalkTo(mut route) => {
                let Some(next) = route.pop_front() else {
                    creature.pop_action();
                    return;
                };
                let walkable = self
                    .grid
                    .tile(next)
                    .map(|t| {
                        matches!(
                            t.passability(),
                            Passability::Walkable | Passability::Flyable
                        ) && step_allowed(t, creature.kind.tile_passability, creature.color)
                    })
                    .unwrap_or(false);
                let diggable = self
                    .grid
                    .tile(next)
                    .map(|t| t.is_diggable(creature.color))
                    .unwrap_or(false);

                if walkable {
                    self.grid.remove_occupant(creature.position, creature.id);
                    self.grid.add_occupant(next, creature.id);
                    creature.position = next;
                    if route.is_empty() {
                        creature.pop_action();
                    } else {
                        creature.replace_front_action(CreatureAction::WalkTo(route));
                    }
                } else if diggable && creature.kind.is_worker {
                    // Tunnel through, then resume the walk
                    route.push_front(next);
                    creature.replace_front_action(CreatureAction::WalkTo(route));
                    creature.push_front_action(CreatureAction::Dig(next));
                } else {
                    // The plan no longer matches the map
                    creature.pop_action();
                }
            }
            CreatureAction::Dig(target) => {
                let valid = creature.position.is_adjacent(&target)
                    && self
                        .grid
                        .tile(target)
                        .map(|t| t.is_diggable(creature.color))
                        .unwrap_or(false);
                if !valid {
                    creature.pop_action();
                    return;
                }
                let gold = self.grid.dig(target, DIG_RATE);
                if gold > 0 {
                    self.registry.deposit_gold(creature.color, gold);
                }
                creature.receive_exp(0.5);
                let open = self
                    .grid
                    .tile(target)
                    .map(|t| t.fullness() == 0.0)
                    .unwrap_or(true);
                if open {
                    creature.pop_action();
                }
            }
            CreatureAction::Claim(target) => {
                if creature.position.is_adjacent(&target) {
                    self.grid.claim(target, creature.color);
                }
                creature.pop_action();
            }
            CreatureAction::Attack(target) => {
                let in_range = self
                    .registry
                    .creature(target)
                    .map(|t| t.hp() > 0.0 && t.position.is_adjacent(&creature.position))
                    .unwrap_or(false);
                if in_range {
                    let damage = creature.kind.attack_damage;
                    if let Some(victim) = self.registry.creature_mut(target) {
                        victim.take_damage(damage);
                    }
                    creature.receive_exp(1.0);
                }
                creature.pop_action();
            }
            CreatureAction::Train => {
                creature.receive_exp(0.25);
                creature.pop_action();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::seat::Seat;

    fn open_world(w: u32, h: u32) -> GameWorld {
        let mut world = GameWorld::create_new_map(w, h).unwrap();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                world.grid.set_fullness(TileCoord::new(x, y), 0.0);
            }
        }
        world
    }

    #[test]
    fn test_turn_number_advances() {
        let mut world = open_world(5, 5);
        world.do_turn();
        world.do_turn();
        assert_eq!(world.turn_number(), 2);
    }

    #[test]
    fn test_dead_creature_removed_after_turn() {
        let mut world = open_world(5, 5);
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();

        let id = world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(2, 2));
        world
            .registry
            .creature(id)
            .expect("creature on map")
            .set_hp(0.0);

        world.do_turn();

        assert!(world.registry.creature(id).is_none());
        assert_eq!(world.registry.creature_count(), 0);
        assert_eq!(
            world
                .seats
                .seat_by_color(FactionColor(1))
                .unwrap()
                .controlled_creatures,
            0
        );
    }

    #[test]
    fn test_live_creatures_counted_for_seat() {
        let mut world = open_world(5, 5);
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();

        world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(1, 1));
        world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(2, 2));
        world.do_turn();

        assert_eq!(
            world
                .seats
                .seat_by_color(FactionColor(1))
                .unwrap()
                .controlled_creatures,
            2
        );
    }

    #[test]
    fn test_temple_spawns_exactly_one_worker() {
        let mut world = open_world(6, 6);
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();
        world.add_room(
            RoomType::DungeonTemple,
            FactionColor(1),
            vec![TileCoord::new(2, 2), TileCoord::new(3, 2)],
        );

        assert_eq!(world.registry.creature_count(), 0);
        world.do_turn();
        // Quota is min(4 * 1 - 0, 1) = 1: one spawn, not two
        assert_eq!(world.registry.creature_count(), 1);
        let worker = world.registry.creature_by_index(0).unwrap();
        assert!(worker.kind.is_worker);
        assert_eq!(worker.color, FactionColor(1));
    }

    #[test]
    fn test_mana_accrues_each_turn() {
        let mut world = open_world(5, 5);
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();

        let before = world.seats.seat_by_color(FactionColor(1)).unwrap().mana;
        world.do_turn();
        let seat = world.seats.seat_by_color(FactionColor(1)).unwrap();
        assert_eq!(seat.mana, before + seat.mana_delta);
    }

    #[test]
    fn test_claimed_tiles_recounted() {
        let mut world = open_world(5, 5);
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();

        world.grid.claim(TileCoord::new(0, 0), FactionColor(1));
        world.grid.claim(TileCoord::new(1, 0), FactionColor(1));
        world.do_turn();

        assert_eq!(
            world
                .seats
                .seat_by_color(FactionColor(1))
                .unwrap()
                .claimed_tiles,
            2
        );
    }

    #[test]
    fn test_empty_room_removed_during_upkeep() {
        let mut world = open_world(5, 5);
        let id = world.add_room(RoomType::Quarters, FactionColor(1), vec![TileCoord::new(1, 1)]);
        world
            .registry
            .release_room_tile(id, TileCoord::new(1, 1), &mut world.grid);

        world.do_turn();
        assert!(world.registry.room(id).is_none());
        assert_eq!(world.grid.tile(TileCoord::new(1, 1)).unwrap().covering_room, None);
    }

    #[test]
    fn test_worker_digs_marked_tile() {
        let mut world = GameWorld::create_new_map(5, 1).unwrap();
        // Excavate a home row tile for the worker
        world.grid.set_fullness(TileCoord::new(0, 0), 0.0);
        world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(0, 0));
        world
            .grid
            .mark_tiles_for_digging(&[TileCoord::new(1, 0)], true, FactionColor(1));

        for _ in 0..10 {
            world.do_turn();
        }

        let tile = world.grid.tile(TileCoord::new(1, 0)).unwrap();
        assert_eq!(tile.fullness(), 0.0);
    }

    #[test]
    fn test_fighters_close_and_fight() {
        let mut world = open_world(7, 1);
        let a = world.spawn_creature(
            CreatureKind::fighter("Knight"),
            FactionColor(1),
            TileCoord::new(0, 0),
        );
        let b = world.spawn_creature(
            CreatureKind::fighter("Orc"),
            FactionColor(2),
            TileCoord::new(6, 0),
        );

        let hp_before = world.registry.creature(b).unwrap().hp();
        for _ in 0..12 {
            world.do_turn();
        }
        // They must have met in the middle and traded blows by now
        let a_hp = world.registry.creature(a).map(|c| c.hp());
        let b_hp = world.registry.creature(b).map(|c| c.hp());
        let damage_done = b_hp.map(|hp| hp < hp_before).unwrap_or(true)
            || a_hp.map(|hp| hp < 30.0).unwrap_or(true);
        assert!(damage_done);
    }

    #[test]
    fn test_goal_completion_records_winner() {
        let mut world = open_world(5, 5);
        world.add_goal_for_all_seats(crate::game::goal::Goal::ClaimTiles(1));
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.seats.claim_seat(FactionColor(1)).unwrap();

        world.grid.claim(TileCoord::new(0, 0), FactionColor(1));
        // First turn counts the claimed tile; second turn's goal check
        // sees the updated count and records the win.
        world.do_turn();
        world.do_turn();

        assert!(world.seats.is_winner(FactionColor(1)));
    }
}
