//! The game world: central owner of the grid, entities, and seats
//!
//! Collaborators drive it through a small surface: the level loader bulk-
//! inserts tiles and entities, the turn engine advances it (`do_turn` in
//! the turn module), and presentation code reads through pure queries and
//! enumerable accessors.

use tracing::{error, info};

use crate::core::config::SimulationConfig;
use crate::core::context::SimContext;
use crate::core::error::{GameError, Result};
use crate::core::types::{CreatureId, FactionColor, LightId, MissileId, RoomId, TrapId, Turn};
use crate::entities::capability::Animated;
use crate::entities::creature::{Creature, CreatureKind};
use crate::entities::light::MapLight;
use crate::entities::missile::{MapPosition, Missile};
use crate::entities::registry::EntityRegistry;
use crate::entities::room::{Room, RoomType};
use crate::entities::trap::{Trap, TrapType};
use crate::game::goal::Goal;
use crate::game::notify::OutboundQueue;
use crate::game::seat::{Player, Seat, SeatPools};
use crate::map::connectivity::ConnectivityEngine;
use crate::map::coord::TileCoord;
use crate::map::grid::TileGrid;
use crate::map::pathfinding;
use crate::map::spiral::TileCoordinateMap;
use crate::map::tile::Passability;
use crate::map::visibility;

pub struct GameWorld {
    pub grid: TileGrid,
    pub spiral: TileCoordinateMap,
    pub connectivity: ConnectivityEngine,
    pub registry: EntityRegistry,
    pub seats: SeatPools,
    pub local_player: Player,
    pub players: Vec<Player>,
    pub ctx: SimContext,
    pub outbound: OutboundQueue,
    goals_for_all_seats: Vec<Goal>,
    pub(crate) turn_number: Turn,
}

impl GameWorld {
    /// Create a world with a fresh all-dirt map. Fails if the backing grid
    /// cannot be allocated.
    pub fn create_new_map(width: u32, height: u32) -> Result<Self> {
        Self::with_config(width, height, SimulationConfig::default())
    }

    pub fn with_config(width: u32, height: u32, config: SimulationConfig) -> Result<Self> {
        let grid = TileGrid::new(width, height)?;
        let spiral = TileCoordinateMap::new(config.spiral_radius);
        let authoritative = config.authoritative;
        info!(width, height, "created new map");
        Ok(Self {
            grid,
            spiral,
            connectivity: ConnectivityEngine::new(),
            registry: EntityRegistry::new(),
            seats: SeatPools::new(),
            local_player: Player::new("defaultNickName"),
            players: Vec::new(),
            ctx: SimContext::new(config),
            outbound: OutboundQueue::new(authoritative),
            goals_for_all_seats: Vec::new(),
            turn_number: 0,
        })
    }

    pub fn turn_number(&self) -> Turn {
        self.turn_number
    }

    /// Drop every entity, seat, and goal, and reset all counters.
    pub fn clear_all(&mut self) {
        self.registry.clear_all();
        self.seats.clear();
        self.goals_for_all_seats.clear();
        self.players.clear();
        self.local_player.seat = None;
        self.ctx.reset();
        self.outbound.drain();
        self.turn_number = 0;
    }

    /// A game cannot start without a seat for the local player.
    pub fn start_game(&self) -> Result<()> {
        if self.local_player.seat.is_none() {
            error!("cannot start the game: no seat set for local player");
            return Err(GameError::NoSeatForLocalPlayer);
        }
        info!(nick = %self.local_player.nick, "game started");
        Ok(())
    }

    // === Level-load surface ===

    /// Register a seat in the empty pool, seeding it with every
    /// all-seats goal.
    pub fn add_seat(&mut self, mut seat: Seat) {
        for goal in &self.goals_for_all_seats {
            seat.add_goal(goal.clone());
        }
        self.seats.add_empty_seat(seat);
    }

    /// Add a goal to the shared list and to every seat already present.
    pub fn add_goal_for_all_seats(&mut self, goal: Goal) {
        for seat in self.seats.filled_seats_mut() {
            seat.add_goal(goal.clone());
        }
        for seat in self.seats.empty_seats_mut() {
            seat.add_goal(goal.clone());
        }
        self.goals_for_all_seats.push(goal);
    }

    /// Seat a player: moves the seat from the empty pool to the filled
    /// pool. Fails when no empty seat carries that color.
    pub fn add_player(&mut self, mut player: Player, color: FactionColor) -> Result<()> {
        self.seats
            .claim_seat(color)
            .ok_or(GameError::SeatNotFound(color))?;
        player.seat = Some(color);
        info!(nick = %player.nick, %color, "added player");
        self.players.push(player);
        Ok(())
    }

    /// Seat the local player.
    pub fn set_local_player_seat(&mut self, color: FactionColor) -> Result<()> {
        self.seats
            .claim_seat(color)
            .ok_or(GameError::SeatNotFound(color))?;
        self.local_player.seat = Some(color);
        Ok(())
    }

    pub fn spawn_creature(
        &mut self,
        kind: CreatureKind,
        color: FactionColor,
        position: TileCoord,
    ) -> CreatureId {
        let id = self.ctx.mint_creature_id();
        let name = format!("{}_{}", kind.class_name, id.0);
        let creature = Creature::new(id, name, kind, color, position);
        self.registry
            .add_creature(creature, &mut self.grid, &mut self.outbound);
        id
    }

    pub fn add_room(
        &mut self,
        room_type: RoomType,
        color: FactionColor,
        tiles: Vec<TileCoord>,
    ) -> RoomId {
        let id = self.ctx.mint_room_id();
        self.registry
            .add_room(Room::new(id, room_type, color, tiles), &mut self.grid);
        id
    }

    pub fn add_trap(
        &mut self,
        trap_type: TrapType,
        color: FactionColor,
        tiles: Vec<TileCoord>,
    ) -> TrapId {
        let id = self.ctx.mint_trap_id();
        self.registry
            .add_trap(Trap::new(id, trap_type, color, tiles), &mut self.grid);
        id
    }

    pub fn add_missile(&mut self, mut missile: Missile) -> MissileId {
        let id = self.ctx.mint_missile_id();
        missile.id = id;
        missile.name = format!("Missile_{}", id.0);
        self.registry.add_missile(missile, &mut self.outbound);
        id
    }

    pub fn add_map_light(
        &mut self,
        position: MapPosition,
        color: (f64, f64, f64),
        brightness: f64,
    ) -> LightId {
        let id = self.ctx.mint_light_id();
        self.registry
            .add_light(MapLight::new(id, position, color, brightness));
        id
    }

    /// Recompute the connectivity partition from the current terrain.
    pub fn refresh_connectivity(&mut self) {
        self.connectivity
            .enable_flood_fill(&mut self.grid, &self.ctx);
    }

    // === Query surface (pure, no grid side effects) ===

    pub fn path(
        &self,
        from: TileCoord,
        to: TileCoord,
        class: Passability,
        color: FactionColor,
    ) -> Vec<TileCoord> {
        pathfinding::path(
            &self.grid,
            &self.connectivity,
            &self.ctx,
            from,
            to,
            class,
            color,
        )
    }

    pub fn path_exists(
        &self,
        from: TileCoord,
        to: TileCoord,
        class: Passability,
        color: FactionColor,
    ) -> bool {
        pathfinding::path_exists(
            &self.grid,
            &self.connectivity,
            &self.ctx,
            from,
            to,
            class,
            color,
        )
    }

    pub fn visible_tiles(&self, origin: TileCoord, radius: f64) -> Vec<TileCoord> {
        visibility::visible_tiles(&self.grid, &self.spiral, origin, radius)
    }

    pub fn line_of_sight(&self, from: TileCoord, to: TileCoord) -> Vec<TileCoord> {
        visibility::line_of_sight(&self.grid, from, to)
    }

    pub fn get_diggable_tiles_for_player_in_area(
        &self,
        a: TileCoord,
        b: TileCoord,
        player: &Player,
    ) -> Vec<TileCoord> {
        match player.seat {
            Some(color) => self.grid.diggable_tiles_in_area(a, b, color),
            None => Vec::new(),
        }
    }

    pub fn get_buildable_tiles_for_player_in_area(
        &self,
        a: TileCoord,
        b: TileCoord,
        player: &Player,
    ) -> Vec<TileCoord> {
        match player.seat {
            Some(color) => self.grid.buildable_tiles_in_area(a, b, color),
            None => Vec::new(),
        }
    }

    /// Flag tiles for digging on behalf of a player.
    pub fn mark_tiles_for_player(&mut self, tiles: &[TileCoord], dig: bool, player: &Player) {
        if let Some(color) = player.seat {
            self.grid.mark_tiles_for_digging(tiles, dig, color);
        }
    }

    // === Per-frame hook ===

    /// Advance per-frame animation state. Decoupled from the turn cadence;
    /// never touches authoritative simulation state.
    pub fn do_player_ai_turn(&mut self, dt: f64) {
        for missile in self.registry.missiles_mut() {
            missile.advance(dt);
        }
        for light in self.registry.lights_mut() {
            light.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_new_map() {
        let world = GameWorld::create_new_map(10, 10).unwrap();
        assert_eq!(world.grid.width(), 10);
        assert_eq!(world.turn_number(), 0);
    }

    #[test]
    fn test_create_degenerate_map_fails() {
        assert!(GameWorld::create_new_map(0, 0).is_err());
    }

    #[test]
    fn test_start_game_requires_local_seat() {
        let mut world = GameWorld::create_new_map(5, 5).unwrap();
        assert!(matches!(
            world.start_game(),
            Err(GameError::NoSeatForLocalPlayer)
        ));

        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        world.set_local_player_seat(FactionColor(1)).unwrap();
        assert!(world.start_game().is_ok());
    }

    #[test]
    fn test_goals_propagate_to_seats() {
        let mut world = GameWorld::create_new_map(5, 5).unwrap();
        world.add_goal_for_all_seats(Goal::ClaimTiles(10));
        world.add_seat(Seat::new(FactionColor(1), "Keeper", TileCoord::new(0, 0)));
        // Seat added after the goal still receives it
        assert_eq!(
            world.seats.seat_by_color(FactionColor(1)).unwrap().num_unmet_goals(),
            1
        );

        world.add_goal_for_all_seats(Goal::MineGold(100));
        assert_eq!(
            world.seats.seat_by_color(FactionColor(1)).unwrap().num_unmet_goals(),
            2
        );
    }

    #[test]
    fn test_spawn_creature_unique_names() {
        let mut world = GameWorld::create_new_map(5, 5).unwrap();
        let a = world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(0, 0));
        let b = world.spawn_creature(CreatureKind::kobold(), FactionColor(1), TileCoord::new(1, 0));
        assert_ne!(a, b);
        assert!(world.registry.creature_by_name("Kobold_0").is_some());
        assert!(world.registry.creature_by_name("Kobold_1").is_some());
    }

    #[test]
    fn test_area_queries_require_seat() {
        let world = GameWorld::create_new_map(5, 5).unwrap();
        let unseated = Player::new("spectator");
        assert!(world
            .get_diggable_tiles_for_player_in_area(
                TileCoord::new(0, 0),
                TileCoord::new(4, 4),
                &unseated
            )
            .is_empty());
    }
}
