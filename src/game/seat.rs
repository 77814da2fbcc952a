//! Seats: per-faction bookkeeping, and the empty/filled seat pools
//!
//! A seat persists whether or not a player occupies it. Claiming a seat
//! moves it between pools; the seat value itself is never copied.

use serde::{Deserialize, Serialize};

use crate::core::config::{MANA_BASE_INCOME, MANA_CAP};
use crate::core::types::FactionColor;
use crate::game::goal::{Goal, GoalView};
use crate::map::coord::TileCoord;

/// Per-faction game state: resources, counters, and goal lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub color: FactionColor,
    pub faction: String,
    pub starting_position: TileCoord,
    pub gold: i64,
    pub mana: i64,
    /// Mana gained on the most recent upkeep
    pub mana_delta: i64,
    pub claimed_tiles: u32,
    pub controlled_creatures: u32,
    unmet_goals: Vec<Goal>,
    completed_goals: Vec<Goal>,
    failed_goals: Vec<Goal>,
}

impl Seat {
    pub fn new(color: FactionColor, faction: &str, starting_position: TileCoord) -> Self {
        Self {
            color,
            faction: faction.to_string(),
            starting_position,
            gold: 0,
            mana: 1000,
            mana_delta: 0,
            claimed_tiles: 0,
            controlled_creatures: 0,
            unmet_goals: Vec::new(),
            completed_goals: Vec::new(),
            failed_goals: Vec::new(),
        }
    }

    pub fn add_goal(&mut self, goal: Goal) {
        self.unmet_goals.push(goal);
    }

    pub fn num_unmet_goals(&self) -> usize {
        self.unmet_goals.len()
    }

    pub fn num_completed_goals(&self) -> usize {
        self.completed_goals.len()
    }

    pub fn num_failed_goals(&self) -> usize {
        self.failed_goals.len()
    }

    pub fn unmet_goals(&self) -> &[Goal] {
        &self.unmet_goals
    }

    pub fn completed_goals(&self) -> &[Goal] {
        &self.completed_goals
    }

    pub fn failed_goals(&self) -> &[Goal] {
        &self.failed_goals
    }

    pub fn clear_goals(&mut self) {
        self.unmet_goals.clear();
        self.completed_goals.clear();
        self.failed_goals.clear();
    }

    /// Re-validate previously completed goals. A goal whose conditions no
    /// longer hold regresses to unmet, or fails outright if it can never
    /// be met again.
    pub fn check_all_completed_goals(&mut self, view: &GoalView) {
        let mut still_completed = Vec::new();
        for goal in self.completed_goals.drain(..) {
            if goal.is_met(view) {
                still_completed.push(goal);
            } else if goal.is_unwinnable(view) {
                self.failed_goals.push(goal);
            } else {
                self.unmet_goals.push(goal);
            }
        }
        self.completed_goals = still_completed;
    }

    /// Evaluate unmet goals, promoting and failing as appropriate.
    /// Returns the number of goals still unmet.
    pub fn check_all_goals(&mut self, view: &GoalView) -> usize {
        let mut still_unmet = Vec::new();
        for goal in self.unmet_goals.drain(..) {
            if goal.is_met(view) {
                self.completed_goals.push(goal);
            } else if goal.is_unwinnable(view) {
                self.failed_goals.push(goal);
            } else {
                still_unmet.push(goal);
            }
        }
        self.unmet_goals = still_unmet;
        self.unmet_goals.len()
    }

    /// Per-turn mana income, capped.
    pub fn accrue_mana(&mut self) {
        self.mana_delta = MANA_BASE_INCOME + self.claimed_tiles as i64;
        self.mana = (self.mana + self.mana_delta).min(MANA_CAP);
    }
}

/// A player occupying (or about to occupy) a seat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub nick: String,
    pub seat: Option<FactionColor>,
    pub is_ai: bool,
}

impl Player {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            seat: None,
            is_ai: false,
        }
    }
}

/// The empty and filled seat pools, plus the winners list
#[derive(Debug, Default)]
pub struct SeatPools {
    empty: Vec<Seat>,
    filled: Vec<Seat>,
    winners: Vec<FactionColor>,
}

impl SeatPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_empty_seat(&mut self, seat: Seat) {
        self.empty.push(seat);
    }

    pub fn num_empty(&self) -> usize {
        self.empty.len()
    }

    pub fn num_filled(&self) -> usize {
        self.filled.len()
    }

    /// Move the seat with the given color from the empty pool to the
    /// filled pool and return its color, or None if no such seat.
    pub fn claim_seat(&mut self, color: FactionColor) -> Option<FactionColor> {
        let index = self.empty.iter().position(|s| s.color == color)?;
        let seat = self.empty.remove(index);
        let color = seat.color;
        self.filled.push(seat);
        Some(color)
    }

    /// Move the first filled seat back to the empty pool.
    pub fn release_seat(&mut self) -> Option<FactionColor> {
        if self.filled.is_empty() {
            return None;
        }
        let seat = self.filled.remove(0);
        let color = seat.color;
        self.empty.push(seat);
        Some(color)
    }

    pub fn filled_seats(&self) -> &[Seat] {
        &self.filled
    }

    pub fn filled_seats_mut(&mut self) -> &mut [Seat] {
        &mut self.filled
    }

    pub fn empty_seats_mut(&mut self) -> &mut [Seat] {
        &mut self.empty
    }

    pub fn seat_by_color(&self, color: FactionColor) -> Option<&Seat> {
        self.filled
            .iter()
            .chain(self.empty.iter())
            .find(|s| s.color == color)
    }

    pub fn seat_by_color_mut(&mut self, color: FactionColor) -> Option<&mut Seat> {
        self.filled
            .iter_mut()
            .chain(self.empty.iter_mut())
            .find(|s| s.color == color)
    }

    /// Record a winner. Re-adding an existing winner is a no-op.
    pub fn add_winning_seat(&mut self, color: FactionColor) {
        if !self.winners.contains(&color) {
            self.winners.push(color);
        }
    }

    pub fn winners(&self) -> &[FactionColor] {
        &self.winners
    }

    pub fn is_winner(&self, color: FactionColor) -> bool {
        self.winners.contains(&color)
    }

    pub fn clear(&mut self) {
        self.empty.clear();
        self.filled.clear();
        self.winners.clear();
    }
}
