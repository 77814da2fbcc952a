//! Win-condition goals evaluated per seat during upkeep
//!
//! A goal moves unmet -> completed or unmet -> failed. Completed goals are
//! re-validated every turn and can regress to unmet (or fail outright) if
//! conditions stop holding; failed goals never recover.

use serde::{Deserialize, Serialize};

/// Per-seat snapshot the goal predicates are evaluated against
#[derive(Debug, Clone, Default)]
pub struct GoalView {
    /// Tiles the seat currently has claimed
    pub claimed_tiles: u32,
    /// Gold across the seat's treasuries
    pub gold: i64,
    /// Living creatures controlled by other factions
    pub living_enemies: u32,
    /// Names of all living creatures, any faction
    pub living_creature_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    /// Destroy every creature of every other faction
    KillAllEnemies,
    /// Keep the named creature alive; fails permanently when it dies
    ProtectCreature(String),
    /// Claim at least this many tiles
    ClaimTiles(u32),
    /// Amass at least this much gold in treasuries
    MineGold(i64),
}

impl Goal {
    pub fn is_met(&self, view: &GoalView) -> bool {
        match self {
            Goal::KillAllEnemies => view.living_enemies == 0,
            Goal::ProtectCreature(name) => {
                view.living_creature_names.iter().any(|n| n == name)
            }
            Goal::ClaimTiles(n) => view.claimed_tiles >= *n,
            Goal::MineGold(n) => view.gold >= *n,
        }
    }

    /// Can this goal never be met again, no matter what happens?
    pub fn is_unwinnable(&self, view: &GoalView) -> bool {
        match self {
            Goal::ProtectCreature(name) => {
                !view.living_creature_names.iter().any(|n| n == name)
            }
            // Tiles, gold, and kills can always still be achieved
            _ => false,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Goal::KillAllEnemies => "Destroy all enemy creatures".to_string(),
            Goal::ProtectCreature(name) => format!("Keep {name} alive"),
            Goal::ClaimTiles(n) => format!("Claim {n} tiles"),
            Goal::MineGold(n) => format!("Amass {n} gold"),
        }
    }
}
