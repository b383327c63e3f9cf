use serde::{Deserialize, Serialize};

use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

/// A registered tournament participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub seq_num: usize,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
}

impl Player {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Row for Player {
    fn id(&self) -> i64 {
        self.id
    }
    fn seq_num(&self) -> usize {
        self.seq_num
    }
    fn set_seq_num(&mut self, n: usize) {
        self.seq_num = n;
    }
}

/// A category entry: a singles player or a doubles team.
///
/// In doubles/mixed categories `player2_id` stays `None` until the player
/// gets paired; a category with such incomplete entries cannot be frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPair {
    pub id: i64,
    pub seq_num: usize,
    pub category_id: i64,
    pub player1_id: i64,
    pub player2_id: Option<i64>,
    /// Group number (1-based) once the group draw has been applied.
    pub group_num: Option<u32>,
    /// Seeding position (1 = top seed) for elimination and Swiss ladder
    /// categories.
    pub initial_rank: Option<u32>,
}

impl PlayerPair {
    pub fn has_player(&self, player_id: i64) -> bool {
        self.player1_id == player_id || self.player2_id == Some(player_id)
    }

    pub fn is_complete(&self, requires_partner: bool) -> bool {
        !requires_partner || self.player2_id.is_some()
    }
}

impl Row for PlayerPair {
    fn id(&self) -> i64 {
        self.id
    }
    fn seq_num(&self) -> usize {
        self.seq_num
    }
    fn set_seq_num(&mut self, n: usize) {
        self.seq_num = n;
    }
}
