use serde::{Deserialize, Serialize};

use crate::models::match_entry::GroupTag;
use crate::store::Row;

/// Accumulated standing of one pair after one round.
///
/// Statistics carry over from round to round, so the entry for the last
/// finished round always holds the pair's overall totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id: i64,
    pub seq_num: usize,
    pub category_id: i64,
    pub round: u32,
    pub pair_id: i64,
    pub tag: GroupTag,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub games_won: i32,
    pub games_lost: i32,
    pub points_won: i32,
    pub points_lost: i32,
    /// 1-based rank within the group; `None` until sorted or forced.
    pub rank: Option<u32>,
}

impl RankingEntry {
    pub fn match_delta(&self) -> i32 {
        self.wins - self.losses
    }

    pub fn game_delta(&self) -> i32 {
        self.games_won - self.games_lost
    }

    pub fn point_delta(&self) -> i32 {
        self.points_won - self.points_lost
    }
}

impl Row for RankingEntry {
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
