use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    /// At least one slot still waits for the result of an earlier match.
    Pending,
    /// Both opponents are known, the match can be called.
    Ready,
    Running,
    Finished,
    /// Decided without play (forfeit); counts like a two-game win with no
    /// points for statistics.
    Walkover,
}

/// One side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Slot1,
    Slot2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Slot1 => Side::Slot2,
            Side::Slot2 => Side::Slot1,
        }
    }
}

/// A match slot: a concrete pair or a symbolic reference that gets
/// resolved when the referenced match finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotRef {
    Pair(i64),
    WinnerOf(i64),
    LoserOf(i64),
}

impl SlotRef {
    pub fn pair_id(&self) -> Option<i64> {
        match self {
            SlotRef::Pair(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub p1: u32,
    pub p2: u32,
}

impl GameScore {
    pub fn new(p1: u32, p2: u32) -> Self {
        GameScore { p1, p2 }
    }

    pub fn winner(&self) -> Option<Side> {
        match self.p1.cmp(&self.p2) {
            std::cmp::Ordering::Greater => Some(Side::Slot1),
            std::cmp::Ordering::Less => Some(Side::Slot2),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::Slot1 => self.p1,
            Side::Slot2 => self.p2,
        }
    }
}

/// Recorded result of a match, game by game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub games: Vec<GameScore>,
}

impl MatchScore {
    pub fn new(games: Vec<GameScore>) -> Self {
        MatchScore { games }
    }

    pub fn games_won(&self, side: Side) -> u32 {
        self.games
            .iter()
            .filter(|g| g.winner() == Some(side))
            .count() as u32
    }

    pub fn points(&self, side: Side) -> u32 {
        self.games.iter().map(|g| g.points(side)).sum()
    }

    /// The side that won more games, `None` for a draw.
    pub fn winner(&self) -> Option<Side> {
        let w1 = self.games_won(Side::Slot1);
        let w2 = self.games_won(Side::Slot2);
        match w1.cmp(&w2) {
            std::cmp::Ordering::Greater => Some(Side::Slot1),
            std::cmp::Ordering::Less => Some(Side::Slot2),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Checks the score against the category settings: a decided match
    /// needs exactly `win_score` won games for the winner, a draw needs
    /// an equal number of won games, no drawn single game and is only
    /// acceptable where the category allows draws.
    pub fn is_valid(&self, win_score: u32, allow_draw: bool) -> bool {
        if self.games.is_empty() {
            return false;
        }
        if self.games.iter().any(|g| g.winner().is_none()) {
            return false;
        }
        let w1 = self.games_won(Side::Slot1);
        let w2 = self.games_won(Side::Slot2);
        match self.winner() {
            Some(_) => {
                let (won, lost) = if w1 > w2 { (w1, w2) } else { (w2, w1) };
                won == win_score && lost < win_score
            }
            None => allow_draw && w1 == w2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub seq_num: usize,
    pub category_id: i64,
    pub round: u32,
    /// Call order; bracket matches are numbered at generation time, group
    /// matches stay unnumbered until ordered manually.
    pub match_num: Option<u32>,
    pub slot1: Option<SlotRef>,
    pub slot2: Option<SlotRef>,
    pub court_id: Option<i64>,
    pub umpire_id: Option<i64>,
    pub state: MatchState,
    pub score: Option<MatchScore>,
    /// Decided side; set when the match finishes (including walkovers).
    pub winner_side: Option<Side>,
    /// Final placement handed to the winner/loser of terminal bracket
    /// matches (final, 3rd-place match, semifinals without one).
    pub winner_rank: Option<u32>,
    pub loser_rank: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn slot(&self, side: Side) -> Option<SlotRef> {
        match side {
            Side::Slot1 => self.slot1,
            Side::Slot2 => self.slot2,
        }
    }

    pub fn pair_id(&self, side: Side) -> Option<i64> {
        self.slot(side).and_then(|s| s.pair_id())
    }

    pub fn has_pair(&self, pair_id: i64) -> bool {
        self.pair_id(Side::Slot1) == Some(pair_id) || self.pair_id(Side::Slot2) == Some(pair_id)
    }

    pub fn is_decided(&self) -> bool {
        matches!(self.state, MatchState::Finished | MatchState::Walkover)
    }

    /// Pair id of the winner. Panics if called before the match is
    /// decided; that indicates corrupted engine state.
    pub fn winner_pair(&self) -> Option<i64> {
        let side = self.winner_side?;
        let id = self
            .pair_id(side)
            .expect("decided match must have resolved slots");
        Some(id)
    }

    pub fn loser_pair(&self) -> Option<i64> {
        let side = self.winner_side?.other();
        let id = self
            .pair_id(side)
            .expect("decided match must have resolved slots");
        Some(id)
    }
}

impl Row for Match {
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

/// Classification of a match group within its round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupTag {
    /// Round-robin group with its 1-based group number.
    Group(u32),
    /// Swiss ladder iteration.
    Iteration,
    L16,
    Quarter,
    Semi,
    /// Final round; also holds the 3rd-place match if one is played.
    Final,
}

/// All matches of one category / round / group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroup {
    pub id: i64,
    pub seq_num: usize,
    pub category_id: i64,
    pub round: u32,
    pub tag: GroupTag,
    pub match_ids: Vec<i64>,
}

impl Row for MatchGroup {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_winner_and_points() {
        let score = MatchScore::new(vec![
            GameScore::new(21, 15),
            GameScore::new(19, 21),
            GameScore::new(21, 12),
        ]);
        assert_eq!(score.winner(), Some(Side::Slot1));
        assert_eq!(score.games_won(Side::Slot1), 2);
        assert_eq!(score.games_won(Side::Slot2), 1);
        assert_eq!(score.points(Side::Slot1), 61);
        assert_eq!(score.points(Side::Slot2), 48);
    }

    #[test]
    fn test_score_validation() {
        let two_straight = MatchScore::new(vec![GameScore::new(21, 15), GameScore::new(21, 18)]);
        assert!(two_straight.is_valid(2, false));

        // a single game cannot decide a best-of-three match
        let one_game = MatchScore::new(vec![GameScore::new(21, 15)]);
        assert!(!one_game.is_valid(2, false));

        // 1:1 in games is a draw and needs the draw permission
        let drawn = MatchScore::new(vec![GameScore::new(21, 15), GameScore::new(17, 21)]);
        assert!(!drawn.is_valid(2, false));
        assert!(drawn.is_valid(2, true));

        // a drawn single game is never valid
        let tied_game = MatchScore::new(vec![GameScore::new(21, 21), GameScore::new(21, 15)]);
        assert!(!tied_game.is_valid(2, false));

        // too many won games
        let three_wins = MatchScore::new(vec![
            GameScore::new(21, 1),
            GameScore::new(21, 2),
            GameScore::new(21, 3),
        ]);
        assert!(!three_wins.is_valid(2, false));
    }
}
