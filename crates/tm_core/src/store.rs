//! In-memory table store.
//!
//! Stands in for the relational storage collaborator: stable integer
//! primary keys, contiguous per-table sequence numbers for display-order
//! stability (fixed up after every insert/delete) and the filtered
//! queries the engine needs. A SQL backend would implement the same
//! surface.

use serde::{Deserialize, Serialize};

use crate::models::{
    Category, Court, GroupTag, Match, MatchGroup, MatchState, Player, PlayerPair, RankingEntry,
};

pub trait Row {
    fn id(&self) -> i64;
    fn seq_num(&self) -> usize;
    fn set_seq_num(&mut self, n: usize);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<T: Row> {
    rows: Vec<T>,
    next_id: i64,
}

impl<T: Row> Default for Table<T> {
    fn default() -> Self {
        Table {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: Row> Table<T> {
    /// Inserts a new row built from a fresh id and sequence number and
    /// returns its id.
    pub fn insert_with(&mut self, build: impl FnOnce(i64, usize) -> T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id, self.rows.len());
        debug_assert_eq!(row.id(), id);
        self.rows.push(row);
        id
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.iter_mut().find(|r| r.id() == id)
    }

    /// Lookup that must succeed; a missing row here means the engine's
    /// referential integrity is broken.
    pub fn expect(&self, id: i64) -> &T {
        self.get(id).expect("row referenced by id must exist")
    }

    pub fn expect_mut(&mut self, id: i64) -> &mut T {
        self.get_mut(id).expect("row referenced by id must exist")
    }

    pub fn delete(&mut self, id: i64) -> bool {
        let Some(pos) = self.rows.iter().position(|r| r.id() == id) else {
            return false;
        };
        self.rows.remove(pos);
        self.fix_seq_nums();
        true
    }

    /// Renumbers all rows so sequence numbers stay contiguous.
    fn fix_seq_nums(&mut self) {
        for (n, row) in self.rows.iter_mut().enumerate() {
            row.set_seq_num(n);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tournament tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentStore {
    pub players: Table<Player>,
    pub pairs: Table<PlayerPair>,
    pub categories: Table<Category>,
    pub matches: Table<Match>,
    pub match_groups: Table<MatchGroup>,
    pub rankings: Table<RankingEntry>,
    pub courts: Table<Court>,
}

impl TournamentStore {
    pub fn new() -> Self {
        TournamentStore::default()
    }

    /// Pairs of a category, optionally restricted to one group, in
    /// insertion order.
    pub fn pairs_in_category(&self, category_id: i64, group_num: Option<u32>) -> Vec<&PlayerPair> {
        self.pairs
            .iter()
            .filter(|p| p.category_id == category_id)
            .filter(|p| group_num.is_none() || p.group_num == group_num)
            .collect()
    }

    pub fn pair_ids_in_category(&self, category_id: i64, group_num: Option<u32>) -> Vec<i64> {
        self.pairs_in_category(category_id, group_num)
            .iter()
            .map(|p| p.id)
            .collect()
    }

    /// The pair a player belongs to within a category, if any.
    pub fn pair_of_player(&self, category_id: i64, player_id: i64) -> Option<&PlayerPair> {
        self.pairs
            .iter()
            .find(|p| p.category_id == category_id && p.has_player(player_id))
    }

    pub fn matches_in_round(&self, category_id: i64, round: u32) -> Vec<&Match> {
        self.matches
            .iter()
            .filter(|m| m.category_id == category_id && m.round == round)
            .collect()
    }

    pub fn matches_in_state(&self, category_id: i64, state: MatchState) -> Vec<&Match> {
        self.matches
            .iter()
            .filter(|m| m.category_id == category_id && m.state == state)
            .collect()
    }

    pub fn match_groups_for(&self, category_id: i64, round: Option<u32>) -> Vec<&MatchGroup> {
        self.match_groups
            .iter()
            .filter(|g| g.category_id == category_id)
            .filter(|g| round.is_none() || Some(g.round) == round)
            .collect()
    }

    pub fn ranking_entries(&self, category_id: i64, round: u32) -> Vec<&RankingEntry> {
        self.rankings
            .iter()
            .filter(|e| e.category_id == category_id && e.round == round)
            .collect()
    }

    pub fn ranking_entry(&self, category_id: i64, round: u32, pair_id: i64) -> Option<&RankingEntry> {
        self.rankings
            .iter()
            .find(|e| e.category_id == category_id && e.round == round && e.pair_id == pair_id)
    }

    /// Distinct real group numbers of a category's ranking entries for a
    /// round, ascending.
    pub fn ranking_groups(&self, category_id: i64, round: u32) -> Vec<GroupTag> {
        let mut nums: Vec<u32> = self
            .ranking_entries(category_id, round)
            .iter()
            .filter_map(|e| match e.tag {
                GroupTag::Group(n) => Some(n),
                _ => None,
            })
            .collect();
        nums.sort_unstable();
        nums.dedup();
        if nums.is_empty() {
            // iteration/elimination rounds rank as a single bundle
            if self.ranking_entries(category_id, round).is_empty() {
                Vec::new()
            } else {
                vec![GroupTag::Iteration]
            }
        } else {
            nums.into_iter().map(GroupTag::Group).collect()
        }
    }

    /// Any match (historic or current) that ever ran on the court.
    pub fn court_was_used(&self, court_id: i64) -> bool {
        self.matches.iter().any(|m| m.court_id == Some(court_id))
    }

    pub fn running_match_on_court(&self, court_id: i64) -> Option<&Match> {
        self.matches
            .iter()
            .find(|m| m.state == MatchState::Running && m.court_id == Some(court_id))
    }

    /// Serializes the complete tournament state.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Restores a state written by [`to_json`](TournamentStore::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<TournamentStore> {
        serde_json::from_str(json)
    }
}
