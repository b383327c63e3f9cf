//! Swiss ladder: everybody plays every round, opponents are re-drawn
//! after each round from the current standings, rematches are never
//! scheduled. Odd fields sit one pair out per round, rotating through
//! the pairs that have sat out least.

use std::collections::HashSet;

use tracing::warn;

use crate::category::{CategoryVariant, GenerationBatch};
use crate::error::{Result, TournamentError};
use crate::models::CategoryState;
use crate::progress::ProgressQueue;
use crate::tournament::Tournament;

pub struct SwissLadderVariant;

/// Greedy pairing with backtracking: walks the standings top-down and
/// pairs each pair with the highest-standing opponent it has not met
/// yet; backtracks when the tail cannot be paired.
fn pair_without_rematches(
    order: &[i64],
    played: &HashSet<(i64, i64)>,
) -> Option<Vec<(i64, i64)>> {
    fn key(a: i64, b: i64) -> (i64, i64) {
        (a.min(b), a.max(b))
    }

    fn step(
        remaining: &mut Vec<i64>,
        played: &HashSet<(i64, i64)>,
        acc: &mut Vec<(i64, i64)>,
    ) -> bool {
        let Some(first) = remaining.first().copied() else {
            return true;
        };
        for i in 1..remaining.len() {
            let candidate = remaining[i];
            if played.contains(&key(first, candidate)) {
                continue;
            }
            remaining.remove(i);
            remaining.remove(0);
            acc.push((first, candidate));
            if step(remaining, played, acc) {
                return true;
            }
            acc.pop();
            remaining.insert(0, first);
            remaining.insert(i, candidate);
        }
        false
    }

    let mut remaining = order.to_vec();
    let mut acc = Vec::with_capacity(order.len() / 2);
    step(&mut remaining, played, &mut acc).then_some(acc)
}

impl SwissLadderVariant {
    fn total_rounds(pair_count: usize) -> u32 {
        // a full ladder lets everyone meet everyone once
        if pair_count % 2 == 0 {
            pair_count as u32 - 1
        } else {
            pair_count as u32
        }
    }

    /// Standings order after `round`, best pair first.
    fn standings(t: &Tournament, category_id: i64, round: u32) -> Vec<i64> {
        let mut entries = t.store.ranking_entries(category_id, round);
        entries.sort_by_key(|e| e.rank.unwrap_or(u32::MAX));
        entries.iter().map(|e| e.pair_id).collect()
    }

    fn played_pairings(t: &Tournament, category_id: i64) -> HashSet<(i64, i64)> {
        use crate::models::Side;
        t.store
            .matches
            .iter()
            .filter(|m| m.category_id == category_id)
            .filter_map(|m| {
                let a = m.pair_id(Side::Slot1)?;
                let b = m.pair_id(Side::Slot2)?;
                Some((a.min(b), a.max(b)))
            })
            .collect()
    }

    /// Times each pair has sat out so far.
    fn sit_out_count(t: &Tournament, category_id: i64, pair_id: i64, rounds: u32) -> u32 {
        (1..=rounds)
            .filter(|&r| {
                !t.store
                    .matches_in_round(category_id, r)
                    .iter()
                    .any(|m| m.has_pair(pair_id))
            })
            .count() as u32
    }

    /// Pairings for the round after `round`, or `None` when no rematch-free
    /// pairing exists anymore.
    fn next_round_pairings(
        t: &Tournament,
        category_id: i64,
        round: u32,
    ) -> Option<Vec<(i64, i64)>> {
        let order = Self::standings(t, category_id, round);
        let played = Self::played_pairings(t, category_id);

        if order.len() % 2 == 0 {
            return pair_without_rematches(&order, &played);
        }

        // odd field: pick the sit-out from the bottom of the standings,
        // fewest previous sit-outs first
        let mut candidates: Vec<i64> = order.clone();
        candidates.reverse();
        candidates.sort_by_key(|&p| Self::sit_out_count(t, category_id, p, round));
        for sit_out in candidates {
            let rest: Vec<i64> = order.iter().copied().filter(|&p| p != sit_out).collect();
            if let Some(pairings) = pair_without_rematches(&rest, &played) {
                return Some(pairings);
            }
        }
        None
    }
}

impl CategoryVariant for SwissLadderVariant {
    fn can_freeze_config(&self, t: &Tournament, category_id: i64) -> Result<()> {
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::Config {
            return Err(TournamentError::ConfigAlreadyFrozen);
        }
        if t.has_unpaired_players(category_id) {
            return Err(TournamentError::UnpairedPlayers);
        }
        let count = t.store.pairs_in_category(category_id, None).len();
        if count < 3 {
            return Err(TournamentError::InvalidPlayerCount { found: count, min: 3 });
        }
        Ok(())
    }

    fn needs_initial_ranking(&self) -> bool {
        true
    }

    fn needs_group_initialization(&self) -> bool {
        false
    }

    fn prepare_first_round(
        &self,
        t: &mut Tournament,
        category_id: i64,
        progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        if !t.store.match_groups_for(category_id, None).is_empty() {
            return Ok(());
        }
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::Idle {
            return Err(TournamentError::WrongState);
        }

        // round one pairs neighbors in the seeding; an odd field's lowest
        // seed sits out
        let mut seeded: Vec<(u32, i64)> = t
            .store
            .pairs_in_category(category_id, None)
            .into_iter()
            .map(|p| p.initial_rank.map(|r| (r, p.id)))
            .collect::<Option<Vec<_>>>()
            .ok_or(TournamentError::InvalidSeedingList)?;
        seeded.sort_unstable();
        let order: Vec<i64> = seeded.into_iter().map(|(_, id)| id).collect();
        let pairings: Vec<(i64, i64)> = order.chunks_exact(2).map(|c| (c[0], c[1])).collect();

        if let Some(p) = progress {
            p.reset(pairings.len() as u32);
        }
        let mut batch = GenerationBatch::default();
        if let Err(e) = t.generate_round_matches(category_id, 1, &pairings, progress, &mut batch) {
            t.rollback_generation(&batch);
            return Err(e);
        }

        t.set_category_state(category_id, CategoryState::GroupRounds);
        Ok(())
    }

    fn calc_total_rounds_count(&self, t: &Tournament, category_id: i64) -> Option<u32> {
        let cat = t.store.categories.expect(category_id);
        if matches!(cat.state, CategoryState::Config | CategoryState::Frozen) {
            return None;
        }
        let count = t.store.pairs_in_category(category_id, None).len();
        Some(Self::total_rounds(count))
    }

    fn on_round_completed(&self, t: &mut Tournament, category_id: i64, round: u32) -> Result<()> {
        let pairs = t.store.pair_ids_in_category(category_id, None);
        t.create_unsorted_ranking_entries_for_last_round(category_id, &pairs)?;
        t.sort_ranking_entries_for_last_round(category_id)?;

        if round >= Self::total_rounds(pairs.len()) {
            t.set_category_state(category_id, CategoryState::Finished);
            return Ok(());
        }

        match Self::next_round_pairings(t, category_id, round) {
            Some(pairings) => {
                let mut batch = GenerationBatch::default();
                if let Err(e) =
                    t.generate_round_matches(category_id, round + 1, &pairings, None, &mut batch)
                {
                    t.rollback_generation(&batch);
                    return Err(e);
                }
                Ok(())
            }
            None => {
                // ladder is exhausted early, the current standing is final
                warn!(category_id, round, "no rematch-free pairing left");
                t.set_category_state(category_id, CategoryState::Finished);
                Ok(())
            }
        }
    }

    fn get_remaining_players_after_round(
        &self,
        t: &Tournament,
        category_id: i64,
        _round: u32,
    ) -> Result<Vec<i64>> {
        // nobody drops out of a ladder
        Ok(t.store.pair_ids_in_category(category_id, None))
    }

    fn get_player_pairs_for_intermediate_seeding(
        &self,
        _t: &Tournament,
        _category_id: i64,
    ) -> Vec<i64> {
        Vec::new()
    }

    fn resolve_intermediate_seeding(
        &self,
        _t: &mut Tournament,
        _category_id: i64,
        _seed: &[i64],
        _progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        Err(TournamentError::CategoryNeedsNoSeeding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_avoids_rematches() {
        let order = vec![1, 2, 3, 4];
        let mut played = HashSet::new();
        played.insert((1, 2));
        played.insert((3, 4));

        let pairings = pair_without_rematches(&order, &played).unwrap();
        assert_eq!(pairings.len(), 2);
        for (a, b) in pairings {
            assert!(!played.contains(&(a.min(b), a.max(b))));
        }
    }

    #[test]
    fn test_pairing_backtracks() {
        // pairing 1-2 first would strand 3 and 4
        let order = vec![1, 2, 3, 4];
        let mut played = HashSet::new();
        played.insert((3, 4));

        let pairings = pair_without_rematches(&order, &played).unwrap();
        assert!(pairings.contains(&(1, 3)) || pairings.contains(&(1, 4)));
    }

    #[test]
    fn test_pairing_detects_exhaustion() {
        // everyone has met everyone
        let order = vec![1, 2, 3, 4];
        let played: HashSet<(i64, i64)> = [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]
            .into_iter()
            .collect();
        assert!(pair_without_rematches(&order, &played).is_none());
    }
}
