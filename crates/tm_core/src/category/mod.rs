//! Category lifecycle state machine.
//!
//! One small concrete type per match system implements the shared
//! [`CategoryVariant`] contract; the facade methods on [`Tournament`]
//! dispatch on the category's match system. Shared here: the transition
//! plumbing between `Config` and `Idle` and the bulk match-generation
//! helpers (group round robins and elimination brackets) with progress
//! reporting, cancellation and batch rollback.

mod elimination;
mod round_robin;
mod swiss;

pub use elimination::SingleEliminationVariant;
pub use round_robin::RoundRobinVariant;
pub use swiss::SwissLadderVariant;

use tracing::{debug, info};

use crate::bracket::{self, BracketSlot};
use crate::error::{Result, TournamentError};
use crate::events::TournamentEvent;
use crate::models::{
    CategoryState, GroupTag, Match, MatchGroup, MatchState, MatchSystem, SlotRef,
};
use crate::progress::ProgressQueue;
use crate::tournament::Tournament;

/// Behavioral contract shared by all match systems.
pub trait CategoryVariant {
    /// Validates the system-specific freeze prerequisites.
    fn can_freeze_config(&self, t: &Tournament, category_id: i64) -> Result<()>;

    /// Whether the system expects an initial seeding between freeze and
    /// first-round generation.
    fn needs_initial_ranking(&self) -> bool;

    /// Whether the system expects a group draw between freeze and
    /// first-round generation.
    fn needs_group_initialization(&self) -> bool;

    /// Generates all matches of the opening phase. Idempotent: a second
    /// call on an already initialized category succeeds without
    /// regenerating anything.
    fn prepare_first_round(
        &self,
        t: &mut Tournament,
        category_id: i64,
        progress: Option<&ProgressQueue>,
    ) -> Result<()>;

    /// Total number of rounds this category will play; `None` while the
    /// configuration is not frozen into a computable shape yet.
    fn calc_total_rounds_count(&self, t: &Tournament, category_id: i64) -> Option<u32>;

    /// Central hook, fired once per round when its last match finishes.
    fn on_round_completed(&self, t: &mut Tournament, category_id: i64, round: u32) -> Result<()>;

    /// Pairs still in contention after `round` rounds.
    fn get_remaining_players_after_round(
        &self,
        t: &Tournament,
        category_id: i64,
        round: u32,
    ) -> Result<Vec<i64>>;

    /// Qualified pairs awaiting the intermediate seeding, in seeding
    /// order; empty unless the category waits for seeding.
    fn get_player_pairs_for_intermediate_seeding(
        &self,
        t: &Tournament,
        category_id: i64,
    ) -> Vec<i64>;

    /// Turns the confirmed seeding into the elimination bracket.
    fn resolve_intermediate_seeding(
        &self,
        t: &mut Tournament,
        category_id: i64,
        seed: &[i64],
        progress: Option<&ProgressQueue>,
    ) -> Result<()>;
}

pub fn variant_for(system: MatchSystem) -> &'static dyn CategoryVariant {
    match system {
        MatchSystem::RoundRobin => &RoundRobinVariant,
        MatchSystem::SingleElimination => &SingleEliminationVariant,
        MatchSystem::SwissLadder => &SwissLadderVariant,
    }
}

// ----------------------------------------------------------------------
// facade dispatch
// ----------------------------------------------------------------------

impl Tournament {
    fn category_system(&self, category_id: i64) -> Result<MatchSystem> {
        self.store
            .categories
            .get(category_id)
            .map(|c| c.match_system)
            .ok_or(TournamentError::InvalidId { id: category_id })
    }

    /// Validates and freezes the category configuration; membership and
    /// system/type become immutable. Fails without partial mutation.
    pub fn freeze_category_config(&mut self, category_id: i64) -> Result<()> {
        let system = self.category_system(category_id)?;
        variant_for(system).can_freeze_config(self, category_id)?;
        self.set_category_state(category_id, CategoryState::Frozen);
        Ok(())
    }

    /// Reopens a frozen category for configuration, dropping any group
    /// draw or seeding already applied.
    pub fn unfreeze_category_config(&mut self, category_id: i64) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        if cat.state != CategoryState::Frozen {
            return Err(TournamentError::CategoryNotUnfreezeable);
        }
        for pair in self.store.pairs.iter_mut() {
            if pair.category_id == category_id {
                pair.group_num = None;
                pair.initial_rank = None;
            }
        }
        self.set_category_state(category_id, CategoryState::Config);
        Ok(())
    }

    /// Applies the group draw (`groups[i]` = members of group i+1) and
    /// readies the category for match generation.
    pub fn apply_group_assignment(&mut self, category_id: i64, groups: &[Vec<i64>]) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        match cat.state {
            CategoryState::Frozen => {}
            CategoryState::Config => return Err(TournamentError::CategoryNotYetFrozen),
            _ => return Err(TournamentError::WrongState),
        }
        if !variant_for(cat.match_system).needs_group_initialization() {
            return Err(TournamentError::CategoryNeedsNoGroupAssignments);
        }
        let cfg = cat.group_config()?;

        // the draw must deliver exactly the configured group layout
        if groups.len() != cfg.num_groups() as usize {
            return Err(TournamentError::GroupNumberMismatch);
        }
        let mut proposed_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let mut expected_sizes: Vec<usize> = cfg
            .groups
            .iter()
            .flat_map(|d| std::iter::repeat(d.size as usize).take(d.count as usize))
            .collect();
        proposed_sizes.sort_unstable();
        expected_sizes.sort_unstable();
        if proposed_sizes != expected_sizes {
            return Err(TournamentError::GroupNumberMismatch);
        }

        // ... and cover every pair of the category exactly once
        let mut all_proposed: Vec<i64> = groups.iter().flatten().copied().collect();
        let mut all_pairs = self.store.pair_ids_in_category(category_id, None);
        all_proposed.sort_unstable();
        all_pairs.sort_unstable();
        if all_proposed != all_pairs {
            return Err(TournamentError::InvalidSeedingList);
        }

        for (idx, group) in groups.iter().enumerate() {
            for &pair_id in group {
                self.store.pairs.expect_mut(pair_id).group_num = Some(idx as u32 + 1);
            }
        }
        self.set_category_state(category_id, CategoryState::Idle);
        Ok(())
    }

    /// Applies the initial seeding (index 0 = top seed) for elimination
    /// and Swiss ladder categories.
    pub fn apply_initial_ranking(&mut self, category_id: i64, seed: &[i64]) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        match cat.state {
            CategoryState::Frozen => {}
            CategoryState::Config => return Err(TournamentError::CategoryNotYetFrozen),
            _ => return Err(TournamentError::WrongState),
        }
        if !variant_for(cat.match_system).needs_initial_ranking() {
            return Err(TournamentError::CategoryNeedsNoSeeding);
        }

        let mut proposed: Vec<i64> = seed.to_vec();
        let mut all_pairs = self.store.pair_ids_in_category(category_id, None);
        proposed.sort_unstable();
        all_pairs.sort_unstable();
        if proposed != all_pairs {
            return Err(TournamentError::InvalidSeedingList);
        }

        for (idx, &pair_id) in seed.iter().enumerate() {
            self.store.pairs.expect_mut(pair_id).initial_rank = Some(idx as u32 + 1);
        }
        self.set_category_state(category_id, CategoryState::Idle);
        Ok(())
    }

    /// Generates the opening matches of the category in one batch,
    /// reporting progress through the optional queue.
    pub fn prepare_first_round(
        &mut self,
        category_id: i64,
        progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        let system = self.category_system(category_id)?;
        variant_for(system).prepare_first_round(self, category_id, progress)
    }

    pub fn calc_total_rounds_count(&self, category_id: i64) -> Result<Option<u32>> {
        let system = self.category_system(category_id)?;
        Ok(variant_for(system).calc_total_rounds_count(self, category_id))
    }

    pub fn get_player_pairs_for_intermediate_seeding(&self, category_id: i64) -> Result<Vec<i64>> {
        let system = self.category_system(category_id)?;
        Ok(variant_for(system).get_player_pairs_for_intermediate_seeding(self, category_id))
    }

    pub fn resolve_intermediate_seeding(
        &mut self,
        category_id: i64,
        seed: &[i64],
        progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        let system = self.category_system(category_id)?;
        variant_for(system).resolve_intermediate_seeding(self, category_id, seed, progress)
    }

    pub fn get_remaining_players_after_round(
        &self,
        category_id: i64,
        round: u32,
    ) -> Result<Vec<i64>> {
        let system = self.category_system(category_id)?;
        variant_for(system).get_remaining_players_after_round(self, category_id, round)
    }
}

// ----------------------------------------------------------------------
// shared generation machinery
// ----------------------------------------------------------------------

/// Ids created during one bulk generation, for rollback on cancellation.
#[derive(Debug, Default)]
pub(crate) struct GenerationBatch {
    match_ids: Vec<i64>,
    group_ids: Vec<i64>,
}

fn cancelled(progress: Option<&ProgressQueue>) -> bool {
    progress.map(|p| p.is_cancelled()).unwrap_or(false)
}

impl Tournament {
    /// Deletes a not-yet-played generation batch; the only path on which
    /// matches are ever removed.
    pub(crate) fn rollback_generation(&mut self, batch: &GenerationBatch) {
        for &id in &batch.match_ids {
            self.store.matches.delete(id);
        }
        for &id in &batch.group_ids {
            self.store.match_groups.delete(id);
        }
        debug!(
            matches = batch.match_ids.len(),
            groups = batch.group_ids.len(),
            "generation batch rolled back"
        );
    }

    fn create_match(
        &mut self,
        category_id: i64,
        round: u32,
        match_num: Option<u32>,
        slot1: SlotRef,
        slot2: SlotRef,
        batch: &mut GenerationBatch,
    ) -> i64 {
        let ready = slot1.pair_id().is_some() && slot2.pair_id().is_some();
        let id = self.store.matches.insert_with(|id, seq| Match {
            id,
            seq_num: seq,
            category_id,
            round,
            match_num,
            slot1: Some(slot1),
            slot2: Some(slot2),
            court_id: None,
            umpire_id: None,
            state: if ready {
                MatchState::Ready
            } else {
                MatchState::Pending
            },
            score: None,
            winner_side: None,
            winner_rank: None,
            loser_rank: None,
            started_at: None,
            finished_at: None,
        });
        batch.match_ids.push(id);
        self.emit(TournamentEvent::MatchCreated {
            category_id,
            match_id: id,
        });
        id
    }

    fn create_match_group(
        &mut self,
        category_id: i64,
        round: u32,
        tag: GroupTag,
        batch: &mut GenerationBatch,
    ) -> i64 {
        let id = self.store.match_groups.insert_with(|id, seq| MatchGroup {
            id,
            seq_num: seq,
            category_id,
            round,
            tag,
            match_ids: Vec::new(),
        });
        batch.group_ids.push(id);
        id
    }

    /// Full round robin for one set of members, one match group per
    /// round, starting at `first_round`.
    pub(crate) fn generate_group_matches(
        &mut self,
        category_id: i64,
        members: &[i64],
        tag: GroupTag,
        first_round: u32,
        progress: Option<&ProgressQueue>,
        batch: &mut GenerationBatch,
    ) -> Result<()> {
        let rounds = bracket::round_robin_rounds(members.len());
        for (offset, pairings) in rounds.iter().enumerate() {
            let round = first_round + offset as u32;
            let group_id = self.create_match_group(category_id, round, tag, batch);
            for &(a, b) in pairings {
                if cancelled(progress) {
                    return Err(TournamentError::OperationCanceled);
                }
                let match_id = self.create_match(
                    category_id,
                    round,
                    None,
                    SlotRef::Pair(members[a]),
                    SlotRef::Pair(members[b]),
                    batch,
                );
                self.store
                    .match_groups
                    .expect_mut(group_id)
                    .match_ids
                    .push(match_id);
                if let Some(p) = progress {
                    p.step(1);
                }
            }
        }
        Ok(())
    }

    /// One round of explicitly chosen pairings (Swiss ladder iterations).
    pub(crate) fn generate_round_matches(
        &mut self,
        category_id: i64,
        round: u32,
        pairings: &[(i64, i64)],
        progress: Option<&ProgressQueue>,
        batch: &mut GenerationBatch,
    ) -> Result<()> {
        let group_id = self.create_match_group(category_id, round, GroupTag::Iteration, batch);
        for (num, &(a, b)) in pairings.iter().enumerate() {
            if cancelled(progress) {
                return Err(TournamentError::OperationCanceled);
            }
            let match_id = self.create_match(
                category_id,
                round,
                Some(num as u32 + 1),
                SlotRef::Pair(a),
                SlotRef::Pair(b),
                batch,
            );
            self.store
                .match_groups
                .expect_mut(group_id)
                .match_ids
                .push(match_id);
            if let Some(p) = progress {
                p.step(1);
            }
        }
        Ok(())
    }

    /// Materializes a single-elimination bracket: matches carry their
    /// placement metadata, symbolic slots reference the feeding match by
    /// id and byes have already been folded away by the generator.
    pub(crate) fn generate_bracket_matches(
        &mut self,
        category_id: i64,
        seeding: &[i64],
        first_round: u32,
        third_place: bool,
        progress: Option<&ProgressQueue>,
        batch: &mut GenerationBatch,
    ) -> Result<()> {
        let blueprint = bracket::single_elimination(seeding.len(), third_place);
        if let Some(p) = progress {
            p.reset(blueprint.len() as u32);
        }
        let max_round = blueprint.iter().map(|m| m.round).max().unwrap_or(1);

        let mut created: Vec<i64> = Vec::with_capacity(blueprint.len());
        let mut groups: Vec<(u32, i64)> = Vec::new(); // (bracket round, group id)

        for bm in &blueprint {
            if cancelled(progress) {
                return Err(TournamentError::OperationCanceled);
            }

            let resolve = |slot: BracketSlot| -> SlotRef {
                match slot {
                    BracketSlot::Seed(n) => SlotRef::Pair(seeding[n - 1]),
                    BracketSlot::WinnerOf(idx) => SlotRef::WinnerOf(created[idx]),
                    BracketSlot::LoserOf(idx) => SlotRef::LoserOf(created[idx]),
                    BracketSlot::Bye => unreachable!("generator resolves all byes"),
                }
            };
            let slot1 = resolve(bm.slot1);
            let slot2 = resolve(bm.slot2);

            let round = first_round + bm.round - 1;
            let match_id =
                self.create_match(category_id, round, Some(bm.match_num), slot1, slot2, batch);
            let m = self.store.matches.expect_mut(match_id);
            m.winner_rank = bm.winner_rank;
            m.loser_rank = bm.loser_rank;
            created.push(match_id);

            let existing = groups
                .iter()
                .find(|(r, _)| *r == bm.round)
                .map(|&(_, id)| id);
            let group_id = match existing {
                Some(id) => id,
                None => {
                    let tag = elimination_tag(max_round - bm.round);
                    let id = self.create_match_group(category_id, round, tag, batch);
                    groups.push((bm.round, id));
                    id
                }
            };
            self.store
                .match_groups
                .expect_mut(group_id)
                .match_ids
                .push(match_id);

            if let Some(p) = progress {
                p.step(1);
            }
        }

        info!(
            category_id,
            matches = created.len(),
            first_round,
            "elimination bracket generated"
        );
        Ok(())
    }
}

/// Match-group tag by distance from the final round.
fn elimination_tag(rounds_before_final: u32) -> GroupTag {
    match rounds_before_final {
        0 => GroupTag::Final,
        1 => GroupTag::Semi,
        2 => GroupTag::Quarter,
        3 => GroupTag::L16,
        // deeper entry rounds of large open brackets
        _ => GroupTag::Iteration,
    }
}

// ----------------------------------------------------------------------
// shared knockout logic
// ----------------------------------------------------------------------

/// Removes the losers of `round` from `survivors`, except after a
/// semifinal: beaten semifinalists stay in contention for 3rd place.
pub(crate) fn drop_losers_of_round(
    t: &Tournament,
    category_id: i64,
    round: u32,
    total_rounds: u32,
    survivors: &mut Vec<i64>,
) {
    if round == total_rounds - 1 {
        return; // semifinals
    }
    for m in t.store.matches_in_round(category_id, round) {
        if let Some(loser) = m.loser_pair() {
            survivors.retain(|&p| p != loser);
        }
    }
}

/// After the last elimination round: forces the final placements stored
/// on the bracket matches onto the last round's ranking entries.
pub(crate) fn force_final_ranks(
    t: &mut Tournament,
    category_id: i64,
    first_ko_round: u32,
    final_round: u32,
) -> Result<()> {
    let mut forced: Vec<(i64, u32)> = Vec::new();
    for round in first_ko_round..=final_round {
        for m in t.store.matches_in_round(category_id, round) {
            if !m.is_decided() {
                continue;
            }
            if let Some(rank) = m.winner_rank {
                let winner = m.winner_pair().expect("decided match must have a winner");
                forced.push((winner, rank));
            }
            if let Some(rank) = m.loser_rank {
                let loser = m.loser_pair().expect("decided match must have a loser");
                forced.push((loser, rank));
            }
        }
    }

    for (pair_id, rank) in forced {
        let entry_id = t
            .store
            .ranking_entry(category_id, final_round, pair_id)
            .ok_or(TournamentError::MissingRankingEntries)?
            .id;
        t.force_rank(entry_id, rank)?;
    }
    Ok(())
}
