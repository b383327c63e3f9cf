//! Pure single elimination: a seeded bracket from the first round on,
//! no group phase and no intermediate seeding.

use crate::category::{drop_losers_of_round, force_final_ranks, CategoryVariant, GenerationBatch};
use crate::error::{Result, TournamentError};
use crate::models::CategoryState;
use crate::progress::ProgressQueue;
use crate::tournament::Tournament;

pub struct SingleEliminationVariant;

impl SingleEliminationVariant {
    /// Pairs ordered by their initial rank, best seed first.
    fn seeding(t: &Tournament, category_id: i64) -> Result<Vec<i64>> {
        let mut pairs: Vec<(u32, i64)> = t
            .store
            .pairs_in_category(category_id, None)
            .into_iter()
            .map(|p| p.initial_rank.map(|r| (r, p.id)))
            .collect::<Option<Vec<_>>>()
            .ok_or(TournamentError::InvalidSeedingList)?;
        pairs.sort_unstable();
        Ok(pairs.into_iter().map(|(_, id)| id).collect())
    }

    fn total_rounds(pair_count: usize) -> u32 {
        pair_count.next_power_of_two().trailing_zeros()
    }
}

impl CategoryVariant for SingleEliminationVariant {
    fn can_freeze_config(&self, t: &Tournament, category_id: i64) -> Result<()> {
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::Config {
            return Err(TournamentError::ConfigAlreadyFrozen);
        }
        if t.has_unpaired_players(category_id) {
            return Err(TournamentError::UnpairedPlayers);
        }
        let count = t.store.pairs_in_category(category_id, None).len();
        if count < 2 {
            return Err(TournamentError::InvalidPlayerCount { found: count, min: 2 });
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
        let third_place = cat.third_place_match();
        let seeding = Self::seeding(t, category_id)?;

        let mut batch = GenerationBatch::default();
        if let Err(e) =
            t.generate_bracket_matches(category_id, &seeding, 1, third_place, progress, &mut batch)
        {
            t.rollback_generation(&batch);
            return Err(e);
        }

        t.set_category_state(category_id, CategoryState::Elimination);
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
        let count = t.store.pairs_in_category(category_id, None).len();
        let total_rounds = Self::total_rounds(count);

        let survivors = self.get_remaining_players_after_round(t, category_id, round - 1)?;
        t.create_unsorted_ranking_entries_for_last_round(category_id, &survivors)?;
        t.sort_ranking_entries_for_last_round(category_id)?;

        if round == total_rounds {
            force_final_ranks(t, category_id, 1, total_rounds)?;
            t.set_category_state(category_id, CategoryState::Finished);
        }
        Ok(())
    }

    fn get_remaining_players_after_round(
        &self,
        t: &Tournament,
        category_id: i64,
        round: u32,
    ) -> Result<Vec<i64>> {
        let mut survivors = t.store.pair_ids_in_category(category_id, None);
        let total_rounds = Self::total_rounds(survivors.len());
        for r in 1..=round {
            drop_losers_of_round(t, category_id, r, total_rounds, &mut survivors);
        }
        Ok(survivors)
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
