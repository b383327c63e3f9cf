//! Group phase followed by a single-elimination phase, configured
//! through the category's [`KoConfig`](crate::models::KoConfig)
//! parameter. The phase boundary runs through the intermediate seeding:
//! after the last group round the category waits until the operator
//! confirms the bracket seeding derived from the group standings.

use std::collections::HashSet;

use crate::category::{drop_losers_of_round, force_final_ranks, CategoryVariant, GenerationBatch};
use crate::error::{Result, TournamentError};
use crate::models::{CategoryState, GroupTag, Side};
use crate::progress::ProgressQueue;
use crate::tournament::Tournament;

pub struct RoundRobinVariant;

impl CategoryVariant for RoundRobinVariant {
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
        let cfg = cat.group_config()?;
        if !cfg.is_valid(count) {
            return Err(TournamentError::InvalidKoConfig);
        }
        Ok(())
    }

    fn needs_initial_ranking(&self) -> bool {
        false
    }

    fn needs_group_initialization(&self) -> bool {
        true
    }

    fn prepare_first_round(
        &self,
        t: &mut Tournament,
        category_id: i64,
        progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        // already generated: nothing to do
        if !t.store.match_groups_for(category_id, None).is_empty() {
            return Ok(());
        }
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::Idle {
            return Err(TournamentError::WrongState);
        }
        let cfg = cat.group_config()?;

        if let Some(p) = progress {
            p.reset(cfg.num_group_matches());
        }

        let mut batch = GenerationBatch::default();
        for group_num in 1..=cfg.num_groups() {
            let members = t.store.pair_ids_in_category(category_id, Some(group_num));
            if let Err(e) = t.generate_group_matches(
                category_id,
                &members,
                GroupTag::Group(group_num),
                1,
                progress,
                &mut batch,
            ) {
                t.rollback_generation(&batch);
                return Err(e);
            }
        }

        t.set_category_state(category_id, CategoryState::GroupRounds);
        Ok(())
    }

    fn calc_total_rounds_count(&self, t: &Tournament, category_id: i64) -> Option<u32> {
        let cat = t.store.categories.expect(category_id);
        if matches!(cat.state, CategoryState::Config | CategoryState::Frozen) {
            return None;
        }
        let cfg = cat.group_config().ok()?;
        Some(cfg.num_group_rounds() + cfg.start_level.rounds())
    }

    fn on_round_completed(&self, t: &mut Tournament, category_id: i64, round: u32) -> Result<()> {
        let cat = t.store.categories.expect(category_id);
        let cfg = cat.group_config()?;
        let group_rounds = cfg.num_group_rounds();
        let total_rounds = group_rounds + cfg.start_level.rounds();

        if round <= group_rounds {
            // group standings cover everyone
            let pairs = t.store.pair_ids_in_category(category_id, None);
            t.create_unsorted_ranking_entries_for_last_round(category_id, &pairs)?;
            t.sort_ranking_entries_for_last_round(category_id)?;

            if round == group_rounds {
                t.set_category_state(category_id, CategoryState::WaitForIntermediateSeeding);
            }
            return Ok(());
        }

        // elimination phase
        let survivors = self.get_remaining_players_after_round(t, category_id, round - 1)?;
        t.create_unsorted_ranking_entries_for_last_round(category_id, &survivors)?;
        t.sort_ranking_entries_for_last_round(category_id)?;

        if round == total_rounds {
            force_final_ranks(t, category_id, group_rounds + 1, total_rounds)?;
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
        let cat = t.store.categories.expect(category_id);
        let cfg = cat.group_config()?;
        let group_rounds = cfg.num_group_rounds();
        let total_rounds = group_rounds + cfg.start_level.rounds();

        if round < group_rounds {
            return Ok(t.store.pair_ids_in_category(category_id, None));
        }

        // participants of the bracket, minus the losers of each decided
        // elimination round
        let mut seen = HashSet::new();
        let mut survivors: Vec<i64> = Vec::new();
        for m in t.store.matches.iter() {
            if m.category_id != category_id || m.round <= group_rounds {
                continue;
            }
            for pair_id in [m.pair_id(Side::Slot1), m.pair_id(Side::Slot2)] {
                if let Some(pair_id) = pair_id {
                    if seen.insert(pair_id) {
                        survivors.push(pair_id);
                    }
                }
            }
        }
        if survivors.is_empty() {
            // bracket not generated yet
            return Ok(t.store.pair_ids_in_category(category_id, None));
        }

        for r in group_rounds + 1..=round {
            drop_losers_of_round(t, category_id, r, total_rounds, &mut survivors);
        }
        Ok(survivors)
    }

    /// Seeding proposal for the bracket: group winners first, then the
    /// second-placed players if they survive. The winners are listed
    /// highest group number first so that winners of neighboring groups
    /// land in opposite bracket halves.
    fn get_player_pairs_for_intermediate_seeding(
        &self,
        t: &Tournament,
        category_id: i64,
    ) -> Vec<i64> {
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::WaitForIntermediateSeeding {
            return Vec::new();
        }
        let Ok(cfg) = cat.group_config() else {
            return Vec::new();
        };
        let round = cat.finished_rounds;

        let pair_at_rank = |group: GroupTag, rank: u32| -> Option<i64> {
            t.store
                .ranking_entries(category_id, round)
                .into_iter()
                .find(|e| e.tag == group && e.rank == Some(rank))
                .map(|e| e.pair_id)
        };

        let groups = t.store.ranking_groups(category_id, round);
        let mut seed: Vec<i64> = groups
            .iter()
            .rev()
            .filter_map(|&g| pair_at_rank(g, 1))
            .collect();
        if cfg.second_survives {
            seed.extend(groups.iter().filter_map(|&g| pair_at_rank(g, 2)));
        }
        seed
    }

    fn resolve_intermediate_seeding(
        &self,
        t: &mut Tournament,
        category_id: i64,
        seed: &[i64],
        progress: Option<&ProgressQueue>,
    ) -> Result<()> {
        let cat = t.store.categories.expect(category_id);
        if cat.state != CategoryState::WaitForIntermediateSeeding {
            return Err(TournamentError::WrongState);
        }
        let cfg = cat.group_config()?;
        let third_place = cat.third_place_match();
        let first_ko_round = cfg.num_group_rounds() + 1;

        // the confirmed list must contain exactly the qualified pairs
        let mut proposed: Vec<i64> = seed.to_vec();
        let mut qualified = self.get_player_pairs_for_intermediate_seeding(t, category_id);
        proposed.sort_unstable();
        qualified.sort_unstable();
        if proposed != qualified {
            return Err(TournamentError::InvalidSeedingList);
        }

        let mut batch = GenerationBatch::default();
        if let Err(e) = t.generate_bracket_matches(
            category_id,
            seed,
            first_ko_round,
            third_place,
            progress,
            &mut batch,
        ) {
            t.rollback_generation(&batch);
            return Err(e);
        }

        t.set_category_state(category_id, CategoryState::Elimination);
        Ok(())
    }
}
