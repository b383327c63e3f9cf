//! Match lifecycle: calling a match onto a court, recording results,
//! walkovers, winner/loser forwarding into dependent bracket matches and
//! the round-completion hook that drives the category state machine.

use chrono::Utc;
use tracing::{debug, info};

use crate::category::variant_for;
use crate::error::{Result, TournamentError};
use crate::events::TournamentEvent;
use crate::models::{GroupTag, MatchScore, MatchState, Side, SlotRef};
use crate::tournament::Tournament;

impl Tournament {
    /// Manual call-order assignment for matches generated without one.
    pub fn set_match_number(&mut self, match_id: i64, match_num: u32) -> Result<()> {
        let m = self
            .store
            .matches
            .get_mut(match_id)
            .ok_or(TournamentError::InvalidId { id: match_id })?;
        if m.is_decided() || m.state == MatchState::Running {
            return Err(TournamentError::WrongState);
        }
        m.match_num = Some(match_num);
        Ok(())
    }

    pub fn assign_umpire(&mut self, match_id: i64, player_id: i64) -> Result<()> {
        if self.store.players.get(player_id).is_none() {
            return Err(TournamentError::InvalidId { id: player_id });
        }
        let m = self
            .store
            .matches
            .get_mut(match_id)
            .ok_or(TournamentError::InvalidId { id: match_id })?;
        if m.is_decided() {
            return Err(TournamentError::WrongState);
        }
        m.umpire_id = Some(player_id);
        Ok(())
    }

    /// Calls a ready match onto a court.
    pub fn start_match(&mut self, match_id: i64, court_id: i64) -> Result<()> {
        let m = self
            .store
            .matches
            .get(match_id)
            .ok_or(TournamentError::InvalidId { id: match_id })?;
        if m.state != MatchState::Ready {
            return Err(TournamentError::MatchNotRunnable);
        }

        self.acquire_court(court_id)?;

        let m = self.store.matches.expect_mut(match_id);
        m.court_id = Some(court_id);
        m.started_at = Some(Utc::now());
        self.set_match_state(match_id, MatchState::Running);
        Ok(())
    }

    /// Records the result of a running match, frees its court, forwards
    /// winner/loser into dependent matches and fires the round-completion
    /// hook when this was the round's last open match.
    pub fn finish_match(&mut self, match_id: i64, score: MatchScore) -> Result<()> {
        let m = self
            .store
            .matches
            .get(match_id)
            .ok_or(TournamentError::InvalidId { id: match_id })?;
        if m.state != MatchState::Running {
            return Err(TournamentError::MatchNotRunning);
        }
        let category_id = m.category_id;
        let round = m.round;
        let court_id = m.court_id;

        let cat = self.store.categories.expect(category_id);
        // draws can only happen in round-robin/iteration play
        let allow_draw = cat.allows_draw() && self.is_group_play(category_id, match_id, round);
        if !score.is_valid(cat.win_score(), allow_draw) {
            return Err(TournamentError::InvalidMatchResultForCategorySettings);
        }

        let winner_side = score.winner();
        let m = self.store.matches.expect_mut(match_id);
        m.winner_side = winner_side;
        m.score = Some(score);
        m.finished_at = Some(Utc::now());
        // the court reference is kept for the match history
        self.set_match_state(match_id, MatchState::Finished);
        if let Some(court_id) = court_id {
            self.release_court(court_id)?;
        }

        info!(match_id, category_id, round, "match finished");
        self.resolve_dependent_slots(match_id);
        self.process_round_completion(category_id)
    }

    /// Decides a match without play. The winner side must be given since
    /// there is no score to derive it from.
    pub fn finish_match_as_walkover(&mut self, match_id: i64, winner_side: Side) -> Result<()> {
        let m = self
            .store
            .matches
            .get(match_id)
            .ok_or(TournamentError::InvalidId { id: match_id })?;
        if !matches!(m.state, MatchState::Ready | MatchState::Running) {
            return Err(TournamentError::MatchNotRunnable);
        }
        let category_id = m.category_id;
        let court_id = if m.state == MatchState::Running {
            m.court_id
        } else {
            None
        };

        let m = self.store.matches.expect_mut(match_id);
        m.winner_side = Some(winner_side);
        m.finished_at = Some(Utc::now());
        self.set_match_state(match_id, MatchState::Walkover);
        if let Some(court_id) = court_id {
            self.release_court(court_id)?;
        }

        self.resolve_dependent_slots(match_id);
        self.process_round_completion(category_id)
    }

    fn is_group_play(&self, category_id: i64, match_id: i64, round: u32) -> bool {
        self.store
            .match_groups_for(category_id, Some(round))
            .iter()
            .find(|g| g.match_ids.contains(&match_id))
            .map(|g| matches!(g.tag, GroupTag::Group(_) | GroupTag::Iteration))
            .unwrap_or(false)
    }

    pub(crate) fn set_match_state(&mut self, match_id: i64, to: MatchState) {
        let m = self.store.matches.expect_mut(match_id);
        let from = m.state;
        if from == to {
            return;
        }
        m.state = to;
        self.emit(TournamentEvent::MatchStateChanged { match_id, from, to });
    }

    /// Replaces symbolic "winner of X"/"loser of X" slots of dependent
    /// matches once X is decided; a dependent match becomes ready when
    /// both of its opponents are known.
    fn resolve_dependent_slots(&mut self, finished_match_id: i64) {
        let finished = self.store.matches.expect(finished_match_id);
        assert!(finished.is_decided(), "forwarding from an undecided match");
        // drawn group matches have no winner to forward
        let Some(winner) = finished.winner_pair() else {
            return;
        };
        let loser = finished
            .loser_pair()
            .expect("match with a winner must have a loser");

        let dependents: Vec<i64> = self
            .store
            .matches
            .iter()
            .filter(|m| {
                [m.slot1, m.slot2].iter().any(|s| {
                    matches!(
                        s,
                        Some(SlotRef::WinnerOf(id)) | Some(SlotRef::LoserOf(id))
                            if *id == finished_match_id
                    )
                })
            })
            .map(|m| m.id)
            .collect();

        for dep_id in dependents {
            let dep = self.store.matches.expect_mut(dep_id);
            for slot in [&mut dep.slot1, &mut dep.slot2] {
                match slot {
                    Some(SlotRef::WinnerOf(id)) if *id == finished_match_id => {
                        *slot = Some(SlotRef::Pair(winner));
                    }
                    Some(SlotRef::LoserOf(id)) if *id == finished_match_id => {
                        *slot = Some(SlotRef::Pair(loser));
                    }
                    _ => {}
                }
            }
            let both_resolved = dep.pair_id(Side::Slot1).is_some() && dep.pair_id(Side::Slot2).is_some();
            if both_resolved && dep.state == MatchState::Pending {
                debug!(match_id = dep_id, "dependent match became ready");
                self.set_match_state(dep_id, MatchState::Ready);
            }
        }
    }

    /// Fires the round-completion hook for every round that is now fully
    /// decided, in ascending order. Rounds complete strictly one after
    /// another even when matches finish out of order.
    fn process_round_completion(&mut self, category_id: i64) -> Result<()> {
        loop {
            let cat = self.store.categories.expect(category_id);
            let next_round = cat.finished_rounds + 1;
            let system = cat.match_system;

            let matches = self.store.matches_in_round(category_id, next_round);
            if matches.is_empty() || matches.iter().any(|m| !m.is_decided()) {
                return Ok(());
            }

            self.store.categories.expect_mut(category_id).finished_rounds = next_round;
            info!(category_id, round = next_round, "round completed");
            self.emit(TournamentEvent::RoundCompleted {
                category_id,
                round: next_round,
            });
            variant_for(system).on_round_completed(self, category_id, next_round)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatParameter, GameScore, MatchSystem, MatchType, ParamValue, Sex};

    /// Round robin of 2 groups of 3 with draws allowed; returns the
    /// prepared tournament, the category and a free court.
    fn drawable_group_category() -> (Tournament, i64, i64) {
        let mut t = Tournament::new();
        let court = t.create_court(1, "Center").unwrap();
        let cat = t
            .create_category("MS", MatchType::Singles, MatchSystem::RoundRobin, Some(Sex::M))
            .unwrap();
        t.set_category_parameter(cat, CatParameter::AllowDraw, ParamValue::Bool(true))
            .unwrap();
        t.set_category_parameter(cat, CatParameter::GroupConfig, ParamValue::Str("F;0;2:3".into()))
            .unwrap();

        let mut pairs = Vec::new();
        for i in 0..6 {
            let p = t
                .create_player(&format!("P{i}"), &format!("T{i}"), Sex::M)
                .unwrap();
            t.add_player_to_category(cat, p).unwrap();
            pairs.push(t.store().pair_of_player(cat, p).unwrap().id);
        }
        t.freeze_category_config(cat).unwrap();
        t.apply_group_assignment(cat, &[pairs[0..3].to_vec(), pairs[3..6].to_vec()])
            .unwrap();
        t.prepare_first_round(cat, None).unwrap();
        (t, cat, court)
    }

    fn drawn_score() -> MatchScore {
        MatchScore::new(vec![GameScore::new(21, 15), GameScore::new(15, 21)])
    }

    #[test]
    fn test_drawn_group_match_finishes_without_winner() {
        let (mut t, cat, court) = drawable_group_category();
        let match_id = t.store().matches_in_state(cat, MatchState::Ready)[0].id;

        t.start_match(match_id, court).unwrap();
        t.finish_match(match_id, drawn_score()).unwrap();

        let m = t.store().matches.get(match_id).unwrap();
        assert_eq!(m.state, MatchState::Finished);
        assert_eq!(m.winner_side, None);
        assert!(m.winner_pair().is_none());
    }

    #[test]
    fn test_drawn_round_counts_draws_in_the_standings() {
        let (mut t, cat, court) = drawable_group_category();

        // one match per group in round 1, the third member sits out
        let round_one: Vec<i64> = t
            .store()
            .matches_in_round(cat, 1)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(round_one.len(), 2);
        for match_id in round_one {
            t.start_match(match_id, court).unwrap();
            t.finish_match(match_id, drawn_score()).unwrap();
        }

        assert_eq!(t.store().categories.get(cat).unwrap().finished_rounds, 1);
        let entries = t.store().ranking_entries(cat, 1);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries.iter().filter(|e| e.draws == 1).count(), 4);
        assert!(entries.iter().all(|e| e.wins == 0 && e.losses == 0));
    }

    #[test]
    fn test_draw_rejected_outside_group_play() {
        let mut t = Tournament::new();
        let court = t.create_court(1, "").unwrap();
        let cat = t
            .create_category("MS KO", MatchType::Singles, MatchSystem::SingleElimination, Some(Sex::M))
            .unwrap();
        t.set_category_parameter(cat, CatParameter::AllowDraw, ParamValue::Bool(true))
            .unwrap();
        let mut pairs = Vec::new();
        for i in 0..2 {
            let p = t
                .create_player(&format!("K{i}"), &format!("T{i}"), Sex::M)
                .unwrap();
            t.add_player_to_category(cat, p).unwrap();
            pairs.push(t.store().pair_of_player(cat, p).unwrap().id);
        }
        t.freeze_category_config(cat).unwrap();
        t.apply_initial_ranking(cat, &pairs).unwrap();
        t.prepare_first_round(cat, None).unwrap();

        // a bracket match cannot end drawn even when the category allows
        // draws in group play
        let match_id = t.store().matches_in_state(cat, MatchState::Ready)[0].id;
        t.start_match(match_id, court).unwrap();
        assert_eq!(
            t.finish_match(match_id, drawn_score()),
            Err(TournamentError::InvalidMatchResultForCategorySettings)
        );
    }
}
