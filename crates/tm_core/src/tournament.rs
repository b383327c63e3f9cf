//! Tournament facade: owns the store and the event sink, and carries the
//! registration surface (players, categories, pairing).
//!
//! The engine is single-threaded by design; all mutation goes through
//! `&mut self` and the caller serializes access.

use tracing::debug;

use crate::error::{Result, TournamentError};
use crate::events::{EventSink, NullEventSink, TournamentEvent};
use crate::models::{
    CatParameter, Category, CategoryState, MatchType, ParamValue, Player, PlayerPair, Sex,
};
use crate::store::TournamentStore;

pub(crate) const MAX_NAME_LEN: usize = 50;

pub struct Tournament {
    pub(crate) store: TournamentStore,
    pub(crate) events: Box<dyn EventSink>,
}

impl Default for Tournament {
    fn default() -> Self {
        Tournament::new()
    }
}

impl Tournament {
    pub fn new() -> Self {
        Tournament::with_event_sink(Box::new(NullEventSink))
    }

    pub fn with_event_sink(events: Box<dyn EventSink>) -> Self {
        Tournament {
            store: TournamentStore::new(),
            events,
        }
    }

    /// Rebuilds a facade around previously saved state.
    pub fn from_store(store: TournamentStore, events: Box<dyn EventSink>) -> Self {
        Tournament { store, events }
    }

    /// Read access for UI/report collaborators.
    pub fn store(&self) -> &TournamentStore {
        &self.store
    }

    pub(crate) fn emit(&mut self, event: TournamentEvent) {
        self.events.publish(event);
    }

    fn validate_name(raw: &str) -> Result<String> {
        let name = raw.trim().to_string();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(TournamentError::InvalidName);
        }
        Ok(name)
    }

    // ------------------------------------------------------------------
    // players
    // ------------------------------------------------------------------

    pub fn create_player(&mut self, first_name: &str, last_name: &str, sex: Sex) -> Result<i64> {
        let first = Self::validate_name(first_name)?;
        let last = Self::validate_name(last_name)?;

        if self
            .store
            .players
            .iter()
            .any(|p| p.first_name == first && p.last_name == last)
        {
            return Err(TournamentError::NameExists {
                name: format!("{first} {last}"),
            });
        }

        let id = self.store.players.insert_with(|id, seq| Player {
            id,
            seq_num: seq,
            first_name: first,
            last_name: last,
            sex,
        });
        self.emit(TournamentEvent::PlayerCreated { player_id: id });
        Ok(id)
    }

    pub fn rename_player(&mut self, player_id: i64, first_name: &str, last_name: &str) -> Result<()> {
        let first = Self::validate_name(first_name)?;
        let last = Self::validate_name(last_name)?;
        let player = self
            .store
            .players
            .get_mut(player_id)
            .ok_or(TournamentError::InvalidId { id: player_id })?;
        player.first_name = first;
        player.last_name = last;
        self.emit(TournamentEvent::PlayerRenamed { player_id });
        Ok(())
    }

    // ------------------------------------------------------------------
    // categories
    // ------------------------------------------------------------------

    pub fn create_category(
        &mut self,
        name: &str,
        match_type: MatchType,
        match_system: crate::models::MatchSystem,
        sex: Option<Sex>,
    ) -> Result<i64> {
        let name = Self::validate_name(name)?;
        if self.store.categories.iter().any(|c| c.name == name) {
            return Err(TournamentError::NameExists { name });
        }

        let id = self
            .store
            .categories
            .insert_with(|id, seq| Category::new(id, seq, name, match_type, match_system, sex));
        self.emit(TournamentEvent::CategoryCreated { category_id: id });
        Ok(id)
    }

    pub fn set_category_parameter(
        &mut self,
        category_id: i64,
        key: CatParameter,
        value: ParamValue,
    ) -> Result<()> {
        let cat = self
            .store
            .categories
            .get_mut(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        if cat.state != CategoryState::Config {
            return Err(TournamentError::WrongState);
        }
        cat.set_parameter(key, value);
        Ok(())
    }

    pub(crate) fn set_category_state(&mut self, category_id: i64, to: CategoryState) {
        let cat = self.store.categories.expect_mut(category_id);
        let from = cat.state;
        if from == to {
            return;
        }
        cat.state = to;
        debug!(category_id, ?from, ?to, "category state changed");
        self.emit(TournamentEvent::CategoryStateChanged {
            category_id,
            from,
            to,
        });
    }

    // ------------------------------------------------------------------
    // membership & pairing
    // ------------------------------------------------------------------

    pub fn add_player_to_category(&mut self, category_id: i64, player_id: i64) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        let player = self
            .store
            .players
            .get(player_id)
            .ok_or(TournamentError::InvalidId { id: player_id })?;

        if !cat.can_add_players() {
            return Err(TournamentError::CategoryClosedForMorePlayers);
        }
        // mixed categories take both sexes; others enforce the restriction
        if cat.match_type != MatchType::Mixed {
            if let Some(required) = cat.sex {
                if player.sex != required {
                    return Err(TournamentError::PlayerNotSuitable);
                }
            }
        }
        if self.store.pair_of_player(category_id, player_id).is_some() {
            return Err(TournamentError::PlayerAlreadyInCategory);
        }

        self.store.pairs.insert_with(|id, seq| PlayerPair {
            id,
            seq_num: seq,
            category_id,
            player1_id: player_id,
            player2_id: None,
            group_num: None,
            initial_rank: None,
        });
        self.emit(TournamentEvent::PlayerAddedToCategory {
            category_id,
            player_id,
        });
        Ok(())
    }

    pub fn remove_player_from_category(&mut self, category_id: i64, player_id: i64) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        if !cat.can_add_players() {
            return Err(TournamentError::CategoryClosedForMorePlayers);
        }

        let pair = self
            .store
            .pair_of_player(category_id, player_id)
            .ok_or(TournamentError::PlayerNotInCategory)?;
        let pair_id = pair.id;

        if pair.player2_id.is_some() {
            // split the pair first, then drop the leaving player's half
            let partner_leaves = pair.player1_id == player_id;
            let pair = self.store.pairs.expect_mut(pair_id);
            if partner_leaves {
                let partner = pair.player2_id.take().expect("partner checked above");
                pair.player1_id = partner;
            } else {
                pair.player2_id = None;
            }
        } else {
            self.store.pairs.delete(pair_id);
        }
        self.emit(TournamentEvent::PlayerRemovedFromCategory {
            category_id,
            player_id,
        });
        Ok(())
    }

    pub fn pair_players(&mut self, category_id: i64, player1_id: i64, player2_id: i64) -> Result<i64> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;

        if !cat.match_type.requires_partner() {
            return Err(TournamentError::NoCategoryForPairing);
        }
        if cat.state != CategoryState::Config {
            return Err(TournamentError::CategoryClosedForMorePlayers);
        }
        if player1_id == player2_id {
            return Err(TournamentError::PlayersIdentical);
        }

        let entry1 = self
            .store
            .pair_of_player(category_id, player1_id)
            .ok_or(TournamentError::PlayerNotInCategory)?;
        let entry2 = self
            .store
            .pair_of_player(category_id, player2_id)
            .ok_or(TournamentError::PlayerNotInCategory)?;
        if entry1.player2_id.is_some() || entry2.player2_id.is_some() {
            return Err(TournamentError::PlayerAlreadyPaired);
        }

        if cat.match_type == MatchType::Mixed {
            let sex1 = self.store.players.expect(player1_id).sex;
            let sex2 = self.store.players.expect(player2_id).sex;
            if sex1 == sex2 {
                return Err(TournamentError::InvalidSex);
            }
        }

        let (keep, drop) = (entry1.id, entry2.id);
        self.store.pairs.expect_mut(keep).player2_id = Some(player2_id);
        self.store.pairs.delete(drop);
        self.emit(TournamentEvent::PairCreated {
            category_id,
            pair_id: keep,
        });
        Ok(keep)
    }

    pub fn split_players(&mut self, category_id: i64, pair_id: i64) -> Result<()> {
        let cat = self
            .store
            .categories
            .get(category_id)
            .ok_or(TournamentError::InvalidId { id: category_id })?;
        if cat.state != CategoryState::Config {
            return Err(TournamentError::CategoryClosedForMorePlayers);
        }

        let pair = self
            .store
            .pairs
            .get(pair_id)
            .filter(|p| p.category_id == category_id)
            .ok_or(TournamentError::InvalidId { id: pair_id })?;
        let partner = pair.player2_id.ok_or(TournamentError::PlayersNotAPair)?;

        self.store.pairs.expect_mut(pair_id).player2_id = None;
        self.store.pairs.insert_with(|id, seq| PlayerPair {
            id,
            seq_num: seq,
            category_id,
            player1_id: partner,
            player2_id: None,
            group_num: None,
            initial_rank: None,
        });
        self.emit(TournamentEvent::PairSplit {
            category_id,
            pair_id,
        });
        Ok(())
    }

    /// True if any doubles/mixed entry still lacks a partner. Singles
    /// entries are complete on their own.
    pub fn has_unpaired_players(&self, category_id: i64) -> bool {
        let Some(cat) = self.store.categories.get(category_id) else {
            return false;
        };
        let requires_partner = cat.match_type.requires_partner();
        self.store
            .pairs_in_category(category_id, None)
            .iter()
            .any(|p| !p.is_complete(requires_partner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchSystem;

    fn tournament_with_players() -> (Tournament, Vec<i64>) {
        let mut t = Tournament::new();
        let ids = vec![
            t.create_player("Ana", "Silva", Sex::F).unwrap(),
            t.create_player("Ben", "Tan", Sex::M).unwrap(),
            t.create_player("Cara", "Wu", Sex::F).unwrap(),
            t.create_player("Dan", "Ito", Sex::M).unwrap(),
        ];
        (t, ids)
    }

    #[test]
    fn test_player_names_are_unique() {
        let (mut t, _) = tournament_with_players();
        let err = t.create_player("Ana", "Silva", Sex::F).unwrap_err();
        assert!(matches!(err, TournamentError::NameExists { .. }));
        assert_eq!(t.create_player("", "X", Sex::M), Err(TournamentError::InvalidName));
    }

    #[test]
    fn test_sex_restriction_on_add() {
        let (mut t, ids) = tournament_with_players();
        let cat = t
            .create_category("LS", MatchType::Singles, MatchSystem::RoundRobin, Some(Sex::F))
            .unwrap();
        assert!(t.add_player_to_category(cat, ids[0]).is_ok());
        assert_eq!(
            t.add_player_to_category(cat, ids[1]),
            Err(TournamentError::PlayerNotSuitable)
        );
        assert_eq!(
            t.add_player_to_category(cat, ids[0]),
            Err(TournamentError::PlayerAlreadyInCategory)
        );
    }

    #[test]
    fn test_mixed_pairing_requires_opposite_sexes() {
        let (mut t, ids) = tournament_with_players();
        let cat = t
            .create_category("XD", MatchType::Mixed, MatchSystem::RoundRobin, None)
            .unwrap();
        for id in &ids {
            t.add_player_to_category(cat, *id).unwrap();
        }

        // Ana + Cara are both female
        assert_eq!(
            t.pair_players(cat, ids[0], ids[2]),
            Err(TournamentError::InvalidSex)
        );

        let pair = t.pair_players(cat, ids[0], ids[1]).unwrap();
        assert_eq!(
            t.pair_players(cat, ids[0], ids[3]),
            Err(TournamentError::PlayerAlreadyPaired)
        );
        assert!(t.has_unpaired_players(cat));

        t.split_players(cat, pair).unwrap();
        assert_eq!(t.store().pairs_in_category(cat, None).len(), 4);
    }

    #[test]
    fn test_pairing_rejected_for_singles() {
        let (mut t, ids) = tournament_with_players();
        let cat = t
            .create_category("MS", MatchType::Singles, MatchSystem::RoundRobin, Some(Sex::M))
            .unwrap();
        t.add_player_to_category(cat, ids[1]).unwrap();
        t.add_player_to_category(cat, ids[3]).unwrap();
        assert_eq!(
            t.pair_players(cat, ids[1], ids[3]),
            Err(TournamentError::NoCategoryForPairing)
        );
    }

    #[test]
    fn test_unpaired_detection_respects_match_type() {
        let (mut t, ids) = tournament_with_players();

        // singles entries have no partner and are complete as they are
        let singles = t
            .create_category("MS", MatchType::Singles, MatchSystem::SingleElimination, Some(Sex::M))
            .unwrap();
        t.add_player_to_category(singles, ids[1]).unwrap();
        t.add_player_to_category(singles, ids[3]).unwrap();
        assert!(!t.has_unpaired_players(singles));
        t.freeze_category_config(singles).unwrap();

        // doubles entries count as unpaired until paired
        let doubles = t
            .create_category("MD", MatchType::Doubles, MatchSystem::RoundRobin, Some(Sex::M))
            .unwrap();
        t.add_player_to_category(doubles, ids[1]).unwrap();
        t.add_player_to_category(doubles, ids[3]).unwrap();
        assert!(t.has_unpaired_players(doubles));
        t.pair_players(doubles, ids[1], ids[3]).unwrap();
        assert!(!t.has_unpaired_players(doubles));
    }

    #[test]
    fn test_remove_player_splits_pairs() {
        let (mut t, ids) = tournament_with_players();
        let cat = t
            .create_category("WD", MatchType::Doubles, MatchSystem::RoundRobin, Some(Sex::F))
            .unwrap();
        t.add_player_to_category(cat, ids[0]).unwrap();
        t.add_player_to_category(cat, ids[2]).unwrap();
        t.pair_players(cat, ids[0], ids[2]).unwrap();

        t.remove_player_from_category(cat, ids[0]).unwrap();
        let pairs = t.store().pairs_in_category(cat, None);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].player1_id, ids[2]);
        assert_eq!(pairs[0].player2_id, None);
    }
}
