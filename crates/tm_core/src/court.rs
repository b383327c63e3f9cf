//! Court management and the automatic court-selection policy.

use tracing::debug;

use crate::error::{Result, TournamentError};
use crate::events::TournamentEvent;
use crate::models::{Court, CourtState};
use crate::tournament::{Tournament, MAX_NAME_LEN};

impl Tournament {
    pub fn create_court(&mut self, number: u32, name: &str) -> Result<i64> {
        let name = name.trim().to_string();
        if name.len() > MAX_NAME_LEN {
            return Err(TournamentError::InvalidName);
        }
        if self.store.courts.iter().any(|c| c.number == number) {
            return Err(TournamentError::CourtNumberExists { number });
        }

        let id = self.store.courts.insert_with(|id, seq| Court {
            id,
            seq_num: seq,
            number,
            name,
            state: CourtState::Available,
            manual_assignment_only: false,
        });
        self.emit(TournamentEvent::CourtCreated { court_id: id });
        Ok(id)
    }

    pub fn rename_court(&mut self, court_id: i64, new_name: &str) -> Result<()> {
        let name = new_name.trim().to_string();
        if name.len() > MAX_NAME_LEN {
            return Err(TournamentError::InvalidName);
        }
        let court = self
            .store
            .courts
            .get_mut(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        court.name = name;
        self.emit(TournamentEvent::CourtRenamed { court_id });
        Ok(())
    }

    pub fn set_court_manual_assignment(&mut self, court_id: i64, manual: bool) -> Result<()> {
        let court = self
            .store
            .courts
            .get_mut(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        court.manual_assignment_only = manual;
        Ok(())
    }

    /// The lowest-numbered available court, optionally skipping courts
    /// reserved for manual assignment.
    pub fn get_next_unused_court(&self, include_manual: bool) -> Option<&Court> {
        self.store
            .courts
            .iter()
            .filter(|c| c.state == CourtState::Available)
            .filter(|c| include_manual || !c.manual_assignment_only)
            .min_by_key(|c| c.number)
    }

    /// Court-selection policy for automatic match assignment: regular
    /// courts first; a free manual court is only handed out when the
    /// caller asked for it, and is reported otherwise so the caller can
    /// offer it to the operator.
    pub fn auto_select_next_unused_court(&self, include_manual: bool) -> Result<&Court> {
        if let Some(court) = self.get_next_unused_court(false) {
            return Ok(court);
        }
        match self.get_next_unused_court(true) {
            None => Err(TournamentError::NoCourtAvail),
            Some(manual_court) => {
                if include_manual {
                    Ok(manual_court)
                } else {
                    Err(TournamentError::OnlyManualCourtAvail)
                }
            }
        }
    }

    pub(crate) fn acquire_court(&mut self, court_id: i64) -> Result<()> {
        let court = self
            .store
            .courts
            .get(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        match court.state {
            CourtState::Available => {}
            CourtState::Busy => return Err(TournamentError::CourtBusy),
            CourtState::Disabled => return Err(TournamentError::CourtDisabled),
        }
        self.set_court_state(court_id, CourtState::Busy);
        Ok(())
    }

    pub(crate) fn release_court(&mut self, court_id: i64) -> Result<()> {
        let court = self
            .store
            .courts
            .get(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        if court.state != CourtState::Busy {
            return Err(TournamentError::WrongState);
        }
        // consistency guard: never free a court from under a running match
        if self.store.running_match_on_court(court_id).is_some() {
            return Err(TournamentError::CourtBusy);
        }
        self.set_court_state(court_id, CourtState::Available);
        Ok(())
    }

    pub fn disable_court(&mut self, court_id: i64) -> Result<()> {
        let court = self
            .store
            .courts
            .get(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        match court.state {
            CourtState::Disabled => Ok(()), // nothing to do
            CourtState::Busy => Err(TournamentError::CourtBusy),
            CourtState::Available => {
                self.set_court_state(court_id, CourtState::Disabled);
                Ok(())
            }
        }
    }

    pub fn enable_court(&mut self, court_id: i64) -> Result<()> {
        let court = self
            .store
            .courts
            .get(court_id)
            .ok_or(TournamentError::InvalidId { id: court_id })?;
        if court.state != CourtState::Disabled {
            return Err(TournamentError::CourtNotDisabled);
        }
        self.set_court_state(court_id, CourtState::Available);
        Ok(())
    }

    /// Deletes a never-used court. Courts that appear in any match, even
    /// a long finished one, must be disabled instead to keep the match
    /// history intact.
    pub fn delete_court(&mut self, court_id: i64) -> Result<()> {
        if self.store.courts.get(court_id).is_none() {
            return Err(TournamentError::InvalidId { id: court_id });
        }
        if self.store.court_was_used(court_id) {
            return Err(TournamentError::CourtAlreadyUsed);
        }
        self.store.courts.delete(court_id);
        self.emit(TournamentEvent::CourtDeleted { court_id });
        Ok(())
    }

    fn set_court_state(&mut self, court_id: i64, to: CourtState) {
        let court = self.store.courts.expect_mut(court_id);
        let from = court.state;
        court.state = to;
        debug!(court_id, ?from, ?to, "court state changed");
        self.emit(TournamentEvent::CourtStateChanged { court_id, from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tournament_with_courts() -> (Tournament, Vec<i64>) {
        let mut t = Tournament::new();
        let c1 = t.create_court(1, "Center").unwrap();
        let c2 = t.create_court(2, "").unwrap();
        let c3 = t.create_court(3, "Training").unwrap();
        t.set_court_manual_assignment(c3, true).unwrap();
        (t, vec![c1, c2, c3])
    }

    #[test]
    fn test_court_numbers_are_unique() {
        let (mut t, _) = tournament_with_courts();
        assert_eq!(
            t.create_court(2, "dup"),
            Err(TournamentError::CourtNumberExists { number: 2 })
        );
    }

    #[test]
    fn test_next_unused_prefers_lowest_number() {
        let (mut t, courts) = tournament_with_courts();
        assert_eq!(t.get_next_unused_court(false).unwrap().id, courts[0]);

        t.acquire_court(courts[0]).unwrap();
        assert_eq!(t.get_next_unused_court(false).unwrap().id, courts[1]);

        // manual court only shows up when explicitly included
        t.acquire_court(courts[1]).unwrap();
        assert!(t.get_next_unused_court(false).is_none());
        assert_eq!(t.get_next_unused_court(true).unwrap().id, courts[2]);
    }

    #[test]
    fn test_auto_select_policy() {
        let (mut t, courts) = tournament_with_courts();
        t.acquire_court(courts[0]).unwrap();
        t.acquire_court(courts[1]).unwrap();

        // only the manual court is left
        assert_eq!(
            t.auto_select_next_unused_court(false).unwrap_err(),
            TournamentError::OnlyManualCourtAvail
        );
        assert_eq!(
            t.auto_select_next_unused_court(true).unwrap().id,
            courts[2]
        );

        t.acquire_court(courts[2]).unwrap();
        assert_eq!(
            t.auto_select_next_unused_court(true).unwrap_err(),
            TournamentError::NoCourtAvail
        );
    }

    #[test]
    fn test_acquire_release_transitions() {
        let (mut t, courts) = tournament_with_courts();
        t.acquire_court(courts[0]).unwrap();
        assert_eq!(t.acquire_court(courts[0]), Err(TournamentError::CourtBusy));
        t.release_court(courts[0]).unwrap();
        assert_eq!(t.release_court(courts[0]), Err(TournamentError::WrongState));
    }

    #[test]
    fn test_disable_enable() {
        let (mut t, courts) = tournament_with_courts();
        t.acquire_court(courts[0]).unwrap();
        assert_eq!(t.disable_court(courts[0]), Err(TournamentError::CourtBusy));

        t.disable_court(courts[1]).unwrap();
        // disabling twice is a no-op
        t.disable_court(courts[1]).unwrap();
        assert_eq!(t.acquire_court(courts[1]), Err(TournamentError::CourtDisabled));
        assert_eq!(t.enable_court(courts[0]), Err(TournamentError::CourtNotDisabled));
        t.enable_court(courts[1]).unwrap();
        t.acquire_court(courts[1]).unwrap();
    }

    #[test]
    fn test_delete_unused_court_only() {
        let (mut t, courts) = tournament_with_courts();
        t.delete_court(courts[1]).unwrap();
        assert!(t.store().courts.get(courts[1]).is_none());
        assert_eq!(
            t.delete_court(courts[1]),
            Err(TournamentError::InvalidId { id: courts[1] })
        );
    }
}
