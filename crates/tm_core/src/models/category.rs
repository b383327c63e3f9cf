use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TournamentError};
use crate::models::ko_config::KoConfig;
use crate::models::pair::Sex;
use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Singles,
    Doubles,
    Mixed,
}

impl MatchType {
    pub fn requires_partner(self) -> bool {
        !matches!(self, MatchType::Singles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSystem {
    RoundRobin,
    SingleElimination,
    SwissLadder,
}

/// Lifecycle state of a category.
///
/// Transitions run strictly forward: `Config` -> `Frozen` -> `Idle` ->
/// `GroupRounds` -> `WaitForIntermediateSeeding` -> `Elimination` ->
/// `Finished`, with system-specific shortcuts (pure elimination skips the
/// group states, Swiss ladder never enters the elimination states).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryState {
    Config,
    Frozen,
    Idle,
    GroupRounds,
    WaitForIntermediateSeeding,
    Elimination,
    Finished,
}

/// Keys of the category parameter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CatParameter {
    AllowDraw,
    WinScore,
    DrawScore,
    GroupConfig,
    ThirdPlaceMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub seq_num: usize,
    pub name: String,
    pub match_type: MatchType,
    pub match_system: MatchSystem,
    /// Sex restriction; `None` means no restriction (and is implied for
    /// mixed categories).
    pub sex: Option<Sex>,
    pub state: CategoryState,
    /// Number of rounds for which the round-completion hook has fired.
    pub finished_rounds: u32,
    params: BTreeMap<CatParameter, ParamValue>,
}

impl Category {
    pub fn new(
        id: i64,
        seq_num: usize,
        name: String,
        match_type: MatchType,
        match_system: MatchSystem,
        sex: Option<Sex>,
    ) -> Self {
        Category {
            id,
            seq_num,
            name,
            match_type,
            match_system,
            sex,
            state: CategoryState::Config,
            finished_rounds: 0,
            params: BTreeMap::new(),
        }
    }

    pub fn set_parameter(&mut self, key: CatParameter, value: ParamValue) {
        self.params.insert(key, value);
    }

    pub fn parameter(&self, key: CatParameter) -> Option<&ParamValue> {
        self.params.get(&key)
    }

    pub fn parameter_bool(&self, key: CatParameter) -> bool {
        match self.params.get(&key) {
            Some(ParamValue::Bool(b)) => *b,
            _ => match key {
                // a placement match for beaten semifinalists is played
                // unless explicitly disabled
                CatParameter::ThirdPlaceMatch => true,
                _ => false,
            },
        }
    }

    pub fn parameter_int(&self, key: CatParameter) -> i32 {
        match self.params.get(&key) {
            Some(ParamValue::Int(i)) => *i,
            _ => match key {
                // best of three: two won games decide a match
                CatParameter::WinScore => 2,
                _ => 0,
            },
        }
    }

    pub fn parameter_string(&self, key: CatParameter) -> String {
        match self.params.get(&key) {
            Some(ParamValue::Str(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Parses the group/bracket configuration out of the parameter map.
    pub fn group_config(&self) -> Result<KoConfig> {
        self.parameter_string(CatParameter::GroupConfig)
            .parse()
            .map_err(|_| TournamentError::InvalidKoConfig)
    }

    pub fn allows_draw(&self) -> bool {
        self.parameter_bool(CatParameter::AllowDraw)
    }

    pub fn win_score(&self) -> u32 {
        self.parameter_int(CatParameter::WinScore).max(1) as u32
    }

    pub fn third_place_match(&self) -> bool {
        self.parameter_bool(CatParameter::ThirdPlaceMatch)
    }

    /// Players can only be added or removed while configuring.
    pub fn can_add_players(&self) -> bool {
        self.state == CategoryState::Config
    }
}

impl Row for Category {
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

    fn cat() -> Category {
        Category::new(
            1,
            0,
            "MS".into(),
            MatchType::Singles,
            MatchSystem::RoundRobin,
            Some(Sex::M),
        )
    }

    #[test]
    fn test_parameter_defaults() {
        let c = cat();
        assert!(!c.allows_draw());
        assert_eq!(c.win_score(), 2);
        assert!(c.third_place_match());
        assert!(c.group_config().is_err());
    }

    #[test]
    fn test_parameter_overrides() {
        let mut c = cat();
        c.set_parameter(CatParameter::AllowDraw, ParamValue::Bool(true));
        c.set_parameter(CatParameter::WinScore, ParamValue::Int(3));
        c.set_parameter(CatParameter::GroupConfig, ParamValue::Str("F;0;2:4".into()));
        assert!(c.allows_draw());
        assert_eq!(c.win_score(), 3);
        assert_eq!(c.group_config().unwrap().num_groups(), 2);
    }
}
