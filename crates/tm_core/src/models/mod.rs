pub mod category;
pub mod court;
pub mod ko_config;
pub mod match_entry;
pub mod pair;
pub mod ranking;

pub use category::{CatParameter, Category, CategoryState, MatchSystem, MatchType, ParamValue};
pub use court::{Court, CourtState};
pub use ko_config::{GroupDef, KoConfig, KoStart};
pub use match_entry::{
    GameScore, GroupTag, Match, MatchGroup, MatchScore, MatchState, Side, SlotRef,
};
pub use pair::{Player, PlayerPair, Sex};
pub use ranking::RankingEntry;
