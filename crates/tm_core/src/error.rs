use thiserror::Error;

/// Closed set of recoverable failure kinds.
///
/// Every mutating engine operation reports its outcome through this enum;
/// internal invariant violations (e.g. a finished match without a winner)
/// are programming errors and panic instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TournamentError {
    #[error("Invalid name")]
    InvalidName,

    #[error("Name already exists: {name}")]
    NameExists { name: String },

    #[error("Invalid sex for this operation")]
    InvalidSex,

    #[error("Category is closed for more players")]
    CategoryClosedForMorePlayers,

    #[error("Player does not match the category's restrictions")]
    PlayerNotSuitable,

    #[error("Player is already registered in this category")]
    PlayerAlreadyInCategory,

    #[error("Player is not registered in this category")]
    PlayerNotInCategory,

    #[error("Player is already part of another pair")]
    PlayerAlreadyPaired,

    #[error("Players do not form a pair")]
    PlayersNotAPair,

    #[error("A player cannot be paired with themselves")]
    PlayersIdentical,

    #[error("Category has no doubles pairing")]
    NoCategoryForPairing,

    #[error("Category configuration is already frozen")]
    ConfigAlreadyFrozen,

    #[error("Category has unpaired players")]
    UnpairedPlayers,

    #[error("Invalid group / bracket configuration")]
    InvalidKoConfig,

    #[error("Invalid player count: found {found}, need at least {min}")]
    InvalidPlayerCount { found: usize, min: usize },

    #[error("Category is not yet frozen")]
    CategoryNotYetFrozen,

    #[error("Category cannot be unfrozen anymore")]
    CategoryNotUnfreezeable,

    #[error("Category needs no group assignments")]
    CategoryNeedsNoGroupAssignments,

    #[error("Category needs no seeding")]
    CategoryNeedsNoSeeding,

    #[error("Proposed groups do not match the group configuration")]
    GroupNumberMismatch,

    #[error("Operation not allowed in the current state")]
    WrongState,

    #[error("Invalid round number: {round}")]
    InvalidRound { round: u32 },

    #[error("Seeding list does not match the expected players")]
    InvalidSeedingList,

    #[error("Invalid rank: {rank}")]
    InvalidRank { rank: i32 },

    #[error("Invalid id: {id}")]
    InvalidId { id: i64 },

    #[error("Match is not in a runnable state")]
    MatchNotRunnable,

    #[error("Match is not running")]
    MatchNotRunning,

    #[error("Match result is not valid for the category settings")]
    InvalidMatchResultForCategorySettings,

    #[error("Court number already exists: {number}")]
    CourtNumberExists { number: u32 },

    #[error("No court available")]
    NoCourtAvail,

    #[error("Only a manual-assignment court is available")]
    OnlyManualCourtAvail,

    #[error("Court is busy")]
    CourtBusy,

    #[error("Court is disabled")]
    CourtDisabled,

    #[error("Court is not disabled")]
    CourtNotDisabled,

    #[error("Court has already been used by a match")]
    CourtAlreadyUsed,

    #[error("Round is not finished yet")]
    RoundNotFinished,

    #[error("Ranking entries are missing")]
    MissingRankingEntries,

    #[error("Operation was canceled")]
    OperationCanceled,
}

pub type Result<T> = std::result::Result<T, TournamentError>;
