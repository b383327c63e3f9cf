//! # tm_core - Tournament Management Engine
//!
//! This library drives racket-sport tournaments from registration to the
//! final ranking: categories with pluggable match systems (round robin
//! with an elimination phase, pure single elimination, Swiss ladder),
//! match scheduling on a limited set of courts and per-round standings.
//!
//! ## Features
//! - Category lifecycle as an explicit state machine
//! - Bracket generation with seeding, byes and forward links
//! - Three-tier performance ranking (matches, games, points)
//! - Progress reporting with cancellation for bulk generation
//! - Typed domain events through an injected sink

pub mod bracket;
pub mod category;
pub mod court;
pub mod error;
pub mod events;
pub mod match_flow;
pub mod models;
pub mod progress;
pub mod ranking;
pub mod store;
pub mod tournament;

pub use category::{variant_for, CategoryVariant};
pub use error::{Result, TournamentError};
pub use events::{EventSink, NullEventSink, RecordingSink, TournamentEvent};
pub use models::{
    CatParameter, Category, CategoryState, Court, CourtState, GameScore, GroupDef, GroupTag,
    KoConfig, KoStart, Match, MatchGroup, MatchScore, MatchState, MatchSystem, MatchType,
    ParamValue, Player, PlayerPair, RankingEntry, Sex, Side, SlotRef,
};
pub use progress::ProgressQueue;
pub use ranking::performance_order;
pub use store::TournamentStore;
pub use tournament::Tournament;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
