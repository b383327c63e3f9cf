//! Typed change notifications for UI/report collaborators.
//!
//! The engine publishes domain events through an injected sink instead of
//! a process-wide emitter, so consumers decide how to fan them out.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::models::{CategoryState, CourtState, MatchState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentEvent {
    CategoryCreated {
        category_id: i64,
    },
    CategoryStateChanged {
        category_id: i64,
        from: CategoryState,
        to: CategoryState,
    },
    PlayerCreated {
        player_id: i64,
    },
    PlayerRenamed {
        player_id: i64,
    },
    PlayerAddedToCategory {
        category_id: i64,
        player_id: i64,
    },
    PlayerRemovedFromCategory {
        category_id: i64,
        player_id: i64,
    },
    PairCreated {
        category_id: i64,
        pair_id: i64,
    },
    PairSplit {
        category_id: i64,
        pair_id: i64,
    },
    MatchCreated {
        category_id: i64,
        match_id: i64,
    },
    MatchStateChanged {
        match_id: i64,
        from: MatchState,
        to: MatchState,
    },
    CourtCreated {
        court_id: i64,
    },
    CourtRenamed {
        court_id: i64,
    },
    CourtStateChanged {
        court_id: i64,
        from: CourtState,
        to: CourtState,
    },
    CourtDeleted {
        court_id: i64,
    },
    RoundCompleted {
        category_id: i64,
        round: u32,
    },
}

pub trait EventSink {
    fn publish(&mut self, event: TournamentEvent);
}

/// Drops every event; the default sink for headless use.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&mut self, _event: TournamentEvent) {}
}

/// Buffers events behind a shared handle; used by tests and by UIs that
/// drain notifications once per frame.
#[derive(Debug, Default)]
pub struct RecordingSink {
    buffer: Arc<Mutex<Vec<TournamentEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    /// Shared handle onto the buffered events.
    pub fn handle(&self) -> Arc<Mutex<Vec<TournamentEvent>>> {
        Arc::clone(&self.buffer)
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: TournamentEvent) {
        self.buffer.lock().expect("event buffer poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_buffers_in_order() {
        let mut sink = RecordingSink::new();
        let handle = sink.handle();

        sink.publish(TournamentEvent::CategoryCreated { category_id: 1 });
        sink.publish(TournamentEvent::CourtCreated { court_id: 7 });

        let events = handle.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            TournamentEvent::CategoryCreated { category_id: 1 }
        );
    }
}
